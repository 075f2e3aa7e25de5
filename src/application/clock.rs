use chrono::{NaiveDate, NaiveDateTime, Utc};

/// Injected time source. Grace-period and expiry predicates take dates from
/// here instead of calling a global now, so the date-sensitive paths are
/// deterministic under test (see `test_utils::FixedClock`).
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().naive_utc()
    }
}
