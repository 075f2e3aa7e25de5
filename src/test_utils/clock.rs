use std::sync::Mutex;

use chrono::{NaiveDate, NaiveDateTime};

use crate::application::clock::Clock;

/// Deterministic clock for date-sensitive tests; advance it explicitly.
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn at(today: NaiveDate) -> Self {
        Self {
            now: Mutex::new(today.and_hms_opt(12, 0, 0).unwrap()),
        }
    }

    pub fn set_today(&self, today: NaiveDate) {
        *self.now.lock().unwrap() = today.and_hms_opt(12, 0, 0).unwrap();
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap()
    }
}
