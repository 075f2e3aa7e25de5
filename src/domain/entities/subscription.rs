use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "subscription_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    None,
    Pending,
    Trial,
    Active,
    Expired,
    Cancelled,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::None => "none",
            SubscriptionStatus::Pending => "pending",
            SubscriptionStatus::Trial => "trial",
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Expired => "expired",
            SubscriptionStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pending" => SubscriptionStatus::Pending,
            "trial" => SubscriptionStatus::Trial,
            "active" => SubscriptionStatus::Active,
            "expired" => SubscriptionStatus::Expired,
            "cancelled" | "canceled" => SubscriptionStatus::Cancelled,
            _ => SubscriptionStatus::None,
        }
    }
}

/// One subscription per tenant (unique). Status is stored; everything
/// date-dependent (`is_active`, `is_usable`, ...) is derived at read time
/// against a caller-supplied date so it can never drift from the stored
/// validity window.
#[derive(Debug, Clone)]
pub struct Subscription {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub plan_id: Uuid,
    pub status: SubscriptionStatus,
    pub starts_at: NaiveDate,
    pub expires_at: NaiveDate,
    /// If present, always on or after `expires_at`.
    pub grace_period_ends_at: Option<NaiveDate>,
    pub created_at: Option<chrono::NaiveDateTime>,
    pub updated_at: Option<chrono::NaiveDateTime>,
}

impl Subscription {
    /// Within the paid-for window (Active/Trial status and not past expiry).
    /// Grace does not count as active.
    pub fn is_active(&self, today: NaiveDate) -> bool {
        matches!(
            self.status,
            SubscriptionStatus::Active | SubscriptionStatus::Trial
        ) && self.expires_at >= today
    }

    /// Past expiry but inside the grace window. Mutually exclusive with
    /// `is_active` for any given date.
    pub fn is_in_grace_period(&self, today: NaiveDate) -> bool {
        matches!(
            self.status,
            SubscriptionStatus::Active | SubscriptionStatus::Trial
        ) && self.expires_at < today
            && self
                .grace_period_ends_at
                .is_some_and(|grace_end| grace_end >= today)
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expires_at < today && !self.is_in_grace_period(today)
    }

    /// The single predicate the access gate consults.
    pub fn is_usable(&self, today: NaiveDate) -> bool {
        self.is_active(today) || self.is_in_grace_period(today)
    }
}

/// Append-only audit trail of status transitions. Never updated or deleted.
#[derive(Debug, Clone)]
pub struct SubscriptionHistory {
    pub id: Uuid,
    pub subscription_id: Uuid,
    pub previous_status: SubscriptionStatus,
    pub new_status: SubscriptionStatus,
    pub reason: String,
    /// None when the transition was made by the system (worker, sweep).
    pub actor: Option<Uuid>,
    pub created_at: Option<chrono::NaiveDateTime>,
}
