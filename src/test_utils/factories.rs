use chrono::NaiveDate;
use uuid::Uuid;

use crate::domain::entities::{
    subscription::{Subscription, SubscriptionStatus},
    subscription_plan::{BillingCycle, SubscriptionPlan},
    tenant::Tenant,
};

pub fn monthly_plan() -> SubscriptionPlan {
    SubscriptionPlan {
        id: Uuid::new_v4(),
        code: "standard-monthly".into(),
        name: "Standard (monthly)".into(),
        billing_cycle: BillingCycle::Monthly,
        price_cents: 49_900,
        currency: "INR".into(),
        trial_days: 0,
        active: true,
        created_at: None,
        updated_at: None,
    }
}

pub fn pending_subscription(plan_id: Uuid, starts_at: NaiveDate) -> Subscription {
    Subscription {
        id: Uuid::new_v4(),
        tenant_id: Uuid::new_v4(),
        plan_id,
        status: SubscriptionStatus::Pending,
        starts_at,
        expires_at: starts_at,
        grace_period_ends_at: None,
        created_at: None,
        updated_at: None,
    }
}

pub fn tenant(billing_email: &str) -> Tenant {
    Tenant {
        id: Uuid::new_v4(),
        name: "Riverdale College".into(),
        billing_email: billing_email.into(),
        created_at: None,
    }
}
