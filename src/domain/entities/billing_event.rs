use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Domain events raised after a gateway callback has been verified and the
/// payment recorded. Handlers run on the billing event worker, never on the
/// request path. No cross-event ordering is guaranteed; the idempotent
/// `record_payment`/`activate` operations make redelivery and reordering safe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BillingEvent {
    PaymentSucceeded {
        payment_id: Uuid,
        invoice_id: Uuid,
        subscription_id: Uuid,
        tenant_id: Uuid,
    },
    PaymentFailed {
        payment_id: Uuid,
        invoice_id: Uuid,
        subscription_id: Uuid,
        tenant_id: Uuid,
        reason: String,
    },
}

impl BillingEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            BillingEvent::PaymentSucceeded { .. } => "payment_succeeded",
            BillingEvent::PaymentFailed { .. } => "payment_failed",
        }
    }

    pub fn tenant_id(&self) -> Uuid {
        match self {
            BillingEvent::PaymentSucceeded { tenant_id, .. }
            | BillingEvent::PaymentFailed { tenant_id, .. } => *tenant_id,
        }
    }

    pub fn payment_id(&self) -> Uuid {
        match self {
            BillingEvent::PaymentSucceeded { payment_id, .. }
            | BillingEvent::PaymentFailed { payment_id, .. } => *payment_id,
        }
    }
}
