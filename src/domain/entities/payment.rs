use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Success => "success",
            PaymentStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_gateway", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentGateway {
    Razorpay,
    Dummy,
}

impl PaymentGateway {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentGateway::Razorpay => "razorpay",
            PaymentGateway::Dummy => "dummy",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "razorpay" => Some(PaymentGateway::Razorpay),
            "dummy" => Some(PaymentGateway::Dummy),
            _ => None,
        }
    }
}

/// One row per gateway payment attempt. Created Pending when the order is
/// initiated; `gateway_transaction_id` stays empty until a callback resolves
/// the attempt and is globally unique once set (the idempotency key — the
/// storage layer enforces it, so concurrent duplicate callbacks collapse to
/// one row).
#[derive(Debug, Clone)]
pub struct Payment {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub invoice_id: Uuid,
    pub gateway: PaymentGateway,
    pub gateway_order_id: String,
    pub gateway_transaction_id: Option<String>,
    pub amount_cents: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub failure_reason: Option<String>,
    pub payment_date: Option<chrono::NaiveDateTime>,
    pub created_at: Option<chrono::NaiveDateTime>,
    pub updated_at: Option<chrono::NaiveDateTime>,
}
