use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "invoice_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InvoiceStatus {
    Unpaid,
    Paid,
    PartiallyPaid,
    Failed,
    Void,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Unpaid => "unpaid",
            InvoiceStatus::Paid => "paid",
            InvoiceStatus::PartiallyPaid => "partially_paid",
            InvoiceStatus::Failed => "failed",
            InvoiceStatus::Void => "void",
        }
    }
}

/// One invoice per billing period of a subscription. Amounts are integer
/// minor units; the currency travels with every amount and is fixed at
/// generation time from the plan.
#[derive(Debug, Clone)]
pub struct Invoice {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub subscription_id: Uuid,
    /// Tenant-global unique, e.g. "INV-202401-9F2C41AB".
    pub invoice_number: String,
    pub amount_cents: i64,
    pub paid_cents: i64,
    pub currency: String,
    pub status: InvoiceStatus,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub due_date: NaiveDate,
    pub paid_at: Option<chrono::NaiveDateTime>,
    pub created_at: Option<chrono::NaiveDateTime>,
    pub updated_at: Option<chrono::NaiveDateTime>,
}

impl Invoice {
    pub fn due_cents(&self) -> i64 {
        (self.amount_cents - self.paid_cents).max(0)
    }

    /// Read-time predicate; overdue is never stored where it could drift.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.due_date < today && self.status != InvoiceStatus::Paid
    }
}
