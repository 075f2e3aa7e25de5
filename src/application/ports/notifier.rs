use async_trait::async_trait;

use crate::app_error::AppResult;

/// Outbound notification boundary (messaging/email module). The
/// `PaymentFailed` handler is the only billing-core caller.
#[async_trait]
pub trait BillingNotifier: Send + Sync {
    async fn payment_failed(
        &self,
        billing_email: &str,
        invoice_number: &str,
        reason: &str,
    ) -> AppResult<()>;
}
