use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::Receiver;
use tracing::{debug, error, info};

use crate::{
    app_error::AppResult,
    application::{
        ports::notifier::BillingNotifier,
        tenant_context::TenantContext,
        use_cases::billing::{BillingUseCases, InvoiceRepoTrait},
        use_cases::subscription::{SubscriptionUseCases, TenantRepoTrait},
    },
    domain::entities::billing_event::BillingEvent,
};

pub const MAX_ATTEMPTS: u32 = 5;
pub const RETRY_BACKOFF: Duration = Duration::from_secs(5);

/// Consumes billing events off the queue and applies their side effects,
/// decoupled from the request that accepted the gateway callback.
///
/// Each handler invocation that fails with a retryable error is retried up
/// to `max_attempts` with a fixed backoff; exhaustion (or a non-retryable
/// error) runs the terminal step exactly once: a persisted, structured
/// permanently-failed record. Events are processed on their own tasks so a
/// handler sleeping through backoff never stalls the queue.
pub struct BillingEventWorker {
    subscription_uc: Arc<SubscriptionUseCases>,
    billing_uc: Arc<BillingUseCases>,
    tenant_repo: Arc<dyn TenantRepoTrait>,
    invoice_repo: Arc<dyn InvoiceRepoTrait>,
    notifier: Arc<dyn BillingNotifier>,
    max_attempts: u32,
    backoff: Duration,
}

impl BillingEventWorker {
    pub fn new(
        subscription_uc: Arc<SubscriptionUseCases>,
        billing_uc: Arc<BillingUseCases>,
        tenant_repo: Arc<dyn TenantRepoTrait>,
        invoice_repo: Arc<dyn InvoiceRepoTrait>,
        notifier: Arc<dyn BillingNotifier>,
    ) -> Self {
        Self {
            subscription_uc,
            billing_uc,
            tenant_repo,
            invoice_repo,
            notifier,
            max_attempts: MAX_ATTEMPTS,
            backoff: RETRY_BACKOFF,
        }
    }

    /// Shrink the retry policy in tests.
    pub fn with_retry_policy(mut self, max_attempts: u32, backoff: Duration) -> Self {
        self.max_attempts = max_attempts;
        self.backoff = backoff;
        self
    }

    pub async fn run(self: Arc<Self>, mut events_rx: Receiver<BillingEvent>) {
        info!(
            max_attempts = self.max_attempts,
            backoff_secs = self.backoff.as_secs(),
            "Billing event worker started"
        );
        while let Some(event) = events_rx.recv().await {
            let worker = Arc::clone(&self);
            tokio::spawn(async move {
                worker.process(event).await;
            });
        }
        info!("Billing event channel closed, worker stopping");
    }

    /// One event, start to terminal outcome. Runs inside the event's own
    /// tenant scope, mirroring the per-request scope on the HTTP side.
    pub async fn process(&self, event: BillingEvent) {
        TenantContext::scope(Some(event.tenant_id()), async {
            let mut attempt = 0u32;
            loop {
                attempt += 1;
                match self.handle(&event).await {
                    Ok(()) => {
                        debug!(
                            event_kind = event.kind(),
                            payment_id = %event.payment_id(),
                            attempt,
                            "Billing event handled"
                        );
                        return;
                    }
                    Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                        error!(
                            event_kind = event.kind(),
                            payment_id = %event.payment_id(),
                            attempt,
                            error = %e,
                            "Billing event handler failed, will retry"
                        );
                        tokio::time::sleep(self.backoff).await;
                    }
                    Err(e) => {
                        self.billing_uc
                            .record_permanent_failure(&event, attempt as i32, &e.to_string())
                            .await;
                        return;
                    }
                }
            }
        })
        .await;
    }

    async fn handle(&self, event: &BillingEvent) -> AppResult<()> {
        match event {
            BillingEvent::PaymentSucceeded {
                subscription_id, ..
            } => {
                self.subscription_uc
                    .activate(*subscription_id, "payment confirmed", None)
                    .await?;
                Ok(())
            }
            BillingEvent::PaymentFailed {
                invoice_id,
                tenant_id,
                reason,
                ..
            } => {
                let tenant = self
                    .tenant_repo
                    .get_by_id(*tenant_id)
                    .await?
                    .ok_or(crate::app_error::AppError::NotFound)?;
                let invoice = self
                    .invoice_repo
                    .get_by_id(*invoice_id)
                    .await?
                    .ok_or(crate::app_error::AppError::NotFound)?;
                self.notifier
                    .payment_failed(&tenant.billing_email, &invoice.invoice_number, reason)
                    .await
            }
        }
    }
}
