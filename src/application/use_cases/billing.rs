use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use rand::RngCore;
use serde::Serialize;
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        clock::Clock,
        isolation,
        jwt::Principal,
        ports::payment_gateway::{CallbackOutcome, GatewayCallback, GatewayOrder},
        tenant_context::TenantContext,
        use_cases::gateway_factory::GatewayFactory,
        use_cases::subscription::SubscriptionRepoTrait,
    },
    domain::entities::{
        billing_event::BillingEvent,
        invoice::{Invoice, InvoiceStatus},
        payment::{Payment, PaymentGateway, PaymentStatus},
        subscription::Subscription,
        subscription_plan::SubscriptionPlan,
    },
};

use crate::application::use_cases::subscription::SubscriptionPlanRepoTrait;

// ============================================================================
// Repository Traits
// ============================================================================

#[derive(Debug, Clone)]
pub struct CreateInvoiceInput {
    pub tenant_id: Uuid,
    pub subscription_id: Uuid,
    pub invoice_number: String,
    pub amount_cents: i64,
    pub currency: String,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub due_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaginatedInvoices {
    pub invoices: Vec<InvoiceView>,
    pub total: i64,
    pub page: i32,
    pub per_page: i32,
    pub total_pages: i32,
}

#[async_trait]
pub trait InvoiceRepoTrait: Send + Sync {
    /// Must fail with `DuplicatePeriod` when an invoice already covers
    /// `(subscription_id, period_start)` — the storage-level unique
    /// constraint backs this under concurrent retries.
    async fn create(&self, input: &CreateInvoiceInput) -> AppResult<Invoice>;

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Invoice>>;

    async fn get_latest_for_subscription(
        &self,
        subscription_id: Uuid,
    ) -> AppResult<Option<Invoice>>;

    async fn list_by_tenant(
        &self,
        tenant_id: Uuid,
        page: i32,
        per_page: i32,
    ) -> AppResult<(Vec<Invoice>, i64)>;

    /// Recompute `paid_cents` from the successful payments and derive the
    /// settled status, all in one atomic statement. Two callbacks settling
    /// the same invoice concurrently must both leave the full sum behind;
    /// a read-then-write pair here would let the later writer apply a
    /// stale, smaller total. `now` becomes `paid_at` when the invoice
    /// settles in full and had none yet.
    async fn settle_totals(&self, id: Uuid, now: NaiveDateTime) -> AppResult<Invoice>;
}

#[derive(Debug, Clone)]
pub struct CreatePendingPaymentInput {
    pub tenant_id: Uuid,
    pub invoice_id: Uuid,
    pub gateway: PaymentGateway,
    pub gateway_order_id: String,
    pub amount_cents: i64,
    pub currency: String,
}

#[async_trait]
pub trait PaymentRepoTrait: Send + Sync {
    async fn create_pending(&self, input: &CreatePendingPaymentInput) -> AppResult<Payment>;

    async fn get_by_transaction_id(&self, transaction_id: &str) -> AppResult<Option<Payment>>;

    async fn find_unresolved_for_order(
        &self,
        gateway_order_id: &str,
    ) -> AppResult<Option<Payment>>;

    /// Claim the pending payment for a callback: set the transaction id and
    /// final status iff the row is still unresolved. Returns `None` when the
    /// row was already claimed (duplicate callback racing ahead) — the
    /// unique constraint on the transaction id makes the winner unique.
    async fn resolve(
        &self,
        payment_id: Uuid,
        transaction_id: &str,
        status: PaymentStatus,
        failure_reason: Option<&str>,
        payment_date: NaiveDateTime,
    ) -> AppResult<Option<Payment>>;

    async fn list_by_tenant(
        &self,
        tenant_id: Uuid,
        page: i32,
        per_page: i32,
    ) -> AppResult<(Vec<Payment>, i64)>;
}

#[derive(Debug, Clone)]
pub struct EventFailureInput {
    pub event_kind: String,
    pub payment_id: Uuid,
    pub tenant_id: Uuid,
    pub reason: String,
    pub last_error: String,
    pub attempts: i32,
}

/// Terminal records of pipeline events that exhausted their retries; the
/// operator follow-up queue.
#[async_trait]
pub trait EventFailureRepoTrait: Send + Sync {
    async fn record(&self, input: &EventFailureInput) -> AppResult<()>;
}

// ============================================================================
// Views
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct InvoiceView {
    pub id: Uuid,
    pub invoice_number: String,
    pub amount_cents: i64,
    pub paid_cents: i64,
    pub due_cents: i64,
    pub currency: String,
    pub status: InvoiceStatus,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub due_date: NaiveDate,
    pub overdue: bool,
    pub paid_at: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentOrderView {
    pub payment_id: Uuid,
    pub invoice_id: Uuid,
    pub gateway: PaymentGateway,
    pub gateway_order_id: String,
    pub amount_cents: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentView {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub gateway: PaymentGateway,
    pub gateway_order_id: String,
    pub amount_cents: i64,
    pub currency: String,
    pub status: PaymentStatus,
    pub failure_reason: Option<String>,
    pub payment_date: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaginatedPayments {
    pub payments: Vec<PaymentView>,
    pub total: i64,
    pub page: i32,
    pub per_page: i32,
    pub total_pages: i32,
}

/// Outcome of `record_payment`. `replayed` marks the idempotent no-op path
/// (same transaction id seen before).
#[derive(Debug, Clone)]
pub struct RecordPaymentOutcome {
    pub payment: Payment,
    pub invoice: Invoice,
    pub replayed: bool,
}

// ============================================================================
// Use Cases
// ============================================================================

pub struct BillingUseCases {
    invoice_repo: Arc<dyn InvoiceRepoTrait>,
    payment_repo: Arc<dyn PaymentRepoTrait>,
    subscription_repo: Arc<dyn SubscriptionRepoTrait>,
    plan_repo: Arc<dyn SubscriptionPlanRepoTrait>,
    failure_repo: Arc<dyn EventFailureRepoTrait>,
    gateway_factory: Arc<GatewayFactory>,
    events_tx: tokio::sync::mpsc::Sender<BillingEvent>,
    clock: Arc<dyn Clock>,
    invoice_due_days: u32,
}

impl BillingUseCases {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        invoice_repo: Arc<dyn InvoiceRepoTrait>,
        payment_repo: Arc<dyn PaymentRepoTrait>,
        subscription_repo: Arc<dyn SubscriptionRepoTrait>,
        plan_repo: Arc<dyn SubscriptionPlanRepoTrait>,
        failure_repo: Arc<dyn EventFailureRepoTrait>,
        gateway_factory: Arc<GatewayFactory>,
        events_tx: tokio::sync::mpsc::Sender<BillingEvent>,
        clock: Arc<dyn Clock>,
        invoice_due_days: u32,
    ) -> Self {
        Self {
            invoice_repo,
            payment_repo,
            subscription_repo,
            plan_repo,
            failure_repo,
            gateway_factory,
            events_tx,
            clock,
            invoice_due_days,
        }
    }

    fn invoice_number(&self, period_start: NaiveDate) -> String {
        let mut entropy = [0u8; 4];
        rand::thread_rng().fill_bytes(&mut entropy);
        format!(
            "INV-{}-{}",
            period_start.format("%Y%m"),
            hex::encode_upper(entropy)
        )
    }

    async fn plan_for(&self, subscription: &Subscription) -> AppResult<SubscriptionPlan> {
        self.plan_repo
            .get_by_id(subscription.plan_id)
            .await?
            .ok_or(AppError::PlanUnavailable)
    }

    /// Invoice the upcoming billing period of a subscription. The upcoming
    /// period starts where the last settled one ended (or at `starts_at`);
    /// while the latest invoice is still open, asking again is a
    /// double-billing attempt and fails with `DuplicatePeriod`.
    pub async fn generate_invoice(&self, subscription_id: Uuid) -> AppResult<Invoice> {
        let subscription = self
            .subscription_repo
            .get_by_id(subscription_id)
            .await?
            .ok_or(AppError::NotFound)?;
        let plan = self.plan_for(&subscription).await?;

        let period_start = match self
            .invoice_repo
            .get_latest_for_subscription(subscription.id)
            .await?
        {
            Some(latest) if latest.status == InvoiceStatus::Paid => latest.period_end,
            Some(latest) if latest.status == InvoiceStatus::Void => latest.period_start,
            Some(_) => return Err(AppError::DuplicatePeriod),
            None => subscription.starts_at,
        };
        let period_end = plan.billing_cycle.period_end(period_start);
        let due_date = period_start + chrono::Days::new(self.invoice_due_days as u64);

        let mut input = CreateInvoiceInput {
            tenant_id: subscription.tenant_id,
            subscription_id: subscription.id,
            invoice_number: self.invoice_number(period_start),
            amount_cents: plan.price_cents,
            currency: plan.currency.clone(),
            period_start,
            period_end,
            due_date,
        };
        let invoice = match self.invoice_repo.create(&input).await {
            // The random suffix collided with an earlier number for the
            // same month; one fresh draw settles it.
            Err(AppError::DuplicateInvoiceNumber) => {
                input.invoice_number = self.invoice_number(period_start);
                self.invoice_repo.create(&input).await?
            }
            other => other?,
        };

        tracing::info!(
            tenant_id = %invoice.tenant_id,
            invoice_number = %invoice.invoice_number,
            amount_cents = invoice.amount_cents,
            currency = %invoice.currency,
            period_start = %invoice.period_start,
            period_end = %invoice.period_end,
            "Invoice generated"
        );
        Ok(invoice)
    }

    /// Initiate a gateway order for an open invoice and store the Pending
    /// payment attempt alongside it.
    pub async fn create_payment_order(
        &self,
        principal: &Principal,
        tenant_id: Uuid,
        invoice_id: Uuid,
        gateway: PaymentGateway,
    ) -> AppResult<PaymentOrderView> {
        isolation::authorize(
            TenantContext::get(),
            Some(tenant_id),
            principal.platform_operator,
        )?;
        let invoice = self
            .invoice_repo
            .get_by_id(invoice_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if invoice.tenant_id != tenant_id {
            return Err(AppError::CrossTenantAccess);
        }
        if !matches!(
            invoice.status,
            InvoiceStatus::Unpaid | InvoiceStatus::PartiallyPaid | InvoiceStatus::Failed
        ) {
            return Err(AppError::InvalidInput(format!(
                "invoice is {}, nothing to pay",
                invoice.status.as_str()
            )));
        }

        let port = self.gateway_factory.get(gateway)?;
        let GatewayOrder {
            order_id,
            amount_cents,
            currency,
        } = port
            .create_order(&invoice.invoice_number, invoice.due_cents(), &invoice.currency)
            .await?;
        if currency != invoice.currency {
            return Err(AppError::Gateway(format!(
                "gateway answered in {currency}, invoice is {}",
                invoice.currency
            )));
        }

        let payment = self
            .payment_repo
            .create_pending(&CreatePendingPaymentInput {
                tenant_id,
                invoice_id: invoice.id,
                gateway,
                gateway_order_id: order_id.as_str().to_string(),
                amount_cents,
                currency,
            })
            .await?;

        tracing::info!(
            tenant_id = %tenant_id,
            invoice_number = %invoice.invoice_number,
            gateway = gateway.as_str(),
            gateway_order_id = %payment.gateway_order_id,
            "Payment order created"
        );
        Ok(PaymentOrderView {
            payment_id: payment.id,
            invoice_id: invoice.id,
            gateway,
            gateway_order_id: payment.gateway_order_id,
            amount_cents: payment.amount_cents,
            currency: payment.currency,
        })
    }

    /// The idempotency contract of the ledger. A transaction id that has
    /// been applied before returns the stored outcome unchanged; otherwise
    /// the pending attempt is resolved and the invoice totals recomputed.
    pub async fn record_payment(
        &self,
        gateway_order_id: &str,
        transaction_id: &str,
        outcome: CallbackOutcome,
        failure_reason: Option<&str>,
    ) -> AppResult<RecordPaymentOutcome> {
        if let Some(existing) = self
            .payment_repo
            .get_by_transaction_id(transaction_id)
            .await?
        {
            let invoice = self
                .invoice_repo
                .get_by_id(existing.invoice_id)
                .await?
                .ok_or(AppError::NotFound)?;
            tracing::debug!(
                transaction_id,
                payment_id = %existing.id,
                "Duplicate gateway callback, returning stored outcome"
            );
            return Ok(RecordPaymentOutcome {
                payment: existing,
                invoice,
                replayed: true,
            });
        }

        let pending = self
            .payment_repo
            .find_unresolved_for_order(gateway_order_id)
            .await?
            .ok_or(AppError::NotFound)?;

        let status = match outcome {
            CallbackOutcome::Success => PaymentStatus::Success,
            CallbackOutcome::Failed => PaymentStatus::Failed,
        };
        let resolved = self
            .payment_repo
            .resolve(
                pending.id,
                transaction_id,
                status,
                failure_reason,
                self.clock.now(),
            )
            .await?;

        let (payment, replayed) = match resolved {
            Some(p) => (p, false),
            // Another callback claimed the row between our lookup and the
            // write; fall back to the stored outcome.
            None => {
                let p = self
                    .payment_repo
                    .get_by_transaction_id(transaction_id)
                    .await?
                    .ok_or_else(|| {
                        AppError::Internal("payment vanished during concurrent resolution".into())
                    })?;
                tracing::debug!(transaction_id, "Lost callback race, using stored outcome");
                (p, true)
            }
        };

        let invoice = self
            .invoice_repo
            .get_by_id(payment.invoice_id)
            .await?
            .ok_or(AppError::NotFound)?;
        if payment.currency != invoice.currency {
            return Err(AppError::InvalidInput(format!(
                "payment currency {} does not match invoice currency {}",
                payment.currency, invoice.currency
            )));
        }

        // A failed attempt leaves the invoice payable as-is. Settling for
        // a lost race is a no-op since the sum is taken fresh.
        let invoice = if payment.status == PaymentStatus::Success {
            self.invoice_repo
                .settle_totals(invoice.id, self.clock.now())
                .await?
        } else {
            invoice
        };

        tracing::info!(
            transaction_id,
            invoice_number = %invoice.invoice_number,
            payment_status = payment.status.as_str(),
            invoice_status = invoice.status.as_str(),
            paid_cents = invoice.paid_cents,
            "Payment recorded"
        );
        Ok(RecordPaymentOutcome {
            payment,
            invoice,
            replayed,
        })
    }

    /// Inbound gateway callback: verify the signature against the raw body
    /// before anything touches the ledger, record the payment, then hand the
    /// side effects to the event pipeline. The caller's response does not
    /// wait on the handlers.
    pub async fn apply_gateway_callback(
        &self,
        raw_body: &[u8],
        signature: &str,
    ) -> AppResult<RecordPaymentOutcome> {
        let callback: GatewayCallback = serde_json::from_slice(raw_body)
            .map_err(|e| AppError::InvalidInput(format!("malformed callback body: {e}")))?;

        let port = self.gateway_factory.get(callback.gateway)?;
        if !port.verify_signature(raw_body, signature) {
            tracing::warn!(
                gateway = callback.gateway.as_str(),
                gateway_order_id = %callback.gateway_order_id,
                "Discarding gateway callback with bad signature"
            );
            return Err(AppError::InvalidSignature);
        }

        let outcome = self
            .record_payment(
                &callback.gateway_order_id,
                &callback.gateway_transaction_id,
                callback.status,
                callback.failure_reason.as_deref(),
            )
            .await?;

        // A replayed callback already had its event emitted the first time.
        if outcome.replayed {
            return Ok(outcome);
        }

        let event = match outcome.payment.status {
            PaymentStatus::Success => BillingEvent::PaymentSucceeded {
                payment_id: outcome.payment.id,
                invoice_id: outcome.invoice.id,
                subscription_id: outcome.invoice.subscription_id,
                tenant_id: outcome.invoice.tenant_id,
            },
            _ => BillingEvent::PaymentFailed {
                payment_id: outcome.payment.id,
                invoice_id: outcome.invoice.id,
                subscription_id: outcome.invoice.subscription_id,
                tenant_id: outcome.invoice.tenant_id,
                reason: callback
                    .failure_reason
                    .clone()
                    .unwrap_or_else(|| "payment declined".into()),
            },
        };
        self.events_tx
            .send(event)
            .await
            .map_err(|_| AppError::Internal("billing event channel closed".into()))?;

        Ok(outcome)
    }

    /// Terminal pipeline step: persist the permanently-failed record and log
    /// it. Must never error out to the worker loop.
    pub async fn record_permanent_failure(
        &self,
        event: &BillingEvent,
        attempts: i32,
        last_error: &str,
    ) {
        tracing::error!(
            event_kind = event.kind(),
            payment_id = %event.payment_id(),
            tenant_id = %event.tenant_id(),
            attempts,
            last_error,
            "Billing event permanently failed, recording for operator follow-up"
        );
        let input = EventFailureInput {
            event_kind: event.kind().to_string(),
            payment_id: event.payment_id(),
            tenant_id: event.tenant_id(),
            reason: match event {
                BillingEvent::PaymentFailed { reason, .. } => reason.clone(),
                BillingEvent::PaymentSucceeded { .. } => "activation side effect failed".into(),
            },
            last_error: last_error.to_string(),
            attempts,
        };
        if let Err(e) = self.failure_repo.record(&input).await {
            // Last resort: the log line above already carries the payload.
            tracing::error!(error = %e, "Could not persist billing event failure record");
        }
    }

    pub async fn list_invoices(
        &self,
        principal: &Principal,
        tenant_id: Uuid,
        page: i32,
        per_page: i32,
    ) -> AppResult<PaginatedInvoices> {
        isolation::authorize(
            TenantContext::get(),
            Some(tenant_id),
            principal.platform_operator,
        )?;
        let today = self.clock.today();
        let (invoices, total) = self
            .invoice_repo
            .list_by_tenant(tenant_id, page, per_page)
            .await?;
        let views = invoices
            .into_iter()
            .map(|inv| InvoiceView {
                id: inv.id,
                invoice_number: inv.invoice_number.clone(),
                amount_cents: inv.amount_cents,
                paid_cents: inv.paid_cents,
                due_cents: inv.due_cents(),
                currency: inv.currency.clone(),
                status: inv.status,
                period_start: inv.period_start,
                period_end: inv.period_end,
                due_date: inv.due_date,
                overdue: inv.is_overdue(today),
                paid_at: inv.paid_at,
            })
            .collect();
        let total_pages = ((total as f64) / (per_page as f64)).ceil() as i32;
        Ok(PaginatedInvoices {
            invoices: views,
            total,
            page,
            per_page,
            total_pages,
        })
    }

    pub async fn list_payments(
        &self,
        principal: &Principal,
        tenant_id: Uuid,
        page: i32,
        per_page: i32,
    ) -> AppResult<PaginatedPayments> {
        isolation::authorize(
            TenantContext::get(),
            Some(tenant_id),
            principal.platform_operator,
        )?;
        let (payments, total) = self
            .payment_repo
            .list_by_tenant(tenant_id, page, per_page)
            .await?;
        let views = payments
            .into_iter()
            .map(|p| PaymentView {
                id: p.id,
                invoice_id: p.invoice_id,
                gateway: p.gateway,
                gateway_order_id: p.gateway_order_id,
                amount_cents: p.amount_cents,
                currency: p.currency,
                status: p.status,
                failure_reason: p.failure_reason,
                payment_date: p.payment_date,
            })
            .collect();
        let total_pages = ((total as f64) / (per_page as f64)).ceil() as i32;
        Ok(PaginatedPayments {
            payments: views,
            total,
            page,
            per_page,
            total_pages,
        })
    }
}
