//! In-memory mock implementations of the repository and notifier traits.
//! Every mock keeps its state under one mutex so the concurrency-sensitive
//! tests (duplicate callbacks, optimistic transitions) exercise real
//! interleavings.

use std::collections::HashMap;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use uuid::Uuid;

use crate::{
    app_error::{AppError, AppResult},
    application::{
        ports::notifier::BillingNotifier,
        use_cases::billing::{
            CreateInvoiceInput, CreatePendingPaymentInput, EventFailureInput,
            EventFailureRepoTrait, InvoiceRepoTrait, PaymentRepoTrait,
        },
        use_cases::subscription::{
            CreateSubscriptionInput, HistoryInput, SubscriptionHistoryRepoTrait,
            SubscriptionPlanRepoTrait, SubscriptionRepoTrait, SubscriptionStateUpdate,
            TenantRepoTrait,
        },
    },
    domain::entities::{
        invoice::{Invoice, InvoiceStatus},
        payment::{Payment, PaymentStatus},
        subscription::{Subscription, SubscriptionHistory, SubscriptionStatus},
        subscription_plan::SubscriptionPlan,
        tenant::Tenant,
    },
};

// ============================================================================
// InMemorySubscriptionRepo
// ============================================================================

#[derive(Default)]
pub struct InMemorySubscriptionRepo {
    subs: Mutex<HashMap<Uuid, Subscription>>,
}

impl InMemorySubscriptionRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, sub: Subscription) -> Subscription {
        self.subs.lock().unwrap().insert(sub.id, sub.clone());
        sub
    }

    pub fn get(&self, id: Uuid) -> Subscription {
        self.subs.lock().unwrap().get(&id).cloned().expect("subscription in mock")
    }

    pub fn get_by_tenant_sync(&self, tenant_id: Uuid) -> Subscription {
        self.subs
            .lock()
            .unwrap()
            .values()
            .find(|s| s.tenant_id == tenant_id)
            .cloned()
            .expect("subscription for tenant in mock")
    }
}

#[async_trait]
impl SubscriptionRepoTrait for InMemorySubscriptionRepo {
    async fn create(&self, input: &CreateSubscriptionInput) -> AppResult<Subscription> {
        let mut subs = self.subs.lock().unwrap();
        if subs.values().any(|s| s.tenant_id == input.tenant_id) {
            return Err(AppError::InvalidInput(
                "tenant already has a subscription".into(),
            ));
        }
        let sub = Subscription {
            id: Uuid::new_v4(),
            tenant_id: input.tenant_id,
            plan_id: input.plan_id,
            status: input.status,
            starts_at: input.starts_at,
            expires_at: input.expires_at,
            grace_period_ends_at: None,
            created_at: None,
            updated_at: None,
        };
        subs.insert(sub.id, sub.clone());
        Ok(sub)
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Subscription>> {
        Ok(self.subs.lock().unwrap().get(&id).cloned())
    }

    async fn get_by_tenant(&self, tenant_id: Uuid) -> AppResult<Option<Subscription>> {
        Ok(self
            .subs
            .lock()
            .unwrap()
            .values()
            .find(|s| s.tenant_id == tenant_id)
            .cloned())
    }

    async fn set_plan(&self, id: Uuid, plan_id: Uuid) -> AppResult<Subscription> {
        let mut subs = self.subs.lock().unwrap();
        let sub = subs.get_mut(&id).ok_or(AppError::NotFound)?;
        sub.plan_id = plan_id;
        Ok(sub.clone())
    }

    async fn update_state(
        &self,
        id: Uuid,
        update: &SubscriptionStateUpdate,
    ) -> AppResult<Option<Subscription>> {
        let mut subs = self.subs.lock().unwrap();
        let sub = subs.get_mut(&id).ok_or(AppError::NotFound)?;
        if sub.status != update.expected_status {
            return Ok(None);
        }
        sub.status = update.status;
        if let Some(starts_at) = update.starts_at {
            sub.starts_at = starts_at;
        }
        if let Some(expires_at) = update.expires_at {
            sub.expires_at = expires_at;
        }
        if let Some(grace) = update.grace_period_ends_at {
            sub.grace_period_ends_at = grace;
        }
        Ok(Some(sub.clone()))
    }

    async fn list_lapsed(&self, today: NaiveDate, limit: i64) -> AppResult<Vec<Subscription>> {
        Ok(self
            .subs
            .lock()
            .unwrap()
            .values()
            .filter(|s| {
                matches!(
                    s.status,
                    SubscriptionStatus::Active | SubscriptionStatus::Trial
                ) && s.expires_at < today
                    && s.grace_period_ends_at.unwrap_or(s.expires_at) < today
            })
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

// ============================================================================
// InMemoryHistoryRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryHistoryRepo {
    rows: Mutex<Vec<SubscriptionHistory>>,
}

impl InMemoryHistoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<SubscriptionHistory> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl SubscriptionHistoryRepoTrait for InMemoryHistoryRepo {
    async fn append(&self, input: &HistoryInput) -> AppResult<SubscriptionHistory> {
        let row = SubscriptionHistory {
            id: Uuid::new_v4(),
            subscription_id: input.subscription_id,
            previous_status: input.previous_status,
            new_status: input.new_status,
            reason: input.reason.clone(),
            actor: input.actor,
            created_at: None,
        };
        self.rows.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn list_by_subscription(
        &self,
        subscription_id: Uuid,
        limit: i64,
    ) -> AppResult<Vec<SubscriptionHistory>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.subscription_id == subscription_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

// ============================================================================
// InMemoryPlanRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryPlanRepo {
    plans: Mutex<HashMap<Uuid, SubscriptionPlan>>,
}

impl InMemoryPlanRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, plan: SubscriptionPlan) -> SubscriptionPlan {
        self.plans.lock().unwrap().insert(plan.id, plan.clone());
        plan
    }
}

#[async_trait]
impl SubscriptionPlanRepoTrait for InMemoryPlanRepo {
    async fn create(&self, plan: &SubscriptionPlan) -> AppResult<SubscriptionPlan> {
        let mut plans = self.plans.lock().unwrap();
        if plans.values().any(|p| p.code == plan.code) {
            return Err(AppError::InvalidInput("plan code already exists".into()));
        }
        plans.insert(plan.id, plan.clone());
        Ok(plan.clone())
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<SubscriptionPlan>> {
        Ok(self.plans.lock().unwrap().get(&id).cloned())
    }

    async fn list(&self, include_inactive: bool) -> AppResult<Vec<SubscriptionPlan>> {
        Ok(self
            .plans
            .lock()
            .unwrap()
            .values()
            .filter(|p| include_inactive || p.active)
            .cloned()
            .collect())
    }

    async fn update(
        &self,
        id: Uuid,
        price_cents: Option<i64>,
        currency: Option<String>,
        active: Option<bool>,
    ) -> AppResult<SubscriptionPlan> {
        let mut plans = self.plans.lock().unwrap();
        let plan = plans.get_mut(&id).ok_or(AppError::NotFound)?;
        if let Some(price) = price_cents {
            plan.price_cents = price;
        }
        if let Some(currency) = currency {
            plan.currency = currency;
        }
        if let Some(active) = active {
            plan.active = active;
        }
        Ok(plan.clone())
    }
}

// ============================================================================
// InMemoryTenantRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryTenantRepo {
    tenants: Mutex<HashMap<Uuid, Tenant>>,
}

impl InMemoryTenantRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, tenant: Tenant) -> Tenant {
        self.tenants
            .lock()
            .unwrap()
            .insert(tenant.id, tenant.clone());
        tenant
    }
}

#[async_trait]
impl TenantRepoTrait for InMemoryTenantRepo {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Tenant>> {
        Ok(self.tenants.lock().unwrap().get(&id).cloned())
    }
}

// ============================================================================
// InMemoryInvoiceRepo
// ============================================================================

/// Shares the payment store with [`InMemoryPaymentRepo`] so `settle_totals`
/// can take the sum and write the row under one lock, like the single-statement
/// recompute in Postgres.
pub struct InMemoryInvoiceRepo {
    invoices: Mutex<Vec<Invoice>>,
    payments: Arc<Mutex<Vec<Payment>>>,
}

impl InMemoryInvoiceRepo {
    pub fn new(payment_repo: &InMemoryPaymentRepo) -> Self {
        Self {
            invoices: Mutex::new(Vec::new()),
            payments: payment_repo.store(),
        }
    }

    pub fn get(&self, id: Uuid) -> Invoice {
        self.invoices
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.id == id)
            .cloned()
            .expect("invoice in mock")
    }
}

#[async_trait]
impl InvoiceRepoTrait for InMemoryInvoiceRepo {
    async fn create(&self, input: &CreateInvoiceInput) -> AppResult<Invoice> {
        let mut invoices = self.invoices.lock().unwrap();
        if invoices.iter().any(|i| {
            i.subscription_id == input.subscription_id && i.period_start == input.period_start
        }) {
            return Err(AppError::DuplicatePeriod);
        }
        if invoices
            .iter()
            .any(|i| i.invoice_number == input.invoice_number)
        {
            return Err(AppError::DuplicateInvoiceNumber);
        }
        let invoice = Invoice {
            id: Uuid::new_v4(),
            tenant_id: input.tenant_id,
            subscription_id: input.subscription_id,
            invoice_number: input.invoice_number.clone(),
            amount_cents: input.amount_cents,
            paid_cents: 0,
            currency: input.currency.clone(),
            status: InvoiceStatus::Unpaid,
            period_start: input.period_start,
            period_end: input.period_end,
            due_date: input.due_date,
            paid_at: None,
            created_at: None,
            updated_at: None,
        };
        invoices.push(invoice.clone());
        Ok(invoice)
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Invoice>> {
        Ok(self
            .invoices
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.id == id)
            .cloned())
    }

    async fn get_latest_for_subscription(
        &self,
        subscription_id: Uuid,
    ) -> AppResult<Option<Invoice>> {
        Ok(self
            .invoices
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.subscription_id == subscription_id)
            .max_by_key(|i| i.period_start)
            .cloned())
    }

    async fn list_by_tenant(
        &self,
        tenant_id: Uuid,
        page: i32,
        per_page: i32,
    ) -> AppResult<(Vec<Invoice>, i64)> {
        let invoices = self.invoices.lock().unwrap();
        let matching: Vec<Invoice> = invoices
            .iter()
            .filter(|i| i.tenant_id == tenant_id)
            .cloned()
            .collect();
        let total = matching.len() as i64;
        let offset = ((page - 1) * per_page).max(0) as usize;
        Ok((
            matching
                .into_iter()
                .skip(offset)
                .take(per_page as usize)
                .collect(),
            total,
        ))
    }

    async fn settle_totals(&self, id: Uuid, now: NaiveDateTime) -> AppResult<Invoice> {
        // Payment lock held across the invoice write; the sum applied can
        // never be staler than the row it lands on.
        let payments = self.payments.lock().unwrap();
        let total: i64 = payments
            .iter()
            .filter(|p| p.invoice_id == id && p.status == PaymentStatus::Success)
            .map(|p| p.amount_cents)
            .sum();
        let mut invoices = self.invoices.lock().unwrap();
        let invoice = invoices
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or(AppError::NotFound)?;
        invoice.paid_cents = total;
        if total >= invoice.amount_cents {
            invoice.status = InvoiceStatus::Paid;
            invoice.paid_at.get_or_insert(now);
        } else if total > 0 {
            invoice.status = InvoiceStatus::PartiallyPaid;
        }
        Ok(invoice.clone())
    }
}

// ============================================================================
// InMemoryPaymentRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryPaymentRepo {
    payments: Arc<Mutex<Vec<Payment>>>,
}

impl InMemoryPaymentRepo {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self) -> Arc<Mutex<Vec<Payment>>> {
        Arc::clone(&self.payments)
    }

    pub fn count_for_transaction(&self, transaction_id: &str) -> usize {
        self.payments
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.gateway_transaction_id.as_deref() == Some(transaction_id))
            .count()
    }
}

#[async_trait]
impl PaymentRepoTrait for InMemoryPaymentRepo {
    async fn create_pending(&self, input: &CreatePendingPaymentInput) -> AppResult<Payment> {
        let payment = Payment {
            id: Uuid::new_v4(),
            tenant_id: input.tenant_id,
            invoice_id: input.invoice_id,
            gateway: input.gateway,
            gateway_order_id: input.gateway_order_id.clone(),
            gateway_transaction_id: None,
            amount_cents: input.amount_cents,
            currency: input.currency.clone(),
            status: PaymentStatus::Pending,
            failure_reason: None,
            payment_date: None,
            created_at: None,
            updated_at: None,
        };
        self.payments.lock().unwrap().push(payment.clone());
        Ok(payment)
    }

    async fn get_by_transaction_id(&self, transaction_id: &str) -> AppResult<Option<Payment>> {
        Ok(self
            .payments
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.gateway_transaction_id.as_deref() == Some(transaction_id))
            .cloned())
    }

    async fn find_unresolved_for_order(
        &self,
        gateway_order_id: &str,
    ) -> AppResult<Option<Payment>> {
        Ok(self
            .payments
            .lock()
            .unwrap()
            .iter()
            .find(|p| {
                p.gateway_order_id == gateway_order_id
                    && p.status == PaymentStatus::Pending
                    && p.gateway_transaction_id.is_none()
            })
            .cloned())
    }

    async fn resolve(
        &self,
        payment_id: Uuid,
        transaction_id: &str,
        status: PaymentStatus,
        failure_reason: Option<&str>,
        payment_date: NaiveDateTime,
    ) -> AppResult<Option<Payment>> {
        // Single lock makes claim + uniqueness one atomic step, mirroring
        // the database unique constraint.
        let mut payments = self.payments.lock().unwrap();
        if payments
            .iter()
            .any(|p| p.gateway_transaction_id.as_deref() == Some(transaction_id))
        {
            return Ok(None);
        }
        let Some(payment) = payments
            .iter_mut()
            .find(|p| p.id == payment_id && p.gateway_transaction_id.is_none())
        else {
            return Ok(None);
        };
        payment.gateway_transaction_id = Some(transaction_id.to_string());
        payment.status = status;
        payment.failure_reason = failure_reason.map(str::to_string);
        payment.payment_date = Some(payment_date);
        Ok(Some(payment.clone()))
    }

    async fn list_by_tenant(
        &self,
        tenant_id: Uuid,
        page: i32,
        per_page: i32,
    ) -> AppResult<(Vec<Payment>, i64)> {
        let payments = self.payments.lock().unwrap();
        let matching: Vec<Payment> = payments
            .iter()
            .filter(|p| p.tenant_id == tenant_id)
            .cloned()
            .collect();
        let total = matching.len() as i64;
        let offset = ((page - 1) * per_page).max(0) as usize;
        Ok((
            matching
                .into_iter()
                .skip(offset)
                .take(per_page as usize)
                .collect(),
            total,
        ))
    }
}

// ============================================================================
// InMemoryEventFailureRepo
// ============================================================================

#[derive(Default)]
pub struct InMemoryEventFailureRepo {
    rows: Mutex<Vec<EventFailureInput>>,
}

impl InMemoryEventFailureRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<EventFailureInput> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventFailureRepoTrait for InMemoryEventFailureRepo {
    async fn record(&self, input: &EventFailureInput) -> AppResult<()> {
        self.rows.lock().unwrap().push(input.clone());
        Ok(())
    }
}

// ============================================================================
// MockNotifier
// ============================================================================

/// Notifier that records calls and can fail the first N of them with a
/// retryable error, for exercising the pipeline's retry path.
#[derive(Default)]
pub struct MockNotifier {
    pub sent: Mutex<Vec<(String, String, String)>>,
    fail_first: AtomicUsize,
    calls: AtomicUsize,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_first(&self, n: usize) {
        self.fail_first.store(n, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BillingNotifier for MockNotifier {
    async fn payment_failed(
        &self,
        billing_email: &str,
        invoice_number: &str,
        reason: &str,
    ) -> AppResult<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.fail_first.load(Ordering::SeqCst) {
            return Err(AppError::Gateway("notification endpoint unreachable".into()));
        }
        self.sent.lock().unwrap().push((
            billing_email.to_string(),
            invoice_number.to_string(),
            reason.to_string(),
        ));
        Ok(())
    }
}
