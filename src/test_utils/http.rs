use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use secrecy::SecretString;
use tokio::sync::mpsc::Receiver;
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    application::{
        clock::Clock,
        jwt,
        ports::payment_gateway::PaymentGatewayPort,
        use_cases::{
            billing::BillingUseCases, gateway_factory::GatewayFactory, plans::PlanUseCases,
            subscription::SubscriptionUseCases,
        },
    },
    domain::entities::{billing_event::BillingEvent, payment::PaymentGateway},
    infra::config::AppConfig,
    test_utils::{
        clock::FixedClock,
        gateway_mocks::MockGateway,
        mocks::{
            InMemoryEventFailureRepo, InMemoryHistoryRepo, InMemoryInvoiceRepo,
            InMemoryPaymentRepo, InMemoryPlanRepo, InMemorySubscriptionRepo, InMemoryTenantRepo,
        },
    },
};

pub const TEST_GRACE_PERIOD_DAYS: u32 = 5;

/// Request-facing state over in-memory stores, plus handles to everything a
/// test wants to seed or inspect.
pub struct TestApp {
    pub state: AppState,
    pub clock: Arc<FixedClock>,
    pub subs: Arc<InMemorySubscriptionRepo>,
    pub history: Arc<InMemoryHistoryRepo>,
    pub plans: Arc<InMemoryPlanRepo>,
    pub tenants: Arc<InMemoryTenantRepo>,
    pub invoices: Arc<InMemoryInvoiceRepo>,
    pub payments: Arc<InMemoryPaymentRepo>,
    pub failures: Arc<InMemoryEventFailureRepo>,
    pub gateway: Arc<MockGateway>,
    pub events_rx: Receiver<BillingEvent>,
}

pub fn test_config() -> AppConfig {
    AppConfig {
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        database_url: String::new(),
        cors_origin: "http://localhost:3000".parse().unwrap(),
        jwt_secret: SecretString::from("http-test-secret"),
        access_token_ttl_secs: 3_600,
        grace_period_days: TEST_GRACE_PERIOD_DAYS,
        invoice_due_days: 7,
        billing_event_queue_size: 16,
        expiry_sweep_interval: Duration::from_secs(3_600),
        resend_api_key: SecretString::from("re_test"),
        email_from: "billing@campuskit.test".into(),
        razorpay_key_id: "rzp_test_key".into(),
        razorpay_key_secret: SecretString::from("rzp-secret"),
        razorpay_webhook_secret: SecretString::from("rzp-webhook-secret"),
        dummy_gateway_secret: SecretString::from("dummy-secret"),
    }
}

pub fn test_app(today: NaiveDate) -> TestApp {
    let config = Arc::new(test_config());
    let clock = Arc::new(FixedClock::at(today));

    let subs = Arc::new(InMemorySubscriptionRepo::new());
    let history = Arc::new(InMemoryHistoryRepo::new());
    let plans = Arc::new(InMemoryPlanRepo::new());
    let tenants = Arc::new(InMemoryTenantRepo::new());
    let payments = Arc::new(InMemoryPaymentRepo::new());
    let invoices = Arc::new(InMemoryInvoiceRepo::new(&payments));
    let failures = Arc::new(InMemoryEventFailureRepo::new());
    let gateway = Arc::new(MockGateway::new(PaymentGateway::Dummy));

    let gateway_factory = Arc::new(GatewayFactory::new(vec![
        gateway.clone() as Arc<dyn PaymentGatewayPort>,
    ]));
    let (events_tx, events_rx) =
        tokio::sync::mpsc::channel::<BillingEvent>(config.billing_event_queue_size);

    let subscription_use_cases = Arc::new(SubscriptionUseCases::new(
        subs.clone(),
        history.clone(),
        plans.clone(),
        clock.clone() as Arc<dyn Clock>,
        config.grace_period_days,
    ));
    let billing_use_cases = Arc::new(BillingUseCases::new(
        invoices.clone(),
        payments.clone(),
        subs.clone(),
        plans.clone(),
        failures.clone(),
        gateway_factory,
        events_tx,
        clock.clone() as Arc<dyn Clock>,
        config.invoice_due_days,
    ));
    let plan_use_cases = Arc::new(PlanUseCases::new(plans.clone()));

    TestApp {
        state: AppState {
            config,
            subscription_use_cases,
            billing_use_cases,
            plan_use_cases,
            tenant_repo: tenants.clone(),
        },
        clock,
        subs,
        history,
        plans,
        tenants,
        invoices,
        payments,
        failures,
        gateway,
        events_rx,
    }
}

pub fn bearer_for(app: &TestApp, tenant_id: Option<Uuid>, platform_operator: bool) -> String {
    let token = jwt::issue(
        Uuid::new_v4(),
        tenant_id,
        platform_operator,
        &app.state.config.jwt_secret,
        app.state.config.access_token_ttl_secs,
    )
    .unwrap();
    format!("Bearer {}", token)
}
