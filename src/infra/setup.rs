use std::fs::File;
use std::sync::Arc;

use tokio::sync::mpsc::Receiver;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    adapters::{
        email::resend::ResendNotifier, http::app_state::AppState,
        persistence::PostgresPersistence,
    },
    application::{
        clock::SystemClock,
        ports::payment_gateway::PaymentGatewayPort,
        use_cases::{
            billing::{BillingUseCases, EventFailureRepoTrait, InvoiceRepoTrait, PaymentRepoTrait},
            gateway_factory::GatewayFactory,
            plans::PlanUseCases,
            subscription::{
                SubscriptionHistoryRepoTrait, SubscriptionPlanRepoTrait, SubscriptionRepoTrait,
                SubscriptionUseCases, TenantRepoTrait,
            },
        },
    },
    domain::entities::billing_event::BillingEvent,
    infra::{
        billing_event_worker::BillingEventWorker,
        config::AppConfig,
        db::init_db,
        dummy_gateway::DummyGateway,
        razorpay_gateway::RazorpayGateway,
    },
};

/// Everything `main` needs: the request-facing state plus the billing event
/// worker and the receiving end of its queue.
pub struct AppRuntime {
    pub app_state: AppState,
    pub billing_event_worker: Arc<BillingEventWorker>,
    pub events_rx: Receiver<BillingEvent>,
}

pub async fn init_app_state() -> anyhow::Result<AppRuntime> {
    let config = AppConfig::from_env();

    let pool = init_db(&config.database_url).await?;
    let postgres_arc = Arc::new(PostgresPersistence::new(pool));

    let subscription_repo = postgres_arc.clone() as Arc<dyn SubscriptionRepoTrait>;
    let history_repo = postgres_arc.clone() as Arc<dyn SubscriptionHistoryRepoTrait>;
    let plan_repo = postgres_arc.clone() as Arc<dyn SubscriptionPlanRepoTrait>;
    let tenant_repo = postgres_arc.clone() as Arc<dyn TenantRepoTrait>;
    let invoice_repo = postgres_arc.clone() as Arc<dyn InvoiceRepoTrait>;
    let payment_repo = postgres_arc.clone() as Arc<dyn PaymentRepoTrait>;
    let failure_repo = postgres_arc.clone() as Arc<dyn EventFailureRepoTrait>;

    let clock = Arc::new(SystemClock);

    let gateway_factory = Arc::new(GatewayFactory::new(vec![
        Arc::new(RazorpayGateway::new(
            config.razorpay_key_id.clone(),
            config.razorpay_key_secret.clone(),
            config.razorpay_webhook_secret.clone(),
        )) as Arc<dyn PaymentGatewayPort>,
        Arc::new(DummyGateway::new(config.dummy_gateway_secret.clone()))
            as Arc<dyn PaymentGatewayPort>,
    ]));

    let notifier = Arc::new(ResendNotifier::new(
        config.resend_api_key.clone(),
        config.email_from.clone(),
    ));

    let (events_tx, events_rx) =
        tokio::sync::mpsc::channel::<BillingEvent>(config.billing_event_queue_size);

    let subscription_use_cases = Arc::new(SubscriptionUseCases::new(
        subscription_repo.clone(),
        history_repo,
        plan_repo.clone(),
        clock.clone(),
        config.grace_period_days,
    ));

    let billing_use_cases = Arc::new(BillingUseCases::new(
        invoice_repo.clone(),
        payment_repo,
        subscription_repo,
        plan_repo.clone(),
        failure_repo,
        gateway_factory,
        events_tx,
        clock,
        config.invoice_due_days,
    ));

    let plan_use_cases = Arc::new(PlanUseCases::new(plan_repo));

    let billing_event_worker = Arc::new(BillingEventWorker::new(
        subscription_use_cases.clone(),
        billing_use_cases.clone(),
        tenant_repo.clone(),
        invoice_repo,
        notifier,
    ));

    Ok(AppRuntime {
        app_state: AppState {
            config: Arc::new(config),
            subscription_use_cases,
            billing_use_cases,
            plan_use_cases,
            tenant_repo,
        },
        billing_event_worker,
        events_rx,
    })
}

pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "campuskit_api=debug,tower_http=debug".into());

    // Console (pretty logs)
    let console_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .pretty();

    // File (structured JSON logs)
    let file = File::create("app.log").expect("cannot create log file");
    let json_layer = fmt::layer()
        .json()
        .with_writer(file)
        .with_current_span(true)
        .with_span_list(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(json_layer)
        .try_init()
        .ok();
}
