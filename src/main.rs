use dotenvy::dotenv;
use tracing::info;

use campuskit_api::infra::{
    app::create_app, expiry_sweep::run_expiry_sweep, setup::init_app_state,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let runtime = init_app_state().await?;

    let bind_addr = runtime.app_state.config.bind_addr;
    let sweep_interval = runtime.app_state.config.expiry_sweep_interval;

    let app = create_app(runtime.app_state.clone());

    // Background workers start after tracing is initialized by create_app.
    let worker = runtime.billing_event_worker;
    let events_rx = runtime.events_rx;
    tokio::spawn(async move {
        worker.run(events_rx).await;
    });

    let subscription_uc = runtime.app_state.subscription_use_cases.clone();
    tokio::spawn(async move {
        run_expiry_sweep(subscription_uc, sweep_interval).await;
    });

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Backend listening at {}", &listener.local_addr()?);

    axum::serve(listener, app).await?;

    Ok(())
}
