use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::application::use_cases::subscription::SubscriptionUseCases;

const SWEEP_BATCH_LIMIT: i64 = 500;

/// Periodically flips subscriptions whose grace period has lapsed to
/// `Expired`. The read path already treats them as unusable; the sweep keeps
/// the stored status and history honest for dashboards and exports.
pub async fn run_expiry_sweep(subscription_uc: Arc<SubscriptionUseCases>, interval: Duration) {
    info!(interval_secs = interval.as_secs(), "Expiry sweep started");
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        match subscription_uc.expire_lapsed(SWEEP_BATCH_LIMIT).await {
            Ok(0) => {}
            Ok(count) => info!(count, "Expired lapsed subscriptions"),
            Err(e) => error!(error = %e, "Expiry sweep failed"),
        }
    }
}
