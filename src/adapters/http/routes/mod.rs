pub mod billing;
pub mod plans;
pub mod subscription;
pub mod tenant;

use axum::{Router, middleware, routing::post};

use crate::adapters::http::{
    app_state::AppState,
    middleware::{auth_middleware, subscription_gate},
};

pub fn router(app_state: AppState) -> Router<AppState> {
    // Institution-facing resources sit behind the subscription gate; plan
    // catalog, subscription management and billing stay reachable so a
    // lapsed tenant can still renew and pay.
    let gated = Router::new()
        .nest("/tenant", tenant::router())
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            subscription_gate,
        ));

    let authed = Router::new()
        .nest("/plans", plans::router())
        .nest("/subscription", subscription::router())
        .nest("/billing", billing::router())
        .merge(gated)
        .route_layer(middleware::from_fn_with_state(
            app_state,
            auth_middleware,
        ));

    // Gateway callbacks authenticate by signature, not by bearer token.
    Router::new()
        .merge(authed)
        .route("/billing/callback", post(billing::gateway_callback))
}
