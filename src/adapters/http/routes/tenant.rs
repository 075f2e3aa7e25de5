use axum::{Extension, Json, Router, extract::State, response::IntoResponse, routing::get};
use serde::Serialize;

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    application::{jwt::Principal, use_cases::subscription::SubscriptionView},
};

/// Institution workspace. Everything mounted here sits behind the
/// subscription gate; further institution-facing modules hang off this
/// router.
pub fn router() -> Router<AppState> {
    Router::new().route("/overview", get(get_overview))
}

#[derive(Serialize)]
struct OverviewResponse {
    name: String,
    billing_email: String,
    subscription: SubscriptionView,
}

async fn get_overview(
    State(app_state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> AppResult<impl IntoResponse> {
    let tenant_id = principal.tenant_id.ok_or(AppError::TenantContextMissing)?;

    let tenant = app_state
        .tenant_repo
        .get_by_id(tenant_id)
        .await?
        .ok_or(AppError::NotFound)?;
    let subscription = app_state
        .subscription_use_cases
        .status(&principal, tenant_id)
        .await?;

    Ok(Json(OverviewResponse {
        name: tenant.name,
        billing_email: tenant.billing_email,
        subscription,
    }))
}
