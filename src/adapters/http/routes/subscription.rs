use axum::{
    Extension, Json, Router,
    extract::State,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    application::jwt::Principal,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_status))
        .route("/history", get(get_history))
        .route("/select-plan", post(select_plan))
        .route("/trial", post(start_trial))
        .route("/cancel", post(cancel))
}

/// Routes address the caller's own tenant; operators acting on another
/// tenant pass it explicitly.
#[derive(Deserialize, Default)]
struct TenantQuery {
    tenant_id: Option<Uuid>,
}

fn target_tenant(principal: &Principal, explicit: Option<Uuid>) -> AppResult<Uuid> {
    explicit
        .or(principal.tenant_id)
        .ok_or(AppError::TenantContextMissing)
}

async fn get_status(
    State(app_state): State<AppState>,
    Extension(principal): Extension<Principal>,
    axum::extract::Query(q): axum::extract::Query<TenantQuery>,
) -> AppResult<impl IntoResponse> {
    let tenant_id = target_tenant(&principal, q.tenant_id)?;
    let view = app_state
        .subscription_use_cases
        .status(&principal, tenant_id)
        .await?;
    Ok(Json(view))
}

async fn get_history(
    State(app_state): State<AppState>,
    Extension(principal): Extension<Principal>,
    axum::extract::Query(q): axum::extract::Query<TenantQuery>,
) -> AppResult<impl IntoResponse> {
    let tenant_id = target_tenant(&principal, q.tenant_id)?;
    let entries = app_state
        .subscription_use_cases
        .history(&principal, tenant_id)
        .await?;
    Ok(Json(entries))
}

#[derive(Deserialize)]
struct SelectPlanRequest {
    plan_id: Uuid,
    tenant_id: Option<Uuid>,
}

async fn select_plan(
    State(app_state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<SelectPlanRequest>,
) -> AppResult<impl IntoResponse> {
    let tenant_id = target_tenant(&principal, req.tenant_id)?;
    let subscription = app_state
        .subscription_use_cases
        .select_plan(&principal, tenant_id, req.plan_id)
        .await?;
    Ok(Json(app_state.subscription_use_cases.view(&subscription)))
}

async fn start_trial(
    State(app_state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<SelectPlanRequest>,
) -> AppResult<impl IntoResponse> {
    let tenant_id = target_tenant(&principal, req.tenant_id)?;
    let subscription = app_state
        .subscription_use_cases
        .start_trial(&principal, tenant_id, req.plan_id)
        .await?;
    Ok(Json(app_state.subscription_use_cases.view(&subscription)))
}

#[derive(Deserialize)]
struct CancelRequest {
    reason: Option<String>,
    tenant_id: Option<Uuid>,
}

async fn cancel(
    State(app_state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<CancelRequest>,
) -> AppResult<impl IntoResponse> {
    let tenant_id = target_tenant(&principal, req.tenant_id)?;
    let reason = req.reason.as_deref().unwrap_or("cancelled by tenant");
    let subscription = app_state
        .subscription_use_cases
        .cancel(&principal, tenant_id, reason)
        .await?;
    Ok(Json(app_state.subscription_use_cases.view(&subscription)))
}
