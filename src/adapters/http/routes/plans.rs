use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, patch},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    app_error::AppResult,
    application::{jwt::Principal, use_cases::plans::CreatePlanInput},
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_plans).post(create_plan))
        .route("/{plan_id}", patch(update_plan))
}

async fn list_plans(
    State(app_state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> AppResult<impl IntoResponse> {
    let plans = app_state.plan_use_cases.list(&principal).await?;
    Ok(Json(plans))
}

async fn create_plan(
    State(app_state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(input): Json<CreatePlanInput>,
) -> AppResult<impl IntoResponse> {
    let plan = app_state.plan_use_cases.create(&principal, input).await?;
    Ok(Json(plan))
}

#[derive(Deserialize)]
struct UpdatePlanRequest {
    price_cents: Option<i64>,
    currency: Option<String>,
    active: Option<bool>,
}

async fn update_plan(
    State(app_state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(plan_id): Path<Uuid>,
    Json(req): Json<UpdatePlanRequest>,
) -> AppResult<impl IntoResponse> {
    let plan = app_state
        .plan_use_cases
        .update(&principal, plan_id, req.price_cents, req.currency, req.active)
        .await?;
    Ok(Json(plan))
}
