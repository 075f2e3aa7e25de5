use axum::{
    Extension, Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    adapters::http::app_state::AppState,
    app_error::{AppError, AppResult},
    application::jwt::Principal,
    domain::entities::payment::PaymentGateway,
};

pub const GATEWAY_SIGNATURE_HEADER: &str = "x-gateway-signature";

const DEFAULT_PER_PAGE: i32 = 20;
const MAX_PER_PAGE: i32 = 100;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/invoices", get(list_invoices).post(generate_invoice))
        .route("/payments", get(list_payments))
        .route("/orders", post(create_payment_order))
}

fn target_tenant(principal: &Principal, explicit: Option<Uuid>) -> AppResult<Uuid> {
    explicit
        .or(principal.tenant_id)
        .ok_or(AppError::TenantContextMissing)
}

#[derive(Deserialize, Default)]
struct ListQuery {
    tenant_id: Option<Uuid>,
    page: Option<i32>,
    per_page: Option<i32>,
}

impl ListQuery {
    fn pagination(&self) -> (i32, i32) {
        let page = self.page.unwrap_or(1).max(1);
        let per_page = self
            .per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE);
        (page, per_page)
    }
}

async fn list_invoices(
    State(app_state): State<AppState>,
    Extension(principal): Extension<Principal>,
    axum::extract::Query(q): axum::extract::Query<ListQuery>,
) -> AppResult<impl IntoResponse> {
    let tenant_id = target_tenant(&principal, q.tenant_id)?;
    let (page, per_page) = q.pagination();
    let invoices = app_state
        .billing_use_cases
        .list_invoices(&principal, tenant_id, page, per_page)
        .await?;
    Ok(Json(invoices))
}

async fn list_payments(
    State(app_state): State<AppState>,
    Extension(principal): Extension<Principal>,
    axum::extract::Query(q): axum::extract::Query<ListQuery>,
) -> AppResult<impl IntoResponse> {
    let tenant_id = target_tenant(&principal, q.tenant_id)?;
    let (page, per_page) = q.pagination();
    let payments = app_state
        .billing_use_cases
        .list_payments(&principal, tenant_id, page, per_page)
        .await?;
    Ok(Json(payments))
}

#[derive(Deserialize)]
struct GenerateInvoiceRequest {
    subscription_id: Uuid,
}

async fn generate_invoice(
    State(app_state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<GenerateInvoiceRequest>,
) -> AppResult<impl IntoResponse> {
    // Invoice generation is an operator/scheduler action; tenant-facing
    // renewal goes through select-plan + order creation.
    if !principal.platform_operator {
        return Err(AppError::CrossTenantAccess);
    }
    let invoice = app_state
        .billing_use_cases
        .generate_invoice(req.subscription_id)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "id": invoice.id,
            "invoice_number": invoice.invoice_number,
            "amount_cents": invoice.amount_cents,
            "currency": invoice.currency,
            "period_start": invoice.period_start,
            "period_end": invoice.period_end,
            "due_date": invoice.due_date,
        })),
    ))
}

#[derive(Deserialize)]
struct CreateOrderRequest {
    invoice_id: Uuid,
    gateway: PaymentGateway,
    tenant_id: Option<Uuid>,
}

async fn create_payment_order(
    State(app_state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<CreateOrderRequest>,
) -> AppResult<impl IntoResponse> {
    let tenant_id = target_tenant(&principal, req.tenant_id)?;
    let order = app_state
        .billing_use_cases
        .create_payment_order(&principal, tenant_id, req.invoice_id, req.gateway)
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Unauthenticated: the HMAC signature over the raw body is the credential.
/// Verification runs against the exact bytes received, never a re-serialized
/// form.
pub async fn gateway_callback(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<impl IntoResponse> {
    let signature = headers
        .get(GATEWAY_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::InvalidSignature)?;

    let outcome = app_state
        .billing_use_cases
        .apply_gateway_callback(&body, signature)
        .await?;

    Ok(Json(serde_json::json!({
        "payment_id": outcome.payment.id,
        "invoice_id": outcome.invoice.id,
        "replayed": outcome.replayed,
    })))
}
