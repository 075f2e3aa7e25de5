use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::{
    adapters::http::app_state::AppState,
    app_error::AppError,
    application::{jwt, jwt::Principal, tenant_context::TenantContext},
};

/// Verifies the bearer token, stores the resolved `Principal` as a request
/// extension and runs the rest of the request inside the caller's tenant
/// scope. Leaving the scope is structural: when the future completes the
/// tenant binding is gone with it, errors included.
pub async fn auth_middleware(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&request).ok_or(AppError::InvalidCredentials)?;
    let claims = jwt::verify(&token, &app_state.config.jwt_secret)?;
    let principal = Principal::try_from(claims)?;

    tracing::debug!(
        user_id = %principal.user_id,
        tenant_id = ?principal.tenant_id,
        platform_operator = principal.platform_operator,
        "Authenticated request"
    );

    let tenant_id = principal.tenant_id;
    request.extensions_mut().insert(principal);

    Ok(TenantContext::scope(tenant_id, next.run(request)).await)
}

/// Blocks tenant traffic whose subscription no longer grants access.
/// Operators bypass the gate; billing routes are mounted outside it so a
/// lapsed tenant can still pay.
pub async fn subscription_gate(
    State(app_state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let principal = request
        .extensions()
        .get::<Principal>()
        .ok_or(AppError::InvalidCredentials)?;

    if !principal.platform_operator {
        app_state
            .subscription_use_cases
            .assert_current_tenant_usable()
            .await?;
    }

    Ok(next.run(request).await)
}

fn bearer_token(req: &Request) -> Option<String> {
    let header = req.headers().get(axum::http::header::AUTHORIZATION)?;
    let value = header.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}
