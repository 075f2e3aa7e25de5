use crate::app_error::{AppError, ErrorCode};
use axum::Json;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the error before it gets converted into a status response.
        tracing::error!(error = ?self, "Request failed");

        match self {
            AppError::Database(_) => {
                error_resp(StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::DatabaseError, None)
            }
            AppError::InvalidCredentials => {
                error_resp(StatusCode::UNAUTHORIZED, ErrorCode::InvalidCredentials, None)
            }
            AppError::InvalidInput(msg) => {
                error_resp(StatusCode::BAD_REQUEST, ErrorCode::InvalidInput, Some(msg))
            }
            AppError::NotFound => error_resp(StatusCode::NOT_FOUND, ErrorCode::NotFound, None),
            AppError::TenantContextMissing => {
                error_resp(StatusCode::UNAUTHORIZED, ErrorCode::TenantContextMissing, None)
            }
            AppError::CrossTenantAccess => {
                error_resp(StatusCode::FORBIDDEN, ErrorCode::CrossTenantAccess, None)
            }
            AppError::SubscriptionExpired => {
                error_resp(StatusCode::PAYMENT_REQUIRED, ErrorCode::SubscriptionExpired, None)
            }
            AppError::PlanUnavailable => {
                error_resp(StatusCode::BAD_REQUEST, ErrorCode::PlanUnavailable, None)
            }
            AppError::DuplicatePeriod => {
                error_resp(StatusCode::CONFLICT, ErrorCode::DuplicatePeriod, None)
            }
            AppError::DuplicateInvoiceNumber => {
                error_resp(StatusCode::CONFLICT, ErrorCode::DuplicateInvoiceNumber, None)
            }
            AppError::InvalidSignature => {
                error_resp(StatusCode::BAD_REQUEST, ErrorCode::InvalidSignature, None)
            }
            AppError::Gateway(_) => {
                error_resp(StatusCode::BAD_GATEWAY, ErrorCode::GatewayError, None)
            }
            AppError::Internal(_) => {
                error_resp(StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::InternalError, None)
            }
        }
    }
}

fn error_resp(status: StatusCode, code: ErrorCode, message: Option<String>) -> Response {
    let body = match message {
        Some(msg) => serde_json::json!({ "code": code.as_str(), "message": msg }),
        None => serde_json::json!({ "code": code.as_str() }),
    };
    (status, Json(body)).into_response()
}
