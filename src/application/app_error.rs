use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found")]
    NotFound,

    #[error("No tenant context for this unit of work")]
    TenantContextMissing,

    #[error("Operation targets a different tenant")]
    CrossTenantAccess,

    #[error("Subscription is not usable")]
    SubscriptionExpired,

    #[error("Plan is missing or inactive")]
    PlanUnavailable,

    #[error("An invoice already covers this billing period")]
    DuplicatePeriod,

    #[error("Invoice number is already taken")]
    DuplicateInvoiceNumber,

    #[error("Gateway callback signature did not verify")]
    InvalidSignature,

    #[error("Gateway error: {0}")]
    Gateway(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether the billing event worker should retry a handler that failed
    /// with this error. Infrastructure faults may heal; domain outcomes
    /// (missing rows, bad input, unusable plans) will not change on retry
    /// and go straight to the terminal record.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::Database(_) | AppError::Gateway(_) | AppError::Internal(_) => true,

            AppError::InvalidCredentials
            | AppError::InvalidInput(_)
            | AppError::NotFound
            | AppError::TenantContextMissing
            | AppError::CrossTenantAccess
            | AppError::SubscriptionExpired
            | AppError::PlanUnavailable
            | AppError::DuplicatePeriod
            | AppError::DuplicateInvoiceNumber
            | AppError::InvalidSignature => false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorCode {
    DatabaseError,
    InvalidCredentials,
    InvalidInput,
    NotFound,
    TenantContextMissing,
    CrossTenantAccess,
    SubscriptionExpired,
    PlanUnavailable,
    DuplicatePeriod,
    DuplicateInvoiceNumber,
    InvalidSignature,
    GatewayError,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::DatabaseError => "DATABASE_ERROR",
            ErrorCode::InvalidCredentials => "INVALID_CREDENTIALS",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::TenantContextMissing => "TENANT_CONTEXT_MISSING",
            ErrorCode::CrossTenantAccess => "CROSS_TENANT_ACCESS",
            ErrorCode::SubscriptionExpired => "SUBSCRIPTION_EXPIRED",
            ErrorCode::PlanUnavailable => "PLAN_UNAVAILABLE",
            ErrorCode::DuplicatePeriod => "DUPLICATE_PERIOD",
            ErrorCode::DuplicateInvoiceNumber => "DUPLICATE_INVOICE_NUMBER",
            ErrorCode::InvalidSignature => "INVALID_SIGNATURE",
            ErrorCode::GatewayError => "GATEWAY_ERROR",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
