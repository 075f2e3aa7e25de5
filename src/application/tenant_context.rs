use std::future::Future;

use uuid::Uuid;

use crate::app_error::{AppError, AppResult};

tokio::task_local! {
    static CURRENT_TENANT: Option<Uuid>;
}

/// Per-unit-of-work holder of the current tenant id.
///
/// The slot is task-local and only exists inside `scope`, so clearing is
/// structural: whenever the wrapped future finishes (return, error, or
/// cancellation) the slot is gone. That rules out a value leaking into the
/// next request on a reused runtime worker thread, which would be a
/// cross-tenant exposure. Both the HTTP middleware and the billing event
/// worker enter a scope per unit of work; nothing else may set the slot.
pub struct TenantContext;

impl TenantContext {
    /// Run `fut` with `tenant_id` as the current tenant. Platform-operator
    /// requests pass `None` and stay tenant-less.
    pub async fn scope<F>(tenant_id: Option<Uuid>, fut: F) -> F::Output
    where
        F: Future,
    {
        CURRENT_TENANT.scope(tenant_id, fut).await
    }

    /// Current tenant id, or `None` outside any scope (or in an operator
    /// scope).
    pub fn get() -> Option<Uuid> {
        CURRENT_TENANT.try_with(|t| *t).ok().flatten()
    }

    pub fn require() -> AppResult<Uuid> {
        Self::get().ok_or(AppError::TenantContextMissing)
    }
}
