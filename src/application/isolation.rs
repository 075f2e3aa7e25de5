use uuid::Uuid;

use crate::app_error::{AppError, AppResult};

/// Tenant isolation check, applied wherever tenant-scoped data is touched —
/// use cases and workers included, not just the HTTP edge, because internal
/// callers can cross tenant lines too.
///
/// Rules, in order:
/// 1. platform operators act across tenants and are always allowed;
/// 2. a missing tenant context denies with `TENANT_CONTEXT_MISSING`;
/// 3. a requested tenant differing from the current one denies with
///    `CROSS_TENANT_ACCESS`;
/// 4. otherwise allow.
pub fn authorize(
    current_tenant: Option<Uuid>,
    requested_tenant: Option<Uuid>,
    is_platform_operator: bool,
) -> AppResult<()> {
    if is_platform_operator {
        return Ok(());
    }
    let current = current_tenant.ok_or(AppError::TenantContextMissing)?;
    match requested_tenant {
        Some(requested) if requested != current => Err(AppError::CrossTenantAccess),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_bypasses_everything() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert!(authorize(Some(a), Some(b), true).is_ok());
        assert!(authorize(None, Some(b), true).is_ok());
        assert!(authorize(None, None, true).is_ok());
    }

    #[test]
    fn missing_context_is_denied_first() {
        let b = Uuid::new_v4();
        assert!(matches!(
            authorize(None, Some(b), false),
            Err(AppError::TenantContextMissing)
        ));
        assert!(matches!(
            authorize(None, None, false),
            Err(AppError::TenantContextMissing)
        ));
    }

    #[test]
    fn cross_tenant_is_denied() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert!(matches!(
            authorize(Some(a), Some(b), false),
            Err(AppError::CrossTenantAccess)
        ));
    }

    #[test]
    fn same_tenant_and_unscoped_requests_are_allowed() {
        let a = Uuid::new_v4();
        assert!(authorize(Some(a), Some(a), false).is_ok());
        assert!(authorize(Some(a), None, false).is_ok());
    }
}
