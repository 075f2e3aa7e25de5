use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::subscription::TenantRepoTrait,
    domain::entities::tenant::Tenant,
};

#[async_trait]
impl TenantRepoTrait for PostgresPersistence {
    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Tenant>> {
        let row = sqlx::query("SELECT id, name, billing_email, created_at FROM tenants WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(AppError::from)?;
        Ok(row.map(|row| Tenant {
            id: row.get("id"),
            name: row.get("name"),
            billing_email: row.get("billing_email"),
            created_at: row.get("created_at"),
        }))
    }
}
