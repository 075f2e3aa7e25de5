use async_trait::async_trait;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::billing::{EventFailureInput, EventFailureRepoTrait},
};

#[async_trait]
impl EventFailureRepoTrait for PostgresPersistence {
    async fn record(&self, input: &EventFailureInput) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO billing_event_failures
                (event_kind, payment_id, tenant_id, reason, last_error, attempts)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&input.event_kind)
        .bind(input.payment_id)
        .bind(input.tenant_id)
        .bind(&input.reason)
        .bind(&input.last_error)
        .bind(input.attempts)
        .execute(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(())
    }
}
