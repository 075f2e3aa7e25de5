use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::subscription::{HistoryInput, SubscriptionHistoryRepoTrait},
    domain::entities::subscription::SubscriptionHistory,
};

fn row_to_history(row: &sqlx::postgres::PgRow) -> SubscriptionHistory {
    SubscriptionHistory {
        id: row.get("id"),
        subscription_id: row.get("subscription_id"),
        previous_status: row.get("previous_status"),
        new_status: row.get("new_status"),
        reason: row.get("reason"),
        actor: row.get("actor"),
        created_at: row.get("created_at"),
    }
}

const SELECT_COLS: &str = r#"
    id, subscription_id, previous_status, new_status, reason, actor, created_at
"#;

#[async_trait]
impl SubscriptionHistoryRepoTrait for PostgresPersistence {
    async fn append(&self, input: &HistoryInput) -> AppResult<SubscriptionHistory> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO subscription_history
                (subscription_id, previous_status, new_status, reason, actor)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(input.subscription_id)
        .bind(input.previous_status)
        .bind(input.new_status)
        .bind(&input.reason)
        .bind(input.actor)
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row_to_history(&row))
    }

    async fn list_by_subscription(
        &self,
        subscription_id: Uuid,
        limit: i64,
    ) -> AppResult<Vec<SubscriptionHistory>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM subscription_history
            WHERE subscription_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
            SELECT_COLS
        ))
        .bind(subscription_id)
        .bind(limit)
        .fetch_all(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(rows.iter().map(row_to_history).collect())
    }
}
