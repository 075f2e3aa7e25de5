use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::subscription::{
        CreateSubscriptionInput, SubscriptionRepoTrait, SubscriptionStateUpdate,
    },
    domain::entities::subscription::Subscription,
};

fn row_to_subscription(row: &sqlx::postgres::PgRow) -> Subscription {
    Subscription {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        plan_id: row.get("plan_id"),
        status: row.get("status"),
        starts_at: row.get("starts_at"),
        expires_at: row.get("expires_at"),
        grace_period_ends_at: row.get("grace_period_ends_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const SELECT_COLS: &str = r#"
    id, tenant_id, plan_id, status, starts_at, expires_at, grace_period_ends_at,
    created_at, updated_at
"#;

#[async_trait]
impl SubscriptionRepoTrait for PostgresPersistence {
    async fn create(&self, input: &CreateSubscriptionInput) -> AppResult<Subscription> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO subscriptions (tenant_id, plan_id, status, starts_at, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(input.tenant_id)
        .bind(input.plan_id)
        .bind(input.status)
        .bind(input.starts_at)
        .bind(input.expires_at)
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row_to_subscription(&row))
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Subscription>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM subscriptions WHERE id = $1",
            SELECT_COLS
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_subscription))
    }

    async fn get_by_tenant(&self, tenant_id: Uuid) -> AppResult<Option<Subscription>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM subscriptions WHERE tenant_id = $1",
            SELECT_COLS
        ))
        .bind(tenant_id)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_subscription))
    }

    async fn set_plan(&self, id: Uuid, plan_id: Uuid) -> AppResult<Subscription> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE subscriptions
            SET plan_id = $2, updated_at = now()
            WHERE id = $1
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(id)
        .bind(plan_id)
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row_to_subscription(&row))
    }

    async fn update_state(
        &self,
        id: Uuid,
        update: &SubscriptionStateUpdate,
    ) -> AppResult<Option<Subscription>> {
        // The status guard in the WHERE clause is the compare-and-set: zero
        // rows means another transition won the race.
        let row = sqlx::query(&format!(
            r#"
            UPDATE subscriptions
            SET status = $3,
                starts_at = COALESCE($4, starts_at),
                expires_at = COALESCE($5, expires_at),
                grace_period_ends_at = CASE WHEN $6 THEN $7 ELSE grace_period_ends_at END,
                updated_at = now()
            WHERE id = $1 AND status = $2
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(id)
        .bind(update.expected_status)
        .bind(update.status)
        .bind(update.starts_at)
        .bind(update.expires_at)
        .bind(update.grace_period_ends_at.is_some())
        .bind(update.grace_period_ends_at.flatten())
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_subscription))
    }

    async fn list_lapsed(&self, today: NaiveDate, limit: i64) -> AppResult<Vec<Subscription>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM subscriptions
            WHERE status IN ('active', 'trial')
              AND expires_at < $1
              AND COALESCE(grace_period_ends_at, expires_at) < $1
            ORDER BY expires_at
            LIMIT $2
            "#,
            SELECT_COLS
        ))
        .bind(today)
        .bind(limit)
        .fetch_all(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(rows.iter().map(row_to_subscription).collect())
    }
}
