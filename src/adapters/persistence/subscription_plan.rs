use async_trait::async_trait;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::PostgresPersistence,
    app_error::{AppError, AppResult},
    application::use_cases::subscription::SubscriptionPlanRepoTrait,
    domain::entities::subscription_plan::SubscriptionPlan,
};

fn row_to_plan(row: &sqlx::postgres::PgRow) -> SubscriptionPlan {
    SubscriptionPlan {
        id: row.get("id"),
        code: row.get("code"),
        name: row.get("name"),
        billing_cycle: row.get("billing_cycle"),
        price_cents: row.get("price_cents"),
        currency: row.get("currency"),
        trial_days: row.get("trial_days"),
        active: row.get("active"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const SELECT_COLS: &str = r#"
    id, code, name, billing_cycle, price_cents, currency, trial_days, active,
    created_at, updated_at
"#;

#[async_trait]
impl SubscriptionPlanRepoTrait for PostgresPersistence {
    async fn create(&self, plan: &SubscriptionPlan) -> AppResult<SubscriptionPlan> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO subscription_plans
                (id, code, name, billing_cycle, price_cents, currency, trial_days, active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(plan.id)
        .bind(&plan.code)
        .bind(&plan.name)
        .bind(plan.billing_cycle)
        .bind(plan.price_cents)
        .bind(&plan.currency)
        .bind(plan.trial_days)
        .bind(plan.active)
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row_to_plan(&row))
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<SubscriptionPlan>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM subscription_plans WHERE id = $1",
            SELECT_COLS
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_plan))
    }

    async fn list(&self, include_inactive: bool) -> AppResult<Vec<SubscriptionPlan>> {
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM subscription_plans
            WHERE active OR $1
            ORDER BY price_cents
            "#,
            SELECT_COLS
        ))
        .bind(include_inactive)
        .fetch_all(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(rows.iter().map(row_to_plan).collect())
    }

    async fn update(
        &self,
        id: Uuid,
        price_cents: Option<i64>,
        currency: Option<String>,
        active: Option<bool>,
    ) -> AppResult<SubscriptionPlan> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE subscription_plans
            SET price_cents = COALESCE($2, price_cents),
                currency = COALESCE($3, currency),
                active = COALESCE($4, active),
                updated_at = now()
            WHERE id = $1
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(id)
        .bind(price_cents)
        .bind(currency)
        .bind(active)
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row_to_plan(&row))
    }
}
