use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::{PostgresPersistence, is_unique_violation},
    app_error::{AppError, AppResult},
    application::use_cases::billing::{CreateInvoiceInput, InvoiceRepoTrait},
    domain::entities::invoice::Invoice,
};

fn row_to_invoice(row: &sqlx::postgres::PgRow) -> Invoice {
    Invoice {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        subscription_id: row.get("subscription_id"),
        invoice_number: row.get("invoice_number"),
        amount_cents: row.get("amount_cents"),
        paid_cents: row.get("paid_cents"),
        currency: row.get("currency"),
        status: row.get("status"),
        period_start: row.get("period_start"),
        period_end: row.get("period_end"),
        due_date: row.get("due_date"),
        paid_at: row.get("paid_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const SELECT_COLS: &str = r#"
    id, tenant_id, subscription_id, invoice_number, amount_cents, paid_cents,
    currency, status, period_start, period_end, due_date, paid_at,
    created_at, updated_at
"#;

#[async_trait]
impl InvoiceRepoTrait for PostgresPersistence {
    async fn create(&self, input: &CreateInvoiceInput) -> AppResult<Invoice> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO invoices
                (tenant_id, subscription_id, invoice_number, amount_cents,
                 currency, period_start, period_end, due_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(input.tenant_id)
        .bind(input.subscription_id)
        .bind(&input.invoice_number)
        .bind(input.amount_cents)
        .bind(&input.currency)
        .bind(input.period_start)
        .bind(input.period_end)
        .bind(input.due_date)
        .fetch_one(self.pool())
        .await
        .map_err(|e| {
            // A concurrent generation for the same period loses here even
            // when both requests passed the read-side check.
            if is_unique_violation(&e, "invoices_subscription_id_period_start_key") {
                AppError::DuplicatePeriod
            } else if is_unique_violation(&e, "invoices_invoice_number_key") {
                AppError::DuplicateInvoiceNumber
            } else {
                AppError::from(e)
            }
        })?;
        Ok(row_to_invoice(&row))
    }

    async fn get_by_id(&self, id: Uuid) -> AppResult<Option<Invoice>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM invoices WHERE id = $1",
            SELECT_COLS
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_invoice))
    }

    async fn get_latest_for_subscription(
        &self,
        subscription_id: Uuid,
    ) -> AppResult<Option<Invoice>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM invoices
            WHERE subscription_id = $1
            ORDER BY period_start DESC
            LIMIT 1
            "#,
            SELECT_COLS
        ))
        .bind(subscription_id)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_invoice))
    }

    async fn list_by_tenant(
        &self,
        tenant_id: Uuid,
        page: i32,
        per_page: i32,
    ) -> AppResult<(Vec<Invoice>, i64)> {
        let offset = (page as i64 - 1) * per_page as i64;
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM invoices
            WHERE tenant_id = $1
            ORDER BY period_start DESC
            LIMIT $2 OFFSET $3
            "#,
            SELECT_COLS
        ))
        .bind(tenant_id)
        .bind(per_page as i64)
        .bind(offset)
        .fetch_all(self.pool())
        .await
        .map_err(AppError::from)?;

        let total: i64 = sqlx::query("SELECT COUNT(*) AS count FROM invoices WHERE tenant_id = $1")
            .bind(tenant_id)
            .fetch_one(self.pool())
            .await
            .map_err(AppError::from)?
            .get("count");

        Ok((rows.iter().map(row_to_invoice).collect(), total))
    }

    async fn settle_totals(&self, id: Uuid, now: NaiveDateTime) -> AppResult<Invoice> {
        // Sum and write in one statement; two callbacks settling
        // concurrently both end up with the full total on the row.
        let row = sqlx::query(&format!(
            r#"
            UPDATE invoices
            SET paid_cents = totals.total,
                status = CASE
                    WHEN totals.total >= invoices.amount_cents THEN 'paid'::invoice_status
                    WHEN totals.total > 0 THEN 'partially_paid'::invoice_status
                    ELSE invoices.status
                END,
                paid_at = CASE
                    WHEN totals.total >= invoices.amount_cents THEN COALESCE(invoices.paid_at, $2)
                    ELSE invoices.paid_at
                END,
                updated_at = now()
            FROM (
                SELECT COALESCE(SUM(amount_cents), 0)::bigint AS total
                FROM payments
                WHERE invoice_id = $1 AND status = 'success'
            ) AS totals
            WHERE invoices.id = $1
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(id)
        .bind(now)
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row_to_invoice(&row))
    }
}
