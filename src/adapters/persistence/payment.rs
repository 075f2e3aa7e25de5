use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::Row;
use uuid::Uuid;

use crate::{
    adapters::persistence::{PostgresPersistence, is_unique_violation},
    app_error::{AppError, AppResult},
    application::use_cases::billing::{CreatePendingPaymentInput, PaymentRepoTrait},
    domain::entities::payment::{Payment, PaymentStatus},
};

fn row_to_payment(row: &sqlx::postgres::PgRow) -> Payment {
    Payment {
        id: row.get("id"),
        tenant_id: row.get("tenant_id"),
        invoice_id: row.get("invoice_id"),
        gateway: row.get("gateway"),
        gateway_order_id: row.get("gateway_order_id"),
        gateway_transaction_id: row.get("gateway_transaction_id"),
        amount_cents: row.get("amount_cents"),
        currency: row.get("currency"),
        status: row.get("status"),
        failure_reason: row.get("failure_reason"),
        payment_date: row.get("payment_date"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const SELECT_COLS: &str = r#"
    id, tenant_id, invoice_id, gateway, gateway_order_id, gateway_transaction_id,
    amount_cents, currency, status, failure_reason, payment_date,
    created_at, updated_at
"#;

#[async_trait]
impl PaymentRepoTrait for PostgresPersistence {
    async fn create_pending(&self, input: &CreatePendingPaymentInput) -> AppResult<Payment> {
        let row = sqlx::query(&format!(
            r#"
            INSERT INTO payments
                (tenant_id, invoice_id, gateway, gateway_order_id, amount_cents, currency)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(input.tenant_id)
        .bind(input.invoice_id)
        .bind(input.gateway)
        .bind(&input.gateway_order_id)
        .bind(input.amount_cents)
        .bind(&input.currency)
        .fetch_one(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row_to_payment(&row))
    }

    async fn get_by_transaction_id(&self, transaction_id: &str) -> AppResult<Option<Payment>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM payments WHERE gateway_transaction_id = $1",
            SELECT_COLS
        ))
        .bind(transaction_id)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_payment))
    }

    async fn find_unresolved_for_order(
        &self,
        gateway_order_id: &str,
    ) -> AppResult<Option<Payment>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM payments
            WHERE gateway_order_id = $1 AND status = 'pending'
            ORDER BY created_at
            LIMIT 1
            "#,
            SELECT_COLS
        ))
        .bind(gateway_order_id)
        .fetch_optional(self.pool())
        .await
        .map_err(AppError::from)?;
        Ok(row.as_ref().map(row_to_payment))
    }

    async fn resolve(
        &self,
        payment_id: Uuid,
        transaction_id: &str,
        status: PaymentStatus,
        failure_reason: Option<&str>,
        payment_date: NaiveDateTime,
    ) -> AppResult<Option<Payment>> {
        // The pending guard and the unique index on gateway_transaction_id
        // together pick exactly one winner under duplicate callbacks: a
        // duplicate either matches zero rows or trips the unique index.
        let result = sqlx::query(&format!(
            r#"
            UPDATE payments
            SET gateway_transaction_id = $2,
                status = $3,
                failure_reason = $4,
                payment_date = $5,
                updated_at = now()
            WHERE id = $1 AND status = 'pending' AND gateway_transaction_id IS NULL
            RETURNING {}
            "#,
            SELECT_COLS
        ))
        .bind(payment_id)
        .bind(transaction_id)
        .bind(status)
        .bind(failure_reason)
        .bind(payment_date)
        .fetch_optional(self.pool())
        .await;

        match result {
            Ok(row) => Ok(row.as_ref().map(row_to_payment)),
            Err(e) if is_unique_violation(&e, "payments_gateway_transaction_id_key") => Ok(None),
            Err(e) => Err(AppError::from(e)),
        }
    }

    async fn list_by_tenant(
        &self,
        tenant_id: Uuid,
        page: i32,
        per_page: i32,
    ) -> AppResult<(Vec<Payment>, i64)> {
        let offset = (page as i64 - 1) * per_page as i64;
        let rows = sqlx::query(&format!(
            r#"
            SELECT {}
            FROM payments
            WHERE tenant_id = $1
            ORDER BY created_at DESC
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

        let total: i64 = sqlx::query("SELECT COUNT(*) AS count FROM payments WHERE tenant_id = $1")
            .bind(tenant_id)
            .fetch_one(self.pool())
            .await
            .map_err(AppError::from)?
            .get("count");

        Ok((rows.iter().map(row_to_payment).collect(), total))
    }
}
