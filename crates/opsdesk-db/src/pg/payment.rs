//! PostgreSQL payment repository implementation

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use opsdesk_types::PaymentStatus;

use crate::error::DbResult;
use crate::models::PaymentRow;
use crate::repo::{NewPayment, PaymentRepository};

/// PostgreSQL payment repository
#[derive(Clone)]
pub struct PgPaymentRepository {
    pool: PgPool,
}

impl PgPaymentRepository {
    /// Create a new payment repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentRepository for PgPaymentRepository {
    async fn insert_if_absent(&self, payment: NewPayment) -> DbResult<Option<PaymentRow>> {
        // The unique constraint on external_id is the idempotency guard:
        // a conflicting insert returns no row instead of erroring, so two
        // concurrent deliveries of the same event leave exactly one row.
        let row = sqlx::query_as::<_, PaymentRow>(
            r#"
            INSERT INTO payments (invoice_id, external_id, amount, currency,
                                  method, paid_at, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (external_id) DO NOTHING
            RETURNING payment_id, invoice_id, external_id, amount, currency,
                      method, paid_at, status, created_at
            "#,
        )
        .bind(payment.invoice_id)
        .bind(&payment.external_id)
        .bind(payment.amount)
        .bind(&payment.currency)
        .bind(&payment.method)
        .bind(payment.paid_at)
        .bind(payment.status.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_by_external_id(&self, external_id: &str) -> DbResult<Option<PaymentRow>> {
        let row = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT payment_id, invoice_id, external_id, amount, currency,
                   method, paid_at, status, created_at
            FROM payments
            WHERE external_id = $1
            "#,
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn update_status(&self, payment_id: Uuid, status: PaymentStatus) -> DbResult<()> {
        sqlx::query("UPDATE payments SET status = $1 WHERE payment_id = $2")
            .bind(status.as_str())
            .bind(payment_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
