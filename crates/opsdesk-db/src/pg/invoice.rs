//! PostgreSQL invoice repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use opsdesk_types::InvoiceStatus;

use crate::error::DbResult;
use crate::models::{InvoiceRow, InvoiceSummaryRow};
use crate::repo::{InvoiceRepository, NewExternalInvoice};

const INVOICE_COLUMNS: &str = "invoice_id, client_id, job_id, external_id, invoice_number, \
     status, total_amount, balance_due, issue_date, due_date, paid_at, \
     created_at, updated_at";

/// PostgreSQL invoice repository
#[derive(Clone)]
pub struct PgInvoiceRepository {
    pool: PgPool,
}

impl PgInvoiceRepository {
    /// Create a new invoice repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InvoiceRepository for PgInvoiceRepository {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<InvoiceRow>> {
        let row = sqlx::query_as::<_, InvoiceRow>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE invoice_id = $1",
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_by_external_id(&self, external_id: &str) -> DbResult<Option<InvoiceRow>> {
        let row = sqlx::query_as::<_, InvoiceRow>(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices WHERE external_id = $1",
        ))
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn update_status(&self, id: Uuid, status: InvoiceStatus) -> DbResult<()> {
        sqlx::query(
            "UPDATE invoices SET status = $1, updated_at = now() WHERE invoice_id = $2",
        )
        .bind(status.as_str())
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn sync_external(&self, invoice: NewExternalInvoice) -> DbResult<Option<InvoiceRow>> {
        let row = sqlx::query_as::<_, InvoiceRow>(&format!(
            r#"
            INSERT INTO invoices (client_id, job_id, external_id, invoice_number,
                                  total_amount, balance_due, status, issue_date,
                                  due_date, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (external_id) DO NOTHING
            RETURNING {INVOICE_COLUMNS}
            "#,
        ))
        .bind(invoice.client_id)
        .bind(invoice.job_id)
        .bind(&invoice.external_id)
        .bind(&invoice.invoice_number)
        .bind(invoice.total_amount)
        .bind(invoice.balance_due)
        .bind(invoice.status.as_str())
        .bind(invoice.issue_date)
        .bind(invoice.due_date)
        .bind(&invoice.notes)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn update_from_external(
        &self,
        id: Uuid,
        status: InvoiceStatus,
        balance_due: Decimal,
        paid_at: Option<DateTime<Utc>>,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE invoices
            SET status = $1,
                balance_due = $2,
                paid_at = COALESCE($3, paid_at),
                updated_at = now()
            WHERE invoice_id = $4
            "#,
        )
        .bind(status.as_str())
        .bind(balance_due)
        .bind(paid_at)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn balance_due(&self, id: Uuid) -> DbResult<Option<Decimal>> {
        let summary = sqlx::query_as::<_, InvoiceSummaryRow>(
            "SELECT invoice_id, balance_due FROM invoice_summary WHERE invoice_id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(summary.and_then(|s| s.balance_due))
    }
}
