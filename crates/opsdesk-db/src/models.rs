//! Database row models
//!
//! These types map directly to database rows using SQLx's FromRow derive.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use uuid::Uuid;

/// Dead-letter queue row for a webhook event that failed processing.
///
/// `error_message` always reflects the most recent failure; there is no
/// append-only history. `replay_count` counts every replay attempt,
/// successful or not.
#[derive(Debug, Clone, FromRow)]
pub struct DlqEventRow {
    pub event_id: Uuid,
    pub event_source: String,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub error_message: Option<String>,
    pub received_at: DateTime<Utc>,
    pub replayed_at: Option<DateTime<Utc>>,
    pub replay_count: i32,
}

/// Payment row from the database
///
/// `external_id` is the source system's transaction identifier and carries
/// a unique constraint: it is the idempotency key for webhook deliveries.
/// Amounts are stored in major currency units.
#[derive(Debug, Clone, FromRow)]
pub struct PaymentRow {
    pub payment_id: Uuid,
    pub invoice_id: Uuid,
    pub external_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub method: String,
    pub paid_at: Option<DateTime<Utc>>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Invoice row from the database (subset the webhook core touches)
#[derive(Debug, Clone, FromRow)]
pub struct InvoiceRow {
    pub invoice_id: Uuid,
    pub client_id: Option<Uuid>,
    pub job_id: Option<Uuid>,
    pub external_id: Option<String>,
    pub invoice_number: Option<String>,
    pub status: String,
    pub total_amount: Decimal,
    pub balance_due: Option<Decimal>,
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Estimate (quote) row from the database
#[derive(Debug, Clone, FromRow)]
pub struct EstimateRow {
    pub estimate_id: Uuid,
    pub job_id: Option<Uuid>,
    pub client_id: Option<Uuid>,
    pub external_id: Option<String>,
    pub status: String,
    pub approved_at: Option<DateTime<Utc>>,
}

/// Client row from the database (subset the webhook core touches)
#[derive(Debug, Clone, FromRow)]
pub struct ClientRow {
    pub client_id: Uuid,
    pub name: String,
    pub email: Option<String>,
}

/// Row from the `invoice_summary` view.
///
/// `balance_due` here is derived (total minus applied payments) and is the
/// value the payment mutator reads after inserting a payment. It must be
/// re-read at replay time, never cached across attempts.
#[derive(Debug, Clone, FromRow)]
pub struct InvoiceSummaryRow {
    pub invoice_id: Uuid,
    pub balance_due: Option<Decimal>,
}
