//! Repository traits
//!
//! Define async repository interfaces for database operations. The webhook
//! core depends on these traits, never on the Pg implementations, so tests
//! can substitute in-memory fakes.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use opsdesk_types::{EventSource, InvoiceStatus, PaymentStatus};

use crate::error::DbResult;
use crate::models::*;

/// Dead-letter queue repository trait
#[async_trait]
pub trait DlqRepository: Send + Sync {
    /// Append a failed event to the DLQ
    async fn insert(&self, event: NewDlqEvent) -> DbResult<DlqEventRow>;

    /// Find a DLQ event by ID
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<DlqEventRow>>;

    /// List DLQ events with a total count, newest first
    async fn list(&self, filter: DlqFilter) -> DbResult<DlqPage>;

    /// Mark an event as successfully replayed.
    ///
    /// Conditional update guarded on the caller's observed `replay_count`
    /// so that concurrent replays of the same event cannot both win. Sets
    /// `replayed_at`, increments `replay_count`, and clears
    /// `error_message`. Returns the updated row, or `None` when the guard
    /// failed (another replay got there first).
    async fn mark_replayed(
        &self,
        id: Uuid,
        expected_replay_count: i32,
    ) -> DbResult<Option<DlqEventRow>>;

    /// Record a failed replay attempt.
    ///
    /// Same optimistic guard as [`mark_replayed`](Self::mark_replayed).
    /// Increments `replay_count` and overwrites `error_message` with the
    /// new failure; `replayed_at` is left unchanged. Returns false when
    /// the guard failed.
    async fn record_replay_failure(
        &self,
        id: Uuid,
        error_message: &str,
        expected_replay_count: i32,
    ) -> DbResult<bool>;
}

/// New DLQ event input
#[derive(Debug, Clone)]
pub struct NewDlqEvent {
    pub event_source: EventSource,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub error_message: String,
}

/// DLQ list filter
#[derive(Debug, Clone, Default)]
pub struct DlqFilter {
    pub limit: i64,
    pub offset: i64,
    pub source: Option<EventSource>,
    /// Only events never successfully replayed (`replayed_at IS NULL`)
    pub unprocessed_only: bool,
}

/// One page of DLQ events plus the total matching count
#[derive(Debug, Clone)]
pub struct DlqPage {
    pub events: Vec<DlqEventRow>,
    pub total: i64,
}

/// Payment repository trait
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// Insert a payment unless one with the same `external_id` exists.
    ///
    /// Backed by `ON CONFLICT (external_id) DO NOTHING`, so two concurrent
    /// deliveries of the same event result in exactly one row. `None`
    /// means the payment already existed and is the idempotency signal.
    async fn insert_if_absent(&self, payment: NewPayment) -> DbResult<Option<PaymentRow>>;

    /// Find a payment by its external (source system) identifier
    async fn find_by_external_id(&self, external_id: &str) -> DbResult<Option<PaymentRow>>;

    /// Update payment status
    async fn update_status(&self, payment_id: Uuid, status: PaymentStatus) -> DbResult<()>;
}

/// New payment input
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub invoice_id: Uuid,
    pub external_id: String,
    /// Major currency units (Stripe minor units are converted upstream)
    pub amount: Decimal,
    pub currency: String,
    pub method: String,
    /// None for failed attempts
    pub paid_at: Option<DateTime<Utc>>,
    pub status: PaymentStatus,
}

/// Invoice repository trait
#[async_trait]
pub trait InvoiceRepository: Send + Sync {
    /// Find an invoice by ID
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<InvoiceRow>>;

    /// Find an invoice by its external (Invoice Ninja) identifier
    async fn find_by_external_id(&self, external_id: &str) -> DbResult<Option<InvoiceRow>>;

    /// Update invoice status
    async fn update_status(&self, id: Uuid, status: InvoiceStatus) -> DbResult<()>;

    /// Insert an externally created invoice unless one with the same
    /// `external_id` exists. `None` means it was already synced.
    async fn sync_external(&self, invoice: NewExternalInvoice) -> DbResult<Option<InvoiceRow>>;

    /// Apply an external status/balance update
    async fn update_from_external(
        &self,
        id: Uuid,
        status: InvoiceStatus,
        balance_due: Decimal,
        paid_at: Option<DateTime<Utc>>,
    ) -> DbResult<()>;

    /// Read the derived balance due from the invoice summary view.
    ///
    /// Read at call time, after any payment insert in the same flow; the
    /// paid/partial decision depends on this reflecting the write.
    async fn balance_due(&self, id: Uuid) -> DbResult<Option<Decimal>>;
}

/// New externally created invoice input
#[derive(Debug, Clone)]
pub struct NewExternalInvoice {
    pub client_id: Uuid,
    pub job_id: Option<Uuid>,
    pub external_id: String,
    pub invoice_number: String,
    pub total_amount: Decimal,
    pub balance_due: Decimal,
    pub status: InvoiceStatus,
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

/// Estimate repository trait
#[async_trait]
pub trait EstimateRepository: Send + Sync {
    /// Find an estimate by its external (Invoice Ninja quote) identifier
    async fn find_by_external_id(&self, external_id: &str) -> DbResult<Option<EstimateRow>>;

    /// Mark an estimate as approved, stamping `approved_at`
    async fn mark_approved(&self, estimate_id: Uuid) -> DbResult<()>;
}

/// Client repository trait
#[async_trait]
pub trait ClientRepository: Send + Sync {
    /// Find a client by email
    async fn find_by_email(&self, email: &str) -> DbResult<Option<ClientRow>>;
}
