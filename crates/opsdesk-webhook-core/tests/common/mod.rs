//! In-memory repository fakes shared by the integration tests.
//!
//! One `MemStore` backs all repository traits so the derived balance view
//! sees payment inserts, mirroring the database's read-after-write
//! behavior.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use hmac::{Hmac, Mac};
use rust_decimal::Decimal;
use sha2::Sha256;
use uuid::Uuid;

use opsdesk_db::{
    ClientRepository, ClientRow, DbResult, DlqEventRow, DlqFilter, DlqPage, DlqRepository,
    EstimateRepository, EstimateRow, InvoiceRepository, InvoiceRow, NewDlqEvent,
    NewExternalInvoice, NewPayment, PaymentRepository, PaymentRow,
};
use opsdesk_types::{InvoiceStatus, PaymentStatus};
use opsdesk_webhook_core::{
    NinjaSignatureVerifier, StripeSignatureVerifier, VerificationMode, WebhookIngestor,
    WebhookProcessor, WorkflowTrigger,
};

pub const STRIPE_SECRET: &str = "whsec_test_secret";
pub const NINJA_SECRET: &str = "ninja_test_secret";

#[derive(Default)]
pub struct MemStore {
    pub payments: Mutex<Vec<PaymentRow>>,
    pub invoices: Mutex<Vec<InvoiceRow>>,
    pub estimates: Mutex<Vec<EstimateRow>>,
    pub clients: Mutex<Vec<ClientRow>>,
    pub dlq: Mutex<Vec<DlqEventRow>>,
}

impl MemStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed_invoice(&self, total_amount: Decimal) -> Uuid {
        self.seed_invoice_with_id(Uuid::new_v4(), total_amount)
    }

    pub fn seed_invoice_with_id(&self, id: Uuid, total_amount: Decimal) -> Uuid {
        self.invoices.lock().unwrap().push(InvoiceRow {
            invoice_id: id,
            client_id: None,
            job_id: None,
            external_id: None,
            invoice_number: Some(format!("INV-{id}")),
            status: InvoiceStatus::Sent.as_str().to_string(),
            total_amount,
            balance_due: Some(total_amount),
            issue_date: None,
            due_date: None,
            paid_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        });
        id
    }

    pub fn seed_external_invoice(&self, external_id: &str, total_amount: Decimal) -> Uuid {
        let id = self.seed_invoice(total_amount);
        let mut invoices = self.invoices.lock().unwrap();
        let row = invoices
            .iter_mut()
            .find(|i| i.invoice_id == id)
            .expect("just inserted");
        row.external_id = Some(external_id.to_string());
        id
    }

    pub fn seed_estimate(&self, external_id: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.estimates.lock().unwrap().push(EstimateRow {
            estimate_id: id,
            job_id: Some(Uuid::new_v4()),
            client_id: Some(Uuid::new_v4()),
            external_id: Some(external_id.to_string()),
            status: "sent".to_string(),
            approved_at: None,
        });
        id
    }

    pub fn seed_client(&self, email: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.clients.lock().unwrap().push(ClientRow {
            client_id: id,
            name: "Test Client".to_string(),
            email: Some(email.to_string()),
        });
        id
    }

    pub fn seed_payment(&self, invoice_id: Uuid, external_id: &str, amount: Decimal) -> Uuid {
        let id = Uuid::new_v4();
        self.payments.lock().unwrap().push(PaymentRow {
            payment_id: id,
            invoice_id,
            external_id: external_id.to_string(),
            amount,
            currency: "USD".to_string(),
            method: "card".to_string(),
            paid_at: Some(Utc::now()),
            status: PaymentStatus::Applied.as_str().to_string(),
            created_at: Utc::now(),
        });
        id
    }

    pub fn payment_rows(&self) -> Vec<PaymentRow> {
        self.payments.lock().unwrap().clone()
    }

    pub fn invoice(&self, id: Uuid) -> InvoiceRow {
        self.invoices
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.invoice_id == id)
            .expect("invoice exists")
            .clone()
    }

    pub fn estimate(&self, id: Uuid) -> EstimateRow {
        self.estimates
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.estimate_id == id)
            .expect("estimate exists")
            .clone()
    }

    pub fn dlq_rows(&self) -> Vec<DlqEventRow> {
        self.dlq.lock().unwrap().clone()
    }

    pub fn seed_dlq(&self, event: NewDlqEvent) -> Uuid {
        let id = Uuid::new_v4();
        self.dlq.lock().unwrap().push(DlqEventRow {
            event_id: id,
            event_source: event.event_source.as_str().to_string(),
            event_type: event.event_type,
            payload: event.payload,
            error_message: Some(event.error_message),
            received_at: Utc::now(),
            replayed_at: None,
            replay_count: 0,
        });
        id
    }

    fn derived_balance(&self, invoice_id: Uuid) -> Option<Decimal> {
        let invoices = self.invoices.lock().unwrap();
        let invoice = invoices.iter().find(|i| i.invoice_id == invoice_id)?;
        let applied: Decimal = self
            .payments
            .lock()
            .unwrap()
            .iter()
            .filter(|p| {
                p.invoice_id == invoice_id && p.status == PaymentStatus::Applied.as_str()
            })
            .map(|p| p.amount)
            .sum();
        Some(invoice.total_amount - applied)
    }
}

pub struct MemPayments(pub Arc<MemStore>);

#[async_trait]
impl PaymentRepository for MemPayments {
    async fn insert_if_absent(&self, payment: NewPayment) -> DbResult<Option<PaymentRow>> {
        let mut payments = self.0.payments.lock().unwrap();
        // Single lock makes the check-and-insert atomic, like the unique
        // constraint it stands in for.
        if payments.iter().any(|p| p.external_id == payment.external_id) {
            return Ok(None);
        }
        let row = PaymentRow {
            payment_id: Uuid::new_v4(),
            invoice_id: payment.invoice_id,
            external_id: payment.external_id,
            amount: payment.amount,
            currency: payment.currency,
            method: payment.method,
            paid_at: payment.paid_at,
            status: payment.status.as_str().to_string(),
            created_at: Utc::now(),
        };
        payments.push(row.clone());
        Ok(Some(row))
    }

    async fn find_by_external_id(&self, external_id: &str) -> DbResult<Option<PaymentRow>> {
        Ok(self
            .0
            .payments
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.external_id == external_id)
            .cloned())
    }

    async fn update_status(&self, payment_id: Uuid, status: PaymentStatus) -> DbResult<()> {
        let mut payments = self.0.payments.lock().unwrap();
        if let Some(row) = payments.iter_mut().find(|p| p.payment_id == payment_id) {
            row.status = status.as_str().to_string();
        }
        Ok(())
    }
}

pub struct MemInvoices(pub Arc<MemStore>);

#[async_trait]
impl InvoiceRepository for MemInvoices {
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<InvoiceRow>> {
        Ok(self
            .0
            .invoices
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.invoice_id == id)
            .cloned())
    }

    async fn find_by_external_id(&self, external_id: &str) -> DbResult<Option<InvoiceRow>> {
        Ok(self
            .0
            .invoices
            .lock()
            .unwrap()
            .iter()
            .find(|i| i.external_id.as_deref() == Some(external_id))
            .cloned())
    }

    async fn update_status(&self, id: Uuid, status: InvoiceStatus) -> DbResult<()> {
        let mut invoices = self.0.invoices.lock().unwrap();
        if let Some(row) = invoices.iter_mut().find(|i| i.invoice_id == id) {
            row.status = status.as_str().to_string();
            row.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn sync_external(&self, invoice: NewExternalInvoice) -> DbResult<Option<InvoiceRow>> {
        let mut invoices = self.0.invoices.lock().unwrap();
        if invoices
            .iter()
            .any(|i| i.external_id.as_deref() == Some(invoice.external_id.as_str()))
        {
            return Ok(None);
        }
        let row = InvoiceRow {
            invoice_id: Uuid::new_v4(),
            client_id: Some(invoice.client_id),
            job_id: invoice.job_id,
            external_id: Some(invoice.external_id),
            invoice_number: Some(invoice.invoice_number),
            status: invoice.status.as_str().to_string(),
            total_amount: invoice.total_amount,
            balance_due: Some(invoice.balance_due),
            issue_date: invoice.issue_date,
            due_date: invoice.due_date,
            paid_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        invoices.push(row.clone());
        Ok(Some(row))
    }

    async fn update_from_external(
        &self,
        id: Uuid,
        status: InvoiceStatus,
        balance_due: Decimal,
        paid_at: Option<chrono::DateTime<Utc>>,
    ) -> DbResult<()> {
        let mut invoices = self.0.invoices.lock().unwrap();
        if let Some(row) = invoices.iter_mut().find(|i| i.invoice_id == id) {
            row.status = status.as_str().to_string();
            row.balance_due = Some(balance_due);
            if paid_at.is_some() {
                row.paid_at = paid_at;
            }
            row.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn balance_due(&self, id: Uuid) -> DbResult<Option<Decimal>> {
        Ok(self.0.derived_balance(id))
    }
}

pub struct MemEstimates(pub Arc<MemStore>);

#[async_trait]
impl EstimateRepository for MemEstimates {
    async fn find_by_external_id(&self, external_id: &str) -> DbResult<Option<EstimateRow>> {
        Ok(self
            .0
            .estimates
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.external_id.as_deref() == Some(external_id))
            .cloned())
    }

    async fn mark_approved(&self, estimate_id: Uuid) -> DbResult<()> {
        let mut estimates = self.0.estimates.lock().unwrap();
        if let Some(row) = estimates.iter_mut().find(|e| e.estimate_id == estimate_id) {
            row.status = "approved".to_string();
            row.approved_at = Some(Utc::now());
        }
        Ok(())
    }
}

pub struct MemClients(pub Arc<MemStore>);

#[async_trait]
impl ClientRepository for MemClients {
    async fn find_by_email(&self, email: &str) -> DbResult<Option<ClientRow>> {
        Ok(self
            .0
            .clients
            .lock()
            .unwrap()
            .iter()
            .find(|c| c.email.as_deref() == Some(email))
            .cloned())
    }
}

pub struct MemDlq(pub Arc<MemStore>);

#[async_trait]
impl DlqRepository for MemDlq {
    async fn insert(&self, event: NewDlqEvent) -> DbResult<DlqEventRow> {
        let row = DlqEventRow {
            event_id: Uuid::new_v4(),
            event_source: event.event_source.as_str().to_string(),
            event_type: event.event_type,
            payload: event.payload,
            error_message: Some(event.error_message),
            received_at: Utc::now(),
            replayed_at: None,
            replay_count: 0,
        };
        self.0.dlq.lock().unwrap().push(row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<DlqEventRow>> {
        Ok(self
            .0
            .dlq
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.event_id == id)
            .cloned())
    }

    async fn list(&self, filter: DlqFilter) -> DbResult<DlqPage> {
        let events: Vec<DlqEventRow> = self
            .0
            .dlq
            .lock()
            .unwrap()
            .iter()
            .filter(|e| {
                filter
                    .source
                    .map(|s| e.event_source == s.as_str())
                    .unwrap_or(true)
                    && (!filter.unprocessed_only || e.replayed_at.is_none())
            })
            .cloned()
            .collect();
        let total = events.len() as i64;
        let page = events
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect();
        Ok(DlqPage {
            events: page,
            total,
        })
    }

    async fn mark_replayed(
        &self,
        id: Uuid,
        expected_replay_count: i32,
    ) -> DbResult<Option<DlqEventRow>> {
        let mut dlq = self.0.dlq.lock().unwrap();
        let Some(row) = dlq
            .iter_mut()
            .find(|e| e.event_id == id && e.replay_count == expected_replay_count)
        else {
            return Ok(None);
        };
        row.replayed_at = Some(Utc::now());
        row.replay_count += 1;
        row.error_message = None;
        Ok(Some(row.clone()))
    }

    async fn record_replay_failure(
        &self,
        id: Uuid,
        error_message: &str,
        expected_replay_count: i32,
    ) -> DbResult<bool> {
        let mut dlq = self.0.dlq.lock().unwrap();
        let Some(row) = dlq
            .iter_mut()
            .find(|e| e.event_id == id && e.replay_count == expected_replay_count)
        else {
            return Ok(false);
        };
        row.replay_count += 1;
        row.error_message = Some(error_message.to_string());
        Ok(true)
    }
}

pub fn processor(store: &Arc<MemStore>) -> Arc<WebhookProcessor> {
    Arc::new(WebhookProcessor::new(
        Arc::new(MemPayments(store.clone())),
        Arc::new(MemInvoices(store.clone())),
        Arc::new(MemEstimates(store.clone())),
        Arc::new(MemClients(store.clone())),
        WorkflowTrigger::disabled(),
    ))
}

pub fn ingestor(store: &Arc<MemStore>) -> WebhookIngestor {
    WebhookIngestor::new(
        StripeSignatureVerifier::new(STRIPE_SECRET),
        NinjaSignatureVerifier::new(Some(NINJA_SECRET.to_string())),
        VerificationMode::Enforce,
        Arc::new(MemDlq(store.clone())),
        processor(store),
    )
}

pub fn replay_engine(store: &Arc<MemStore>) -> opsdesk_webhook_core::ReplayEngine {
    opsdesk_webhook_core::ReplayEngine::new(Arc::new(MemDlq(store.clone())), processor(store))
}

/// Stripe-style signature header over a payload
pub fn sign_stripe(payload: &[u8]) -> String {
    let timestamp = Utc::now().timestamp();
    let signed = format!("{}.{}", timestamp, std::str::from_utf8(payload).unwrap());
    let mut mac = Hmac::<Sha256>::new_from_slice(STRIPE_SECRET.as_bytes()).unwrap();
    mac.update(signed.as_bytes());
    format!(
        "t={},v1={}",
        timestamp,
        hex::encode(mac.finalize().into_bytes())
    )
}

/// Invoice Ninja signature header over a payload
pub fn sign_ninja(payload: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(NINJA_SECRET.as_bytes()).unwrap();
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// A payment_intent.succeeded body for the given invoice
pub fn payment_succeeded_body(pi_id: &str, invoice_id: Uuid, amount_cents: i64) -> Vec<u8> {
    let body = serde_json::json!({
        "id": format!("evt_{pi_id}"),
        "type": "payment_intent.succeeded",
        "created": Utc::now().timestamp(),
        "data": { "object": {
            "id": pi_id,
            "amount": amount_cents,
            "currency": "usd",
            "created": Utc::now().timestamp(),
            "metadata": { "invoice_id": invoice_id.to_string() },
            "payment_method_types": ["card"]
        }}
    });
    serde_json::to_vec(&body).unwrap()
}
