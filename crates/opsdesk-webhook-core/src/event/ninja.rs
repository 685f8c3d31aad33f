//! Invoice Ninja event model
//!
//! Invoice Ninja webhooks carry an `event` discriminator plus optional
//! `quote` / `invoice` / `payment` / `client` objects. Status fields are
//! numeric strings, mapped to local enums here.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

use opsdesk_types::InvoiceStatus;

use crate::error::ProcessError;

/// Invoice Ninja event types we handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NinjaEventType {
    /// Quote approved by the customer
    QuoteApproved,
    /// Invoice created in Invoice Ninja
    InvoiceCreated,
    /// Invoice updated (status/balance changes)
    InvoiceUpdated,
    /// Payment recorded in Invoice Ninja
    PaymentCreated,
    /// Unknown event type
    Unknown(String),
}

impl From<&str> for NinjaEventType {
    fn from(s: &str) -> Self {
        match s {
            "quote.approved" => Self::QuoteApproved,
            "invoice.created" => Self::InvoiceCreated,
            "invoice.updated" => Self::InvoiceUpdated,
            "payment.created" => Self::PaymentCreated,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl NinjaEventType {
    /// The wire-format discriminator string
    pub fn as_str(&self) -> &str {
        match self {
            Self::QuoteApproved => "quote.approved",
            Self::InvoiceCreated => "invoice.created",
            Self::InvoiceUpdated => "invoice.updated",
            Self::PaymentCreated => "payment.created",
            Self::Unknown(s) => s,
        }
    }
}

impl std::fmt::Display for NinjaEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed Invoice Ninja webhook payload
#[derive(Debug, Clone, Deserialize)]
pub struct NinjaEvent {
    pub event: String,
    #[serde(default)]
    pub quote: Option<NinjaQuote>,
    #[serde(default)]
    pub invoice: Option<NinjaInvoice>,
    #[serde(default)]
    pub payment: Option<NinjaPayment>,
    #[serde(default)]
    pub client: Option<NinjaClient>,
}

impl NinjaEvent {
    /// Parse a raw (already verified) webhook body
    pub fn parse(payload: &[u8]) -> Result<Self, ProcessError> {
        serde_json::from_slice(payload).map_err(|e| ProcessError::MalformedPayload(e.to_string()))
    }

    /// Parse from a stored JSON value (DLQ replay path); accepts either
    /// the structured payload or a JSON string of the original body
    pub fn from_value(value: serde_json::Value) -> Result<Self, ProcessError> {
        match value {
            serde_json::Value::String(s) => {
                serde_json::from_str(&s).map_err(|e| ProcessError::MalformedPayload(e.to_string()))
            }
            other => serde_json::from_value(other)
                .map_err(|e| ProcessError::MalformedPayload(e.to_string())),
        }
    }

    /// The typed discriminator
    pub fn event_type(&self) -> NinjaEventType {
        NinjaEventType::from(self.event.as_str())
    }
}

/// Quote object.
///
/// Amounts are already in major currency units, unlike Stripe's.
#[derive(Debug, Clone, Deserialize)]
pub struct NinjaQuote {
    pub id: String,
    pub number: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub status_id: Option<String>,
    pub amount: Decimal,
    pub balance: Decimal,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub public_notes: Option<String>,
    #[serde(default)]
    pub private_notes: Option<String>,
}

/// Invoice object
#[derive(Debug, Clone, Deserialize)]
pub struct NinjaInvoice {
    pub id: String,
    pub number: String,
    #[serde(default)]
    pub client_id: Option<String>,
    pub status_id: String,
    pub amount: Decimal,
    pub balance: Decimal,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub public_notes: Option<String>,
    #[serde(default)]
    pub private_notes: Option<String>,
    /// Set when the invoice was converted from a quote
    #[serde(default)]
    pub quote_id: Option<String>,
}

/// Payment object
#[derive(Debug, Clone, Deserialize)]
pub struct NinjaPayment {
    pub id: String,
    pub invoice_id: String,
    pub amount: Decimal,
    #[serde(default)]
    pub transaction_reference: Option<String>,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub type_id: Option<String>,
}

/// Client object
#[derive(Debug, Clone, Deserialize)]
pub struct NinjaClient {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Map Invoice Ninja's numeric invoice status IDs to the local enum.
///
/// 1=draft, 2=sent, 3=partial, 4=paid, 5=cancelled. Anything else falls
/// back to draft.
pub fn ninja_invoice_status(status_id: &str) -> InvoiceStatus {
    match status_id {
        "2" => InvoiceStatus::Sent,
        "3" => InvoiceStatus::Partial,
        "4" => InvoiceStatus::Paid,
        "5" => InvoiceStatus::Void,
        _ => InvoiceStatus::Draft,
    }
}
