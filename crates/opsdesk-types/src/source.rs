//! Webhook event sources

use serde::{Deserialize, Serialize};

/// External system that delivered a webhook event.
///
/// Stored as a lowercase string in the DLQ (`"stripe"`, `"invoiceninja"`).
/// Each source has its own signature scheme and event-type vocabulary, so
/// routing is always keyed on the source, never inferred from payload shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventSource {
    /// Stripe payment events (`payment_intent.*`, `charge.*`)
    Stripe,
    /// Invoice Ninja quote/invoice/payment events
    InvoiceNinja,
}

impl EventSource {
    /// Canonical lowercase name as stored in the database
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Stripe => "stripe",
            Self::InvoiceNinja => "invoiceninja",
        }
    }
}

impl std::fmt::Display for EventSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventSource {
    type Err = SourceParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stripe" => Ok(Self::Stripe),
            "invoiceninja" => Ok(Self::InvoiceNinja),
            _ => Err(SourceParseError(s.to_string())),
        }
    }
}

/// Error returned when parsing an unknown event source
#[derive(Debug, thiserror::Error)]
#[error("unknown event source: {0}")]
pub struct SourceParseError(pub String);
