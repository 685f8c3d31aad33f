//! Payment, invoice, and estimate status enums

use serde::{Deserialize, Serialize};

/// Payment lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Payment applied against an invoice
    Applied,
    /// Payment attempt failed (recorded for audit, `paid_at` is null)
    Failed,
    /// Payment reversed after initially succeeding
    Refunded,
    /// Payment received but not yet matched to an invoice
    Unapplied,
}

impl PaymentStatus {
    /// Canonical lowercase name as stored in the database
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
            Self::Unapplied => "unapplied",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "applied" => Ok(Self::Applied),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            "unapplied" => Ok(Self::Unapplied),
            _ => Err(StatusParseError("payment", s.to_string())),
        }
    }
}

/// Invoice lifecycle status
///
/// Progression: draft -> sent -> partial -> paid, or sent -> void on
/// cancellation. A refund of an applied payment moves the invoice back
/// toward `Sent`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    Draft,
    Sent,
    Partial,
    Paid,
    Void,
}

impl InvoiceStatus {
    /// Canonical lowercase name as stored in the database
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Sent => "sent",
            Self::Partial => "partial",
            Self::Paid => "paid",
            Self::Void => "void",
        }
    }
}

impl std::fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InvoiceStatus {
    type Err = StatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(Self::Draft),
            "sent" => Ok(Self::Sent),
            "partial" => Ok(Self::Partial),
            "paid" => Ok(Self::Paid),
            "void" => Ok(Self::Void),
            _ => Err(StatusParseError("invoice", s.to_string())),
        }
    }
}

/// Estimate (quote) lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimateStatus {
    Draft,
    Sent,
    Approved,
    Expired,
    Converted,
}

impl EstimateStatus {
    /// Canonical lowercase name as stored in the database
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Sent => "sent",
            Self::Approved => "approved",
            Self::Expired => "expired",
            Self::Converted => "converted",
        }
    }
}

impl std::fmt::Display for EstimateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown status string
#[derive(Debug, thiserror::Error)]
#[error("unknown {0} status: {1}")]
pub struct StatusParseError(pub &'static str, pub String);

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn payment_status_round_trips() {
        for status in [
            PaymentStatus::Applied,
            PaymentStatus::Failed,
            PaymentStatus::Refunded,
            PaymentStatus::Unapplied,
        ] {
            assert_eq!(PaymentStatus::from_str(status.as_str()).unwrap(), status);
        }
    }

    #[test]
    fn invoice_status_round_trips() {
        for status in [
            InvoiceStatus::Draft,
            InvoiceStatus::Sent,
            InvoiceStatus::Partial,
            InvoiceStatus::Paid,
            InvoiceStatus::Void,
        ] {
            assert_eq!(InvoiceStatus::from_str(status.as_str()).unwrap(), status);
        }
    }
}
