//! Stripe event model

use serde::Deserialize;

use crate::error::ProcessError;

/// Stripe event types we handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StripeEventType {
    /// Payment intent succeeded
    PaymentIntentSucceeded,
    /// Payment intent failed
    PaymentIntentFailed,
    /// Charge succeeded (backup for payment_intent.succeeded)
    ChargeSucceeded,
    /// Charge refunded
    ChargeRefunded,
    /// Unknown event type
    Unknown(String),
}

impl From<&str> for StripeEventType {
    fn from(s: &str) -> Self {
        match s {
            "payment_intent.succeeded" => Self::PaymentIntentSucceeded,
            "payment_intent.payment_failed" => Self::PaymentIntentFailed,
            "charge.succeeded" => Self::ChargeSucceeded,
            "charge.refunded" => Self::ChargeRefunded,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl StripeEventType {
    /// The wire-format discriminator string
    pub fn as_str(&self) -> &str {
        match self {
            Self::PaymentIntentSucceeded => "payment_intent.succeeded",
            Self::PaymentIntentFailed => "payment_intent.payment_failed",
            Self::ChargeSucceeded => "charge.succeeded",
            Self::ChargeRefunded => "charge.refunded",
            Self::Unknown(s) => s,
        }
    }
}

impl std::fmt::Display for StripeEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parsed Stripe event
#[derive(Debug, Clone)]
pub struct StripeEvent {
    /// Stripe's event ID (`evt_…`)
    pub id: String,
    /// Event type
    pub event_type: StripeEventType,
    /// Typed event data
    pub data: StripeEventData,
    /// When the event was created (Unix timestamp)
    pub created: i64,
}

/// Stripe event data
#[derive(Debug, Clone)]
pub enum StripeEventData {
    /// Payment intent object
    PaymentIntent(PaymentIntent),
    /// Charge object
    Charge(Charge),
    /// Raw JSON for unknown events
    Raw(serde_json::Value),
}

/// Payment intent object.
///
/// `amount` is in minor currency units (cents); converting to major units
/// is the mutator's job, not the parser's.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub metadata: PaymentIntentMetadata,
    pub created: i64,
    #[serde(default)]
    pub last_payment_error: Option<PaymentIntentError>,
    #[serde(default)]
    pub payment_method_types: Vec<String>,
}

impl PaymentIntent {
    /// Best-effort payment method label for storage
    pub fn method(&self) -> &str {
        self.payment_method_types
            .first()
            .map(String::as_str)
            .unwrap_or("unknown")
    }
}

/// Metadata attached to the payment intent at checkout time
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentIntentMetadata {
    /// Local invoice UUID stamped onto the checkout session
    #[serde(default)]
    pub invoice_id: Option<String>,
}

/// Failure detail on a failed payment intent
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntentError {
    #[serde(default)]
    pub message: Option<String>,
}

/// Charge object
#[derive(Debug, Clone, Deserialize)]
pub struct Charge {
    pub id: String,
    /// Payment intent this charge belongs to, if any
    #[serde(default)]
    pub payment_intent: Option<String>,
    #[serde(default)]
    pub amount_refunded: i64,
}

// Raw wire shape for parsing
#[derive(Debug, Deserialize)]
struct RawStripeEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: RawEventData,
    created: i64,
}

#[derive(Debug, Deserialize)]
struct RawEventData {
    object: serde_json::Value,
}

impl StripeEvent {
    /// Parse a raw (already verified) webhook body
    pub fn parse(payload: &[u8]) -> Result<Self, ProcessError> {
        let raw: RawStripeEvent = serde_json::from_slice(payload)
            .map_err(|e| ProcessError::MalformedPayload(e.to_string()))?;
        Self::from_raw(raw)
    }

    /// Parse from a stored JSON value (DLQ replay path).
    ///
    /// The DLQ may hold either the structured event or a JSON string of
    /// the original body; both shapes are accepted.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ProcessError> {
        let raw: RawStripeEvent = match value {
            serde_json::Value::String(s) => serde_json::from_str(&s)
                .map_err(|e| ProcessError::MalformedPayload(e.to_string()))?,
            other => serde_json::from_value(other)
                .map_err(|e| ProcessError::MalformedPayload(e.to_string()))?,
        };
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawStripeEvent) -> Result<Self, ProcessError> {
        let event_type = StripeEventType::from(raw.event_type.as_str());
        let data = match &event_type {
            StripeEventType::PaymentIntentSucceeded | StripeEventType::PaymentIntentFailed => {
                let intent: PaymentIntent = serde_json::from_value(raw.data.object)
                    .map_err(|e| ProcessError::MalformedPayload(e.to_string()))?;
                StripeEventData::PaymentIntent(intent)
            }
            StripeEventType::ChargeSucceeded | StripeEventType::ChargeRefunded => {
                let charge: Charge = serde_json::from_value(raw.data.object)
                    .map_err(|e| ProcessError::MalformedPayload(e.to_string()))?;
                StripeEventData::Charge(charge)
            }
            StripeEventType::Unknown(_) => StripeEventData::Raw(raw.data.object),
        };

        Ok(Self {
            id: raw.id,
            event_type,
            data,
            created: raw.created,
        })
    }
}
