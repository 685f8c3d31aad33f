//! Live webhook ingestion
//!
//! Verify the raw body, parse, process, and on any processing failure
//! capture the event into the DLQ. Signature and parse failures reject the
//! request and are never stored; post-verification failures are stored and
//! the request is still acknowledged, so the sender does not retry-storm.

use std::sync::Arc;

use tracing::{error, info};
use uuid::Uuid;

use opsdesk_db::{DlqRepository, NewDlqEvent};
use opsdesk_types::EventSource;

use crate::error::ProcessError;
use crate::event::{NinjaEvent, StripeEvent};
use crate::processor::WebhookProcessor;
use crate::signature::{NinjaSignatureVerifier, StripeSignatureVerifier, VerificationMode};

/// Result of a live ingestion attempt that did not reject the request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Event fully processed (including idempotent duplicates)
    Processed,
    /// Processing failed; the event was captured for replay. `None` means
    /// even the DLQ write failed (logged, request still acknowledged).
    DeadLettered { event_id: Option<Uuid> },
}

/// Live ingestion entry point shared by the webhook endpoints
pub struct WebhookIngestor {
    stripe_verifier: StripeSignatureVerifier,
    ninja_verifier: NinjaSignatureVerifier,
    mode: VerificationMode,
    dlq: Arc<dyn DlqRepository>,
    processor: Arc<WebhookProcessor>,
}

impl WebhookIngestor {
    /// Create an ingestor. `mode` comes from the service config, which
    /// refuses `Bypass` in production.
    pub fn new(
        stripe_verifier: StripeSignatureVerifier,
        ninja_verifier: NinjaSignatureVerifier,
        mode: VerificationMode,
        dlq: Arc<dyn DlqRepository>,
        processor: Arc<WebhookProcessor>,
    ) -> Self {
        Self {
            stripe_verifier,
            ninja_verifier,
            mode,
            dlq,
            processor,
        }
    }

    /// Ingest a Stripe webhook delivery.
    ///
    /// Errors returned here (`InvalidSignature`, `MalformedPayload`) mean
    /// the request must be rejected; anything else is absorbed into the
    /// DLQ and reported as an outcome.
    pub async fn ingest_stripe(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<IngestOutcome, ProcessError> {
        if self.mode == VerificationMode::Enforce {
            let signature = signature.ok_or(ProcessError::InvalidSignature)?;
            self.stripe_verifier.verify(body, signature)?;
        }

        let event = StripeEvent::parse(body)?;
        info!(event_id = %event.id, event_type = %event.event_type, "Stripe webhook received");

        match self.processor.process_stripe(&event).await {
            Ok(()) => Ok(IngestOutcome::Processed),
            Err(e) => Ok(self
                .dead_letter(EventSource::Stripe, event.event_type.as_str(), body, &e)
                .await),
        }
    }

    /// Ingest an Invoice Ninja webhook delivery
    pub async fn ingest_ninja(
        &self,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<IngestOutcome, ProcessError> {
        if self.mode == VerificationMode::Enforce {
            self.ninja_verifier.verify(body, signature)?;
        }

        let event = NinjaEvent::parse(body)?;
        info!(event_type = %event.event, "Invoice Ninja webhook received");

        match self.processor.process_ninja(&event).await {
            Ok(()) => Ok(IngestOutcome::Processed),
            Err(e) => Ok(self
                .dead_letter(EventSource::InvoiceNinja, &event.event, body, &e)
                .await),
        }
    }

    /// Capture a failed event. The payload is stored verbatim (as parsed
    /// JSON of the received bytes) so replay re-processes exactly what the
    /// sender delivered. A failing DLQ write is logged, never propagated:
    /// the sender still gets its acknowledgement either way.
    async fn dead_letter(
        &self,
        source: EventSource,
        event_type: &str,
        body: &[u8],
        cause: &ProcessError,
    ) -> IngestOutcome {
        error!(%source, event_type, error = %cause, "Webhook processing failed, dead-lettering");

        let payload = serde_json::from_slice(body)
            .unwrap_or_else(|_| serde_json::Value::String(String::from_utf8_lossy(body).into()));

        match self
            .dlq
            .insert(NewDlqEvent {
                event_source: source,
                event_type: event_type.to_string(),
                payload,
                error_message: cause.to_string(),
            })
            .await
        {
            Ok(row) => {
                info!(dlq_event_id = %row.event_id, "Event stored in DLQ");
                IngestOutcome::DeadLettered {
                    event_id: Some(row.event_id),
                }
            }
            Err(e) => {
                error!(error = %e, "Failed to store event in DLQ");
                IngestOutcome::DeadLettered { event_id: None }
            }
        }
    }
}
