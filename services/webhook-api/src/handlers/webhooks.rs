//! Inbound webhook handlers
//!
//! Both handlers take the raw body so the signature is computed over the
//! exact bytes delivered. Status codes follow the sender's retry
//! expectations: rejected deliveries get 4xx so a misconfigured secret is
//! visible, processing failures get 200 because the event is already
//! captured in the DLQ and a sender retry would not help.

use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};

use opsdesk_webhook_core::{IngestOutcome, ProcessError};

use crate::state::AppState;

/// POST /webhooks/stripe
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let start = Instant::now();
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok());

    let status = match state.ingestor.ingest_stripe(&body, signature).await {
        Ok(outcome) => {
            record_outcome("stripe", &outcome);
            StatusCode::OK
        }
        Err(ProcessError::InvalidSignature) => {
            tracing::warn!("Stripe webhook rejected: invalid signature");
            metrics::counter!("webhooks_received_total", "source" => "stripe", "status" => "rejected")
                .increment(1);
            StatusCode::BAD_REQUEST
        }
        Err(ProcessError::MalformedPayload(e)) => {
            tracing::warn!(error = %e, "Stripe webhook rejected: malformed payload");
            metrics::counter!("webhooks_received_total", "source" => "stripe", "status" => "rejected")
                .increment(1);
            StatusCode::BAD_REQUEST
        }
        Err(e) => {
            tracing::error!(error = %e, "Stripe webhook ingestion error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    metrics::histogram!("webhook_processing_duration_seconds", "source" => "stripe")
        .record(start.elapsed().as_secs_f64());
    status
}

/// POST /webhooks/invoiceninja
pub async fn ninja_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let start = Instant::now();
    let signature = headers
        .get("x-ninja-signature")
        .and_then(|v| v.to_str().ok());

    let status = match state.ingestor.ingest_ninja(&body, signature).await {
        Ok(outcome) => {
            record_outcome("invoiceninja", &outcome);
            StatusCode::OK
        }
        Err(ProcessError::InvalidSignature) => {
            tracing::warn!("Invoice Ninja webhook rejected: invalid signature");
            metrics::counter!("webhooks_received_total", "source" => "invoiceninja", "status" => "rejected")
                .increment(1);
            StatusCode::UNAUTHORIZED
        }
        Err(ProcessError::MalformedPayload(e)) => {
            tracing::warn!(error = %e, "Invoice Ninja webhook rejected: malformed payload");
            metrics::counter!("webhooks_received_total", "source" => "invoiceninja", "status" => "rejected")
                .increment(1);
            StatusCode::BAD_REQUEST
        }
        Err(e) => {
            tracing::error!(error = %e, "Invoice Ninja webhook ingestion error");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    metrics::histogram!("webhook_processing_duration_seconds", "source" => "invoiceninja")
        .record(start.elapsed().as_secs_f64());
    status
}

fn record_outcome(source: &'static str, outcome: &IngestOutcome) {
    match outcome {
        IngestOutcome::Processed => {
            metrics::counter!("webhooks_received_total", "source" => source, "status" => "processed")
                .increment(1);
        }
        IngestOutcome::DeadLettered { .. } => {
            metrics::counter!("webhooks_received_total", "source" => source, "status" => "dead_lettered")
                .increment(1);
            metrics::counter!("webhooks_dead_lettered_total", "source" => source).increment(1);
        }
    }
}
