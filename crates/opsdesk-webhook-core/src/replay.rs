//! DLQ replay engine
//!
//! Operator-triggered reprocessing of dead-lettered events. Replay skips
//! signature verification (the stored payload was verified on first
//! receipt, and the caller is authenticated by admin credential) but runs
//! the exact same mutators as live ingestion.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use opsdesk_db::{DlqEventRow, DlqFilter, DlqPage, DlqRepository};
use opsdesk_types::EventSource;

use crate::error::{ProcessError, ReplayError};
use crate::event::{NinjaEvent, StripeEvent};
use crate::processor::WebhookProcessor;

/// Result of a successful replay
#[derive(Debug, Clone)]
pub struct ReplaySummary {
    pub event_id: Uuid,
    pub event_source: EventSource,
    pub event_type: String,
    pub replayed_at: DateTime<Utc>,
    pub replay_count: i32,
}

/// Replays DLQ events through the live mutators
pub struct ReplayEngine {
    dlq: Arc<dyn DlqRepository>,
    processor: Arc<WebhookProcessor>,
}

impl ReplayEngine {
    /// Create a replay engine sharing the live processor
    pub fn new(dlq: Arc<dyn DlqRepository>, processor: Arc<WebhookProcessor>) -> Self {
        Self { dlq, processor }
    }

    /// Replay one DLQ event.
    ///
    /// Replaying an already-replayed event is refused unless `force` is
    /// set: re-running financial mutations requires explicit operator
    /// intent. Every attempt, successful or not, increments the event's
    /// replay count; the optimistic guard on that count rejects
    /// concurrent replays of the same event.
    #[instrument(skip(self), fields(%event_id, force))]
    pub async fn replay(&self, event_id: Uuid, force: bool) -> Result<ReplaySummary, ReplayError> {
        let event = self
            .dlq
            .find_by_id(event_id)
            .await?
            .ok_or(ReplayError::NotFound)?;

        if let Some(replayed_at) = event.replayed_at {
            if !force {
                warn!(%replayed_at, replay_count = event.replay_count, "Event already replayed");
                return Err(ReplayError::AlreadyReplayed {
                    replayed_at,
                    replay_count: event.replay_count,
                });
            }
        }

        let source = EventSource::from_str(&event.event_source)
            .map_err(|_| ReplayError::UnsupportedSource(event.event_source.clone()))?;

        info!(%source, event_type = %event.event_type, "Replaying DLQ event");

        match self.dispatch(source, &event).await {
            Ok(()) => {
                let updated = self
                    .dlq
                    .mark_replayed(event.event_id, event.replay_count)
                    .await?
                    .ok_or(ReplayError::Conflict)?;

                info!(
                    replay_count = updated.replay_count,
                    "DLQ event replayed successfully"
                );

                Ok(ReplaySummary {
                    event_id: updated.event_id,
                    event_source: source,
                    event_type: updated.event_type,
                    // mark_replayed just set it; absence would be a bug,
                    // fall back to now rather than panic
                    replayed_at: updated.replayed_at.unwrap_or_else(Utc::now),
                    replay_count: updated.replay_count,
                })
            }
            Err(e) => {
                let message = format!("Replay failed: {e}");
                error!(error = %e, "DLQ event replay failed");

                let recorded = self
                    .dlq
                    .record_replay_failure(event.event_id, &message, event.replay_count)
                    .await?;
                if !recorded {
                    return Err(ReplayError::Conflict);
                }

                Err(ReplayError::Failed(e.to_string()))
            }
        }
    }

    /// List DLQ events for the admin dashboard
    pub async fn list(&self, filter: DlqFilter) -> Result<DlqPage, ReplayError> {
        Ok(self.dlq.list(filter).await?)
    }

    /// Re-parse the stored payload and run it through the live mutators
    async fn dispatch(&self, source: EventSource, event: &DlqEventRow) -> Result<(), ProcessError> {
        match source {
            EventSource::Stripe => {
                let stripe_event = StripeEvent::from_value(event.payload.clone())?;
                self.processor.process_stripe(&stripe_event).await
            }
            EventSource::InvoiceNinja => {
                let ninja_event = NinjaEvent::from_value(event.payload.clone())?;
                self.processor.process_ninja(&ninja_event).await
            }
        }
    }
}
