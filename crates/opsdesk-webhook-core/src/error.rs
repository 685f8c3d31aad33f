//! Webhook processing and replay errors

use chrono::{DateTime, Utc};
use thiserror::Error;

use opsdesk_db::DbError;

/// Errors raised while verifying or processing an inbound event.
///
/// `InvalidSignature` and `MalformedPayload` reject the request outright
/// and never reach the DLQ; everything after verification is captured into
/// the DLQ with the request still acknowledged to the sender.
#[derive(Error, Debug)]
pub enum ProcessError {
    /// Signature missing, unparseable, stale, or wrong
    #[error("invalid signature")]
    InvalidSignature,

    /// Body is not valid JSON or not the expected event shape
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// An identifier the mutator depends on is absent from the payload
    #[error("missing required field: {0}")]
    MissingRequiredField(&'static str),

    /// A referenced invoice/client/estimate could not be resolved
    #[error("related record not found: {0}")]
    RelatedRecordNotFound(String),

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] DbError),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

/// Errors surfaced to the operator from a replay attempt.
///
/// Unlike live ingestion, replay failures are returned directly: replay is
/// a synchronous, operator-driven action expecting feedback.
#[derive(Error, Debug)]
pub enum ReplayError {
    /// No DLQ event with the given ID
    #[error("event not found")]
    NotFound,

    /// Event was already replayed and `force` was not set
    #[error("event already replayed at {replayed_at}")]
    AlreadyReplayed {
        replayed_at: DateTime<Utc>,
        replay_count: i32,
    },

    /// A concurrent replay of the same event won the optimistic guard
    #[error("concurrent replay detected")]
    Conflict,

    /// Stored event names a source this deployment does not handle
    #[error("unsupported event source: {0}")]
    UnsupportedSource(String),

    /// The replayed handler itself failed; the DLQ entry was updated
    #[error("replay failed: {0}")]
    Failed(String),

    /// Database error
    #[error("database error: {0}")]
    Database(#[from] DbError),
}
