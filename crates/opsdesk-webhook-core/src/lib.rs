//! OpsDesk Webhook Core - Inbound event processing
//!
//! The ingestion and recovery pipeline for asynchronous payment and
//! invoicing events:
//!
//! - [`signature`] verifies raw webhook bodies against per-source secrets
//! - [`event`] parses verified bodies into typed, per-source events
//! - [`processor`] routes events to domain mutators (payments, invoices,
//!   estimates)
//! - [`ingest`] wraps the live path: verify, process, and dead-letter
//!   failures while still acknowledging the sender
//! - [`replay`] re-runs dead-lettered events through the same mutators on
//!   operator request
//!
//! # Example
//!
//! ```rust,ignore
//! use opsdesk_webhook_core::{WebhookIngestor, WebhookProcessor, ReplayEngine};
//!
//! let processor = Arc::new(WebhookProcessor::new(payments, invoices, estimates, clients, trigger));
//! let ingestor = WebhookIngestor::new(stripe_verifier, ninja_verifier, mode, dlq.clone(), processor.clone());
//! let replay = ReplayEngine::new(dlq, processor);
//!
//! let outcome = ingestor.ingest_stripe(&body, signature).await?;
//! ```

pub mod auth;
pub mod error;
pub mod event;
pub mod ingest;
pub mod processor;
pub mod replay;
pub mod signature;
pub mod trigger;

pub use auth::AdminToken;
pub use error::{ProcessError, ReplayError};
pub use event::{NinjaEvent, NinjaEventType, StripeEvent, StripeEventData, StripeEventType};
pub use ingest::{IngestOutcome, WebhookIngestor};
pub use processor::WebhookProcessor;
pub use replay::{ReplayEngine, ReplaySummary};
pub use signature::{NinjaSignatureVerifier, StripeSignatureVerifier, VerificationMode};
pub use trigger::WorkflowTrigger;
