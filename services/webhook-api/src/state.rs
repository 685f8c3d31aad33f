//! Application state for the Webhook API service.

use std::sync::Arc;

use opsdesk_db::DbPool;
use opsdesk_webhook_core::{AdminToken, ReplayEngine, WebhookIngestor};

use crate::config::Config;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Live webhook ingestion pipeline
    pub ingestor: Arc<WebhookIngestor>,
    /// DLQ replay engine
    pub replay: Arc<ReplayEngine>,
    /// Admin credential for the replay endpoints
    pub admin: AdminToken,
    /// Database pool (readiness probe)
    pub pool: DbPool,
    /// Configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        ingestor: WebhookIngestor,
        replay: ReplayEngine,
        admin: AdminToken,
        pool: DbPool,
        config: Config,
    ) -> Self {
        Self {
            ingestor: Arc::new(ingestor),
            replay: Arc::new(replay),
            admin,
            pool,
            config: Arc::new(config),
        }
    }

    /// Get request timeout from config
    pub fn request_timeout(&self) -> std::time::Duration {
        self.config.request_timeout
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
