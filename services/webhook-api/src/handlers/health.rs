//! Health check handlers
//!
//! Readiness probes the DLQ table itself rather than a bare `SELECT 1`:
//! it proves both database connectivity and that the one table this
//! service cannot run without is reachable, and surfaces the unreplayed
//! backlog for operators watching the probe output.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub database: &'static str,
    /// Dead-lettered events not yet successfully replayed
    pub dlq_backlog: i64,
}

/// Liveness probe - always returns OK if the service is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Readiness probe - checks the DLQ table is reachable
pub async fn ready(State(state): State<AppState>) -> Result<Json<ReadyResponse>, StatusCode> {
    let backlog: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM webhook_event_dlq WHERE replayed_at IS NULL")
            .fetch_one(&state.pool)
            .await
            .map_err(|e| {
                tracing::error!(error = ?e, "DLQ readiness check failed");
                StatusCode::SERVICE_UNAVAILABLE
            })?;

    Ok(Json(ReadyResponse {
        status: "ready",
        database: "connected",
        dlq_backlog: backlog,
    }))
}
