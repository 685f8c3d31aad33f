//! Admin DLQ replay handlers

use std::str::FromStr;

use axum::extract::{Query, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use opsdesk_db::{DlqEventRow, DlqFilter};
use opsdesk_types::EventSource;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 200;

#[derive(Debug, Deserialize)]
pub struct ReplayRequest {
    pub event_id: Uuid,
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Serialize)]
pub struct ReplayResponse {
    pub success: bool,
    pub event_id: Uuid,
    pub event_source: EventSource,
    pub event_type: String,
    pub replayed_at: DateTime<Utc>,
    pub replay_count: i32,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    pub source: Option<String>,
    #[serde(default)]
    pub unprocessed_only: bool,
}

#[derive(Debug, Serialize)]
pub struct DlqEventResponse {
    pub event_id: Uuid,
    pub event_source: String,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub error_message: Option<String>,
    pub received_at: DateTime<Utc>,
    pub replayed_at: Option<DateTime<Utc>>,
    pub replay_count: i32,
}

impl From<DlqEventRow> for DlqEventResponse {
    fn from(row: DlqEventRow) -> Self {
        Self {
            event_id: row.event_id,
            event_source: row.event_source,
            event_type: row.event_type,
            payload: row.payload,
            error_message: row.error_message,
            received_at: row.received_at,
            replayed_at: row.replayed_at,
            replay_count: row.replay_count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub events: Vec<DlqEventResponse>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// POST /api/admin/replay
pub async fn replay_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ReplayRequest>,
) -> ApiResult<Json<ReplayResponse>> {
    authorize(&state, &headers)?;

    match state.replay.replay(req.event_id, req.force).await {
        Ok(summary) => {
            metrics::counter!("dlq_replays_total", "status" => "success").increment(1);
            Ok(Json(ReplayResponse {
                success: true,
                event_id: summary.event_id,
                event_source: summary.event_source,
                event_type: summary.event_type,
                replayed_at: summary.replayed_at,
                replay_count: summary.replay_count,
            }))
        }
        Err(e) => {
            metrics::counter!("dlq_replays_total", "status" => "failure").increment(1);
            Err(e.into())
        }
    }
}

/// GET /api/admin/replay
pub async fn list_dlq_events(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ListResponse>> {
    authorize(&state, &headers)?;

    let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = query.offset.unwrap_or(0).max(0);
    let source = query
        .source
        .as_deref()
        .map(EventSource::from_str)
        .transpose()
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let page = state
        .replay
        .list(DlqFilter {
            limit,
            offset,
            source,
            unprocessed_only: query.unprocessed_only,
        })
        .await?;

    Ok(Json(ListResponse {
        events: page.events.into_iter().map(Into::into).collect(),
        total: page.total,
        limit,
        offset,
    }))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> ApiResult<()> {
    let header = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    if state.admin.verify_bearer(header) {
        Ok(())
    } else {
        Err(ApiError::Unauthorized)
    }
}
