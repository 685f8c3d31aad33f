//! PostgreSQL DLQ repository implementation

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::DbResult;
use crate::models::DlqEventRow;
use crate::repo::{DlqFilter, DlqPage, DlqRepository, NewDlqEvent};

const DLQ_COLUMNS: &str = "event_id, event_source, event_type, payload, \
     error_message, received_at, replayed_at, replay_count";

/// PostgreSQL DLQ repository
#[derive(Clone)]
pub struct PgDlqRepository {
    pool: PgPool,
}

impl PgDlqRepository {
    /// Create a new DLQ repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DlqRepository for PgDlqRepository {
    async fn insert(&self, event: NewDlqEvent) -> DbResult<DlqEventRow> {
        let row = sqlx::query_as::<_, DlqEventRow>(&format!(
            r#"
            INSERT INTO webhook_event_dlq (event_source, event_type, payload, error_message)
            VALUES ($1, $2, $3, $4)
            RETURNING {DLQ_COLUMNS}
            "#,
        ))
        .bind(event.event_source.as_str())
        .bind(&event.event_type)
        .bind(&event.payload)
        .bind(&event.error_message)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<DlqEventRow>> {
        let row = sqlx::query_as::<_, DlqEventRow>(&format!(
            "SELECT {DLQ_COLUMNS} FROM webhook_event_dlq WHERE event_id = $1",
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn list(&self, filter: DlqFilter) -> DbResult<DlqPage> {
        // Both queries share the same filter clauses; bind order matters.
        let source = filter.source.map(|s| s.as_str());

        let events = sqlx::query_as::<_, DlqEventRow>(&format!(
            r#"
            SELECT {DLQ_COLUMNS}
            FROM webhook_event_dlq
            WHERE ($1::text IS NULL OR event_source = $1)
              AND (NOT $2 OR replayed_at IS NULL)
            ORDER BY received_at DESC
            LIMIT $3 OFFSET $4
            "#,
        ))
        .bind(source)
        .bind(filter.unprocessed_only)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM webhook_event_dlq
            WHERE ($1::text IS NULL OR event_source = $1)
              AND (NOT $2 OR replayed_at IS NULL)
            "#,
        )
        .bind(source)
        .bind(filter.unprocessed_only)
        .fetch_one(&self.pool)
        .await?;

        Ok(DlqPage { events, total })
    }

    async fn mark_replayed(
        &self,
        id: Uuid,
        expected_replay_count: i32,
    ) -> DbResult<Option<DlqEventRow>> {
        let row = sqlx::query_as::<_, DlqEventRow>(&format!(
            r#"
            UPDATE webhook_event_dlq
            SET replayed_at = now(),
                replay_count = replay_count + 1,
                error_message = NULL
            WHERE event_id = $1 AND replay_count = $2
            RETURNING {DLQ_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(expected_replay_count)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn record_replay_failure(
        &self,
        id: Uuid,
        error_message: &str,
        expected_replay_count: i32,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE webhook_event_dlq
            SET replay_count = replay_count + 1,
                error_message = $2
            WHERE event_id = $1 AND replay_count = $3
            "#,
        )
        .bind(id)
        .bind(error_message)
        .bind(expected_replay_count)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
