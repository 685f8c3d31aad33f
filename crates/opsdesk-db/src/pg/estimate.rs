//! PostgreSQL estimate repository implementation

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use opsdesk_types::EstimateStatus;

use crate::error::DbResult;
use crate::models::EstimateRow;
use crate::repo::EstimateRepository;

/// PostgreSQL estimate repository
#[derive(Clone)]
pub struct PgEstimateRepository {
    pool: PgPool,
}

impl PgEstimateRepository {
    /// Create a new estimate repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EstimateRepository for PgEstimateRepository {
    async fn find_by_external_id(&self, external_id: &str) -> DbResult<Option<EstimateRow>> {
        let row = sqlx::query_as::<_, EstimateRow>(
            r#"
            SELECT estimate_id, job_id, client_id, external_id, status, approved_at
            FROM estimates
            WHERE external_id = $1
            "#,
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn mark_approved(&self, estimate_id: Uuid) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE estimates
            SET status = $1, approved_at = now(), updated_at = now()
            WHERE estimate_id = $2
            "#,
        )
        .bind(EstimateStatus::Approved.as_str())
        .bind(estimate_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
