//! PostgreSQL client repository implementation

use async_trait::async_trait;
use sqlx::PgPool;

use crate::error::DbResult;
use crate::models::ClientRow;
use crate::repo::ClientRepository;

/// PostgreSQL client repository
#[derive(Clone)]
pub struct PgClientRepository {
    pool: PgPool,
}

impl PgClientRepository {
    /// Create a new client repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClientRepository for PgClientRepository {
    async fn find_by_email(&self, email: &str) -> DbResult<Option<ClientRow>> {
        let row = sqlx::query_as::<_, ClientRow>(
            "SELECT client_id, name, email FROM clients WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}
