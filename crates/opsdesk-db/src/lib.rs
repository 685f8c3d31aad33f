//! OpsDesk DB - Database abstractions
//!
//! SQLx-based database layer for OpsDesk services.
//!
//! # Example
//!
//! ```rust,ignore
//! use opsdesk_db::{create_pool, Repositories};
//!
//! let pool = create_pool("postgres://localhost/opsdesk").await?;
//! let repos = Repositories::new(pool);
//!
//! // Use repositories
//! let invoice = repos.invoices.find_by_external_id("inv_123").await?;
//! ```

pub mod error;
pub mod models;
pub mod pg;
pub mod pool;
pub mod repo;

pub use error::{DbError, DbResult};
pub use models::*;
pub use pg::Repositories;
pub use pool::{create_pool, DbPool};
pub use repo::*;
