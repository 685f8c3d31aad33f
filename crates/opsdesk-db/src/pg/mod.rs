//! PostgreSQL repository implementations

mod client;
mod dlq;
mod estimate;
mod invoice;
mod payment;

pub use client::PgClientRepository;
pub use dlq::PgDlqRepository;
pub use estimate::PgEstimateRepository;
pub use invoice::PgInvoiceRepository;
pub use payment::PgPaymentRepository;

use crate::DbPool;

/// All repositories bundled together
#[derive(Clone)]
pub struct Repositories {
    pub dlq: PgDlqRepository,
    pub payments: PgPaymentRepository,
    pub invoices: PgInvoiceRepository,
    pub estimates: PgEstimateRepository,
    pub clients: PgClientRepository,
}

impl Repositories {
    /// Create all repositories from a database pool
    pub fn new(pool: DbPool) -> Self {
        Self {
            dlq: PgDlqRepository::new(pool.clone()),
            payments: PgPaymentRepository::new(pool.clone()),
            invoices: PgInvoiceRepository::new(pool.clone()),
            estimates: PgEstimateRepository::new(pool.clone()),
            clients: PgClientRepository::new(pool),
        }
    }
}
