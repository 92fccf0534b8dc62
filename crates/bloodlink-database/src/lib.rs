//! # bloodlink-database
//!
//! Persistence for the matching engine. The repository traits in
//! [`repositories`] are implemented twice: by [`memory`] for development and
//! tests, and by [`postgres`] for deployments.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod postgres;
pub mod repositories;

use std::sync::Arc;

pub use connection::DatabasePool;
pub use repositories::{
    DonationRepository, DonorDirectory, NotificationRepository, RequestRepository,
    VerificationCodeRepository,
};

/// Every repository the engine needs, behind trait objects.
#[derive(Clone)]
pub struct Repositories {
    /// Phone verification codes.
    pub codes: Arc<dyn VerificationCodeRepository>,
    /// Blood requests and their matched donors.
    pub requests: Arc<dyn RequestRepository>,
    /// Donation audit records.
    pub donations: Arc<dyn DonationRepository>,
    /// In-app notifications and delivery records.
    pub notifications: Arc<dyn NotificationRepository>,
    /// Donor directory.
    pub donors: Arc<dyn DonorDirectory>,
}

impl Repositories {
    /// Fresh, empty in-process repositories.
    pub fn in_memory() -> Self {
        Self {
            codes: Arc::new(memory::MemoryCodeRepository::new()),
            requests: Arc::new(memory::MemoryRequestRepository::new()),
            donations: Arc::new(memory::MemoryDonationRepository::new()),
            notifications: Arc::new(memory::MemoryNotificationRepository::new()),
            donors: Arc::new(memory::MemoryDonorDirectory::new()),
        }
    }

    /// PostgreSQL-backed repositories sharing one pool.
    pub fn postgres(db: &DatabasePool) -> Self {
        let pool = db.pool().clone();
        Self {
            codes: Arc::new(postgres::PgCodeRepository::new(pool.clone())),
            requests: Arc::new(postgres::PgRequestRepository::new(pool.clone())),
            donations: Arc::new(postgres::PgDonationRepository::new(pool.clone())),
            notifications: Arc::new(postgres::PgNotificationRepository::new(pool.clone())),
            donors: Arc::new(postgres::PgDonorDirectory::new(pool)),
        }
    }
}

impl std::fmt::Debug for Repositories {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repositories").finish_non_exhaustive()
    }
}
