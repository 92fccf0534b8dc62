//! In-process repositories backed by `DashMap`.
//!
//! Each map shard is locked only for the key being touched, so unrelated
//! phone numbers, requests and donations never contend.

pub mod codes;
pub mod donations;
pub mod donors;
pub mod notifications;
pub mod requests;

pub use codes::MemoryCodeRepository;
pub use donations::MemoryDonationRepository;
pub use donors::MemoryDonorDirectory;
pub use notifications::MemoryNotificationRepository;
pub use requests::MemoryRequestRepository;
