//! Donation confirmation.

pub mod service;
pub mod state;

pub use service::DonationService;
pub use state::{Transition, apply, derive_status};
