//! Donation audit record.

pub mod model;
pub mod status;

pub use model::Donation;
pub use status::{ConfirmingParty, DonationStatus};
