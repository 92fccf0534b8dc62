//! Donor directory entities.

pub mod model;
pub mod preference;

pub use model::{Candidate, DonorProfile};
pub use preference::NotificationPreferences;
