//! # bloodlink-service
//!
//! Business logic for the matching engine. Services follow constructor
//! injection: repositories, providers and the clock arrive as `Arc`s.
//!
//! [`MatchingEngine`] bundles them behind the operations the HTTP layer
//! and the server binary call.

pub mod donation;
pub mod engine;
pub mod matching;
pub mod notification;
pub mod request;

pub use donation::{DonationService, Transition, derive_status};
pub use engine::{EngineParts, MatchingEngine};
pub use matching::{DonorSelector, Selection, compatible_donors, distance_km};
pub use notification::NotificationService;
pub use request::{MatchOutcome, MatchResponse, RequestService};
