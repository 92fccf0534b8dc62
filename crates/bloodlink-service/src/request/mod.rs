//! Blood request intake and donor responses.

pub mod service;

pub use service::{MatchOutcome, MatchResponse, RequestService};
