//! # bloodlink-api
//!
//! HTTP API layer for BloodLink built on Axum.
//!
//! A thin surface over [`bloodlink_service::MatchingEngine`]: phone sign-in,
//! request intake, donor responses, donation confirmation, notification
//! history and the WebSocket upgrade served by the in-process room hub.

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use state::AppState;
