//! # bloodlink-entity
//!
//! Domain entity models for BloodLink. Every struct in this crate is either a
//! persisted record (request, donation, notification, verification code,
//! donor directory entry) or a value object embedded in one. Enums that are
//! stored as text expose `as_str` and parse back through `FromStr`.

#[macro_use]
mod macros;

pub mod blood;
pub mod donation;
pub mod donor;
pub mod notification;
pub mod request;
pub mod verification;

pub use blood::{BloodType, Urgency};
