//! Session tokens for verified phone numbers.

pub mod claims;
pub mod issuer;

pub use claims::SessionClaims;
pub use issuer::{SessionIssuer, SessionToken};
