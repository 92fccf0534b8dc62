//! Route handlers, one module per resource.

pub mod auth;
pub mod donation;
pub mod health;
pub mod notification;
pub mod request;
pub mod ws;
