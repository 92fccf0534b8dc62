//! # BloodLink Dispatch
//!
//! Fans a blood request alert out to every selected donor. Each donor gets
//! one persisted [`Notification`](bloodlink_entity::notification::Notification)
//! before any external send, then SMS and realtime deliveries run side by
//! side with per-call timeouts and bounded retries.

pub mod dispatcher;
pub mod error;
pub mod retry;
pub mod sms;
pub mod summary;

pub use dispatcher::NotificationDispatcher;
pub use error::DeliveryError;
pub use sms::{DevSmsProvider, HttpSmsProvider, build_sms_provider};
pub use summary::{ChannelReport, DispatchSummary, DonorOutcome, DonorStatus};
