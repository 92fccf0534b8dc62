//! Seams between the engine and the outside world.
//!
//! Each trait here has at least one production implementation in a sibling
//! crate and a deterministic stand-in used by tests.

pub mod clock;
pub mod realtime;
pub mod sms;

pub use clock::{Clock, ManualClock, SystemClock};
pub use realtime::{RealtimeChannel, request_room, user_room};
pub use sms::{DeliveryMode, SmsError, SmsProvider, SmsReceipt};
