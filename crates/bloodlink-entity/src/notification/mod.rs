//! Notification domain entities.

pub mod delivery;
pub mod model;
pub mod payload;

pub use delivery::{DeliveryChannel, DeliveryOutcome, DeliveryRecord};
pub use model::Notification;
pub use payload::{NotificationPayload, NotificationType};
