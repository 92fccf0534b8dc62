//! In-app notification history and read state.

pub mod service;

pub use service::NotificationService;
