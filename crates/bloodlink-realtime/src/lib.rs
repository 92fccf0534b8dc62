//! # bloodlink-realtime
//!
//! The realtime channel used for in-app delivery and read-state sync.
//!
//! - [`RoomHub`] serves WebSocket clients connected to this process.
//! - [`RemoteLink`] forwards events to an external realtime gateway over a
//!   single owned WebSocket client connection with explicit reconnects.
//!
//! Both implement [`bloodlink_core::traits::RealtimeChannel`].

pub mod connection;
pub mod heartbeat;
pub mod hub;
pub mod message;
pub mod remote;
pub mod room;

pub use connection::{ConnectionHandle, ConnectionId, ConnectionPool};
pub use hub::RoomHub;
pub use message::{InboundMessage, OutboundMessage};
pub use remote::RemoteLink;
pub use room::RoomRegistry;
