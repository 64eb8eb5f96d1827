//! Room broadcast core.
//!
//! - [`registry`]: one coordinator per room id, created on first use
//! - [`coordinator`]: the per-room event loop owning the registered connections
//! - [`connection`]: the read / write pump pair of one WebSocket
//! - [`queue`]: bounded outbound queue with send-or-evict delivery

pub mod connection;
mod coordinator;
pub mod handle;
pub mod queue;
pub mod registry;

pub use connection::{Connection, PumpConfig, ReadError, WriteError};
pub use handle::{ClientRegistration, Participant, RoomHandle, spawn_room};
pub use queue::{Delivery, Outbound, OutboundReceiver, OutboundSender, outbound_queue};
pub use registry::RoomRegistry;
