//! Parlor chat server.
//!
//! Each room is driven by a single coordinator task that owns the room's
//! connection set, so registration, removal and broadcast are linearized per
//! room. WebSocket connections talk to their room only through a command inbox
//! and receive events through their own bounded outbound queue.
//!
//! Layers:
//! - `domain`: value objects, entities and repository traits
//! - `room`: per-room coordinator, registry and connection pumps
//! - `infrastructure`: DTOs, SQLite / in-memory stores, password hashing
//! - `usecase`: application logic called by the handlers
//! - `ui`: Axum router, handlers and server runner

pub mod domain;
pub mod infrastructure;
pub mod room;
pub mod ui;
pub mod usecase;
