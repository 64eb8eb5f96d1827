//! Domain layer: value objects, entities, errors and the repository traits the
//! outer layers implement.

pub mod entity;
pub mod error;
pub mod repository;
pub mod value_object;

pub use entity::{ChatEvent, EventKind, JOIN_CONTENT, LEAVE_CONTENT, RoomSummary, User};
pub use error::{PasswordError, RepositoryError, RoomError, ValueObjectError};
pub use repository::{MessageRepository, PasswordHasher, UserRepository};
pub use value_object::{ConnectionId, RoomId, SessionToken, Username};

#[cfg(test)]
pub use repository::MockMessageRepository;
