//! Domain-level error types.

use thiserror::Error;

/// Validation errors raised by value object constructors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("Room ID must not be empty")]
    RoomIdEmpty,

    #[error("Room ID must be at most {0} characters")]
    RoomIdTooLong(usize),

    #[error("Room ID '{0}' contains whitespace or '/'")]
    RoomIdInvalidCharacter(String),

    #[error("Username must not be empty")]
    UsernameEmpty,

    #[error("Username must not start or end with whitespace")]
    UsernameSurroundingWhitespace,

    #[error("Username must be at most {0} characters")]
    UsernameTooLong(usize),

    #[error("Session token must not be empty")]
    SessionTokenEmpty,

    #[error("Unknown event kind '{0}'")]
    UnknownEventKind(String),
}

/// Errors raised by the persistence gateway
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A unique key (username, session token) already exists
    #[error("{0} already exists")]
    Conflict(String),

    /// Stored data could not be mapped back to the domain
    #[error("Corrupted record: {0}")]
    Corrupted(String),

    /// The storage engine failed
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Errors raised when talking to a room coordinator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    /// The coordinator loop is gone and no longer accepts commands
    #[error("Room '{0}' is no longer running")]
    Closed(String),
}

/// Errors raised by the password hasher
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Password hashing failed: {0}")]
    Hash(String),
}
