//! Infrastructure layer: DTOs, persistence and password hashing.

pub mod dto;
pub mod password;
pub mod repository;
