//! Utilities shared by the Parlor packages: logging setup and clock helpers.

pub mod logger;
pub mod time;
