//! Repository 実装
//!
//! - `inmemory`: HashMap ベースの実装（テスト・永続化なしの起動用）
//! - `sqlite`: sqlx による SQLite 実装

pub mod inmemory;
pub mod sqlite;

pub use inmemory::InMemoryStore;
pub use sqlite::SqliteStore;
