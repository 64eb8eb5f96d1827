//! SQLite Store 実装
//!
//! `sqlx` の SQLite ドライバで `MessageRepository` / `UserRepository` を実装します。
//!
//! ## スキーマ
//!
//! ```text
//! users    (username PK, hashed_password)
//! sessions (token PK, username → users)
//! rooms    (id PK)
//! messages (id AUTOINCREMENT, room_id → rooms, kind, username NULL, content, timestamp)
//! ```
//!
//! `messages.id` が履歴再生時の `sequence`（rowid）になります。

use std::{str::FromStr, time::Duration};

use async_trait::async_trait;
use sqlx::{
    Row, SqlitePool,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow},
};

use crate::domain::{
    ChatEvent, EventKind, MessageRepository, RepositoryError, RoomId, RoomSummary, SessionToken,
    User, UserRepository, Username,
};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: [&str; 4] = [
    "CREATE TABLE IF NOT EXISTS users (
        username TEXT PRIMARY KEY,
        hashed_password TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS sessions (
        token TEXT PRIMARY KEY,
        username TEXT NOT NULL,
        FOREIGN KEY (username) REFERENCES users(username)
    )",
    "CREATE TABLE IF NOT EXISTS rooms (
        id TEXT PRIMARY KEY
    )",
    "CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        room_id TEXT NOT NULL,
        kind TEXT NOT NULL DEFAULT 'message',
        username TEXT,
        content TEXT NOT NULL,
        timestamp TEXT NOT NULL,
        FOREIGN KEY (room_id) REFERENCES rooms(id)
    )",
];

/// SQLite ストア
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// `url` のデータベースに接続し、テーブルを作成する
    ///
    /// `sqlite::memory:` のようなインメモリ DB では接続を一本に固定します
    /// （接続ごとに別の DB になるため）。
    pub async fn connect(url: &str) -> Result<Self, RepositoryError> {
        let in_memory = url.contains(":memory:") || url.contains("mode=memory");

        let mut options = SqliteConnectOptions::from_str(url)
            .map_err(storage_error)?
            .create_if_missing(true)
            .busy_timeout(BUSY_TIMEOUT)
            .foreign_keys(true);
        if !in_memory {
            options = options.journal_mode(SqliteJournalMode::Wal);
        }

        let pool_options = if in_memory {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None::<Duration>)
                .max_lifetime(None::<Duration>)
        } else {
            SqlitePoolOptions::new().max_connections(4)
        };
        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(storage_error)?;

        let store = Self { pool };
        store.migrate().await?;
        tracing::info!("SQLite store ready at {}", url);
        Ok(store)
    }

    async fn migrate(&self) -> Result<(), RepositoryError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(storage_error)?;
        }
        Ok(())
    }
}

fn storage_error(err: sqlx::Error) -> RepositoryError {
    RepositoryError::Storage(err.to_string())
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db_err| db_err.is_unique_violation())
        .unwrap_or(false)
}

fn event_from_row(row: &SqliteRow) -> Result<ChatEvent, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(storage_error)?;
    let kind: String = row.try_get("kind").map_err(storage_error)?;
    let username: Option<String> = row.try_get("username").map_err(storage_error)?;
    let content: String = row.try_get("content").map_err(storage_error)?;
    let timestamp: String = row.try_get("timestamp").map_err(storage_error)?;

    let kind =
        EventKind::from_str(&kind).map_err(|e| RepositoryError::Corrupted(e.to_string()))?;
    let author = username
        .map(Username::new)
        .transpose()
        .map_err(|e| RepositoryError::Corrupted(e.to_string()))?;

    Ok(ChatEvent {
        kind,
        content,
        author,
        timestamp,
        sequence: Some(id.to_string()),
    })
}

#[async_trait]
impl MessageRepository for SqliteStore {
    async fn create_room_if_absent(&self, room_id: &RoomId) -> Result<(), RepositoryError> {
        sqlx::query("INSERT OR IGNORE INTO rooms (id) VALUES (?)")
            .bind(room_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(storage_error)?;
        Ok(())
    }

    async fn append_message(
        &self,
        room_id: &RoomId,
        event: &ChatEvent,
    ) -> Result<(), RepositoryError> {
        // rooms 行が無いと外部キー制約で失敗するため、先に作成しておく
        self.create_room_if_absent(room_id).await?;
        sqlx::query(
            "INSERT INTO messages (room_id, kind, username, content, timestamp) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(room_id.as_str())
        .bind(event.kind.as_str())
        .bind(event.author.as_ref().map(|u| u.as_str()))
        .bind(&event.content)
        .bind(&event.timestamp)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(())
    }

    async fn list_messages(&self, room_id: &RoomId) -> Result<Vec<ChatEvent>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, kind, username, content, timestamp FROM messages WHERE room_id = ? ORDER BY id",
        )
        .bind(room_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.iter().map(event_from_row).collect()
    }

    async fn list_rooms(&self) -> Result<Vec<RoomSummary>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT r.id AS id, COUNT(DISTINCT m.username) AS user_count
             FROM rooms r
             LEFT JOIN messages m ON r.id = m.room_id
             GROUP BY r.id
             ORDER BY r.id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage_error)?;

        rows.iter()
            .map(|row| {
                let id: String = row.try_get("id").map_err(storage_error)?;
                let user_count: i64 = row.try_get("user_count").map_err(storage_error)?;
                Ok(RoomSummary {
                    id: RoomId::new(id).map_err(|e| RepositoryError::Corrupted(e.to_string()))?,
                    user_count: user_count.max(0) as usize,
                })
            })
            .collect()
    }
}

#[async_trait]
impl UserRepository for SqliteStore {
    async fn get_user(&self, username: &Username) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query("SELECT username, hashed_password FROM users WHERE username = ?")
            .bind(username.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;

        row.map(|row| user_from_row(&row)).transpose()
    }

    async fn create_user(&self, user: &User) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO users (username, hashed_password) VALUES (?, ?)")
            .bind(user.username.as_str())
            .bind(&user.hashed_password)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    RepositoryError::Conflict(format!("User '{}'", user.username))
                } else {
                    storage_error(e)
                }
            })?;
        Ok(())
    }

    async fn create_session(
        &self,
        token: &SessionToken,
        username: &Username,
    ) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO sessions (token, username) VALUES (?, ?)")
            .bind(token.as_str())
            .bind(username.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    RepositoryError::Conflict("Session token".to_string())
                } else {
                    storage_error(e)
                }
            })?;
        Ok(())
    }

    async fn get_user_by_session(
        &self,
        token: &SessionToken,
    ) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query(
            "SELECT u.username AS username, u.hashed_password AS hashed_password
             FROM sessions s
             JOIN users u ON u.username = s.username
             WHERE s.token = ?",
        )
        .bind(token.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_error)?;

        row.map(|row| user_from_row(&row)).transpose()
    }
}

fn user_from_row(row: &SqliteRow) -> Result<User, RepositoryError> {
    let username: String = row.try_get("username").map_err(storage_error)?;
    let hashed_password: String = row.try_get("hashed_password").map_err(storage_error)?;
    Ok(User {
        username: Username::new(username).map_err(|e| RepositoryError::Corrupted(e.to_string()))?,
        hashed_password,
    })
}
