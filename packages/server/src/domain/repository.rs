//! Repository trait 定義
//!
//! ドメイン層が必要とするデータアクセスのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;

use super::{ChatEvent, RepositoryError, RoomId, RoomSummary, SessionToken, User, Username};

/// Message Repository trait (persistence gateway of the room coordinator)
///
/// Every method is fallible. The coordinator logs failures and keeps running;
/// a failed append never blocks or drops the live broadcast.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Room を作成（既に存在する場合は何もしない）
    async fn create_room_if_absent(&self, room_id: &RoomId) -> Result<(), RepositoryError>;

    /// イベントを Room の履歴に追加
    async fn append_message(
        &self,
        room_id: &RoomId,
        event: &ChatEvent,
    ) -> Result<(), RepositoryError>;

    /// Room の履歴を保存順（古い順）で取得
    async fn list_messages(&self, room_id: &RoomId) -> Result<Vec<ChatEvent>, RepositoryError>;

    /// 全 Room の一覧を取得
    async fn list_rooms(&self) -> Result<Vec<RoomSummary>, RepositoryError>;
}

/// User Repository trait (accounts and sessions)
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// ユーザーを取得（存在しない場合は `None`）
    async fn get_user(&self, username: &Username) -> Result<Option<User>, RepositoryError>;

    /// ユーザーを作成（既に存在する場合は `RepositoryError::Conflict`）
    async fn create_user(&self, user: &User) -> Result<(), RepositoryError>;

    /// セッションを作成
    async fn create_session(
        &self,
        token: &SessionToken,
        username: &Username,
    ) -> Result<(), RepositoryError>;

    /// セッショントークンからユーザーを取得（無効なトークンは `None`）
    async fn get_user_by_session(
        &self,
        token: &SessionToken,
    ) -> Result<Option<User>, RepositoryError>;
}

/// Password hashing service
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    /// Hash a plain-text password
    async fn hash(&self, password: &str) -> Result<String, super::PasswordError>;

    /// Check a plain-text password against a stored hash
    async fn verify(&self, password: &str, hashed: &str) -> bool;
}
