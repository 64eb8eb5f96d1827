//! UseCase 層のエラー定義

use thiserror::Error;

use crate::domain::{PasswordError, RepositoryError, RoomError, ValueObjectError};

/// アカウント登録のエラー
#[derive(Debug, Error)]
pub enum SignUpError {
    #[error("Invalid username: {0}")]
    InvalidUsername(#[from] ValueObjectError),

    #[error("Password must not be empty")]
    EmptyPassword,

    #[error("Username '{0}' is already taken")]
    UsernameTaken(String),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Repository(RepositoryError),
}

/// ログインのエラー
#[derive(Debug, Error)]
pub enum LogInError {
    /// ユーザーが存在しない、またはパスワードが一致しない
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// WebSocket 接続開始のエラー
#[derive(Debug, Error)]
pub enum ConnectError {
    /// セッショントークンが無効
    #[error("Session is not valid")]
    Unauthenticated,

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Room 一覧取得のエラー
#[derive(Debug, Error)]
pub enum GetRoomsError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Room 詳細（参加者一覧）取得のエラー
#[derive(Debug, Error)]
pub enum GetRoomDetailError {
    /// このプロセスで Room が起動していない
    #[error("Room '{0}' is not running")]
    NotRunning(String),

    #[error(transparent)]
    Room(#[from] RoomError),
}

/// Room 履歴取得のエラー
#[derive(Debug, Error)]
pub enum GetRoomHistoryError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
