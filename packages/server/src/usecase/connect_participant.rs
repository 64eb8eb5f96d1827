//! UseCase: 参加者接続処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectParticipantUseCase::authenticate() / join_room() メソッド
//! - セッショントークンからのユーザー解決と Room の取得・起動
//!
//! ### なぜこのテストが必要か
//! - 未認証のクライアントが Room に入れないことを保証
//! - 同じ Room ID に対して同じコーディネーターが使われることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：有効なセッションでの接続
//! - 異常系：未知のセッショントークン
//! - 認証だけでは Room が起動しないこと

use std::sync::Arc;

use crate::{
    domain::{RoomId, SessionToken, UserRepository, Username},
    room::{RoomHandle, RoomRegistry},
};

use super::error::ConnectError;

/// 参加者接続のユースケース
pub struct ConnectParticipantUseCase {
    /// Repository（セッション解決）
    users: Arc<dyn UserRepository>,
    /// 起動中の Room 一覧
    registry: Arc<RoomRegistry>,
}

impl ConnectParticipantUseCase {
    pub fn new(users: Arc<dyn UserRepository>, registry: Arc<RoomRegistry>) -> Self {
        Self { users, registry }
    }

    /// セッションのユーザーを返す
    ///
    /// Room には触れません。アップグレードが受理されてから
    /// `join_room` を呼んでください。
    ///
    /// # Returns
    ///
    /// * `Ok(Username)` - 認証成功
    /// * `Err(ConnectError)` - セッションが無効、またはストレージエラー
    pub async fn authenticate(&self, token: &SessionToken) -> Result<Username, ConnectError> {
        let user = self
            .users
            .get_user_by_session(token)
            .await?
            .ok_or(ConnectError::Unauthenticated)?;
        Ok(user.username)
    }

    /// 接続先 Room のハンドルを返す
    ///
    /// Room が起動していなければここで起動します。接続の登録自体は
    /// WebSocket のアップグレード後に `Connection` が行います。
    pub async fn join_room(&self, username: &Username, room_id: &RoomId) -> RoomHandle {
        let room = self.registry.get_or_create(room_id).await;
        tracing::debug!("'{}' is connecting to room '{}'", username, room_id);
        room
    }
}
