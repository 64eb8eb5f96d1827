//! UseCase: Room 履歴取得

use std::sync::Arc;

use crate::domain::{ChatEvent, MessageRepository, RoomId};

use super::error::GetRoomHistoryError;

pub struct GetRoomHistoryUseCase {
    repository: Arc<dyn MessageRepository>,
}

impl GetRoomHistoryUseCase {
    pub fn new(repository: Arc<dyn MessageRepository>) -> Self {
        Self { repository }
    }

    /// 保存順（古い順）の履歴を返す。未知の Room は空
    pub async fn execute(&self, room_id: &RoomId) -> Result<Vec<ChatEvent>, GetRoomHistoryError> {
        Ok(self.repository.list_messages(room_id).await?)
    }
}
