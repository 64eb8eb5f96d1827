//! UseCase: Room 一覧取得

use std::sync::Arc;

use crate::{
    domain::{MessageRepository, RoomId},
    room::RoomRegistry,
};

use super::error::GetRoomsError;

/// Room 一覧の 1 件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomListing {
    pub id: RoomId,
    /// 履歴に登場したユーザーの数
    pub user_count: usize,
    /// このプロセスでコーディネーターが起動しているか
    pub active: bool,
}

/// Room 一覧取得のユースケース
pub struct GetRoomsUseCase {
    repository: Arc<dyn MessageRepository>,
    registry: Arc<RoomRegistry>,
}

impl GetRoomsUseCase {
    pub fn new(repository: Arc<dyn MessageRepository>, registry: Arc<RoomRegistry>) -> Self {
        Self {
            repository,
            registry,
        }
    }

    pub async fn execute(&self) -> Result<Vec<RoomListing>, GetRoomsError> {
        let summaries = self.repository.list_rooms().await?;

        let mut rooms = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let active = self.registry.get(&summary.id).await.is_some();
            rooms.push(RoomListing {
                id: summary.id,
                user_count: summary.user_count,
                active,
            });
        }
        Ok(rooms)
    }
}
