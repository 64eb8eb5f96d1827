//! UseCase: Room の参加者一覧取得
//!
//! 起動中のコーディネーターに参加者のスナップショットを問い合わせます。
//! 起動していない Room は `NotRunning` になります（ここで起動はしない）。

use std::sync::Arc;

use crate::{
    domain::RoomId,
    room::{Participant, RoomRegistry},
};

use super::error::GetRoomDetailError;

pub struct GetRoomDetailUseCase {
    registry: Arc<RoomRegistry>,
}

impl GetRoomDetailUseCase {
    pub fn new(registry: Arc<RoomRegistry>) -> Self {
        Self { registry }
    }

    pub async fn execute(&self, room_id: &RoomId) -> Result<Vec<Participant>, GetRoomDetailError> {
        let room = self
            .registry
            .get(room_id)
            .await
            .ok_or_else(|| GetRoomDetailError::NotRunning(room_id.as_str().to_string()))?;

        Ok(room.participants().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{ConnectionId, Username},
        infrastructure::repository::InMemoryStore,
        room::{ClientRegistration, outbound_queue, registry::DEFAULT_ROOM_INBOX_CAPACITY},
    };
    use parlor_shared::time::FixedClock;

    fn create_test_registry() -> Arc<RoomRegistry> {
        Arc::new(RoomRegistry::new(
            Arc::new(InMemoryStore::new()),
            Arc::new(FixedClock::new(1672498800000)),
            DEFAULT_ROOM_INBOX_CAPACITY,
        ))
    }

    #[tokio::test]
    async fn test_detail_lists_live_participants() {
        // テスト項目: 起動中の Room の参加者が返される
        // given (前提条件):
        let registry = create_test_registry();
        let room_id = RoomId::new("lobby".to_string()).unwrap();
        let room = registry.get_or_create(&room_id).await;
        let (queue, _rx) = outbound_queue(8);
        room.register(ClientRegistration {
            connection_id: ConnectionId::generate(),
            username: Username::new("alice".to_string()).unwrap(),
            queue,
        })
        .await
        .unwrap();
        let usecase = GetRoomDetailUseCase::new(registry);

        // when (操作):
        let participants = usecase.execute(&room_id).await.unwrap();

        // then (期待する結果):
        assert_eq!(participants.len(), 1);
        assert_eq!(participants[0].username.as_str(), "alice");
        assert_eq!(participants[0].connections, 1);
    }

    #[tokio::test]
    async fn test_detail_of_idle_room_is_not_running() {
        // テスト項目: 起動していない Room は NotRunning となり、起動もされない
        // given (前提条件):
        let registry = create_test_registry();
        let usecase = GetRoomDetailUseCase::new(registry.clone());

        // when (操作):
        let result = usecase
            .execute(&RoomId::new("ghost".to_string()).unwrap())
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(GetRoomDetailError::NotRunning(id)) if id == "ghost"));
        assert_eq!(registry.active_room_count().await, 0);
    }
}
