//! InMemory Store 実装
//!
//! ドメイン層が定義する `MessageRepository` / `UserRepository` trait の
//! インメモリ実装。テストおよび `--database` を指定しない起動で使用します。
//!
//! 行番号（`sequence`）は SQLite の rowid と同様に、ストア全体で単調増加する
//! カウンタから払い出します。

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    ChatEvent, MessageRepository, RepositoryError, RoomId, RoomSummary, SessionToken, User,
    UserRepository, Username,
};

#[derive(Default)]
struct State {
    users: HashMap<String, User>,
    /// token → username
    sessions: HashMap<String, Username>,
    /// room id → 保存済みイベント（rowid 付き）
    rooms: BTreeMap<String, Vec<(i64, ChatEvent)>>,
    last_row_id: i64,
}

/// インメモリストア
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    /// 空のストアを作成
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageRepository for InMemoryStore {
    async fn create_room_if_absent(&self, room_id: &RoomId) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        state.rooms.entry(room_id.as_str().to_string()).or_default();
        Ok(())
    }

    async fn append_message(
        &self,
        room_id: &RoomId,
        event: &ChatEvent,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        state.last_row_id += 1;
        let row_id = state.last_row_id;
        let mut stored = event.clone();
        stored.sequence = None;
        state
            .rooms
            .entry(room_id.as_str().to_string())
            .or_default()
            .push((row_id, stored));
        Ok(())
    }

    async fn list_messages(&self, room_id: &RoomId) -> Result<Vec<ChatEvent>, RepositoryError> {
        let state = self.state.lock().await;
        let events = state
            .rooms
            .get(room_id.as_str())
            .map(|rows| {
                rows.iter()
                    .map(|(row_id, event)| event.clone().with_sequence(row_id.to_string()))
                    .collect()
            })
            .unwrap_or_default();
        Ok(events)
    }

    async fn list_rooms(&self) -> Result<Vec<RoomSummary>, RepositoryError> {
        let state = self.state.lock().await;
        state
            .rooms
            .iter()
            .map(|(id, rows)| {
                let authors: BTreeSet<&str> = rows
                    .iter()
                    .filter_map(|(_, event)| event.author.as_ref().map(|u| u.as_str()))
                    .collect();
                let id = RoomId::new(id.clone())
                    .map_err(|e| RepositoryError::Corrupted(e.to_string()))?;
                Ok(RoomSummary {
                    id,
                    user_count: authors.len(),
                })
            })
            .collect()
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn get_user(&self, username: &Username) -> Result<Option<User>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state.users.get(username.as_str()).cloned())
    }

    async fn create_user(&self, user: &User) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        let key = user.username.as_str().to_string();
        if state.users.contains_key(&key) {
            return Err(RepositoryError::Conflict(format!("User '{}'", key)));
        }
        state.users.insert(key, user.clone());
        Ok(())
    }

    async fn create_session(
        &self,
        token: &SessionToken,
        username: &Username,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        if state.sessions.contains_key(token.as_str()) {
            return Err(RepositoryError::Conflict("Session token".to_string()));
        }
        state
            .sessions
            .insert(token.as_str().to_string(), username.clone());
        Ok(())
    }

    async fn get_user_by_session(
        &self,
        token: &SessionToken,
    ) -> Result<Option<User>, RepositoryError> {
        let state = self.state.lock().await;
        Ok(state
            .sessions
            .get(token.as_str())
            .and_then(|username| state.users.get(username.as_str()))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - イベントの追加と保存順での取得、rowid の払い出し
    // - Room 一覧の作成者数カウント
    // - ユーザー作成時の重複検出とセッション解決
    //
    // 【なぜこのテストが必要か】
    // - Room コーディネーターと UseCase のテストがこの実装に依存している
    // ========================================

    fn room(name: &str) -> RoomId {
        RoomId::new(name.to_string()).unwrap()
    }

    fn user(name: &str) -> Username {
        Username::new(name.to_string()).unwrap()
    }

    #[tokio::test]
    async fn test_list_messages_in_append_order_with_row_ids() {
        // テスト項目: 追加順で取得でき、rowid が単調増加する
        // given (前提条件):
        let store = InMemoryStore::new();
        let r1 = room("r1");
        store.create_room_if_absent(&r1).await.unwrap();

        // when (操作):
        store
            .append_message(&r1, &ChatEvent::join(user("alice"), "t".to_string()))
            .await
            .unwrap();
        store
            .append_message(
                &r1,
                &ChatEvent::message(user("alice"), "hi".to_string(), "t".to_string()),
            )
            .await
            .unwrap();
        let events = store.list_messages(&r1).await.unwrap();

        // then (期待する結果):
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].content, "has joined the chat");
        assert_eq!(events[1].content, "hi");
        let first: i64 = events[0].sequence.as_deref().unwrap().parse().unwrap();
        let second: i64 = events[1].sequence.as_deref().unwrap().parse().unwrap();
        assert!(first < second);
    }

    #[tokio::test]
    async fn test_unknown_room_has_empty_history() {
        // テスト項目: 存在しない Room の履歴は空
        // given (前提条件):
        let store = InMemoryStore::new();

        // when (操作):
        let events = store.list_messages(&room("nowhere")).await.unwrap();

        // then (期待する結果):
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_list_rooms_counts_distinct_authors() {
        // テスト項目: Room 一覧が履歴中の作成者の種類数を返す
        // given (前提条件):
        let store = InMemoryStore::new();
        let busy = room("busy");
        store.create_room_if_absent(&room("empty")).await.unwrap();
        store.create_room_if_absent(&busy).await.unwrap();
        for name in ["alice", "bob", "alice"] {
            store
                .append_message(
                    &busy,
                    &ChatEvent::message(user(name), "x".to_string(), "t".to_string()),
                )
                .await
                .unwrap();
        }

        // when (操作):
        let rooms = store.list_rooms().await.unwrap();

        // then (期待する結果):
        assert_eq!(
            rooms,
            vec![
                RoomSummary {
                    id: busy,
                    user_count: 2
                },
                RoomSummary {
                    id: room("empty"),
                    user_count: 0
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_create_user_rejects_duplicate() {
        // テスト項目: 同じユーザー名での二重登録は Conflict になる
        // given (前提条件):
        let store = InMemoryStore::new();
        let alice = User {
            username: user("alice"),
            hashed_password: "hash".to_string(),
        };
        store.create_user(&alice).await.unwrap();

        // when (操作):
        let result = store.create_user(&alice).await;

        // then (期待する結果):
        assert!(matches!(result, Err(RepositoryError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_session_resolves_to_user() {
        // テスト項目: セッショントークンからユーザーを取得できる
        // given (前提条件):
        let store = InMemoryStore::new();
        let alice = User {
            username: user("alice"),
            hashed_password: "hash".to_string(),
        };
        store.create_user(&alice).await.unwrap();
        let token = SessionToken::generate();
        store.create_session(&token, &alice.username).await.unwrap();

        // when (操作):
        let found = store.get_user_by_session(&token).await.unwrap();
        let missing = store
            .get_user_by_session(&SessionToken::generate())
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(found, Some(alice));
        assert_eq!(missing, None);
    }
}
