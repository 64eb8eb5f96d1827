//! Room registry: lazily starts one coordinator per room id.

use std::{collections::HashMap, sync::Arc};

use parlor_shared::time::Clock;
use tokio::sync::Mutex;

use crate::domain::{MessageRepository, RoomId};

use super::handle::{RoomHandle, spawn_room};

/// Default capacity of a room's command inbox
pub const DEFAULT_ROOM_INBOX_CAPACITY: usize = 256;

/// Process-wide map of running rooms.
///
/// Rooms are never removed; an idle room is just a parked task.
pub struct RoomRegistry {
    rooms: Mutex<HashMap<RoomId, RoomHandle>>,
    repository: Arc<dyn MessageRepository>,
    clock: Arc<dyn Clock>,
    inbox_capacity: usize,
}

impl RoomRegistry {
    pub fn new(
        repository: Arc<dyn MessageRepository>,
        clock: Arc<dyn Clock>,
        inbox_capacity: usize,
    ) -> Self {
        Self {
            rooms: Mutex::new(HashMap::new()),
            repository,
            clock,
            inbox_capacity,
        }
    }

    /// Return the handle of `room_id`, starting its coordinator on first use.
    ///
    /// The lock only covers the lookup-or-insert; storage work for a new room
    /// happens inside the spawned coordinator.
    pub async fn get_or_create(&self, room_id: &RoomId) -> RoomHandle {
        let mut rooms = self.rooms.lock().await;
        if let Some(handle) = rooms.get(room_id) {
            return handle.clone();
        }

        let handle = spawn_room(
            room_id.clone(),
            Arc::clone(&self.repository),
            Arc::clone(&self.clock),
            self.inbox_capacity,
        );
        rooms.insert(room_id.clone(), handle.clone());
        tracing::info!("Room '{}' created ({} active rooms)", room_id, rooms.len());

        handle
    }

    /// Handle of an already running room, if any
    pub async fn get(&self, room_id: &RoomId) -> Option<RoomHandle> {
        self.rooms.lock().await.get(room_id).cloned()
    }

    pub async fn active_room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }
}
