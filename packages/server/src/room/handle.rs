//! Cloneable handle used to submit commands to a room coordinator.

use std::sync::Arc;

use parlor_shared::time::Clock;
use tokio::sync::{mpsc, oneshot};

use crate::domain::{ChatEvent, ConnectionId, MessageRepository, RoomError, RoomId, Username};

use super::{coordinator::RoomCoordinator, queue::OutboundSender};

/// A connection asking to join a room
#[derive(Debug)]
pub struct ClientRegistration {
    pub connection_id: ConnectionId,
    pub username: Username,
    /// Sending half of the connection's outbound queue; the coordinator becomes its only owner
    pub queue: OutboundSender,
}

/// Live participant of a room, with the number of connections they hold
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub username: Username,
    pub connections: usize,
}

/// Commands processed, one at a time, by the room's coordinator loop
#[derive(Debug)]
pub enum RoomCommand {
    Register(ClientRegistration),
    Unregister(ConnectionId),
    Broadcast(ChatEvent),
    Participants(oneshot::Sender<Vec<Participant>>),
}

/// Handle to a running room coordinator.
///
/// Cheap to clone; every clone feeds the same inbox, so commands from all
/// connections of a room are linearized.
#[derive(Debug, Clone)]
pub struct RoomHandle {
    room_id: RoomId,
    inbox: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    pub fn room_id(&self) -> &RoomId {
        &self.room_id
    }

    /// Add a connection to the room.
    ///
    /// # Errors
    ///
    /// Returns [`RoomError::Closed`] if the coordinator loop has stopped.
    pub async fn register(&self, registration: ClientRegistration) -> Result<(), RoomError> {
        self.send(RoomCommand::Register(registration)).await
    }

    /// Remove a connection from the room. Removing an unknown connection is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`RoomError::Closed`] if the coordinator loop has stopped.
    pub async fn unregister(&self, connection_id: ConnectionId) -> Result<(), RoomError> {
        self.send(RoomCommand::Unregister(connection_id)).await
    }

    /// Persist an event and fan it out to every registered connection.
    ///
    /// # Errors
    ///
    /// Returns [`RoomError::Closed`] if the coordinator loop has stopped.
    pub async fn broadcast(&self, event: ChatEvent) -> Result<(), RoomError> {
        self.send(RoomCommand::Broadcast(event)).await
    }

    /// Snapshot of the live participants, sorted by username.
    ///
    /// # Errors
    ///
    /// Returns [`RoomError::Closed`] if the coordinator loop has stopped.
    pub async fn participants(&self) -> Result<Vec<Participant>, RoomError> {
        let (reply, response) = oneshot::channel();
        self.send(RoomCommand::Participants(reply)).await?;
        response.await.map_err(|_| self.closed())
    }

    async fn send(&self, command: RoomCommand) -> Result<(), RoomError> {
        self.inbox.send(command).await.map_err(|_| self.closed())
    }

    fn closed(&self) -> RoomError {
        RoomError::Closed(self.room_id.as_str().to_string())
    }
}

/// Start a coordinator task for `room_id` and return its handle.
///
/// The loop runs until every handle is dropped.
pub fn spawn_room(
    room_id: RoomId,
    repository: Arc<dyn MessageRepository>,
    clock: Arc<dyn Clock>,
    inbox_capacity: usize,
) -> RoomHandle {
    let (inbox, commands) = mpsc::channel(inbox_capacity.max(1));
    let coordinator = RoomCoordinator::new(room_id.clone(), commands, repository, clock);
    tokio::spawn(coordinator.run());

    RoomHandle { room_id, inbox }
}
