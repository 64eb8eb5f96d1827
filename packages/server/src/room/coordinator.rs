//! Room coordinator: the single owner of a room's registered connections.
//!
//! All registration, deregistration and broadcast for one room run through
//! [`RoomCoordinator::run`], one command at a time. Nothing else touches the
//! registered set, so no lock guards it.

use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    sync::Arc,
};

use parlor_shared::time::{Clock, timestamp_to_jst_chat_time};
use tokio::sync::{mpsc, oneshot};

use crate::domain::{ChatEvent, ConnectionId, MessageRepository, RoomId, Username};

use super::{
    handle::{ClientRegistration, Participant, RoomCommand},
    queue::{Delivery, Outbound, OutboundSender},
};

struct RegisteredClient {
    username: Username,
    queue: OutboundSender,
}

#[derive(Debug, Clone, Copy)]
enum Removal {
    Unregistered,
    Evicted,
}

pub(crate) struct RoomCoordinator {
    room_id: RoomId,
    clients: HashMap<ConnectionId, RegisteredClient>,
    inbox: mpsc::Receiver<RoomCommand>,
    /// Presence events synthesized by the loop itself, processed before the inbox
    pending: VecDeque<ChatEvent>,
    repository: Arc<dyn MessageRepository>,
    clock: Arc<dyn Clock>,
}

impl RoomCoordinator {
    pub(crate) fn new(
        room_id: RoomId,
        inbox: mpsc::Receiver<RoomCommand>,
        repository: Arc<dyn MessageRepository>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            room_id,
            clients: HashMap::new(),
            inbox,
            pending: VecDeque::new(),
            repository,
            clock,
        }
    }

    pub(crate) async fn run(mut self) {
        tracing::info!("Room '{}' coordinator started", self.room_id);

        if let Err(e) = self.repository.create_room_if_absent(&self.room_id).await {
            tracing::warn!("Failed to create room '{}' in storage: {}", self.room_id, e);
        }

        while let Some(command) = self.next_command().await {
            match command {
                RoomCommand::Register(registration) => self.register(registration).await,
                RoomCommand::Unregister(connection_id) => {
                    self.remove(connection_id, Removal::Unregistered)
                }
                RoomCommand::Broadcast(event) => self.broadcast(event).await,
                RoomCommand::Participants(reply) => self.reply_participants(reply),
            }
        }

        tracing::info!("Room '{}' coordinator stopped", self.room_id);
    }

    async fn next_command(&mut self) -> Option<RoomCommand> {
        if let Some(event) = self.pending.pop_front() {
            return Some(RoomCommand::Broadcast(event));
        }
        self.inbox.recv().await
    }

    async fn register(&mut self, registration: ClientRegistration) {
        let ClientRegistration {
            connection_id,
            username,
            queue,
        } = registration;

        match self.repository.list_messages(&self.room_id).await {
            Ok(history) if history.is_empty() => {}
            Ok(history) => {
                let count = history.len();
                if queue.send_or_evict(Outbound::History(history)) == Delivery::Evict {
                    tracing::warn!(
                        "Connection {} of '{}' closed before history replay, not registering",
                        connection_id,
                        username
                    );
                    return;
                }
                tracing::debug!("Replayed {} events to connection {}", count, connection_id);
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to load history of room '{}' for '{}': {}",
                    self.room_id,
                    username,
                    e
                );
            }
        }

        let first_connection = !self.has_connection_for(&username);
        self.clients.insert(
            connection_id,
            RegisteredClient {
                username: username.clone(),
                queue,
            },
        );
        tracing::info!(
            "Connection {} of '{}' registered in room '{}' ({} connections)",
            connection_id,
            username,
            self.room_id,
            self.clients.len()
        );

        if first_connection {
            let join = ChatEvent::join(username, self.now());
            self.pending.push_back(join);
        }
    }

    /// Drop a connection and close its queue. Idempotent: an absent connection
    /// produces no presence event.
    fn remove(&mut self, connection_id: ConnectionId, reason: Removal) {
        let Some(client) = self.clients.remove(&connection_id) else {
            tracing::debug!(
                "Connection {} already removed from room '{}'",
                connection_id,
                self.room_id
            );
            return;
        };
        let RegisteredClient { username, queue } = client;
        drop(queue);

        tracing::info!(
            "Connection {} of '{}' removed from room '{}' ({:?})",
            connection_id,
            username,
            self.room_id,
            reason
        );

        if !self.has_connection_for(&username) {
            let leave = ChatEvent::leave(username, self.now());
            self.pending.push_back(leave);
        }
    }

    async fn broadcast(&mut self, event: ChatEvent) {
        if let Err(e) = self.repository.append_message(&self.room_id, &event).await {
            tracing::warn!(
                "Failed to store {} event in room '{}': {}",
                event.kind,
                self.room_id,
                e
            );
        }

        let event = Arc::new(event);
        let unresponsive: Vec<ConnectionId> = self
            .clients
            .iter()
            .filter(|(_, client)| {
                client.queue.send_or_evict(Outbound::Event(Arc::clone(&event))) == Delivery::Evict
            })
            .map(|(connection_id, _)| *connection_id)
            .collect();

        for connection_id in unresponsive {
            tracing::warn!(
                "Outbound queue of connection {} is full, dropping it",
                connection_id
            );
            self.remove(connection_id, Removal::Evicted);
        }
    }

    fn reply_participants(&self, reply: oneshot::Sender<Vec<Participant>>) {
        let mut counts: BTreeMap<&Username, usize> = BTreeMap::new();
        for client in self.clients.values() {
            *counts.entry(&client.username).or_default() += 1;
        }
        let participants = counts
            .into_iter()
            .map(|(username, connections)| Participant {
                username: username.clone(),
                connections,
            })
            .collect();

        // The requester may have given up waiting
        let _ = reply.send(participants);
    }

    fn has_connection_for(&self, username: &Username) -> bool {
        self.clients.values().any(|client| &client.username == username)
    }

    fn now(&self) -> String {
        timestamp_to_jst_chat_time(self.clock.now_jst_millis())
    }
}
