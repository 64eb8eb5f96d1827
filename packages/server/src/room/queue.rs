//! Bounded outbound queue between a room coordinator and one connection's
//! write pump.
//!
//! The coordinator is the only holder of the [`OutboundSender`]. Dropping it
//! closes the queue, which is the signal for the write pump to drain, send a
//! close frame and exit.

use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};

use crate::domain::ChatEvent;

/// One item queued for a connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// A live event accepted by the room
    Event(Arc<ChatEvent>),
    /// The persisted history replayed on registration, oldest first.
    ///
    /// Sent as a single item so a long history never overflows the queue of a
    /// connection that has not started draining yet.
    History(Vec<ChatEvent>),
}

/// Result of [`OutboundSender::send_or_evict`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// The queue was full or the write pump is gone; the connection must be dropped
    Evict,
}

/// Sending half, owned by the room coordinator
#[derive(Debug)]
pub struct OutboundSender {
    tx: mpsc::Sender<Outbound>,
}

impl OutboundSender {
    /// Enqueue without waiting.
    ///
    /// A full queue means the peer is not keeping up; the caller evicts it
    /// instead of stalling the room.
    pub fn send_or_evict(&self, item: Outbound) -> Delivery {
        match self.tx.try_send(item) {
            Ok(()) => Delivery::Delivered,
            Err(TrySendError::Full(_)) | Err(TrySendError::Closed(_)) => Delivery::Evict,
        }
    }
}

/// Receiving half, owned by the write pump
#[derive(Debug)]
pub struct OutboundReceiver {
    rx: mpsc::Receiver<Outbound>,
}

impl OutboundReceiver {
    /// Next queued item, or `None` once the coordinator closed the queue and
    /// every item has been drained.
    pub async fn recv(&mut self) -> Option<Outbound> {
        self.rx.recv().await
    }
}

/// Create a queue holding at most `capacity` items.
///
/// A zero capacity is raised to one (tokio channels need at least one slot).
pub fn outbound_queue(capacity: usize) -> (OutboundSender, OutboundReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (OutboundSender { tx }, OutboundReceiver { rx })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Username;

    fn event(content: &str) -> Outbound {
        Outbound::Event(Arc::new(ChatEvent::message(
            Username::new("alice".to_string()).unwrap(),
            content.to_string(),
            "Monday 3:04PM".to_string(),
        )))
    }

    #[tokio::test]
    async fn test_send_or_evict_delivers_until_full() {
        // テスト項目: 容量まではキューに入り、超えると Evict が返される
        // given (前提条件):
        let (sender, mut receiver) = outbound_queue(2);

        // when (操作):
        let first = sender.send_or_evict(event("1"));
        let second = sender.send_or_evict(event("2"));
        let third = sender.send_or_evict(event("3"));

        // then (期待する結果):
        assert_eq!(first, Delivery::Delivered);
        assert_eq!(second, Delivery::Delivered);
        assert_eq!(third, Delivery::Evict);
        assert_eq!(receiver.recv().await, Some(event("1")));
        assert_eq!(receiver.recv().await, Some(event("2")));
    }

    #[tokio::test]
    async fn test_send_or_evict_when_receiver_dropped() {
        // テスト項目: write pump 側が終了しているキューへの送信は Evict になる
        // given (前提条件):
        let (sender, receiver) = outbound_queue(4);
        drop(receiver);

        // when (操作):
        let result = sender.send_or_evict(event("late"));

        // then (期待する結果):
        assert_eq!(result, Delivery::Evict);
    }

    #[tokio::test]
    async fn test_receiver_drains_then_ends_after_sender_dropped() {
        // テスト項目: 送信側を破棄すると、残りを受信した後に None が返される
        // given (前提条件):
        let (sender, mut receiver) = outbound_queue(4);
        sender.send_or_evict(event("last"));

        // when (操作):
        drop(sender);

        // then (期待する結果):
        assert_eq!(receiver.recv().await, Some(event("last")));
        assert_eq!(receiver.recv().await, None);
    }
}
