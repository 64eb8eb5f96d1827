//! Connection pump pair: bridges one WebSocket to its room coordinator.
//!
//! The read pump is the only reader of the transport and the write pump the
//! only writer. The coordinator never touches the socket; it only sees the
//! connection's outbound queue.

use std::{fmt::Display, sync::Arc, time::Duration};

use axum::{body::Bytes, extract::ws::Message};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use parlor_shared::time::{Clock, timestamp_to_jst_chat_time};
use thiserror::Error;
use tokio::time::{Instant, MissedTickBehavior, interval_at, timeout, timeout_at};

use crate::{
    domain::{ChatEvent, ConnectionId, RoomError, Username},
    infrastructure::dto::websocket::ChatEventDto,
};

use super::{
    handle::{ClientRegistration, RoomHandle},
    queue::{Outbound, OutboundReceiver, outbound_queue},
};

/// Time allowed to write a frame to the peer
pub const WRITE_WAIT: Duration = Duration::from_secs(10);

/// Time allowed between two pongs from the peer
pub const PONG_WAIT: Duration = Duration::from_secs(60);

/// Maximum inbound frame size in bytes
pub const MAX_MESSAGE_SIZE: usize = 512;

/// Default capacity of a connection's outbound queue
pub const DEFAULT_SEND_QUEUE_CAPACITY: usize = 256;

/// Timing and sizing of the pump pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PumpConfig {
    pub write_wait: Duration,
    pub pong_wait: Duration,
    /// Must stay below `pong_wait` so a healthy peer always answers in time
    pub ping_period: Duration,
    pub max_message_size: usize,
    pub send_queue_capacity: usize,
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            write_wait: WRITE_WAIT,
            pong_wait: PONG_WAIT,
            ping_period: PONG_WAIT * 9 / 10,
            max_message_size: MAX_MESSAGE_SIZE,
            send_queue_capacity: DEFAULT_SEND_QUEUE_CAPACITY,
        }
    }
}

impl PumpConfig {
    /// Set the read deadline; the ping period follows at 9/10 of it.
    pub fn with_pong_wait(mut self, pong_wait: Duration) -> Self {
        self.pong_wait = pong_wait;
        self.ping_period = pong_wait * 9 / 10;
        self
    }

    pub fn with_max_message_size(mut self, max_message_size: usize) -> Self {
        self.max_message_size = max_message_size;
        self
    }

    pub fn with_send_queue_capacity(mut self, send_queue_capacity: usize) -> Self {
        self.send_queue_capacity = send_queue_capacity;
        self
    }
}

/// Why the read pump stopped
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("no pong received within {0:?}")]
    DeadlineExpired(Duration),

    #[error("frame of {size} bytes exceeds the {limit} byte limit")]
    FrameTooLarge { size: usize, limit: usize },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("transport closed without a close frame")]
    Disconnected,

    #[error(transparent)]
    Room(#[from] RoomError),
}

/// Why the write pump stopped
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("write timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

/// One authenticated user's session in one room
pub struct Connection {
    id: ConnectionId,
    username: Username,
    room: RoomHandle,
    clock: Arc<dyn Clock>,
    config: PumpConfig,
}

impl Connection {
    pub fn new(
        username: Username,
        room: RoomHandle,
        clock: Arc<dyn Clock>,
        config: PumpConfig,
    ) -> Self {
        Self {
            id: ConnectionId::generate(),
            username,
            room,
            clock,
            config,
        }
    }

    /// Run both pumps until the connection ends, then unregister it.
    ///
    /// The write pump runs on its own task. The read pump runs here and stops
    /// on a close frame, a read error, an expired deadline, an oversize frame,
    /// or when the write pump has given up on the transport.
    pub async fn serve<S, K>(self, stream: S, sink: K)
    where
        S: Stream<Item = Result<Message, axum::Error>> + Unpin,
        K: Sink<Message> + Unpin + Send + 'static,
        K::Error: Display,
    {
        let (queue, outbound) = outbound_queue(self.config.send_queue_capacity);
        let mut writer = tokio::spawn(write_pump(sink, outbound, self.config.clone()));

        let registration = ClientRegistration {
            connection_id: self.id,
            username: self.username.clone(),
            queue,
        };
        if let Err(e) = self.room.register(registration).await {
            tracing::warn!("Could not register '{}': {}", self.username, e);
            return;
        }

        tokio::select! {
            result = self.read_pump(stream) => match result {
                Ok(()) => tracing::info!("'{}' closed connection {}", self.username, self.id),
                Err(e) => tracing::info!(
                    "Connection {} of '{}' stopped reading: {}",
                    self.id,
                    self.username,
                    e
                ),
            },
            result = &mut writer => match result {
                Ok(Ok(())) => tracing::debug!("Write pump of connection {} finished", self.id),
                Ok(Err(e)) => tracing::warn!("Write pump of connection {} failed: {}", self.id, e),
                Err(e) => tracing::error!("Write pump of connection {} panicked: {}", self.id, e),
            },
        }

        if let Err(e) = self.room.unregister(self.id).await {
            tracing::warn!("Could not unregister connection {}: {}", self.id, e);
        }
    }

    async fn read_pump<S>(&self, mut stream: S) -> Result<(), ReadError>
    where
        S: Stream<Item = Result<Message, axum::Error>> + Unpin,
    {
        let mut deadline = Instant::now() + self.config.pong_wait;

        loop {
            let frame = match timeout_at(deadline, stream.next()).await {
                Err(_) => return Err(ReadError::DeadlineExpired(self.config.pong_wait)),
                Ok(None) => return Err(ReadError::Disconnected),
                Ok(Some(Err(e))) => return Err(ReadError::Transport(e.to_string())),
                Ok(Some(Ok(frame))) => frame,
            };

            match frame {
                Message::Text(text) => {
                    self.check_size(text.as_str().len())?;
                    let event = ChatEvent::message(
                        self.username.clone(),
                        text.as_str().to_owned(),
                        timestamp_to_jst_chat_time(self.clock.now_jst_millis()),
                    );
                    self.room.broadcast(event).await?;
                }
                Message::Binary(data) => {
                    self.check_size(data.len())?;
                    tracing::debug!("Ignoring binary frame of {} bytes", data.len());
                }
                Message::Pong(_) => {
                    deadline = Instant::now() + self.config.pong_wait;
                }
                // axum answers pings on its own
                Message::Ping(_) => {}
                Message::Close(_) => return Ok(()),
            }
        }
    }

    fn check_size(&self, size: usize) -> Result<(), ReadError> {
        if size > self.config.max_message_size {
            return Err(ReadError::FrameTooLarge {
                size,
                limit: self.config.max_message_size,
            });
        }
        Ok(())
    }
}

async fn write_pump<K>(
    mut sink: K,
    mut outbound: OutboundReceiver,
    config: PumpConfig,
) -> Result<(), WriteError>
where
    K: Sink<Message> + Unpin,
    K::Error: Display,
{
    let mut ticker = interval_at(Instant::now() + config.ping_period, config.ping_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            item = outbound.recv() => match item {
                Some(Outbound::Event(event)) => {
                    write_frame(&mut sink, encode(&event)?, config.write_wait).await?;
                }
                Some(Outbound::History(events)) => {
                    for event in &events {
                        write_frame(&mut sink, encode(event)?, config.write_wait).await?;
                    }
                }
                None => {
                    // The room closed the queue
                    write_frame(&mut sink, Message::Close(None), config.write_wait).await?;
                    let _ = timeout(config.write_wait, sink.close()).await;
                    return Ok(());
                }
            },
            _ = ticker.tick() => {
                write_frame(&mut sink, Message::Ping(Bytes::new()), config.write_wait).await?;
            }
        }
    }
}

async fn write_frame<K>(sink: &mut K, frame: Message, wait: Duration) -> Result<(), WriteError>
where
    K: Sink<Message> + Unpin,
    K::Error: Display,
{
    match timeout(wait, sink.send(frame)).await {
        Err(_) => Err(WriteError::Timeout(wait)),
        Ok(Err(e)) => Err(WriteError::Transport(e.to_string())),
        Ok(Ok(())) => Ok(()),
    }
}

fn encode(event: &ChatEvent) -> Result<Message, WriteError> {
    let json = serde_json::to_string(&ChatEventDto::from(event))?;
    Ok(Message::Text(json.into()))
}

#[cfg(test)]
mod tests {
    use futures_channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
    use parlor_shared::time::FixedClock;

    use super::*;
    use crate::{
        domain::RoomId,
        infrastructure::{dto::websocket::MessageType, repository::InMemoryStore},
        room::handle::spawn_room,
    };

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - read pump: テキストの転送、close / 期限切れ / サイズ超過での終了
    // - write pump: イベントの JSON 送信、ping 送信、キュー終了時の close
    //
    // 【どのようなシナリオをテストするか】
    // - WebSocket の代わりに futures の mpsc チャンネルを transport として使う
    // - 時間に依存するテストは tokio の一時停止クロックで実行する
    // ========================================

    type Inbound = UnboundedSender<Result<Message, axum::Error>>;

    const WAIT: Duration = Duration::from_secs(300);

    fn user(name: &str) -> Username {
        Username::new(name.to_string()).unwrap()
    }

    fn start_room() -> RoomHandle {
        spawn_room(
            RoomId::new("pumps".to_string()).unwrap(),
            Arc::new(InMemoryStore::new()),
            Arc::new(FixedClock::new(1672498800000)),
            16,
        )
    }

    /// Registers a bare queue as an observer and consumes its own join event
    async fn observe(room: &RoomHandle) -> OutboundReceiver {
        let (queue, mut receiver) = outbound_queue(64);
        room.register(ClientRegistration {
            connection_id: ConnectionId::generate(),
            username: user("observer"),
            queue,
        })
        .await
        .unwrap();
        let join = next_event(&mut receiver).await;
        assert_eq!(join.author, Some(user("observer")));
        receiver
    }

    async fn next_event(receiver: &mut OutboundReceiver) -> Arc<ChatEvent> {
        match timeout(WAIT, receiver.recv()).await.unwrap() {
            Some(Outbound::Event(event)) => event,
            other => panic!("expected a live event, got {:?}", other),
        }
    }

    /// Starts alice's pumps over in-memory channels
    fn connect_alice(
        room: &RoomHandle,
        config: PumpConfig,
    ) -> (Inbound, UnboundedReceiver<Message>) {
        let (inbound_tx, inbound_rx) = mpsc::unbounded();
        let (outbound_tx, outbound_rx) = mpsc::unbounded();
        let connection = Connection::new(
            user("alice"),
            room.clone(),
            Arc::new(FixedClock::new(1672498800000)),
            config,
        );
        tokio::spawn(connection.serve(inbound_rx, outbound_tx));
        (inbound_tx, outbound_rx)
    }

    async fn next_frame(frames: &mut UnboundedReceiver<Message>) -> Message {
        timeout(WAIT, frames.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("transport sink dropped")
    }

    fn decode(frame: Message) -> ChatEventDto {
        match frame {
            Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
            other => panic!("expected a text frame, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_text_frame_is_broadcast_as_message() {
        // テスト項目: 受信したテキストが送信者名付きの message としてルームに配信される
        // given (前提条件):
        let room = start_room();
        let mut observer = observe(&room).await;
        let (inbound, mut frames) = connect_alice(&room, PumpConfig::default());
        assert_eq!(next_event(&mut observer).await.author, Some(user("alice")));

        // when (操作):
        inbound.unbounded_send(Ok(Message::Text("hi".into()))).unwrap();

        // then (期待する結果):
        let message = next_event(&mut observer).await;
        assert_eq!(message.content, "hi");
        assert_eq!(message.author, Some(user("alice")));
        assert_eq!(message.timestamp, "Sunday 12:00AM");

        // alice also receives history, her own join, and her message
        let history = decode(next_frame(&mut frames).await);
        assert_eq!(history.r#type, MessageType::Join);
        assert_eq!(history.user.as_deref(), Some("observer"));
        assert!(history.rowid.is_some());
        let join = decode(next_frame(&mut frames).await);
        assert_eq!(join.r#type, MessageType::Join);
        assert_eq!(join.user.as_deref(), Some("alice"));
        let echoed = decode(next_frame(&mut frames).await);
        assert_eq!(echoed.r#type, MessageType::Message);
        assert_eq!(echoed.content, "hi");
    }

    #[tokio::test]
    async fn test_close_frame_unregisters_and_closes_transport() {
        // テスト項目: close フレームで leave が配信され、送信側は close フレームを書いて終了する
        // given (前提条件):
        let room = start_room();
        let mut observer = observe(&room).await;
        let (inbound, mut frames) = connect_alice(&room, PumpConfig::default());
        next_event(&mut observer).await;

        // when (操作):
        inbound.unbounded_send(Ok(Message::Close(None))).unwrap();

        // then (期待する結果):
        let leave = next_event(&mut observer).await;
        assert_eq!(leave.content, "has left the chat");
        assert_eq!(leave.author, Some(user("alice")));
        let mut last = next_frame(&mut frames).await;
        while let Message::Text(_) = last {
            last = next_frame(&mut frames).await;
        }
        assert!(matches!(last, Message::Close(None)));
        assert!(timeout(WAIT, frames.next()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_oversize_frame_disconnects() {
        // テスト項目: 上限を超えるフレームを受信すると接続が終了する
        // given (前提条件):
        let room = start_room();
        let mut observer = observe(&room).await;
        let config = PumpConfig::default().with_max_message_size(8);
        let (inbound, _frames) = connect_alice(&room, config);
        next_event(&mut observer).await;

        // when (操作):
        inbound
            .unbounded_send(Ok(Message::Text("far too long for the limit".into())))
            .unwrap();

        // then (期待する結果): メッセージは配信されず leave が届く
        let next = next_event(&mut observer).await;
        assert_eq!(next.content, "has left the chat");
    }

    #[tokio::test]
    async fn test_write_failure_unregisters() {
        // テスト項目: transport への書き込みが失敗すると接続が登録解除される
        // given (前提条件): 送信先がすでに閉じている
        let room = start_room();
        let mut observer = observe(&room).await;
        let (_inbound, frames) = connect_alice(&room, PumpConfig::default());
        drop(frames);

        // when (操作): join alice の書き込みが失敗する

        // then (期待する結果):
        assert_eq!(next_event(&mut observer).await.content, "has joined the chat");
        let leave = next_event(&mut observer).await;
        assert_eq!(leave.content, "has left the chat");
        assert_eq!(leave.author, Some(user("alice")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_deadline_expires_without_pong() {
        // テスト項目: pong が届かないまま期限が過ぎると接続が終了する
        // given (前提条件):
        let room = start_room();
        let mut observer = observe(&room).await;
        let start = Instant::now();
        let (_inbound, _frames) = connect_alice(&room, PumpConfig::default());
        next_event(&mut observer).await;

        // when (操作): 何も受信しないまま時間が経過する
        let leave = next_event(&mut observer).await;

        // then (期待する結果):
        assert_eq!(leave.content, "has left the chat");
        assert!(Instant::now() - start >= PONG_WAIT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pong_extends_read_deadline() {
        // テスト項目: pong を受信すると読み取り期限が延長される
        // given (前提条件):
        let room = start_room();
        let mut observer = observe(&room).await;
        let start = Instant::now();
        let (inbound, _frames) = connect_alice(&room, PumpConfig::default());
        next_event(&mut observer).await;

        // when (操作): 50 秒後に pong を受信
        tokio::time::sleep(Duration::from_secs(50)).await;
        inbound
            .unbounded_send(Ok(Message::Pong(Bytes::new())))
            .unwrap();
        tokio::time::sleep(Duration::from_secs(55)).await;

        // then (期待する結果): 最初の期限 (60 秒) を過ぎても接続は残り、延長後の期限で切れる
        let participants = room.participants().await.unwrap();
        assert!(participants.iter().any(|p| p.username == user("alice")));
        let leave = next_event(&mut observer).await;
        assert_eq!(leave.content, "has left the chat");
        assert!(Instant::now() - start >= Duration::from_secs(110));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ping_sent_every_period() {
        // テスト項目: ping が一定間隔で送信される
        // given (前提条件):
        let room = start_room();
        let start = Instant::now();
        let (inbound, mut frames) = connect_alice(&room, PumpConfig::default());
        assert!(matches!(next_frame(&mut frames).await, Message::Text(_)));

        // when (操作): pong を返しながら時間を進める
        let first = next_frame(&mut frames).await;
        let first_at = Instant::now() - start;
        inbound
            .unbounded_send(Ok(Message::Pong(Bytes::new())))
            .unwrap();
        let second = next_frame(&mut frames).await;
        let second_at = Instant::now() - start;

        // then (期待する結果):
        let period = PumpConfig::default().ping_period;
        assert!(matches!(first, Message::Ping(_)));
        assert!(matches!(second, Message::Ping(_)));
        assert!(first_at >= period);
        assert!(second_at >= period * 2);
        assert!(period < PONG_WAIT);
    }
}
