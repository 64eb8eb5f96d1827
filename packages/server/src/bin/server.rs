//! Room-scoped WebSocket chat server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin parlor-server
//! cargo run --bin parlor-server -- --host 0.0.0.0 --port 3000 --database sqlite://chat.db
//! ```

use std::{sync::Arc, time::Duration};

use clap::Parser;
use parlor_server::{
    domain::{MessageRepository, UserRepository},
    infrastructure::{
        password::BcryptPasswordHasher,
        repository::{InMemoryStore, SqliteStore},
    },
    room::{PumpConfig, RoomRegistry},
    ui::{AppState, Server},
};
use parlor_shared::{logger::setup_logger, time::SystemClock};

#[derive(Parser, Debug)]
#[command(name = "parlor-server")]
#[command(about = "Room-scoped WebSocket chat server", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8000")]
    port: u16,

    /// SQLite database URL; `memory` keeps everything in process memory
    #[arg(short = 'd', long, default_value = "sqlite://parlor.db")]
    database: String,

    /// Capacity of each connection's outbound queue
    #[arg(long, default_value_t = 256)]
    send_queue_capacity: usize,

    /// Capacity of each room's command inbox
    #[arg(long, default_value_t = 256)]
    room_inbox_capacity: usize,

    /// Maximum inbound message size in bytes
    #[arg(long, default_value_t = 512)]
    max_message_size: usize,

    /// Seconds allowed between two pongs before a connection is dropped
    #[arg(long, default_value_t = 60)]
    pong_wait_secs: u64,

    /// bcrypt cost factor
    #[arg(long, default_value_t = bcrypt::DEFAULT_COST)]
    bcrypt_cost: u32,
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_PKG_NAME"), env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();

    if let Err(e) = run(args).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    // Initialize dependencies in order:
    // 1. Store
    // 2. Room registry
    // 3. AppState (UseCases)
    // 4. Server

    // 1. Create Store
    let (users, messages): (Arc<dyn UserRepository>, Arc<dyn MessageRepository>) =
        if args.database == "memory" {
            tracing::info!("Using in-memory store; nothing will be persisted");
            let store = Arc::new(InMemoryStore::new());
            (
                store.clone() as Arc<dyn UserRepository>,
                store as Arc<dyn MessageRepository>,
            )
        } else {
            let store = Arc::new(SqliteStore::connect(&args.database).await?);
            (
                store.clone() as Arc<dyn UserRepository>,
                store as Arc<dyn MessageRepository>,
            )
        };

    // 2. Create Room registry
    let clock = Arc::new(SystemClock);
    let registry = Arc::new(RoomRegistry::new(
        messages.clone(),
        clock.clone(),
        args.room_inbox_capacity,
    ));

    // 3. Create AppState
    let pump_config = PumpConfig::default()
        .with_pong_wait(Duration::from_secs(args.pong_wait_secs.max(1)))
        .with_max_message_size(args.max_message_size)
        .with_send_queue_capacity(args.send_queue_capacity);
    let state = AppState::new(
        users,
        messages,
        Arc::new(BcryptPasswordHasher::new(args.bcrypt_cost)),
        registry,
        clock,
        pump_config,
    );

    // 4. Create and run the server
    Server::new(state).run(args.host, args.port).await
}
