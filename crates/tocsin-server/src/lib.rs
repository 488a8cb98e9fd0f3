//! Tocsin production server.
//!
//! Production server using WebSockets over Tokio, system time and the OS RNG.
//!
//! # Architecture
//!
//! The [`ServerDriver`] is a sans-IO state machine: it owns the room registry
//! and maps connection events to actions. [`Server`] runs it behind a single
//! async mutex and executes the actions with real sockets.
//!
//! Every connection gets an unbounded outbound channel drained by its own
//! writer task. Actions are executed while the driver lock is still held, so
//! the order of messages in each channel matches the order of registry
//! mutations: a member never sees a roster older than one it already got,
//! and a departed member never receives a later broadcast.
//!
//! # Components
//!
//! - [`ServerDriver`]: Action-based orchestrator (pure logic, no I/O)
//! - [`RoomRegistry`]: Authoritative room → members map
//! - [`Server`]: Production runtime that executes driver actions
//! - [`WebSocketListener`]: TCP accept + WebSocket handshake
//! - [`SystemEnv`]: Production environment (real time, OS RNG)

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod driver;
mod error;
mod registry;
mod server_error;
mod transport;

use std::{collections::HashMap, sync::Arc};

pub use driver::{ServerAction, ServerConfig as DriverConfig, ServerDriver, ServerEvent};
pub use error::ServerError;
use futures::{SinkExt, StreamExt};
pub use registry::{Departure, Member, RoomError, RoomRegistry};
pub use server_error::ServerError as DriverError;
use tocsin_core::{Environment, LogLevel};
pub use tocsin_core::SystemEnv;
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio_tungstenite::tungstenite::{
    Message,
    protocol::{CloseFrame, frame::coding::CloseCode},
};
pub use transport::{PendingConnection, ServerSocket, WebSocketListener};

/// Driver shared by all connection tasks.
type SharedDriver = Arc<Mutex<ServerDriver<SystemEnv>>>;

/// Item queued for a connection's writer task.
#[derive(Debug)]
enum Outbound {
    /// Encoded JSON message
    Text(String),
    /// Send a close frame and stop writing
    Close(String),
}

/// Shared state for all connections.
///
/// Maps session ID to the connection's outbound queue. The queue is the only
/// way to reach a socket, so every message to a client is written by one
/// task in enqueue order.
struct SharedState {
    outbound: RwLock<HashMap<u64, mpsc::UnboundedSender<Outbound>>>,
}

/// Server configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct ServerRuntimeConfig {
    /// Address to bind to (e.g., "0.0.0.0:8080")
    pub bind_address: String,
    /// Driver configuration (limits)
    pub driver: DriverConfig,
}

impl Default for ServerRuntimeConfig {
    fn default() -> Self {
        Self { bind_address: "0.0.0.0:8080".to_string(), driver: DriverConfig::default() }
    }
}

/// Production Tocsin server.
///
/// Wraps `ServerDriver` with WebSocket transport and system environment.
pub struct Server {
    /// The action-based server driver
    driver: ServerDriver<SystemEnv>,
    /// Listening socket
    transport: WebSocketListener,
    /// Environment
    env: SystemEnv,
}

impl Server {
    /// Create and bind a new server.
    ///
    /// # Errors
    ///
    /// [`ServerError::Config`] or [`ServerError::Transport`] if the bind
    /// address is unusable.
    pub async fn bind(config: ServerRuntimeConfig) -> Result<Self, ServerError> {
        let env = SystemEnv::new();
        let driver = ServerDriver::new(env.clone(), config.driver);
        let transport = WebSocketListener::bind(&config.bind_address).await?;

        Ok(Self { driver, transport, env })
    }

    /// Run the server, accepting connections and processing messages.
    ///
    /// This method runs until the task is dropped.
    ///
    /// # Errors
    ///
    /// Only if the local address cannot be read at startup. Per-connection
    /// failures are logged and do not stop the server.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!("Server starting on {}", self.transport.local_addr()?);

        let env = self.env;
        let driver = Arc::new(Mutex::new(self.driver));
        let shared = Arc::new(SharedState { outbound: RwLock::new(HashMap::new()) });

        loop {
            match self.transport.accept().await {
                Ok(pending) => {
                    let driver = Arc::clone(&driver);
                    let shared = Arc::clone(&shared);
                    let env = env.clone();

                    tokio::spawn(async move {
                        let peer = pending.peer_addr();
                        if let Err(e) = handle_connection(pending, driver, shared, env).await {
                            tracing::warn!("Connection error from {}: {}", peer, e);
                        }
                    });
                },
                Err(e) => {
                    tracing::error!("Accept error: {}", e);
                },
            }
        }
    }

    /// Local address the server is bound to.
    ///
    /// # Errors
    ///
    /// [`ServerError::Transport`] if the OS cannot report the address.
    pub fn local_addr(&self) -> Result<std::net::SocketAddr, ServerError> {
        self.transport.local_addr()
    }
}

/// Handle a single WebSocket connection from handshake to close.
async fn handle_connection(
    pending: PendingConnection,
    driver: SharedDriver,
    shared: Arc<SharedState>,
    env: SystemEnv,
) -> Result<(), ServerError> {
    let socket = pending.upgrade().await?;
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    let session_id = {
        let mut outbound = shared.outbound.write().await;
        let mut session_id = env.random_u64();
        while outbound.contains_key(&session_id) {
            session_id = env.random_u64();
        }
        outbound.insert(session_id, tx);
        session_id
    };

    tracing::debug!("New connection: {}", session_id);

    let writer = tokio::spawn(async move {
        while let Some(item) = rx.recv().await {
            let result = match item {
                Outbound::Text(text) => sink.send(Message::text(text)).await,
                Outbound::Close(reason) => {
                    let frame = CloseFrame { code: CloseCode::Normal, reason: reason.into() };
                    let _ = sink.send(Message::Close(Some(frame))).await;
                    break;
                },
            };

            if let Err(e) = result {
                tracing::debug!("Write error on session {}: {}", session_id, e);
                break;
            }
        }
    });

    let accepted = dispatch(&driver, &shared, ServerEvent::ConnectionAccepted { session_id }).await;

    let result = match accepted {
        Ok(()) => {
            let reason = read_loop(session_id, &mut stream, &driver, &shared).await;
            forget_session(&shared, session_id).await;
            dispatch(&driver, &shared, ServerEvent::ConnectionClosed { session_id, reason }).await
        },
        // The driver never registered this session, so there is nothing to close
        Err(e) => {
            forget_session(&shared, session_id).await;
            Err(e)
        },
    };

    let _ = writer.await;
    result
}

/// Drop the outbound queue, which ends the writer task.
async fn forget_session(shared: &SharedState, session_id: u64) {
    let mut outbound = shared.outbound.write().await;
    outbound.remove(&session_id);
}

/// Feed inbound frames to the driver until the peer goes away.
///
/// Returns the close reason.
async fn read_loop<S>(
    session_id: u64,
    stream: &mut S,
    driver: &SharedDriver,
    shared: &SharedState,
) -> String
where
    S: futures::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(frame) = stream.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text.as_str().to_string(),
            Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                Ok(text) => text,
                Err(_) => {
                    tracing::warn!("Ignoring non UTF-8 binary message from {}", session_id);
                    continue;
                },
            },
            Ok(Message::Close(_)) => return "closed by peer".to_string(),
            Ok(_) => continue,
            Err(e) => return format!("read error: {e}"),
        };

        if let Err(e) = dispatch(driver, shared, ServerEvent::MessageReceived { session_id, text }).await
        {
            tracing::warn!("Message processing error: {}", e);
        }
    }

    "connection dropped".to_string()
}

/// Run one event through the driver and execute the resulting actions
/// without releasing the lock in between.
async fn dispatch(
    driver: &SharedDriver,
    shared: &SharedState,
    event: ServerEvent,
) -> Result<(), ServerError> {
    let mut driver = driver.lock().await;
    let actions = driver.process_event(event)?;
    execute_actions(actions, shared).await
}

/// Execute server actions.
async fn execute_actions(actions: Vec<ServerAction>, shared: &SharedState) -> Result<(), ServerError> {
    let outbound = shared.outbound.read().await;

    for action in actions {
        match action {
            ServerAction::SendToSession { session_id, message } => {
                let text = message.encode()?;
                match outbound.get(&session_id) {
                    Some(tx) => {
                        if tx.send(Outbound::Text(text)).is_err() {
                            tracing::debug!("SendToSession: writer for {} is gone", session_id);
                        }
                    },
                    None => tracing::warn!("SendToSession: session {} not found", session_id),
                }
            },

            ServerAction::CloseConnection { session_id, reason } => {
                tracing::info!("Closing connection {}: {}", session_id, reason);
                if let Some(tx) = outbound.get(&session_id) {
                    let _ = tx.send(Outbound::Close(reason));
                }
            },

            ServerAction::Log { level, message } => match level {
                LogLevel::Debug => tracing::debug!("{}", message),
                LogLevel::Info => tracing::info!("{}", message),
                LogLevel::Warn => tracing::warn!("{}", message),
                LogLevel::Error => tracing::error!("{}", message),
            },
        }
    }

    Ok(())
}
