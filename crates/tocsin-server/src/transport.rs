//! WebSocket transport over TCP.
//!
//! Accepting a TCP connection and completing the WebSocket handshake are
//! separate steps so a slow or hostile client cannot stall the accept loop:
//! [`WebSocketListener::accept`] only takes the socket, and the per-connection
//! task calls [`PendingConnection::upgrade`].

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::{WebSocketStream, accept_async};

use crate::error::ServerError;

/// Established server-side WebSocket.
pub type ServerSocket = WebSocketStream<TcpStream>;

/// Listening socket for incoming WebSocket clients.
#[derive(Debug)]
pub struct WebSocketListener {
    listener: TcpListener,
}

impl WebSocketListener {
    /// Bind to `address` (e.g. `0.0.0.0:8080`).
    ///
    /// # Errors
    ///
    /// - [`ServerError::Config`] if the address does not parse
    /// - [`ServerError::Transport`] if the socket cannot be bound
    pub async fn bind(address: &str) -> Result<Self, ServerError> {
        let addr: SocketAddr = address
            .parse()
            .map_err(|e| ServerError::Config(format!("invalid bind address '{address}': {e}")))?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Transport(format!("failed to bind {addr}: {e}")))?;

        tracing::info!("WebSocket transport bound to {}", addr);

        Ok(Self { listener })
    }

    /// Wait for the next TCP connection.
    ///
    /// # Errors
    ///
    /// [`ServerError::Transport`] on accept failure (e.g. file descriptor
    /// exhaustion). The listener stays usable.
    pub async fn accept(&self) -> Result<PendingConnection, ServerError> {
        let (stream, peer) = self.listener.accept().await?;
        Ok(PendingConnection { stream, peer })
    }

    /// Local address the listener is bound to.
    ///
    /// # Errors
    ///
    /// [`ServerError::Transport`] if the OS cannot report the address.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }
}

/// TCP connection that has not completed the WebSocket handshake.
#[derive(Debug)]
pub struct PendingConnection {
    stream: TcpStream,
    peer: SocketAddr,
}

impl PendingConnection {
    /// Remote address of the client.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Complete the WebSocket handshake.
    ///
    /// # Errors
    ///
    /// [`ServerError::Transport`] if the client does not speak WebSocket.
    pub async fn upgrade(self) -> Result<ServerSocket, ServerError> {
        accept_async(self.stream)
            .await
            .map_err(|e| ServerError::Transport(format!("handshake with {} failed: {e}", self.peer)))
    }
}
