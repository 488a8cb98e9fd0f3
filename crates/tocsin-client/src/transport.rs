//! WebSocket transport for the client.
//!
//! Each [`TransportId`] the manager asks for becomes one task owning one
//! WebSocket. The task reports what happens to it as [`ClientEvent`]s tagged
//! with that id. Protocol logic stays in the Sans-IO manager.

use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::event::{ClientEvent, TransportId};

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Stream error.
    #[error("stream error: {0}")]
    Stream(String),
}

enum Command {
    Send(String),
    Close,
}

/// Handle to one spawned transport task.
pub struct TransportHandle {
    commands: mpsc::UnboundedSender<Command>,
    abort_handle: tokio::task::AbortHandle,
}

impl TransportHandle {
    /// Queue a text frame. Dropped silently if the task already ended; the
    /// task reports that as a fault on its own.
    pub fn send(&self, text: String) {
        let _ = self.commands.send(Command::Send(text));
    }

    /// Close the WebSocket gracefully. No further events are reported.
    pub fn close(&self) {
        let _ = self.commands.send(Command::Close);
    }

    /// Stop the task without a closing handshake.
    pub fn stop(&self) {
        self.abort_handle.abort();
    }
}

/// Connect to `url` in a new task.
///
/// Reports `TransportOpened`, then `MessageReceived` per text frame (or
/// UTF-8 binary frame), and ends
/// with `TransportFailed` or `TransportClosed` unless closed through the
/// handle.
pub fn spawn(
    url: String,
    transport: TransportId,
    events: mpsc::UnboundedSender<ClientEvent>,
) -> TransportHandle {
    let (commands_tx, commands_rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(run(url, transport, commands_rx, events));

    TransportHandle { commands: commands_tx, abort_handle: handle.abort_handle() }
}

async fn run(
    url: String,
    transport: TransportId,
    commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<ClientEvent>,
) {
    let ending = match bridge(&url, transport, commands, &events).await {
        Ok(Some(ending)) => ending,
        Ok(None) => return,
        Err(e) => ClientEvent::TransportFailed { transport, reason: e.to_string() },
    };
    let _ = events.send(ending);
}

/// Pump frames until the socket ends. `Ok(None)` means closed on request.
async fn bridge(
    url: &str,
    transport: TransportId,
    mut commands: mpsc::UnboundedReceiver<Command>,
    events: &mpsc::UnboundedSender<ClientEvent>,
) -> Result<Option<ClientEvent>, TransportError> {
    let (ws, _) =
        connect_async(url).await.map_err(|e| TransportError::Connection(e.to_string()))?;
    let (mut sink, mut stream) = ws.split();

    let _ = events.send(ClientEvent::TransportOpened { transport });

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Send(text)) => {
                    sink.send(Message::text(text))
                        .await
                        .map_err(|e| TransportError::Stream(e.to_string()))?;
                },
                Some(Command::Close) | None => {
                    let _ = sink.close().await;
                    return Ok(None);
                },
            },
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let text = text.as_str().to_string();
                    let _ = events.send(ClientEvent::MessageReceived { transport, text });
                },
                Some(Ok(Message::Binary(bytes))) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => {
                        let _ = events.send(ClientEvent::MessageReceived { transport, text });
                    },
                    Err(e) => tracing::warn!("transport {transport}: dropping binary frame: {e}"),
                },
                Some(Ok(Message::Close(_))) | None => {
                    return Ok(Some(ClientEvent::TransportClosed { transport }));
                },
                Some(Ok(_)) => {},
                Some(Err(e)) => return Err(TransportError::Stream(e.to_string())),
            },
        }
    }
}
