//! Async client runtime.
//!
//! Glue between the Sans-IO [`ConnectionManager`], a [`SessionStore`], the
//! WebSocket transport and a UI. The UI sends user intents in and receives
//! [`UiEvent`]s out; everything else happens here.

use std::collections::HashMap;

use thiserror::Error;
use tokio::sync::mpsc;
use tocsin_core::{Environment, LogLevel};
use tocsin_proto::{DisplayName, RoomCode};

use crate::{
    event::{ClientAction, ClientEvent, TransportId},
    manager::ConnectionManager,
    store::{SessionStore, StoreError, persist},
    transport::{self, TransportHandle},
};

/// Runtime configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// WebSocket URL of the server.
    pub server_url: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self { server_url: "ws://127.0.0.1:8080".to_string() }
    }
}

/// Runtime errors.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Stored session could not be read.
    #[error("session store: {0}")]
    Store(#[from] StoreError),
}

/// What the UI needs to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// Display name changed (also sent once at startup).
    NameChanged(DisplayName),
    /// Current room changed.
    RoomChanged(Option<RoomCode>),
    /// Roster of the current room changed.
    MembersChanged(Vec<String>),
    /// Bookmark list changed (also sent once at startup).
    BookmarksChanged(Vec<RoomCode>),
    /// Show an alert.
    Alert {
        /// Alert title.
        title: String,
        /// Alert body.
        message: String,
    },
}

/// Client runtime driving one [`ConnectionManager`].
pub struct Runtime<E: Environment, S: SessionStore> {
    manager: ConnectionManager<E>,
    store: S,
    config: ClientConfig,
    transports: HashMap<TransportId, TransportHandle>,
    events_tx: mpsc::UnboundedSender<ClientEvent>,
    events_rx: mpsc::UnboundedReceiver<ClientEvent>,
    ui: mpsc::UnboundedSender<UiEvent>,
}

impl<E: Environment, S: SessionStore> Runtime<E, S> {
    /// Load the stored session and restore the manager.
    ///
    /// If a room was stored, its rejoin is already underway when this
    /// returns. Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns `RuntimeError::Store` if the store cannot be read.
    pub fn start(
        env: E,
        store: S,
        config: ClientConfig,
        ui: mpsc::UnboundedSender<UiEvent>,
    ) -> Result<Self, RuntimeError> {
        let persisted = store.load()?;
        let (manager, actions) = ConnectionManager::restore(env, persisted);
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let mut runtime = Self {
            manager,
            store,
            config,
            transports: HashMap::new(),
            events_tx,
            events_rx,
            ui,
        };

        runtime.notify(UiEvent::NameChanged(runtime.manager.name().clone()));
        runtime.notify(UiEvent::BookmarksChanged(runtime.manager.bookmarks().as_slice().to_vec()));
        runtime.execute(actions);

        Ok(runtime)
    }

    /// The connection manager.
    pub fn manager(&self) -> &ConnectionManager<E> {
        &self.manager
    }

    /// Process intents and transport events until `intents` closes.
    ///
    /// Open transports are closed on return.
    pub async fn run(mut self, mut intents: mpsc::UnboundedReceiver<ClientEvent>) {
        loop {
            tokio::select! {
                intent = intents.recv() => match intent {
                    Some(event) => self.dispatch(event),
                    None => break,
                },
                Some(event) = self.events_rx.recv() => {
                    if let ClientEvent::TransportFailed { transport, .. }
                    | ClientEvent::TransportClosed { transport } = &event
                    {
                        if let Some(handle) = self.transports.remove(transport) {
                            handle.stop();
                        }
                    }
                    self.dispatch(event);
                },
            }
        }

        for (_, handle) in self.transports.drain() {
            handle.close();
        }
        tracing::info!("client runtime stopped");
    }

    fn dispatch(&mut self, event: ClientEvent) {
        match self.manager.handle(event) {
            Ok(actions) => self.execute(actions),
            Err(e) => {
                tracing::debug!("intent rejected: {e}");
                let (title, message) = e.alert();
                self.notify(UiEvent::Alert { title: title.to_string(), message });
            },
        }
    }

    fn execute(&mut self, actions: Vec<ClientAction>) {
        for action in actions {
            if let Err(e) = persist(&self.store, &action) {
                tracing::error!("failed to persist session state: {e}");
            }

            match action {
                ClientAction::OpenTransport { transport } => {
                    let handle = transport::spawn(
                        self.config.server_url.clone(),
                        transport,
                        self.events_tx.clone(),
                    );
                    self.transports.insert(transport, handle);
                },
                ClientAction::CloseTransport { transport } => {
                    if let Some(handle) = self.transports.remove(&transport) {
                        handle.close();
                    }
                },
                ClientAction::Send { transport, message } => {
                    let Some(handle) = self.transports.get(&transport) else {
                        tracing::warn!("no transport {transport} for {}", message.kind());
                        continue;
                    };
                    match message.encode() {
                        Ok(text) => handle.send(text),
                        Err(e) => tracing::error!("failed to encode {}: {e}", message.kind()),
                    }
                },
                ClientAction::PersistName(name) => self.notify(UiEvent::NameChanged(name)),
                ClientAction::PersistBookmarks(codes) => {
                    self.notify(UiEvent::BookmarksChanged(codes));
                },
                ClientAction::PersistRoom(_) => {},
                ClientAction::RoomChanged(room) => self.notify(UiEvent::RoomChanged(room)),
                ClientAction::MembersChanged(members) => {
                    self.notify(UiEvent::MembersChanged(members));
                },
                ClientAction::Notify { title, message } => {
                    self.notify(UiEvent::Alert { title, message });
                },
                ClientAction::Log { level, message } => match level {
                    LogLevel::Debug => tracing::debug!("{message}"),
                    LogLevel::Info => tracing::info!("{message}"),
                    LogLevel::Warn => tracing::warn!("{message}"),
                    LogLevel::Error => tracing::error!("{message}"),
                },
            }
        }
    }

    fn notify(&self, event: UiEvent) {
        // UI gone means we are shutting down
        let _ = self.ui.send(event);
    }
}
