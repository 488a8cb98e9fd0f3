//! In-memory world of clients and one server.
//!
//! `SimWorld` wires real [`ConnectionManager`]s (each with its own
//! [`MemoryStore`]) to a real [`ServerDriver`] through a single FIFO queue.
//! Every transport a manager opens becomes one server session. Nothing runs
//! until the test calls [`SimWorld::run_until_idle`] or [`SimWorld::step`],
//! so interleavings are explicit and reproducible.

use std::collections::{HashMap, VecDeque};

use tocsin_client::{
    ClientAction, ClientError, ClientEvent, ConnectionManager, EMERGENCY_TITLE, MemoryStore,
    PersistedSession, SessionStore, TransportId, store::persist,
};
use tocsin_core::LogLevel;
use tocsin_proto::{ClientMessage, RoomCode};
use tocsin_server::{DriverConfig, ServerAction, ServerDriver, ServerEvent};

use crate::SimEnv;

/// Index of a client in a [`SimWorld`].
pub type ClientId = usize;

/// Upper bound on deliveries per [`SimWorld::run_until_idle`] call.
const MAX_STEPS: usize = 100_000;

/// Something in flight.
#[derive(Debug)]
enum Delivery {
    /// Event for the server driver
    Server(ServerEvent),
    /// Event for one client's manager
    Client { client: ClientId, event: ClientEvent },
}

/// One simulated client: manager, store and what its UI would show.
pub struct SimClient {
    manager: ConnectionManager<SimEnv>,
    store: MemoryStore,
    sent: Vec<ClientMessage>,
    alerts: Vec<(String, String)>,
    shown_room: Option<RoomCode>,
    shown_members: Vec<String>,
}

impl SimClient {
    fn new(manager: ConnectionManager<SimEnv>, store: MemoryStore) -> Self {
        Self {
            manager,
            store,
            sent: Vec::new(),
            alerts: Vec::new(),
            shown_room: None,
            shown_members: Vec::new(),
        }
    }

    /// The client's connection manager.
    pub fn manager(&self) -> &ConnectionManager<SimEnv> {
        &self.manager
    }

    /// The client's store.
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// Every message the manager asked to send, in order.
    pub fn sent(&self) -> &[ClientMessage] {
        &self.sent
    }

    /// Every alert shown, as `(title, message)`.
    pub fn alerts(&self) -> &[(String, String)] {
        &self.alerts
    }

    /// Bodies of emergency alerts received.
    pub fn emergencies(&self) -> Vec<&str> {
        self.alerts
            .iter()
            .filter(|(title, _)| title == EMERGENCY_TITLE)
            .map(|(_, message)| message.as_str())
            .collect()
    }

    /// Room the UI currently shows.
    pub fn shown_room(&self) -> Option<&RoomCode> {
        self.shown_room.as_ref()
    }

    /// Roster the UI currently shows.
    pub fn shown_members(&self) -> &[String] {
        &self.shown_members
    }
}

/// Deterministic world of clients talking to one server.
pub struct SimWorld {
    env: SimEnv,
    server: ServerDriver<SimEnv>,
    clients: Vec<SimClient>,
    queue: VecDeque<Delivery>,
    /// Open transports by owner
    links: HashMap<(ClientId, TransportId), u64>,
    /// Owner of each server session
    sessions: HashMap<u64, (ClientId, TransportId)>,
    next_session: u64,
    reachable: bool,
    violations: Vec<String>,
}

impl SimWorld {
    /// World with default server limits.
    pub fn new(seed: u64) -> Self {
        Self::with_config(seed, DriverConfig::default())
    }

    /// World with custom server limits.
    pub fn with_config(seed: u64, config: DriverConfig) -> Self {
        let env = SimEnv::with_seed(seed);
        Self {
            server: ServerDriver::new(env.clone(), config),
            env,
            clients: Vec::new(),
            queue: VecDeque::new(),
            links: HashMap::new(),
            sessions: HashMap::new(),
            next_session: 1,
            reachable: true,
            violations: Vec::new(),
        }
    }

    /// Start a client from stored values, as on app launch.
    ///
    /// Startup actions (name generation, auto-rejoin) are queued but not run.
    pub fn add_client(&mut self, persisted: PersistedSession) -> ClientId {
        let store = MemoryStore::with_session(persisted.clone());
        let (manager, actions) = ConnectionManager::restore(self.env.clone(), persisted);

        let id = self.clients.len();
        self.clients.push(SimClient::new(manager, store));
        self.apply_client_actions(id, actions);
        id
    }

    /// Start a client with a stored name and nothing else.
    pub fn add_named(&mut self, name: &str) -> ClientId {
        self.add_client(PersistedSession { name: Some(name.to_string()), ..Default::default() })
    }

    /// Feed a user intent to a client. Resulting actions are queued.
    ///
    /// # Errors
    ///
    /// Whatever the manager rejects locally.
    pub fn intent(&mut self, client: ClientId, event: ClientEvent) -> Result<(), ClientError> {
        let actions = self.clients[client].manager.handle(event)?;
        self.apply_client_actions(client, actions);
        Ok(())
    }

    /// Deliver an event to a client right now, bypassing the queue.
    ///
    /// Used to model late or duplicated transport events.
    pub fn inject(&mut self, client: ClientId, event: ClientEvent) {
        self.deliver_to_client(client, event);
    }

    /// Kill the client's current connection as a network fault would.
    ///
    /// The server sees a close and the client sees a transport failure.
    pub fn drop_connection(&mut self, client: ClientId) {
        let Some(transport) = self.clients[client].manager.state().transport() else {
            return;
        };
        if let Some(session_id) = self.unlink(client, transport) {
            self.queue.push_back(Delivery::Server(ServerEvent::ConnectionClosed {
                session_id,
                reason: "network fault".to_string(),
            }));
        }
        self.queue.push_back(Delivery::Client {
            client,
            event: ClientEvent::TransportFailed { transport, reason: "network fault".to_string() },
        });
    }

    /// Restart a client process: its socket dies, in-flight events for it
    /// are lost, and a new manager is restored from its store.
    pub fn restart(&mut self, client: ClientId) {
        if let Some(transport) = self.clients[client].manager.state().transport() {
            if let Some(session_id) = self.unlink(client, transport) {
                self.queue.push_back(Delivery::Server(ServerEvent::ConnectionClosed {
                    session_id,
                    reason: "client restarted".to_string(),
                }));
            }
        }
        self.queue.retain(|d| !matches!(d, Delivery::Client { client: c, .. } if *c == client));

        let store = self.clients[client].store.clone();
        let persisted = match store.load() {
            Ok(persisted) => persisted,
            Err(e) => {
                self.violations.push(format!("client {client} store: {e}"));
                PersistedSession::default()
            },
        };
        let (manager, actions) = ConnectionManager::restore(self.env.clone(), persisted);
        self.clients[client] = SimClient::new(manager, store);
        self.apply_client_actions(client, actions);
    }

    /// Make new transports fail to connect (or succeed again).
    pub fn set_reachable(&mut self, reachable: bool) {
        self.reachable = reachable;
    }

    /// Deliver the next queued event. Returns `false` if the queue was empty.
    pub fn step(&mut self) -> bool {
        match self.queue.pop_front() {
            Some(Delivery::Server(event)) => self.deliver_to_server(event),
            Some(Delivery::Client { client, event }) => self.deliver_to_client(client, event),
            None => return false,
        }
        true
    }

    /// Deliver events until nothing is in flight. Returns the number
    /// delivered.
    pub fn run_until_idle(&mut self) -> usize {
        let mut steps = 0;
        while steps < MAX_STEPS && self.step() {
            steps += 1;
        }
        if steps == MAX_STEPS {
            self.violations.push(format!("still busy after {MAX_STEPS} deliveries"));
        }
        steps
    }

    /// Number of queued deliveries.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// A client.
    pub fn client(&self, client: ClientId) -> &SimClient {
        &self.clients[client]
    }

    /// Number of clients.
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// The server driver.
    pub fn server(&self) -> &ServerDriver<SimEnv> {
        &self.server
    }

    /// The shared environment.
    pub fn env(&self) -> &SimEnv {
        &self.env
    }

    /// Server session backing the client's current transport.
    pub fn session_of(&self, client: ClientId) -> Option<u64> {
        let transport = self.clients[client].manager.state().transport()?;
        self.links.get(&(client, transport)).copied()
    }

    /// Contract violations seen so far: driver errors, store failures,
    /// encode failures, runaway loops. Always empty in a correct system.
    pub fn violations(&self) -> &[String] {
        &self.violations
    }

    fn unlink(&mut self, client: ClientId, transport: TransportId) -> Option<u64> {
        let session_id = self.links.remove(&(client, transport))?;
        self.sessions.remove(&session_id);
        Some(session_id)
    }

    fn deliver_to_client(&mut self, client: ClientId, event: ClientEvent) {
        match self.clients[client].manager.handle(event) {
            Ok(actions) => self.apply_client_actions(client, actions),
            Err(e) => self.violations.push(format!("client {client} rejected transport event: {e}")),
        }
    }

    fn deliver_to_server(&mut self, event: ServerEvent) {
        match self.server.process_event(event) {
            Ok(actions) => self.apply_server_actions(actions),
            Err(e) => self.violations.push(format!("server: {e}")),
        }
    }

    fn apply_client_actions(&mut self, client: ClientId, actions: Vec<ClientAction>) {
        for action in actions {
            if let Err(e) = persist(&self.clients[client].store, &action) {
                self.violations.push(format!("client {client} store: {e}"));
            }

            match action {
                ClientAction::OpenTransport { transport } => self.open(client, transport),
                ClientAction::CloseTransport { transport } => {
                    if let Some(session_id) = self.unlink(client, transport) {
                        self.queue.push_back(Delivery::Server(ServerEvent::ConnectionClosed {
                            session_id,
                            reason: "closed by client".to_string(),
                        }));
                    }
                },
                ClientAction::Send { transport, message } => {
                    let text = match message.encode() {
                        Ok(text) => text,
                        Err(e) => {
                            self.violations.push(format!("client {client} encode: {e}"));
                            continue;
                        },
                    };
                    self.clients[client].sent.push(message);
                    if let Some(&session_id) = self.links.get(&(client, transport)) {
                        self.queue.push_back(Delivery::Server(ServerEvent::MessageReceived {
                            session_id,
                            text,
                        }));
                    }
                },
                ClientAction::RoomChanged(room) => self.clients[client].shown_room = room,
                ClientAction::MembersChanged(members) => {
                    self.clients[client].shown_members = members;
                },
                ClientAction::Notify { title, message } => {
                    self.clients[client].alerts.push((title, message));
                },
                ClientAction::Log { level, message } => log(level, &format!("client {client}: {message}")),
                ClientAction::PersistName(_)
                | ClientAction::PersistRoom(_)
                | ClientAction::PersistBookmarks(_) => {},
            }
        }
    }

    fn apply_server_actions(&mut self, actions: Vec<ServerAction>) {
        for action in actions {
            match action {
                ServerAction::SendToSession { session_id, message } => {
                    let Some(&(client, transport)) = self.sessions.get(&session_id) else {
                        continue;
                    };
                    match message.encode() {
                        Ok(text) => self.queue.push_back(Delivery::Client {
                            client,
                            event: ClientEvent::MessageReceived { transport, text },
                        }),
                        Err(e) => self.violations.push(format!("server encode: {e}")),
                    }
                },
                ServerAction::CloseConnection { session_id, reason } => {
                    let Some((client, transport)) = self.sessions.get(&session_id).copied() else {
                        continue;
                    };
                    self.unlink(client, transport);
                    self.queue.push_back(Delivery::Server(ServerEvent::ConnectionClosed {
                        session_id,
                        reason,
                    }));
                    self.queue.push_back(Delivery::Client {
                        client,
                        event: ClientEvent::TransportClosed { transport },
                    });
                },
                ServerAction::Log { level, message } => log(level, &format!("server: {message}")),
            }
        }
    }

    fn open(&mut self, client: ClientId, transport: TransportId) {
        if !self.reachable {
            self.queue.push_back(Delivery::Client {
                client,
                event: ClientEvent::TransportFailed {
                    transport,
                    reason: "server unreachable".to_string(),
                },
            });
            return;
        }

        let session_id = self.next_session;
        self.next_session += 1;
        self.links.insert((client, transport), session_id);
        self.sessions.insert(session_id, (client, transport));

        self.queue.push_back(Delivery::Server(ServerEvent::ConnectionAccepted { session_id }));
        self.queue.push_back(Delivery::Client {
            client,
            event: ClientEvent::TransportOpened { transport },
        });
    }
}

fn log(level: LogLevel, message: &str) {
    match level {
        LogLevel::Debug => tracing::debug!("{message}"),
        LogLevel::Info => tracing::info!("{message}"),
        LogLevel::Warn => tracing::warn!("{message}"),
        LogLevel::Error => tracing::error!("{message}"),
    }
}
