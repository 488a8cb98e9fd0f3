//! Server driver.
//!
//! Sans-IO state machine that owns the [`RoomRegistry`] and turns connection
//! events into actions. The runtime feeds it [`ServerEvent`]s and executes
//! the returned [`ServerAction`]s in order, so roster broadcasts already come
//! resolved to one send per recipient.
//!
//! Per-request ordering: a `created`/`joined` reply is emitted before the
//! `members` broadcast it triggers.

use std::collections::HashMap;

use tocsin_core::{Environment, LogLevel};
use tocsin_proto::{ClientMessage, DisplayName, RoomCode, ServerMessage};

use crate::{registry::RoomRegistry, server_error::ServerError};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Maximum concurrent connections
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { max_connections: 10_000 }
    }
}

/// Events that the server driver processes.
///
/// These are produced by the external runtime (simulation or production).
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// A new connection was accepted
    ConnectionAccepted {
        /// Unique connection ID assigned by the runtime
        session_id: u64,
    },

    /// A text message was received from a connection
    MessageReceived {
        /// Connection that sent the message
        session_id: u64,
        /// Raw JSON text
        text: String,
    },

    /// A connection was closed (by peer or error)
    ConnectionClosed {
        /// Connection that was closed
        session_id: u64,
        /// Reason for closure
        reason: String,
    },
}

/// Actions that the server driver produces.
///
/// These are executed by runtime-specific code (production or simulation).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerAction {
    /// Send a message to a specific session
    SendToSession {
        /// Target session ID
        session_id: u64,
        /// Message to send
        message: ServerMessage,
    },

    /// Close a connection
    CloseConnection {
        /// Session to close
        session_id: u64,
        /// Reason for closure
        reason: String,
    },

    /// Log a message (for debugging/monitoring)
    Log {
        /// Log level
        level: LogLevel,
        /// Message to log
        message: String,
    },
}

/// Action-based server driver.
///
/// Orchestrates connection tracking, room membership and message routing.
pub struct ServerDriver<E>
where
    E: Environment,
{
    /// Live connections and when they were accepted
    connections: HashMap<u64, E::Instant>,
    /// Room membership
    registry: RoomRegistry<E::Instant>,
    /// Environment (time, RNG)
    env: E,
    /// Server configuration
    config: ServerConfig,
}

impl<E> ServerDriver<E>
where
    E: Environment,
{
    /// Create a new server driver.
    pub fn new(env: E, config: ServerConfig) -> Self {
        Self { connections: HashMap::new(), registry: RoomRegistry::new(), env, config }
    }

    /// Process a server event and return actions to execute.
    ///
    /// This is the main entry point for the server driver.
    ///
    /// # Errors
    ///
    /// Only for runtime contract violations (unknown or duplicate session).
    /// Anything a client can cause is answered on the wire instead.
    pub fn process_event(&mut self, event: ServerEvent) -> Result<Vec<ServerAction>, ServerError> {
        match event {
            ServerEvent::ConnectionAccepted { session_id } => {
                self.handle_connection_accepted(session_id)
            },
            ServerEvent::MessageReceived { session_id, text } => {
                self.handle_message_received(session_id, &text)
            },
            ServerEvent::ConnectionClosed { session_id, reason } => {
                Ok(self.handle_connection_closed(session_id, &reason))
            },
        }
    }

    /// Handle a new connection being accepted.
    fn handle_connection_accepted(
        &mut self,
        session_id: u64,
    ) -> Result<Vec<ServerAction>, ServerError> {
        if self.connections.contains_key(&session_id) {
            return Err(ServerError::SessionAlreadyExists(session_id));
        }

        if self.connections.len() >= self.config.max_connections {
            return Ok(vec![ServerAction::CloseConnection {
                session_id,
                reason: "max connections exceeded".to_string(),
            }]);
        }

        self.connections.insert(session_id, self.env.now());

        Ok(vec![ServerAction::Log {
            level: LogLevel::Debug,
            message: format!("connection {session_id} accepted"),
        }])
    }

    /// Handle a message received from a connection.
    fn handle_message_received(
        &mut self,
        session_id: u64,
        text: &str,
    ) -> Result<Vec<ServerAction>, ServerError> {
        if !self.connections.contains_key(&session_id) {
            return Err(ServerError::SessionNotFound(session_id));
        }

        let message = match ClientMessage::decode(text) {
            Ok(message) => message,
            Err(e) => {
                return Ok(vec![ServerAction::Log {
                    level: LogLevel::Warn,
                    message: format!("ignoring message from session {session_id}: {e}"),
                }]);
            },
        };

        let actions = match message {
            ClientMessage::Create { room, name } => self.handle_create(session_id, &room, &name),
            ClientMessage::Join { room, name } => self.handle_join(session_id, &room, &name),
            ClientMessage::Emergency { room, .. } => self.handle_emergency(session_id, &room),
            ClientMessage::Unknown => vec![ServerAction::Log {
                level: LogLevel::Debug,
                message: format!("ignoring unknown message type from session {session_id}"),
            }],
        };

        Ok(actions)
    }

    /// `create`: fail if the code is taken, otherwise leave any current room
    /// and become the first member.
    fn handle_create(&mut self, session_id: u64, room: &str, name: &str) -> Vec<ServerAction> {
        let (code, name) = match validate(room, name) {
            Ok(parsed) => parsed,
            Err(reason) => return vec![reject(session_id, reason)],
        };

        if self.registry.has_room(&code) {
            return vec![reject(session_id, format!("room {code} already exists"))];
        }

        let mut actions = self.leave_current_room(session_id);

        match self.registry.create_room(session_id, code.clone(), name, self.env.now()) {
            Ok(_) => {
                actions.push(ServerAction::Log {
                    level: LogLevel::Info,
                    message: format!("session {session_id} created room {code}"),
                });
                actions.push(send(session_id, ServerMessage::Created { room: code.to_string() }));
                actions.extend(self.broadcast_roster(&code));
            },
            Err(e) => actions.push(reject(session_id, e.to_string())),
        }

        actions
    }

    /// `join`: same room is a rename (or a re-ack under the same name),
    /// another room means leave then join.
    fn handle_join(&mut self, session_id: u64, room: &str, name: &str) -> Vec<ServerAction> {
        let (code, name) = match validate(room, name) {
            Ok(parsed) => parsed,
            Err(reason) => return vec![reject(session_id, reason)],
        };

        if self.registry.room_of(session_id) == Some(&code) {
            return self.handle_rejoin(session_id, code, name);
        }

        if !self.registry.has_room(&code) {
            return vec![reject(session_id, format!("room {code} does not exist"))];
        }

        let mut actions = self.leave_current_room(session_id);

        match self.registry.join_room(session_id, &code, name) {
            Ok(_) => {
                actions.push(ServerAction::Log {
                    level: LogLevel::Info,
                    message: format!("session {session_id} joined room {code}"),
                });
                actions.push(send(session_id, ServerMessage::Joined { room: code.to_string() }));
                actions.extend(self.broadcast_roster(&code));
            },
            Err(e) => actions.push(reject(session_id, e.to_string())),
        }

        actions
    }

    fn handle_rejoin(
        &mut self,
        session_id: u64,
        code: RoomCode,
        name: DisplayName,
    ) -> Vec<ServerAction> {
        let joined = send(session_id, ServerMessage::Joined { room: code.to_string() });

        let unchanged = self.registry.member(session_id).is_some_and(|m| m.name == name);
        if unchanged {
            let members = self.registry.roster(&code);
            return vec![joined, send(session_id, ServerMessage::Members { members })];
        }

        match self.registry.rename_member(session_id, name) {
            Ok((code, _)) => {
                let mut actions = vec![
                    ServerAction::Log {
                        level: LogLevel::Info,
                        message: format!("session {session_id} renamed in room {code}"),
                    },
                    joined,
                ];
                actions.extend(self.broadcast_roster(&code));
                actions
            },
            Err(e) => vec![reject(session_id, e.to_string())],
        }
    }

    /// `emergency`: alert every other member, or reject a non-member.
    fn handle_emergency(&self, session_id: u64, room: &str) -> Vec<ServerAction> {
        let code = match RoomCode::parse(room) {
            Ok(code) => code,
            Err(e) => return vec![reject(session_id, e.to_string())],
        };

        let recipients = match self.registry.emergency(session_id, &code) {
            Ok(recipients) => recipients,
            Err(_) => {
                return vec![reject(session_id, format!("you are not a member of room {code}"))];
            },
        };

        let sender = self
            .registry
            .member(session_id)
            .map_or_else(|| "someone".to_string(), |m| m.name.to_string());
        let message = format!("{sender} raised an emergency in room {code}!");

        let mut actions = vec![ServerAction::Log {
            level: LogLevel::Info,
            message: format!(
                "session {session_id} raised an emergency in room {code}, alerting {} members",
                recipients.len()
            ),
        }];
        actions.extend(recipients.into_iter().map(|recipient| {
            send(recipient, ServerMessage::Alert { message: message.clone() })
        }));
        actions
    }

    /// Handle a connection being closed: equivalent to leaving its room.
    fn handle_connection_closed(&mut self, session_id: u64, reason: &str) -> Vec<ServerAction> {
        let mut actions = Vec::new();

        if let Some(accepted_at) = self.connections.remove(&session_id) {
            let uptime = self.env.now() - accepted_at;
            actions.push(ServerAction::Log {
                level: LogLevel::Info,
                message: format!("connection {session_id} closed after {uptime:?}: {reason}"),
            });
        }

        actions.extend(self.leave_current_room(session_id));
        actions
    }

    /// Remove the session from its room and tell the remaining members.
    fn leave_current_room(&mut self, session_id: u64) -> Vec<ServerAction> {
        let Some(departure) = self.registry.leave_room(session_id) else {
            return Vec::new();
        };

        let mut actions = vec![ServerAction::Log {
            level: LogLevel::Info,
            message: format!(
                "session {session_id} ({}) left room {}{}",
                departure.member.name,
                departure.room,
                if departure.room_closed { ", room closed" } else { "" }
            ),
        }];

        if !departure.room_closed {
            actions.extend(self.broadcast_roster(&departure.room));
        }

        actions
    }

    /// One `members` snapshot per member of `code`, taken now.
    fn broadcast_roster(&self, code: &RoomCode) -> Vec<ServerAction> {
        let members = self.registry.roster(code);
        self.registry
            .sessions_in_room(code)
            .map(|session_id| send(session_id, ServerMessage::Members { members: members.clone() }))
            .collect()
    }

    /// Number of active connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Number of live rooms.
    pub fn room_count(&self) -> usize {
        self.registry.room_count()
    }

    /// Check if a room exists.
    pub fn has_room(&self, code: &RoomCode) -> bool {
        self.registry.has_room(code)
    }

    /// Current roster of a room, empty if it does not exist.
    pub fn roster(&self, code: &RoomCode) -> Vec<String> {
        self.registry.roster(code)
    }

    /// Room a session is in, if any.
    pub fn room_of(&self, session_id: u64) -> Option<&RoomCode> {
        self.registry.room_of(session_id)
    }

    /// Sessions in a room, in join order.
    pub fn sessions_in_room(&self, code: &RoomCode) -> impl Iterator<Item = u64> + '_ {
        self.registry.sessions_in_room(code)
    }
}

impl<E> std::fmt::Debug for ServerDriver<E>
where
    E: Environment,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerDriver")
            .field("connection_count", &self.connections.len())
            .field("room_count", &self.registry.room_count())
            .finish_non_exhaustive()
    }
}

fn validate(room: &str, name: &str) -> Result<(RoomCode, DisplayName), String> {
    let code = RoomCode::parse(room).map_err(|e| e.to_string())?;
    let name = DisplayName::parse(name).map_err(|e| e.to_string())?;
    Ok((code, name))
}

fn send(session_id: u64, message: ServerMessage) -> ServerAction {
    ServerAction::SendToSession { session_id, message }
}

fn reject(session_id: u64, message: String) -> ServerAction {
    send(session_id, ServerMessage::Error { message })
}
