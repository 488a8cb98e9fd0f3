//! Connection manager state machine.
//!
//! The `ConnectionManager` owns the [`Session`] and the [`BookmarkList`] and
//! is the only thing that mutates them. It never touches a socket or a disk:
//! every effect comes back as a [`ClientAction`] for the caller to execute.
//!
//! # Lifecycle
//!
//! ```text
//! Disconnected --create/join--> Connecting --created/joined--> Joined
//!      ^                            |                            |
//!      +---- error / fault / leave -+----------------------------+
//! ```
//!
//! A rename while `Joined` reconnects under the new name. There is no
//! automatic reconnection: after a fault the manager stays `Disconnected`
//! until the user acts.

use tocsin_core::{Environment, LogLevel, generate_display_name, generate_room_code};
use tocsin_proto::{ClientMessage, DisplayName, RoomCode, ServerMessage};

use crate::{
    bookmarks::BookmarkList,
    error::ClientError,
    event::{ClientAction, ClientEvent, TransportId},
    session::{ConnectionState, JoinIntent, Session},
    store::PersistedSession,
};

/// Alert title for an emergency raised by another member.
pub const EMERGENCY_TITLE: &str = "Emergency!";

/// Alert title for a server `error` reply.
pub const ERROR_TITLE: &str = "Error";

/// Alert title for a transport fault.
pub const CONNECTION_ERROR_TITLE: &str = "Connection error";

/// Alert body for a transport fault.
pub const UNREACHABLE_MESSAGE: &str = "The server is unreachable!";

/// Client-side room session state machine.
pub struct ConnectionManager<E: Environment> {
    env: E,
    session: Session,
    bookmarks: BookmarkList,
    /// Last roster snapshot for the current room.
    members: Vec<String>,
    next_transport: u64,
}

impl<E: Environment> ConnectionManager<E> {
    /// Create a disconnected manager with no stored state.
    pub fn new(env: E, name: DisplayName) -> Self {
        Self {
            env,
            session: Session::new(name),
            bookmarks: BookmarkList::new(),
            members: Vec::new(),
            next_transport: 1,
        }
    }

    /// Rebuild the manager from persisted values.
    ///
    /// A missing or invalid name is replaced by a generated one and persisted
    /// immediately. An invalid stored room is cleared. If a room remains, the
    /// returned actions open a transport and rejoin it with `join`, never
    /// `create`.
    pub fn restore(env: E, persisted: PersistedSession) -> (Self, Vec<ClientAction>) {
        let mut actions = Vec::new();

        let stored_name = persisted.name.as_deref().map(DisplayName::parse);
        let name = match stored_name {
            Some(Ok(name)) => name,
            other => {
                if let Some(Err(e)) = other {
                    actions.push(log(LogLevel::Warn, format!("discarding stored name: {e}")));
                }
                let name = generate_display_name(&env);
                actions.push(ClientAction::PersistName(name.clone()));
                actions.push(log(LogLevel::Info, format!("generated display name {name}")));
                name
            },
        };

        let bookmarks = BookmarkList::from_codes(
            persisted.bookmarks.iter().filter_map(|code| RoomCode::parse(code).ok()),
        );

        let room = match persisted.room.as_deref().map(RoomCode::parse) {
            Some(Ok(room)) => Some(room),
            Some(Err(e)) => {
                actions.push(ClientAction::PersistRoom(None));
                actions.push(log(LogLevel::Warn, format!("discarding stored room: {e}")));
                None
            },
            None => None,
        };

        let mut manager = Self::new(env, name);
        manager.bookmarks = bookmarks;

        if let Some(room) = room {
            manager.session.room = Some(room.clone());
            actions.push(ClientAction::RoomChanged(Some(room.clone())));
            actions.push(log(LogLevel::Info, format!("rejoining room {room}")));
            actions.extend(manager.connect(room, JoinIntent::Join));
        }

        (manager, actions)
    }

    /// Current session.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Current display name.
    pub fn name(&self) -> &DisplayName {
        &self.session.name
    }

    /// Room the server last acknowledged (or the one being rejoined).
    pub fn room(&self) -> Option<&RoomCode> {
        self.session.room.as_ref()
    }

    /// Connection lifecycle state.
    pub fn state(&self) -> &ConnectionState {
        &self.session.state
    }

    /// Last roster snapshot, in join order.
    pub fn members(&self) -> &[String] {
        &self.members
    }

    /// Bookmarked rooms.
    pub fn bookmarks(&self) -> &BookmarkList {
        &self.bookmarks
    }

    /// Process an event and return the actions to execute, in order.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Validation`] if a typed room code or name is invalid
    /// - [`ClientError::NotJoined`] if an emergency is raised outside a room
    ///
    /// On error nothing changed and no transport was touched.
    pub fn handle(&mut self, event: ClientEvent) -> Result<Vec<ClientAction>, ClientError> {
        match event {
            ClientEvent::CreateRoom => Ok(self.handle_create()),
            ClientEvent::JoinRoom { room } => self.handle_join(&room),
            ClientEvent::LeaveRoom => Ok(self.handle_leave()),
            ClientEvent::Rename { name } => self.handle_rename(&name),
            ClientEvent::RaiseEmergency => self.handle_emergency(),
            ClientEvent::ForgetBookmark { room } => self.handle_forget(&room),
            ClientEvent::TransportOpened { transport } => Ok(self.handle_opened(transport)),
            ClientEvent::MessageReceived { transport, text } => {
                Ok(self.handle_message(transport, &text))
            },
            ClientEvent::TransportFailed { transport, reason } => {
                Ok(self.handle_fault(transport, &reason))
            },
            ClientEvent::TransportClosed { transport } => {
                Ok(self.handle_fault(transport, "closed by server"))
            },
        }
    }

    fn handle_create(&mut self) -> Vec<ClientAction> {
        let room = generate_room_code(&self.env);
        self.connect(room, JoinIntent::Create)
    }

    fn handle_join(&mut self, input: &str) -> Result<Vec<ClientAction>, ClientError> {
        let room = RoomCode::parse(input)?;

        let current = match &self.session.state {
            ConnectionState::Connecting { room, .. } | ConnectionState::Joined { room, .. } => {
                Some(room)
            },
            ConnectionState::Disconnected => None,
        };
        if current == Some(&room) {
            return Ok(vec![log(LogLevel::Debug, format!("already in room {room}"))]);
        }

        Ok(self.connect(room, JoinIntent::Join))
    }

    fn handle_leave(&mut self) -> Vec<ClientAction> {
        let Some(transport) = self.session.state.transport() else {
            return vec![log(LogLevel::Debug, "leave ignored: not in a room".to_string())];
        };

        let mut actions = vec![ClientAction::CloseTransport { transport }];
        self.session.state = ConnectionState::Disconnected;
        actions.extend(self.clear_room());
        actions.push(log(LogLevel::Info, "left room".to_string()));
        actions
    }

    fn handle_rename(&mut self, input: &str) -> Result<Vec<ClientAction>, ClientError> {
        let name = DisplayName::parse(input)?;
        if name == self.session.name {
            return Ok(vec![log(LogLevel::Debug, format!("already named {name}"))]);
        }

        self.session.name = name.clone();
        let mut actions = vec![
            ClientAction::PersistName(name.clone()),
            log(LogLevel::Info, format!("renamed to {name}")),
        ];

        match self.session.state.clone() {
            ConnectionState::Disconnected => {},
            ConnectionState::Connecting { room, intent, .. } => {
                actions.extend(self.connect(room, intent));
            },
            ConnectionState::Joined { room, .. } => {
                // Closing the old transport deletes a room we were alone in
                let intent =
                    if self.members.len() <= 1 { JoinIntent::Create } else { JoinIntent::Join };
                actions.extend(self.connect(room, intent));
            },
        }

        Ok(actions)
    }

    fn handle_emergency(&self) -> Result<Vec<ClientAction>, ClientError> {
        let ConnectionState::Joined { transport, room } = &self.session.state else {
            return Err(ClientError::NotJoined);
        };

        Ok(vec![
            ClientAction::Send {
                transport: *transport,
                message: ClientMessage::emergency(room, &self.session.name),
            },
            log(LogLevel::Info, format!("raised emergency in room {room}")),
        ])
    }

    fn handle_forget(&mut self, input: &str) -> Result<Vec<ClientAction>, ClientError> {
        let room = RoomCode::parse(input)?;

        if !self.bookmarks.remove(&room) {
            return Ok(vec![log(LogLevel::Debug, format!("room {room} was not bookmarked"))]);
        }

        Ok(vec![ClientAction::PersistBookmarks(self.bookmarks.as_slice().to_vec())])
    }

    fn handle_opened(&mut self, transport: TransportId) -> Vec<ClientAction> {
        if let Some(stale) = self.discard_stale(transport, "open") {
            return stale;
        }

        let name = self.session.name.clone();
        match &mut self.session.state {
            ConnectionState::Connecting { room, intent, opened, .. } if !*opened => {
                *opened = true;
                let message = match intent {
                    JoinIntent::Create => ClientMessage::create(room, &name),
                    JoinIntent::Join => ClientMessage::join(room, &name),
                };
                vec![
                    log(
                        LogLevel::Debug,
                        format!("transport {transport} open, sending {}", message.kind()),
                    ),
                    ClientAction::Send { transport, message },
                ]
            },
            _ => vec![log(LogLevel::Warn, format!("transport {transport} reported open twice"))],
        }
    }

    fn handle_message(&mut self, transport: TransportId, text: &str) -> Vec<ClientAction> {
        if let Some(stale) = self.discard_stale(transport, "message") {
            return stale;
        }

        let message = match ServerMessage::decode(text) {
            Ok(message) => message,
            Err(e) => {
                return vec![log(LogLevel::Warn, format!("ignoring undecodable message: {e}"))];
            },
        };

        match message {
            ServerMessage::Created { room } | ServerMessage::Joined { room } => {
                self.handle_associated(transport, &room)
            },
            ServerMessage::Members { members } => {
                self.members = members.clone();
                vec![ClientAction::MembersChanged(members)]
            },
            ServerMessage::Alert { message } => {
                vec![ClientAction::Notify { title: EMERGENCY_TITLE.to_string(), message }]
            },
            ServerMessage::Error { message } => {
                let mut actions = vec![ClientAction::CloseTransport { transport }];
                self.session.state = ConnectionState::Disconnected;
                actions.extend(self.clear_room());
                actions.push(log(LogLevel::Warn, format!("server error: {message}")));
                actions.push(ClientAction::Notify { title: ERROR_TITLE.to_string(), message });
                actions
            },
            ServerMessage::Unknown => {
                vec![log(LogLevel::Debug, "ignoring message of unknown type".to_string())]
            },
        }
    }

    fn handle_associated(&mut self, transport: TransportId, acked: &str) -> Vec<ClientAction> {
        let ConnectionState::Connecting { room, .. } = &self.session.state else {
            return vec![log(LogLevel::Debug, format!("duplicate acknowledgement for {acked}"))];
        };

        if RoomCode::parse(acked).ok().as_ref() != Some(room) {
            return vec![log(
                LogLevel::Warn,
                format!("ignoring acknowledgement for {acked}, expected {room}"),
            )];
        }

        let room = room.clone();
        self.session.state = ConnectionState::Joined { transport, room: room.clone() };
        self.session.room = Some(room.clone());

        let mut actions = vec![
            ClientAction::PersistRoom(Some(room.clone())),
            ClientAction::RoomChanged(Some(room.clone())),
        ];
        if self.bookmarks.add(room.clone()) {
            actions.push(ClientAction::PersistBookmarks(self.bookmarks.as_slice().to_vec()));
        }
        actions.push(log(LogLevel::Info, format!("joined room {room} as {}", self.session.name)));
        actions
    }

    fn handle_fault(&mut self, transport: TransportId, reason: &str) -> Vec<ClientAction> {
        if let Some(stale) = self.discard_stale(transport, "fault") {
            return stale;
        }

        self.session.state = ConnectionState::Disconnected;
        let mut actions = self.clear_room();
        actions.push(log(LogLevel::Warn, format!("transport {transport} failed: {reason}")));
        actions.push(ClientAction::Notify {
            title: CONNECTION_ERROR_TITLE.to_string(),
            message: UNREACHABLE_MESSAGE.to_string(),
        });
        actions
    }

    /// Replace the current transport with a new one headed for `room`.
    fn connect(&mut self, room: RoomCode, intent: JoinIntent) -> Vec<ClientAction> {
        let mut actions = Vec::new();

        if let Some(old) = self.session.state.transport() {
            actions.push(ClientAction::CloseTransport { transport: old });
        }
        if self.session.room.as_ref().is_some_and(|current| *current != room) {
            actions.extend(self.clear_room());
        }

        let transport = TransportId(self.next_transport);
        self.next_transport += 1;
        self.session.state =
            ConnectionState::Connecting { transport, room: room.clone(), intent, opened: false };

        actions.push(ClientAction::OpenTransport { transport });
        actions.push(log(LogLevel::Debug, format!("opening transport {transport} for room {room}")));
        actions
    }

    /// Forget the current room and roster.
    fn clear_room(&mut self) -> Vec<ClientAction> {
        let mut actions = Vec::new();
        if self.session.room.take().is_some() {
            actions.push(ClientAction::PersistRoom(None));
            actions.push(ClientAction::RoomChanged(None));
        }
        if !self.members.is_empty() {
            self.members.clear();
            actions.push(ClientAction::MembersChanged(Vec::new()));
        }
        actions
    }

    fn discard_stale(&self, transport: TransportId, what: &str) -> Option<Vec<ClientAction>> {
        if self.session.state.transport() == Some(transport) {
            return None;
        }
        Some(vec![log(LogLevel::Debug, format!("discarding {what} from stale transport {transport}"))])
    }
}

fn log(level: LogLevel, message: String) -> ClientAction {
    ClientAction::Log { level, message }
}
