//! Fuzz target for the client connection manager
//!
//! # Strategy
//!
//! - Arbitrary interleavings of user intents and transport events
//! - Transport events carry current, stale or never-issued transport ids
//! - Server messages are well-formed replies or arbitrary text
//!
//! # Invariants
//!
//! - `handle` only fails for invalid input or an emergency outside a room
//! - At most one transport is open at any time
//! - A `Joined` state always has the session room set to the joined room
//! - `Disconnected` never keeps a room
//! - Bookmarks stay duplicate-free and bounded
//! - NEVER panic

#![no_main]

use std::collections::HashSet;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tocsin_client::{
    ClientAction, ClientError, ClientEvent, ConnectionManager, ConnectionState, MAX_BOOKMARKS,
    PersistedSession, TransportId,
};
use tocsin_core::SystemEnv;

#[derive(Debug, Arbitrary)]
enum Input {
    Create,
    Join(String),
    Leave,
    Rename(String),
    Emergency,
    Forget(String),
    Opened(Which),
    Reply { which: Which, reply: Reply },
    Failed(Which),
    Closed(Which),
}

#[derive(Debug, Arbitrary)]
enum Which {
    Current,
    Previous,
    Id(u64),
}

#[derive(Debug, Arbitrary)]
enum Reply {
    Ack,
    OtherAck(String),
    Members(Vec<String>),
    Alert(String),
    Error(String),
    Raw(String),
}

fuzz_target!(|data: (Option<String>, Option<String>, Vec<Input>)| {
    let (name, room, inputs) = data;
    let persisted = PersistedSession { name, room, bookmarks: Vec::new() };
    let (mut manager, actions) = ConnectionManager::restore(SystemEnv::new(), persisted);

    let mut open: Option<TransportId> = None;
    let mut previous = TransportId(0);
    track(&actions, &mut open, &mut previous);

    for input in inputs.into_iter().take(128) {
        let pick = |which: &Which, current: Option<TransportId>| match which {
            Which::Current => current.unwrap_or(previous),
            Which::Previous => previous,
            Which::Id(n) => TransportId(*n),
        };
        let current = manager.state().transport();

        let event = match input {
            Input::Create => ClientEvent::CreateRoom,
            Input::Join(room) => ClientEvent::JoinRoom { room },
            Input::Leave => ClientEvent::LeaveRoom,
            Input::Rename(name) => ClientEvent::Rename { name },
            Input::Emergency => ClientEvent::RaiseEmergency,
            Input::Forget(room) => ClientEvent::ForgetBookmark { room },
            Input::Opened(which) => ClientEvent::TransportOpened { transport: pick(&which, current) },
            Input::Failed(which) => ClientEvent::TransportFailed {
                transport: pick(&which, current),
                reason: "fuzz".into(),
            },
            Input::Closed(which) => ClientEvent::TransportClosed { transport: pick(&which, current) },
            Input::Reply { which, reply } => {
                let text = match reply {
                    Reply::Ack => match manager.state() {
                        ConnectionState::Connecting { room, .. } => {
                            format!(r#"{{"type":"joined","room":"{room}"}}"#)
                        },
                        _ => r#"{"type":"joined","room":"00000"}"#.to_string(),
                    },
                    Reply::OtherAck(room) => format!(r#"{{"type":"created","room":{room:?}}}"#),
                    Reply::Members(members) => format!(r#"{{"type":"members","members":{members:?}}}"#),
                    Reply::Alert(message) => format!(r#"{{"type":"alert","message":{message:?}}}"#),
                    Reply::Error(message) => format!(r#"{{"type":"error","message":{message:?}}}"#),
                    Reply::Raw(text) => text,
                };
                ClientEvent::MessageReceived { transport: pick(&which, current), text }
            },
        };

        let is_transport_event = matches!(
            event,
            ClientEvent::TransportOpened { .. }
                | ClientEvent::MessageReceived { .. }
                | ClientEvent::TransportFailed { .. }
                | ClientEvent::TransportClosed { .. }
        );

        match manager.handle(event) {
            Ok(actions) => track(&actions, &mut open, &mut previous),
            Err(ClientError::Validation(_) | ClientError::NotJoined) => {
                assert!(!is_transport_event, "transport events never fail");
            },
        }

        // Faults end a transport without a close action
        if manager.state().transport().is_none() {
            open = None;
        }
        assert_eq!(open, manager.state().transport());

        match manager.state() {
            ConnectionState::Joined { room, .. } => assert_eq!(manager.room(), Some(room)),
            ConnectionState::Disconnected => assert_eq!(manager.room(), None),
            ConnectionState::Connecting { .. } => {},
        }

        let bookmarks = manager.bookmarks().as_slice();
        assert!(bookmarks.len() <= MAX_BOOKMARKS);
        assert_eq!(bookmarks.iter().collect::<HashSet<_>>().len(), bookmarks.len());
    }
});

fn track(actions: &[ClientAction], open: &mut Option<TransportId>, previous: &mut TransportId) {
    for action in actions {
        match action {
            ClientAction::OpenTransport { transport } => {
                assert!(open.is_none(), "second transport opened");
                *open = Some(*transport);
            },
            ClientAction::CloseTransport { transport } => {
                assert_eq!(*open, Some(*transport));
                *previous = *transport;
                *open = None;
            },
            _ => {},
        }
    }
}
