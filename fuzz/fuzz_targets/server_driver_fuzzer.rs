//! Fuzz target for the server driver
//!
//! # Strategy
//!
//! - A handful of sessions connect, disconnect and send messages
//! - Messages are well-formed requests over a small set of room codes and
//!   names, or arbitrary text
//!
//! # Invariants
//!
//! - `process_event` never errors for events a real socket can produce
//! - Every live room has at least one member
//! - Every session the registry lists is a live connection
//! - A member receives nothing after its connection closed
//! - NEVER panic on any client input

#![no_main]

use std::collections::HashSet;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tocsin_proto::RoomCode;
use tocsin_server::{DriverConfig, ServerAction, ServerDriver, ServerEvent, SystemEnv};

const ROOMS: [&str; 3] = ["11111", "22222", "ab123"];
const NAMES: [&str; 3] = ["alice", "bob", " "];

#[derive(Debug, Arbitrary)]
enum Step {
    Connect(u8),
    Close(u8),
    Create { session: u8, room: u8, name: u8 },
    Join { session: u8, room: u8, name: u8 },
    Emergency { session: u8, room: u8 },
    Raw { session: u8, text: String },
}

fuzz_target!(|steps: Vec<Step>| {
    let mut driver = ServerDriver::new(SystemEnv::new(), DriverConfig { max_connections: 4 });
    let mut live: HashSet<u64> = HashSet::new();

    for step in steps.into_iter().take(256) {
        let session_of = |s: u8| u64::from(s % 6);
        let event = match step {
            Step::Connect(s) => {
                let session_id = session_of(s);
                if live.contains(&session_id) {
                    continue;
                }
                ServerEvent::ConnectionAccepted { session_id }
            },
            Step::Close(s) => {
                let session_id = session_of(s);
                live.remove(&session_id);
                ServerEvent::ConnectionClosed { session_id, reason: "fuzz".into() }
            },
            Step::Create { session, room, name } | Step::Join { session, room, name } => {
                let kind = if matches!(step, Step::Create { .. }) { "create" } else { "join" };
                let session_id = session_of(session);
                if !live.contains(&session_id) {
                    continue;
                }
                let text = format!(
                    r#"{{"type":"{kind}","room":"{}","name":"{}"}}"#,
                    ROOMS[room as usize % ROOMS.len()],
                    NAMES[name as usize % NAMES.len()]
                );
                ServerEvent::MessageReceived { session_id, text }
            },
            Step::Emergency { session, room } => {
                let session_id = session_of(session);
                if !live.contains(&session_id) {
                    continue;
                }
                let text = format!(
                    r#"{{"type":"emergency","room":"{}","name":"x"}}"#,
                    ROOMS[room as usize % ROOMS.len()]
                );
                ServerEvent::MessageReceived { session_id, text }
            },
            Step::Raw { session, text } => {
                let session_id = session_of(session);
                if !live.contains(&session_id) {
                    continue;
                }
                ServerEvent::MessageReceived { session_id, text }
            },
        };

        let accepted = match &event {
            ServerEvent::ConnectionAccepted { session_id } => Some(*session_id),
            _ => None,
        };

        let actions = driver.process_event(event).expect("socket-reachable events never error");

        if let Some(session_id) = accepted {
            let rejected = actions
                .iter()
                .any(|a| matches!(a, ServerAction::CloseConnection { session_id: s, .. } if *s == session_id));
            if !rejected {
                live.insert(session_id);
            }
        }

        for action in &actions {
            if let ServerAction::SendToSession { session_id, .. } = action {
                assert!(live.contains(session_id), "message to closed session {session_id}");
            }
        }

        assert_eq!(driver.connection_count(), live.len());
        for code in ROOMS {
            let code = RoomCode::parse(code).expect("valid fixture");
            let sessions: Vec<u64> = driver.sessions_in_room(&code).collect();
            assert_eq!(driver.has_room(&code), !sessions.is_empty());
            assert!(sessions.iter().all(|s| live.contains(s)));
        }
    }
});
