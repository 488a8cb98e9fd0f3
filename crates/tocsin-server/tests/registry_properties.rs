//! Property-based tests for RoomRegistry
//!
//! Random sequences of create / join / leave / rename / emergency from a
//! handful of sessions over a handful of room codes. After every step the
//! registry must agree with a naive model and keep its structural invariants.

use std::collections::HashMap;

use proptest::prelude::*;
use tocsin_proto::{DisplayName, RoomCode};
use tocsin_server::{RoomError, RoomRegistry};

const ROOMS: [&str; 3] = ["11111", "22222", "33333"];
const NAMES: [&str; 4] = ["alice", "bob", "carol", "alice"];

#[derive(Debug, Clone)]
enum Op {
    Create { session: u64, room: usize, name: usize },
    Join { session: u64, room: usize, name: usize },
    Leave { session: u64 },
    Rename { session: u64, name: usize },
    Emergency { session: u64, room: usize },
}

fn arbitrary_op() -> impl Strategy<Value = Op> {
    let session = 0u64..5;
    let room = 0..ROOMS.len();
    let name = 0..NAMES.len();
    prop_oneof![
        (session.clone(), room.clone(), name.clone())
            .prop_map(|(session, room, name)| Op::Create { session, room, name }),
        (session.clone(), room.clone(), name.clone())
            .prop_map(|(session, room, name)| Op::Join { session, room, name }),
        session.clone().prop_map(|session| Op::Leave { session }),
        (session.clone(), name).prop_map(|(session, name)| Op::Rename { session, name }),
        (session, room).prop_map(|(session, room)| Op::Emergency { session, room }),
    ]
}

fn code(i: usize) -> RoomCode {
    RoomCode::parse(ROOMS[i]).unwrap()
}

fn name(i: usize) -> DisplayName {
    DisplayName::parse(NAMES[i]).unwrap()
}

/// Naive model: each room is an ordered list of (session, name).
#[derive(Default)]
struct Model {
    rooms: HashMap<RoomCode, Vec<(u64, String)>>,
}

impl Model {
    fn room_of(&self, session: u64) -> Option<RoomCode> {
        self.rooms
            .iter()
            .find(|(_, members)| members.iter().any(|(s, _)| *s == session))
            .map(|(code, _)| code.clone())
    }

    fn leave(&mut self, session: u64) {
        if let Some(code) = self.room_of(session) {
            let members = self.rooms.get_mut(&code).unwrap();
            members.retain(|(s, _)| *s != session);
            if members.is_empty() {
                self.rooms.remove(&code);
            }
        }
    }

    fn roster(&self, code: &RoomCode) -> Vec<String> {
        self.rooms
            .get(code)
            .map(|members| members.iter().map(|(_, n)| n.clone()).collect())
            .unwrap_or_default()
    }
}

fn apply(registry: &mut RoomRegistry<u64>, model: &mut Model, op: &Op) {
    match *op {
        Op::Create { session, room, name: n } => {
            if model.room_of(session).is_some() {
                registry.leave_room(session);
                model.leave(session);
            }
            let result = registry.create_room(session, code(room), name(n), 0);
            if model.rooms.contains_key(&code(room)) {
                assert_eq!(result, Err(RoomError::RoomExists(code(room))));
            } else {
                model.rooms.insert(code(room), vec![(session, NAMES[n].to_string())]);
                assert_eq!(result.unwrap(), model.roster(&code(room)));
            }
        },
        Op::Join { session, room, name: n } => {
            if model.room_of(session).is_some() {
                registry.leave_room(session);
                model.leave(session);
            }
            let result = registry.join_room(session, &code(room), name(n));
            match model.rooms.get_mut(&code(room)) {
                Some(members) => {
                    members.push((session, NAMES[n].to_string()));
                    assert_eq!(result.unwrap(), model.roster(&code(room)));
                },
                None => assert_eq!(result, Err(RoomError::RoomNotFound(code(room)))),
            }
        },
        Op::Leave { session } => {
            let departure = registry.leave_room(session);
            assert_eq!(departure.is_some(), model.room_of(session).is_some());
            model.leave(session);
        },
        Op::Rename { session, name: n } => {
            let result = registry.rename_member(session, name(n));
            match model.room_of(session) {
                Some(room) => {
                    let members = model.rooms.get_mut(&room).unwrap();
                    members.retain(|(s, _)| *s != session);
                    members.push((session, NAMES[n].to_string()));
                    assert_eq!(result.unwrap(), (room.clone(), model.roster(&room)));
                },
                None => assert!(result.is_err()),
            }
        },
        Op::Emergency { session, room } => {
            let result = registry.emergency(session, &code(room));
            if model.room_of(session) == Some(code(room)) {
                let expected: Vec<u64> = model.rooms[&code(room)]
                    .iter()
                    .map(|(s, _)| *s)
                    .filter(|s| *s != session)
                    .collect();
                assert_eq!(result.unwrap(), expected);
            } else {
                assert!(matches!(result, Err(RoomError::NotInRoom { .. })));
            }
        },
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: the registry matches the naive model after every operation
    #[test]
    fn prop_registry_matches_model(ops in prop::collection::vec(arbitrary_op(), 1..60)) {
        let mut registry = RoomRegistry::new();
        let mut model = Model::default();

        for op in &ops {
            apply(&mut registry, &mut model, op);

            for (i, _) in ROOMS.iter().enumerate() {
                prop_assert_eq!(registry.roster(&code(i)), model.roster(&code(i)));
                prop_assert_eq!(registry.has_room(&code(i)), model.rooms.contains_key(&code(i)));
            }
            for session in 0..5 {
                prop_assert_eq!(registry.room_of(session).cloned(), model.room_of(session));
            }
        }
    }

    /// Property: rooms are never empty and sessions are never in two rooms
    #[test]
    fn prop_structural_invariants(ops in prop::collection::vec(arbitrary_op(), 1..60)) {
        let mut registry = RoomRegistry::new();
        let mut model = Model::default();

        for op in &ops {
            apply(&mut registry, &mut model, op);
        }

        let mut seen = HashMap::new();
        for (i, _) in ROOMS.iter().enumerate() {
            let sessions: Vec<u64> = registry.sessions_in_room(&code(i)).collect();
            if registry.has_room(&code(i)) {
                prop_assert!(!sessions.is_empty());
            }
            for session in sessions {
                prop_assert!(seen.insert(session, i).is_none(), "session {} in two rooms", session);
            }
        }
        prop_assert_eq!(registry.member_count(), seen.len());
    }
}
