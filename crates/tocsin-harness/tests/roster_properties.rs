//! Property tests for roster consistency between clients and server.
//!
//! Random sequences of user actions, network faults and restarts are applied
//! to a simulated world. After each one the world is run to quiescence and
//! the server registry, the client sessions and what each UI shows must all
//! agree.

use std::collections::HashMap;

use proptest::prelude::*;
use tocsin_client::{ClientEvent, ConnectionState};
use tocsin_harness::SimWorld;

const CLIENTS: usize = 4;

#[derive(Debug, Clone)]
enum Op {
    Create(usize),
    /// First client joins the second client's room
    Join(usize, usize),
    Leave(usize),
    Rename(usize, u8),
    Emergency(usize),
    Drop(usize),
    Restart(usize),
}

fn op() -> impl Strategy<Value = Op> {
    let client = 0..CLIENTS;
    prop_oneof![
        2 => client.clone().prop_map(Op::Create),
        4 => (client.clone(), client.clone()).prop_map(|(a, b)| Op::Join(a, b)),
        1 => client.clone().prop_map(Op::Leave),
        2 => (client.clone(), 0u8..4).prop_map(|(c, n)| Op::Rename(c, n)),
        2 => client.clone().prop_map(Op::Emergency),
        1 => client.clone().prop_map(Op::Drop),
        1 => client.prop_map(Op::Restart),
    ]
}

fn check_consistent(world: &SimWorld) -> Result<(), TestCaseError> {
    prop_assert!(world.violations().is_empty(), "violations: {:?}", world.violations());

    let mut joined_per_room = HashMap::new();
    for id in 0..world.client_count() {
        let client = world.client(id);
        let manager = client.manager();
        prop_assert_eq!(client.shown_room(), manager.room());

        match manager.state() {
            ConnectionState::Connecting { .. } => {
                prop_assert!(false, "client {} still connecting after quiescence", id);
            },
            ConnectionState::Disconnected => {
                prop_assert_eq!(manager.room(), None);
                prop_assert!(client.shown_members().is_empty());
            },
            ConnectionState::Joined { room, .. } => {
                let session = world.session_of(id);
                prop_assert!(session.is_some());
                prop_assert_eq!(session.and_then(|s| world.server().room_of(s)), Some(room));
                let roster = world.server().roster(room);
                prop_assert_eq!(client.shown_members(), roster.as_slice());
                *joined_per_room.entry(room.clone()).or_insert(0usize) += 1;
            },
        }
    }

    prop_assert_eq!(world.server().room_count(), joined_per_room.len());
    for (room, joined) in joined_per_room {
        prop_assert_eq!(world.server().roster(&room).len(), joined);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn clients_and_server_agree(seed in any::<u64>(), ops in prop::collection::vec(op(), 1..40)) {
        let mut world = SimWorld::new(seed);
        for n in 0..CLIENTS {
            world.add_named(&format!("client{n}"));
        }

        for op in ops {
            let mut expected_alerts = None;

            match op {
                Op::Create(c) => world.intent(c, ClientEvent::CreateRoom).unwrap(),
                Op::Join(c, target) => {
                    let Some(room) = world.client(target).manager().room().cloned() else {
                        continue;
                    };
                    world.intent(c, ClientEvent::JoinRoom { room: room.to_string() }).unwrap();
                },
                Op::Leave(c) => world.intent(c, ClientEvent::LeaveRoom).unwrap(),
                Op::Rename(c, n) => {
                    world.intent(c, ClientEvent::Rename { name: format!("name{n}") }).unwrap();
                },
                Op::Emergency(c) => {
                    let ConnectionState::Joined { room, .. } = world.client(c).manager().state()
                    else {
                        prop_assert!(world.intent(c, ClientEvent::RaiseEmergency).is_err());
                        continue;
                    };
                    let room = room.clone();
                    let before: Vec<usize> =
                        (0..CLIENTS).map(|id| world.client(id).emergencies().len()).collect();
                    let recipients: Vec<usize> = (0..CLIENTS)
                        .filter(|&id| {
                            id != c
                                && matches!(world.client(id).manager().state(),
                                    ConnectionState::Joined { room: r, .. } if *r == room)
                        })
                        .collect();
                    expected_alerts = Some((before, recipients));
                    world.intent(c, ClientEvent::RaiseEmergency).unwrap();
                },
                Op::Drop(c) => world.drop_connection(c),
                Op::Restart(c) => world.restart(c),
            }

            world.run_until_idle();
            check_consistent(&world)?;

            if let Some((before, recipients)) = expected_alerts {
                for id in 0..CLIENTS {
                    let gained = world.client(id).emergencies().len() - before[id];
                    let expected = usize::from(recipients.contains(&id));
                    prop_assert_eq!(gained, expected, "client {} alert count", id);
                }
            }
        }
    }
}
