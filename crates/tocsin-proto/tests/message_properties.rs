//! Property-based tests for wire messages and input validation
//!
//! Checks that validation is stable under normalization and that decoding
//! never panics on hostile input, only returns errors.

use proptest::prelude::*;
use tocsin_proto::{ClientMessage, DisplayName, MAX_NAME_LEN, RoomCode, ServerMessage};

/// Strategy for room codes as a user might type them
fn typed_room_code() -> impl Strategy<Value = String> {
    ("[a-zA-Z0-9]{5,6}", " {0,2}", " {0,2}").prop_map(|(code, pre, post)| format!("{pre}{code}{post}"))
}

/// Strategy for server messages that have a wire form
fn arbitrary_server_message() -> impl Strategy<Value = ServerMessage> {
    prop_oneof![
        "[0-9]{5}".prop_map(|room| ServerMessage::Created { room }),
        "[0-9]{5}".prop_map(|room| ServerMessage::Joined { room }),
        prop::collection::vec("\\PC{1,32}", 0..8).prop_map(|members| ServerMessage::Members { members }),
        "\\PC{0,64}".prop_map(|message| ServerMessage::Alert { message }),
        "\\PC{0,64}".prop_map(|message| ServerMessage::Error { message }),
    ]
}

proptest! {
    #[test]
    fn room_code_parse_is_idempotent(input in typed_room_code()) {
        let code = RoomCode::parse(&input).unwrap();
        let reparsed = RoomCode::parse(code.as_str()).unwrap();

        prop_assert_eq!(&code, &reparsed);
        prop_assert!(code.as_str().bytes().all(|b| !b.is_ascii_lowercase()));
    }

    #[test]
    fn room_code_rejects_out_of_range_lengths(input in "[a-zA-Z0-9]{0,4}|[a-zA-Z0-9]{7,12}") {
        prop_assert!(RoomCode::parse(&input).is_err());
    }

    #[test]
    fn accepted_names_are_trimmed_and_bounded(input in "\\PC{0,48}") {
        if let Ok(name) = DisplayName::parse(&input) {
            prop_assert_eq!(name.as_str(), input.trim());
            prop_assert!(!name.as_str().is_empty());
            prop_assert!(name.as_str().chars().count() <= MAX_NAME_LEN);
        }
    }

    #[test]
    fn numeric_and_string_rooms_decode_identically(room in 10_000u32..100_000, name in "[a-z]{1,10}") {
        let numeric = format!(r#"{{"type":"join","room":{room},"name":"{name}"}}"#);
        let textual = format!(r#"{{"type":"join","room":"{room}","name":"{name}"}}"#);

        prop_assert_eq!(
            ClientMessage::decode(&numeric).unwrap(),
            ClientMessage::decode(&textual).unwrap()
        );
    }

    #[test]
    fn server_messages_survive_the_wire(msg in arbitrary_server_message()) {
        let text = msg.encode().unwrap();
        prop_assert_eq!(ServerMessage::decode(&text).unwrap(), msg);
    }

    #[test]
    fn decoding_garbage_never_panics(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = ClientMessage::decode_bytes(&bytes);
        let _ = ServerMessage::decode_bytes(&bytes);
    }
}
