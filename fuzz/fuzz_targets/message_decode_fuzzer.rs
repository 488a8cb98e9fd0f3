//! Fuzz target for wire message decoding
//!
//! # Strategy
//!
//! - Raw bytes: arbitrary input through `decode_bytes` (UTF-8 check + JSON)
//! - Shaped JSON: objects with known and unknown `type` values and fields of
//!   the wrong JSON type
//!
//! # Invariants
//!
//! - Decoding NEVER panics
//! - Anything that decodes re-encodes (except `Unknown`) and decodes to the
//!   same value
//! - `room` values that parse as a room code stay valid after normalization

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use tocsin_proto::{ClientMessage, RoomCode, ServerMessage};

#[derive(Debug, Arbitrary)]
enum Input {
    Raw(Vec<u8>),
    Shaped { kind: u8, room: RoomValue, name: String },
}

#[derive(Debug, Arbitrary)]
enum RoomValue {
    Text(String),
    Number(i64),
    Missing,
}

const KINDS: [&str; 9] =
    ["create", "join", "emergency", "created", "joined", "members", "alert", "error", "typing"];

fuzz_target!(|input: Input| {
    let bytes = match input {
        Input::Raw(bytes) => bytes,
        Input::Shaped { kind, room, name } => {
            let kind = KINDS[kind as usize % KINDS.len()];
            let room = match room {
                RoomValue::Text(text) => format!(",\"room\":{text:?}"),
                RoomValue::Number(n) => format!(",\"room\":{n}"),
                RoomValue::Missing => String::new(),
            };
            format!("{{\"type\":\"{kind}\"{room},\"name\":{name:?}}}").into_bytes()
        },
    };

    if let Ok(message) = ClientMessage::decode_bytes(&bytes) {
        if !matches!(message, ClientMessage::Unknown) {
            let text = message.encode().expect("decoded message must encode");
            assert_eq!(ClientMessage::decode(&text).expect("re-decode"), message);
        }
        if let ClientMessage::Create { room, .. } | ClientMessage::Join { room, .. } = &message {
            if let Ok(code) = RoomCode::parse(room) {
                assert_eq!(RoomCode::parse(code.as_str()).expect("normalized"), code);
            }
        }
    }

    if let Ok(message) = ServerMessage::decode_bytes(&bytes) {
        if !matches!(message, ServerMessage::Unknown) {
            let text = message.encode().expect("decoded message must encode");
            assert_eq!(ServerMessage::decode(&text).expect("re-decode"), message);
        }
    }
});
