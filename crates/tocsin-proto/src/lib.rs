//! Tocsin wire protocol.
//!
//! One JSON object per WebSocket message, discriminated by a `type` field.
//! Clients send [`ClientMessage`] (`create`, `join`, `emergency`); the server
//! answers with [`ServerMessage`] (`created`, `joined`, `members`, `alert`,
//! `error`).
//!
//! Validated input types ([`RoomCode`], [`DisplayName`]) live here too so the
//! client rejects bad input before any I/O and the server applies the exact
//! same rules to what arrives on the wire.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod error;
pub mod message;
pub mod room;

pub use error::{ProtocolError, Result};
pub use message::{ClientMessage, ServerMessage};
pub use room::{DisplayName, MAX_NAME_LEN, RoomCode, ValidationError};
