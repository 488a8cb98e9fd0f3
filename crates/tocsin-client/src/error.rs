//! Client error types.
//!
//! These are errors the manager returns instead of actions: the request was
//! refused locally and nothing changed. Server `error` messages and transport
//! faults are not errors here; they are events that drive the manager to
//! `Disconnected`.

use thiserror::Error;
use tocsin_proto::ValidationError;

/// Errors that can occur while handling a user intent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Input rejected before any I/O.
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// Emergency raised while not joined to a room.
    #[error("not joined to a room")]
    NotJoined,
}

impl ClientError {
    /// Alert title and body to show the user for this error.
    pub fn alert(&self) -> (&'static str, String) {
        match self {
            Self::Validation(ValidationError::InvalidRoomCode(_)) => {
                ("Error", "Please enter a valid room code.".to_string())
            },
            Self::Validation(e) => ("Error", format!("Please enter a valid name: {e}.")),
            Self::NotJoined => ("Error", "Not connected to a room!".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_room_code_asks_for_a_valid_one() {
        let err = ClientError::from(ValidationError::InvalidRoomCode("12".into()));
        assert_eq!(err.alert(), ("Error", "Please enter a valid room code.".to_string()));
    }

    #[test]
    fn not_joined_alert() {
        assert_eq!(ClientError::NotJoined.alert().1, "Not connected to a room!");
        assert_eq!(ClientError::NotJoined.to_string(), "not joined to a room");
    }
}
