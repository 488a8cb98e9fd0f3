//! Driver error types.
//!
//! Request-level failures (bad room code, unknown room, emergency from a
//! non-member) are not errors at this level: the driver answers them with an
//! `error` message and carries on. What remains here are runtime contract
//! violations.

use std::fmt;

/// Errors that can occur while the driver processes an event.
#[derive(Debug)]
pub enum ServerError {
    /// Session not found.
    ///
    /// The runtime delivered a message for a session it never announced, or
    /// one it already closed. Indicates a runtime bug.
    SessionNotFound(u64),

    /// Session already registered.
    ///
    /// Attempting to accept a session ID that is still live. Session IDs must
    /// be unique. Fatal for the new connection.
    SessionAlreadyExists(u64),
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SessionNotFound(id) => write!(f, "session not found: {id}"),
            Self::SessionAlreadyExists(id) => write!(f, "session already exists: {id}"),
        }
    }
}

impl std::error::Error for ServerError {}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn server_error_display() {
        let err = ServerError::SessionNotFound(42);
        assert_eq!(err.to_string(), "session not found: 42");

        let err = ServerError::SessionAlreadyExists(123);
        assert_eq!(err.to_string(), "session already exists: 123");
    }

    #[test]
    fn contract_errors_have_no_source() {
        assert!(ServerError::SessionNotFound(1).source().is_none());
        assert!(ServerError::SessionAlreadyExists(1).source().is_none());
    }
}
