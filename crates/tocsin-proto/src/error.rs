//! Protocol error types.

use thiserror::Error;

/// Result alias for protocol operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while encoding or decoding wire messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Inbound text was not a well-formed message
    #[error("malformed message: {0}")]
    Malformed(String),

    /// Binary frame did not contain UTF-8 text
    #[error("message is not valid UTF-8")]
    InvalidUtf8,

    /// Message could not be serialized
    #[error("failed to encode message: {0}")]
    Encode(String),
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_errors_become_malformed() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(matches!(ProtocolError::from(err), ProtocolError::Malformed(_)));
    }

    #[test]
    fn display_names_the_failure() {
        assert_eq!(ProtocolError::InvalidUtf8.to_string(), "message is not valid UTF-8");
        assert_eq!(
            ProtocolError::Encode("boom".into()).to_string(),
            "failed to encode message: boom"
        );
    }
}
