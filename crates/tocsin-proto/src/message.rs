//! JSON wire messages.
//!
//! Every message is a single JSON object whose `type` field selects the
//! variant. Types this build does not know decode to an `Unknown` variant so
//! peers can ignore them instead of tearing the session down.
//!
//! Client messages carry `room` and `name` as raw strings. The server
//! validates them with [`RoomCode::parse`] and [`DisplayName::parse`] so a bad
//! value produces an `error` reply rather than a decode failure. Older clients
//! send numeric room codes on `create`, so `room` also accepts a JSON integer.

use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    error::{ProtocolError, Result},
    room::{DisplayName, RoomCode},
};

/// Message sent from a client to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    /// Create room `room` and join it as `name`
    Create {
        /// Requested room code
        #[serde(deserialize_with = "room_string_or_number")]
        room: String,
        /// Caller's display name
        name: String,
    },

    /// Join the existing room `room` as `name`
    Join {
        /// Room code to join
        #[serde(deserialize_with = "room_string_or_number")]
        room: String,
        /// Caller's display name
        name: String,
    },

    /// Alert every other member of `room`
    Emergency {
        /// Room the caller believes it is in
        #[serde(deserialize_with = "room_string_or_number")]
        room: String,
        /// Caller's display name
        name: String,
    },

    /// Any `type` this build does not recognize
    #[serde(other, skip_serializing)]
    Unknown,
}

impl ClientMessage {
    /// `create` request for a validated code and name.
    pub fn create(room: &RoomCode, name: &DisplayName) -> Self {
        Self::Create { room: room.to_string(), name: name.to_string() }
    }

    /// `join` request for a validated code and name.
    pub fn join(room: &RoomCode, name: &DisplayName) -> Self {
        Self::Join { room: room.to_string(), name: name.to_string() }
    }

    /// `emergency` request for a validated code and name.
    pub fn emergency(room: &RoomCode, name: &DisplayName) -> Self {
        Self::Emergency { room: room.to_string(), name: name.to_string() }
    }

    /// Wire name of the message type, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Join { .. } => "join",
            Self::Emergency { .. } => "emergency",
            Self::Unknown => "unknown",
        }
    }

    /// Serialize to a JSON text frame.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::Encode`] for [`ClientMessage::Unknown`], which has no
    /// wire form.
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }

    /// Parse a JSON text frame.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::Malformed`] if the text is not a JSON object with a
    /// string `type`, or a known type is missing fields.
    pub fn decode(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Parse a binary frame that carries JSON.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::InvalidUtf8`] for non UTF-8 payloads, otherwise as
    /// [`ClientMessage::decode`].
    pub fn decode_bytes(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes).map_err(|_| ProtocolError::InvalidUtf8)?;
        Self::decode(text)
    }
}

/// Message sent from the server to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Room creation and join succeeded
    Created {
        /// Normalized room code
        room: String,
    },

    /// Join succeeded
    Joined {
        /// Normalized room code
        room: String,
    },

    /// Full roster snapshot in join order
    Members {
        /// Display names of every member, duplicates included
        members: Vec<String>,
    },

    /// Another member raised an emergency
    Alert {
        /// Human-readable text naming the sender
        message: String,
    },

    /// The preceding request failed
    Error {
        /// Human-readable reason
        message: String,
    },

    /// Any `type` this build does not recognize
    #[serde(other, skip_serializing)]
    Unknown,
}

impl ServerMessage {
    /// Wire name of the message type, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Created { .. } => "created",
            Self::Joined { .. } => "joined",
            Self::Members { .. } => "members",
            Self::Alert { .. } => "alert",
            Self::Error { .. } => "error",
            Self::Unknown => "unknown",
        }
    }

    /// Serialize to a JSON text frame.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::Encode`] for [`ServerMessage::Unknown`].
    pub fn encode(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }

    /// Parse a JSON text frame.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::Malformed`] for anything that is not a message object.
    pub fn decode(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Parse a binary frame that carries JSON.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::InvalidUtf8`] for non UTF-8 payloads, otherwise as
    /// [`ServerMessage::decode`].
    pub fn decode_bytes(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes).map_err(|_| ProtocolError::InvalidUtf8)?;
        Self::decode(text)
    }
}

fn room_string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawRoom {
        Text(String),
        Number(u64),
    }

    Ok(match RawRoom::deserialize(deserializer)? {
        RawRoom::Text(text) => text,
        RawRoom::Number(n) => n.to_string(),
    })
}
