//! Validated room codes and display names.
//!
//! Both types are only constructible through `parse`, so holding one is proof
//! the value passed validation. Validation never performs I/O and is shared by
//! client and server.

use std::{fmt, str::FromStr};

use thiserror::Error;

/// Minimum room code length in characters.
pub const MIN_ROOM_CODE_LEN: usize = 5;

/// Maximum room code length in characters.
pub const MAX_ROOM_CODE_LEN: usize = 6;

/// Maximum display name length in characters (after trimming).
pub const MAX_NAME_LEN: usize = 32;

/// Input rejected before any I/O.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Room code has the wrong length or a non-alphanumeric character
    #[error("invalid room code {0:?}: expected 5 or 6 letters or digits")]
    InvalidRoomCode(String),

    /// Display name is empty after trimming
    #[error("display name must not be empty")]
    EmptyName,

    /// Display name exceeds [`MAX_NAME_LEN`]
    #[error("display name is {len} characters, maximum is {max}")]
    NameTooLong {
        /// Length of the rejected name
        len: usize,
        /// Allowed maximum
        max: usize,
    },
}

/// Room identifier shared out-of-band between members.
///
/// # Invariants
///
/// - 5 or 6 characters, each ASCII alphanumeric
/// - Letters are upper case, so `ab123` and `AB123` name the same room
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomCode(String);

impl RoomCode {
    /// Parse user or wire input into a room code.
    ///
    /// Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// [`ValidationError::InvalidRoomCode`] if the trimmed input is not 5 or 6
    /// ASCII alphanumeric characters.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        let valid_len = (MIN_ROOM_CODE_LEN..=MAX_ROOM_CODE_LEN).contains(&trimmed.len());

        if !valid_len || !trimmed.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(ValidationError::InvalidRoomCode(input.to_string()));
        }

        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Digits-only code for `n`, zero-padded to five digits.
    ///
    /// Values past six digits wrap, so the result is always valid.
    pub fn numeric(n: u32) -> Self {
        Self(format!("{:05}", n % 1_000_000))
    }

    /// The normalized code.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RoomCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for RoomCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Name a member is listed under in a room roster.
///
/// Names are not unique: two members of one room may share a name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DisplayName(String);

impl DisplayName {
    /// Parse user or wire input into a display name.
    ///
    /// # Errors
    ///
    /// - [`ValidationError::EmptyName`] if nothing is left after trimming
    /// - [`ValidationError::NameTooLong`] past [`MAX_NAME_LEN`] characters
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyName);
        }

        let len = trimmed.chars().count();
        if len > MAX_NAME_LEN {
            return Err(ValidationError::NameTooLong { len, max: MAX_NAME_LEN });
        }

        Ok(Self(trimmed.to_string()))
    }

    /// Placeholder name `user` followed by the last five digits of `n`.
    pub fn numbered(n: u32) -> Self {
        Self(format!("user{:05}", n % 100_000))
    }

    /// The trimmed name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DisplayName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DisplayName {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for DisplayName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
