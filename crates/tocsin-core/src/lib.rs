//! Tocsin core.
//!
//! Pieces shared by the server driver, the client connection manager and the
//! simulation harness: the [`Environment`] seam for time and randomness,
//! generation of display names and room codes, and the [`LogLevel`] carried
//! by `Log` actions.
//!
//! - [`Environment`]: time and randomness seam
//! - [`SystemEnv`]: production environment (real time, OS RNG)

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod env;
pub mod identity;
mod system_env;

pub use env::Environment;
pub use identity::{generate_display_name, generate_room_code};
pub use system_env::SystemEnv;

/// Severity of a `Log` action emitted by a sans-IO state machine.
///
/// State machines never log themselves; the runtime maps this onto its
/// logging backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Debug information
    Debug,
    /// Informational message
    Info,
    /// Warning
    Warn,
    /// Error
    Error,
}
