//! Deterministic simulation harness for Tocsin.
//!
//! Runs real client connection managers against a real server driver with no
//! sockets, threads or wall-clock time. All randomness (generated names,
//! room codes) comes from one seeded [`SimEnv`], so a failing seed replays
//! exactly.
//!
//! - [`SimEnv`]: seeded RNG and virtual clock
//! - [`SimWorld`]: clients, server and the FIFO queue between them

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod sim_env;
pub mod world;

pub use sim_env::{SimEnv, SimInstant};
pub use world::{ClientId, SimClient, SimWorld};
