//! Line-oriented Tocsin client.
//!
//! A thin shell over [`tocsin_client::runtime::Runtime`]: parses typed
//! commands into client intents and renders UI events as text lines. All
//! session logic lives in the connection manager.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod commands;
pub mod view;

pub use commands::Command;
pub use view::View;
