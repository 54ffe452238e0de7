// ABOUTME: SSH connectivity for remote bootstrap.
// ABOUTME: Exports session management and command execution types.

mod client;
mod error;

pub use client::{CommandOutput, Session, SessionConfig};
pub use error::{Error, Result};
