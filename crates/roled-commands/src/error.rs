//! Command error types
//!
//! Bad user input is reported back to the invoking channel, not surfaced as
//! an error; only store failures propagate.

use roled_store::StoreError;
use thiserror::Error;

/// Errors from command dispatch.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for command operations
pub type CommandResult<T> = Result<T, CommandError>;
