//! Daemon error types

use thiserror::Error;

/// Top-level daemon errors
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(#[from] roled_store::StoreError),

    #[error("Engine error: {0}")]
    Engine(#[from] roled_engine::EngineError),

    #[error("Command error: {0}")]
    Command(#[from] roled_commands::CommandError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for daemon operations
pub type DaemonResult<T> = Result<T, DaemonError>;
