//! Gateway error types

use thiserror::Error;

/// Errors from the chat-platform gateway.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Transient delivery error; the operation is skipped and the next pass
    /// self-heals.
    #[error("transient delivery error: {0}")]
    Transient(String),

    /// The referenced entity does not exist remotely.
    #[error("unknown entity: {0}")]
    UnknownEntity(String),
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;
