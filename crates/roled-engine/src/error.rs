//! Engine error types
//!
//! Remote failures never surface here: every gateway call goes through the
//! fire-and-continue wrapper. Only policy-store failures propagate.

use roled_store::StoreError;
use thiserror::Error;

/// Errors from a reconciliation pass.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
