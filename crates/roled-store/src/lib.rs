//! Policy persistence for roled
//!
//! One policy document per community. `get` auto-provisions a default
//! document on first access (PolicyNotFound is never surfaced to callers);
//! `set` overwrites the whole document and is durable before it returns, so
//! a reader after a completed `set` observes the new value.

#![deny(unsafe_code)]

pub mod error;
mod json;
mod memory;

pub use error::{StoreError, StoreResult};
pub use json::JsonFileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use roled_types::{CommunityId, Policy};

/// Per-community policy storage.
///
/// There is no partial-field update: callers read-modify-write the whole
/// policy. `set` is atomic per community; races between two concurrent
/// read-modify-write cycles on the same community are an accepted,
/// documented limitation.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Get the policy for a community, provisioning and persisting a default
    /// one on first access.
    async fn get(&self, community: &CommunityId) -> StoreResult<Policy>;

    /// Overwrite the policy for a community. Durable before returning.
    async fn set(&self, community: &CommunityId, policy: Policy) -> StoreResult<()>;
}
