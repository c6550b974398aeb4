//! In-memory policy store for development and testing

use crate::{SettingsStore, StoreResult};
use async_trait::async_trait;
use roled_types::{CommunityId, Policy};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// In-memory policy store. Same provisioning contract as the file store,
/// without durability.
#[derive(Debug, Default)]
pub struct MemoryStore {
    policies: RwLock<HashMap<CommunityId, Policy>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn get(&self, community: &CommunityId) -> StoreResult<Policy> {
        let mut policies = self.policies.write().await;
        Ok(policies.entry(community.clone()).or_default().clone())
    }

    async fn set(&self, community: &CommunityId, policy: Policy) -> StoreResult<()> {
        let mut policies = self.policies.write().await;
        policies.insert(community.clone(), policy);
        Ok(())
    }
}
