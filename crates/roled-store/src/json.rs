//! JSON-file policy store
//!
//! One `<community>.json` per community under a data directory. Writes are
//! atomic (write to `.tmp`, then rename) to prevent corruption from
//! interrupted writes.

use crate::{SettingsStore, StoreResult};
use async_trait::async_trait;
use roled_types::{CommunityId, Policy};
use std::path::{Path, PathBuf};

/// File-backed policy store.
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Create a store rooted at the given directory. The directory is
    /// created lazily on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the policy documents.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, community: &CommunityId) -> PathBuf {
        self.dir.join(format!("{}.json", community.as_str()))
    }

    async fn write(&self, community: &CommunityId, policy: &Policy) -> StoreResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let json = serde_json::to_string_pretty(policy)?;

        // Atomic write: write to .tmp then rename
        let path = self.path_for(community);
        let tmp_path = path.with_extension("tmp");
        tokio::fs::write(&tmp_path, json).await?;
        tokio::fs::rename(&tmp_path, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for JsonFileStore {
    async fn get(&self, community: &CommunityId) -> StoreResult<Policy> {
        let path = self.path_for(community);
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => Ok(serde_json::from_str(&contents)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let policy = Policy::default();
                self.write(community, &policy).await?;
                tracing::info!(community = %community, "provisioned default policy");
                Ok(policy)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, community: &CommunityId, policy: Policy) -> StoreResult<()> {
        self.write(community, &policy).await
    }
}
