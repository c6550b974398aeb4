//! Chat-platform gateway interface
//!
//! The gateway is an external collaborator: roled consumes message events
//! and member/role enumeration from it and pushes role mutations back
//! through it. Every remote operation may fail with a transient delivery
//! error; callers go through [`attempt`], which logs the failure and yields
//! no result instead of propagating. Correctness relies on the next
//! scheduled pass to self-heal, not on retries.

#![deny(unsafe_code)]

pub mod error;
mod memory;

pub use error::{GatewayError, GatewayResult};
pub use memory::MemoryGateway;

use async_trait::async_trait;
use roled_types::{ChannelId, CommunityId, Member, MessageEvent, RemoteRole, RoleId, UserId};
use std::future::Future;
use tokio::sync::broadcast;

/// Chat-platform operations consumed by the engine, the command surface and
/// the scheduler.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Communities the process is connected to.
    async fn list_communities(&self) -> GatewayResult<Vec<CommunityId>>;

    /// Fresh member enumeration, including current activity labels and held
    /// roles.
    async fn list_members(&self, community: &CommunityId) -> GatewayResult<Vec<Member>>;

    /// Fresh role enumeration, in the platform's order.
    async fn list_roles(&self, community: &CommunityId) -> GatewayResult<Vec<RemoteRole>>;

    async fn create_role(
        &self,
        community: &CommunityId,
        name: &str,
        hoisted: bool,
    ) -> GatewayResult<RemoteRole>;

    async fn assign_role(
        &self,
        community: &CommunityId,
        member: &UserId,
        role: &RoleId,
    ) -> GatewayResult<()>;

    async fn unassign_role(
        &self,
        community: &CommunityId,
        member: &UserId,
        role: &RoleId,
    ) -> GatewayResult<()>;

    async fn delete_role(&self, community: &CommunityId, role: &RoleId) -> GatewayResult<()>;

    async fn rename_role(
        &self,
        community: &CommunityId,
        role: &RoleId,
        new_name: &str,
    ) -> GatewayResult<()>;

    async fn send_message(&self, channel: &ChannelId, text: &str) -> GatewayResult<()>;

    /// Subscribe to inbound messages.
    fn subscribe_messages(&self) -> broadcast::Receiver<MessageEvent>;
}

/// Run a remote operation; on failure, log at WARN and yield no result.
///
/// This is the uniform wrapper for every gateway call site. A failed op is
/// skipped, never aborting the pass it belongs to.
pub async fn attempt<T, F>(operation: &str, fut: F) -> Option<T>
where
    F: Future<Output = GatewayResult<T>>,
{
    match fut.await {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(operation, error = %e, "remote operation failed, skipping");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_attempt_yields_value_on_success() {
        let result = attempt("op", async { Ok::<_, GatewayError>(7) }).await;
        assert_eq!(result, Some(7));
    }

    #[tokio::test]
    async fn test_attempt_swallows_transient_errors() {
        let result = attempt("op", async {
            Err::<(), _>(GatewayError::Transient("timeout".into()))
        })
        .await;
        assert_eq!(result, None);
    }
}
