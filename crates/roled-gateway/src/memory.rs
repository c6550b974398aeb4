//! In-memory gateway for development and testing
//!
//! Holds per-community member and role state behind an `RwLock`, synthesizes
//! role ids, and records every sent message. Individual operations can be
//! told to fail with a transient error to exercise partial-failure paths.

use crate::{Gateway, GatewayError, GatewayResult};
use async_trait::async_trait;
use roled_types::{ChannelId, CommunityId, Member, MessageEvent, RemoteRole, RoleId, UserId};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::{broadcast, RwLock};

#[derive(Debug, Default, Clone)]
struct CommunityState {
    members: Vec<Member>,
    roles: Vec<RemoteRole>,
}

/// In-memory gateway.
#[derive(Debug)]
pub struct MemoryGateway {
    communities: RwLock<HashMap<CommunityId, CommunityState>>,
    sent: RwLock<Vec<(ChannelId, String)>>,
    failing: RwLock<HashSet<String>>,
    message_tx: broadcast::Sender<MessageEvent>,
    next_role_id: AtomicU64,
}

impl Default for MemoryGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryGateway {
    pub fn new() -> Self {
        let (message_tx, _) = broadcast::channel(256);
        Self {
            communities: RwLock::new(HashMap::new()),
            sent: RwLock::new(Vec::new()),
            failing: RwLock::new(HashSet::new()),
            message_tx,
            next_role_id: AtomicU64::new(1),
        }
    }

    /// Register a community with no members or roles.
    pub async fn add_community(&self, community: CommunityId) {
        let mut communities = self.communities.write().await;
        communities.entry(community).or_default();
    }

    /// Add a member to a community, registering the community if needed.
    pub async fn add_member(&self, community: &CommunityId, member: Member) {
        let mut communities = self.communities.write().await;
        communities
            .entry(community.clone())
            .or_default()
            .members
            .push(member);
    }

    /// Change a member's current activity label.
    pub async fn set_activity(
        &self,
        community: &CommunityId,
        member: &UserId,
        activity: Option<String>,
    ) {
        let mut communities = self.communities.write().await;
        if let Some(state) = communities.get_mut(community) {
            if let Some(m) = state.members.iter_mut().find(|m| &m.id == member) {
                m.activity = activity;
            }
        }
    }

    /// Deliver an inbound message to subscribers.
    pub fn publish_message(&self, message: MessageEvent) {
        let _ = self.message_tx.send(message);
    }

    /// Everything sent through `send_message`, in order.
    pub async fn sent_messages(&self) -> Vec<(ChannelId, String)> {
        self.sent.read().await.clone()
    }

    /// Force the named operation to fail with a transient error until
    /// cleared.
    pub async fn fail_on(&self, operation: &str) {
        self.failing.write().await.insert(operation.to_string());
    }

    /// Stop failing all operations.
    pub async fn clear_failures(&self) {
        self.failing.write().await.clear();
    }

    /// Look up a role by name, first match in enumeration order.
    pub async fn role_named(
        &self,
        community: &CommunityId,
        name: &str,
    ) -> Option<RemoteRole> {
        let communities = self.communities.read().await;
        communities
            .get(community)?
            .roles
            .iter()
            .find(|r| r.name == name)
            .cloned()
    }

    /// Look up a member by id.
    pub async fn member(&self, community: &CommunityId, id: &UserId) -> Option<Member> {
        let communities = self.communities.read().await;
        communities
            .get(community)?
            .members
            .iter()
            .find(|m| &m.id == id)
            .cloned()
    }

    async fn check(&self, operation: &str) -> GatewayResult<()> {
        if self.failing.read().await.contains(operation) {
            return Err(GatewayError::Transient(format!(
                "injected failure for {}",
                operation
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn list_communities(&self) -> GatewayResult<Vec<CommunityId>> {
        self.check("list_communities").await?;
        let communities = self.communities.read().await;
        let mut ids: Vec<_> = communities.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    async fn list_members(&self, community: &CommunityId) -> GatewayResult<Vec<Member>> {
        self.check("list_members").await?;
        let communities = self.communities.read().await;
        communities
            .get(community)
            .map(|s| s.members.clone())
            .ok_or_else(|| GatewayError::UnknownEntity(community.to_string()))
    }

    async fn list_roles(&self, community: &CommunityId) -> GatewayResult<Vec<RemoteRole>> {
        self.check("list_roles").await?;
        let communities = self.communities.read().await;
        communities
            .get(community)
            .map(|s| s.roles.clone())
            .ok_or_else(|| GatewayError::UnknownEntity(community.to_string()))
    }

    async fn create_role(
        &self,
        community: &CommunityId,
        name: &str,
        _hoisted: bool,
    ) -> GatewayResult<RemoteRole> {
        self.check("create_role").await?;
        let mut communities = self.communities.write().await;
        let state = communities
            .get_mut(community)
            .ok_or_else(|| GatewayError::UnknownEntity(community.to_string()))?;

        let role = RemoteRole {
            id: RoleId::new(format!(
                "role-{}",
                self.next_role_id.fetch_add(1, Ordering::Relaxed)
            )),
            name: name.to_string(),
            created_at: chrono::Utc::now(),
        };
        state.roles.push(role.clone());
        Ok(role)
    }

    async fn assign_role(
        &self,
        community: &CommunityId,
        member: &UserId,
        role: &RoleId,
    ) -> GatewayResult<()> {
        self.check("assign_role").await?;
        let mut communities = self.communities.write().await;
        let state = communities
            .get_mut(community)
            .ok_or_else(|| GatewayError::UnknownEntity(community.to_string()))?;
        let member = state
            .members
            .iter_mut()
            .find(|m| &m.id == member)
            .ok_or_else(|| GatewayError::UnknownEntity(member.to_string()))?;
        if !member.role_ids.contains(role) {
            member.role_ids.push(role.clone());
        }
        Ok(())
    }

    async fn unassign_role(
        &self,
        community: &CommunityId,
        member: &UserId,
        role: &RoleId,
    ) -> GatewayResult<()> {
        self.check("unassign_role").await?;
        let mut communities = self.communities.write().await;
        let state = communities
            .get_mut(community)
            .ok_or_else(|| GatewayError::UnknownEntity(community.to_string()))?;
        let member = state
            .members
            .iter_mut()
            .find(|m| &m.id == member)
            .ok_or_else(|| GatewayError::UnknownEntity(member.to_string()))?;
        member.role_ids.retain(|r| r != role);
        Ok(())
    }

    async fn delete_role(&self, community: &CommunityId, role: &RoleId) -> GatewayResult<()> {
        self.check("delete_role").await?;
        let mut communities = self.communities.write().await;
        let state = communities
            .get_mut(community)
            .ok_or_else(|| GatewayError::UnknownEntity(community.to_string()))?;
        state.roles.retain(|r| &r.id != role);
        for member in &mut state.members {
            member.role_ids.retain(|r| r != role);
        }
        Ok(())
    }

    async fn rename_role(
        &self,
        community: &CommunityId,
        role: &RoleId,
        new_name: &str,
    ) -> GatewayResult<()> {
        self.check("rename_role").await?;
        let mut communities = self.communities.write().await;
        let state = communities
            .get_mut(community)
            .ok_or_else(|| GatewayError::UnknownEntity(community.to_string()))?;
        let role = state
            .roles
            .iter_mut()
            .find(|r| &r.id == role)
            .ok_or_else(|| GatewayError::UnknownEntity(role.to_string()))?;
        role.name = new_name.to_string();
        Ok(())
    }

    async fn send_message(&self, channel: &ChannelId, text: &str) -> GatewayResult<()> {
        self.check("send_message").await?;
        let mut sent = self.sent.write().await;
        sent.push((channel.clone(), text.to_string()));
        Ok(())
    }

    fn subscribe_messages(&self) -> broadcast::Receiver<MessageEvent> {
        self.message_tx.subscribe()
    }
}
