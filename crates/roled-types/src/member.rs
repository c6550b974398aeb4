//! Remote-owned state as the gateway reports it
//!
//! Members and roles are enumerated fresh for every reconciliation pass and
//! never cached across passes.

use crate::{ChannelId, CommunityId, RoleId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A community member at enumeration time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: UserId,

    /// Display name; the ignored-users set matches on this.
    pub name: String,

    /// What the member is currently doing, if anything. Raw label string.
    pub activity: Option<String>,

    /// Roles the member currently holds.
    pub role_ids: Vec<RoleId>,
}

impl Member {
    /// Whether the member currently holds the given role.
    pub fn holds(&self, role: &RoleId) -> bool {
        self.role_ids.contains(role)
    }
}

/// A role as the chat platform reports it.
///
/// The engine treats role identity by display name, not by id: the name is
/// the join key between policy and remote roles. Where duplicate names
/// exist, the first match in enumeration order is canonical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRole {
    pub id: RoleId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// An inbound message from the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEvent {
    pub author_id: UserId,
    pub author_name: String,

    /// Roles the author holds, for the required-role gate.
    pub author_role_ids: Vec<RoleId>,

    pub text: String,
    pub community: CommunityId,
    pub channel: ChannelId,
}
