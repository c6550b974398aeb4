//! Remote operations emitted by the engine and command handlers
//!
//! Each op carries the names needed to render its narration line; ids are
//! what actually gets sent to the gateway. Ops are executed in the context
//! of a single community.

use crate::{ChannelId, CommunityId, RoleId, UserId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single remote mutation against the chat platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteOp {
    /// Create a (hoisted) role named after an eligible activity
    CreateRole { name: String, hoisted: bool },

    /// Give a member a role they are owed but do not hold
    AssignRole {
        member: UserId,
        member_name: String,
        role: RoleId,
        role_name: String,
    },

    /// Take a role from a member who holds it but is no longer owed it
    UnassignRole {
        member: UserId,
        member_name: String,
        role: RoleId,
        role_name: String,
    },

    /// Delete a role outright (only ever emitted by the `remove` command,
    /// never by the reconciliation engine)
    DeleteRole { role: RoleId, role_name: String },

    /// Rename a role (emitted by the `alias` command)
    RenameRole {
        role: RoleId,
        old_name: String,
        new_name: String,
    },
}

impl fmt::Display for RemoteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteOp::CreateRole { name, .. } => write!(f, "Created role {}", name),
            RemoteOp::AssignRole {
                member_name,
                role_name,
                ..
            } => write!(f, "Assign role {} to {}", role_name, member_name),
            RemoteOp::UnassignRole {
                member_name,
                role_name,
                ..
            } => write!(f, "Removing role {} from {}", role_name, member_name),
            RemoteOp::DeleteRole { role_name, .. } => {
                write!(f, "Deleting '{}' role", role_name)
            }
            RemoteOp::RenameRole {
                old_name, new_name, ..
            } => write!(f, "Renaming role '{}' to '{}'", old_name, new_name),
        }
    }
}

/// Request for an ad-hoc reconciliation pass, pushed by the command router
/// and consumed by the scheduler.
///
/// A request with a channel is a loud pass: newly issued ops are narrated to
/// that channel. The periodic background pass is silent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileRequest {
    pub community: CommunityId,
    pub channel: Option<ChannelId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_narration_lines() {
        let op = RemoteOp::AssignRole {
            member: UserId::new("1"),
            member_name: "alice".into(),
            role: RoleId::new("10"),
            role_name: "Chess".into(),
        };
        assert_eq!(op.to_string(), "Assign role Chess to alice");

        let op = RemoteOp::DeleteRole {
            role: RoleId::new("10"),
            role_name: "Chess".into(),
        };
        assert_eq!(op.to_string(), "Deleting 'Chess' role");
    }
}
