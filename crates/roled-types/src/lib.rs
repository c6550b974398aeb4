//! Core types for roled, the activity-driven role reconciliation daemon.
//!
//! roled continuously reconciles a community's role memberships against what
//! its members are currently doing (their activity label), under a
//! per-community [`Policy`].
//!
//! ## Key Concepts
//!
//! - **Policy**: per-community configuration (allow/deny lists, aliases,
//!   thresholds, ignored users), persisted as a whole on every mutation
//! - **Member**: a community member with an optional activity label and the
//!   roles they currently hold, supplied fresh per reconciliation pass
//! - **RemoteRole**: a role as the chat platform reports it; its *display
//!   name* is the join key between policy and remote state
//! - **RemoteOp**: a single remote mutation (create/assign/unassign/delete/
//!   rename) with a human-readable narration line

#![deny(unsafe_code)]

pub mod ids;
pub mod member;
pub mod ops;
pub mod policy;
pub mod text;

pub use ids::{ChannelId, CommunityId, RoleId, UserId};
pub use member::{Member, MessageEvent, RemoteRole};
pub use ops::{ReconcileRequest, RemoteOp};
pub use policy::{Policy, POLICY_VERSION};
pub use text::code_block;
