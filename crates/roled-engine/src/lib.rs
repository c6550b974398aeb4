//! Reconciliation engine for roled
//!
//! Given a fresh snapshot of member activities and the community's policy,
//! the engine computes the desired (role, member) memberships, diffs them
//! against observed remote state and applies the minimal set of
//! create/assign/unassign operations. Passes are idempotent: the common
//! steady-state case for the periodic background pass is op-free.

#![deny(unsafe_code)]

pub mod error;
pub mod reconciler;
pub mod snapshot;

pub use error::{EngineError, EngineResult};
pub use reconciler::{removal_ops, Reconciler};
pub use snapshot::{compute_activity_groups, ActivityBucket, ActivityGroups};
