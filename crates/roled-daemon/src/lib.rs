//! roled daemon
//!
//! Wires the policy store, gateway, reconciliation engine and command
//! router into a long-running service: periodic silent reconciliation
//! sweeps plus command-triggered loud passes.

pub mod config;
pub mod error;
pub mod runtime;
pub mod scheduler;

pub use config::DaemonConfig;
pub use error::{DaemonError, DaemonResult};
pub use runtime::Runtime;
pub use scheduler::Scheduler;
