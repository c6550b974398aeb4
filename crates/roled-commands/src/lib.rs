//! Policy command surface for roled
//!
//! Text commands (`ig~<command> <args>`) mutate a community's policy. Each
//! handler is a pure transform from the current policy and arguments to a
//! new policy, reply lines and remote ops; the [`CommandRouter`] wires
//! handlers to the store and gateway and pushes loud reconcile triggers
//! after policy mutations.

#![deny(unsafe_code)]

pub mod error;
pub mod handlers;
pub mod parser;
pub mod router;

pub use error::{CommandError, CommandResult};
pub use handlers::CommandOutcome;
pub use parser::{parse, strip_quotes, ParsedCommand, COMMAND_PREFIX};
pub use router::CommandRouter;
