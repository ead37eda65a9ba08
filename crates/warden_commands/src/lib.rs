//! Verb-to-handler registry.
//!
//! Handlers are looked up by verb, checked against the acting player's
//! privilege level, and run with a [`CommandContext`] that gives them the
//! mediator to consult. The mediator never calls into handlers.

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod handler;
mod registry;

pub use handler::{CommandContext, CommandHandler, CommandInfo};
pub use registry::CommandRegistry;
