//! # agentry-runner
//!
//! The [`Runner`] ties an agent to a session service: each call to
//! [`Runner::run`] loads the session, replays its history into the agent's
//! context, persists the user turn and every agent event, and streams the
//! events back to the caller.

mod context;
mod runner;

pub use context::InvocationContext;
pub use runner::{Runner, RunnerConfig};
