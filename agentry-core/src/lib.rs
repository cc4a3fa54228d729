//! # agentry-core
//!
//! Core traits and types for Agentry agents, tools, sessions, and events.
//!
//! ## Overview
//!
//! This crate provides the foundational abstractions for the rest of the
//! workspace:
//!
//! - [`Agent`] - The fundamental trait for all agents
//! - [`Llm`] - The model interface agents speak to
//! - [`Tool`] / [`Toolset`] - For extending agents with callable operations
//! - [`Event`] - For streaming agent output back to the caller
//! - [`AgentryError`] / [`Result`] - Unified error handling
//!
//! ## Core Traits
//!
//! ### Agent
//!
//! ```rust,ignore
//! #[async_trait]
//! pub trait Agent: Send + Sync {
//!     fn name(&self) -> &str;
//!     fn description(&self) -> &str;
//!     async fn run(&self, ctx: Arc<dyn InvocationContext>) -> Result<EventStream>;
//! }
//! ```
//!
//! ### Tool
//!
//! ```rust,ignore
//! #[async_trait]
//! pub trait Tool: Send + Sync {
//!     fn name(&self) -> &str;
//!     fn description(&self) -> &str;
//!     async fn execute(&self, ctx: Arc<dyn ToolContext>, args: Value) -> Result<Value>;
//! }
//! ```
//!
//! ## State scopes
//!
//! Session state keys use typed prefixes:
//!
//! - `app:` - shared across all users of an application
//! - `user:` - shared across one user's sessions
//! - `temp:` - cleared on every append, never persisted

pub mod agent;
pub mod context;
pub mod error;
pub mod event;
pub mod model;
pub mod tool;
pub mod types;

pub use agent::{Agent, EventStream};
pub use context::{InvocationContext, ReadonlyContext};
pub use error::{AgentryError, Result};
pub use event::{Event, EventActions, KEY_PREFIX_APP, KEY_PREFIX_TEMP, KEY_PREFIX_USER};
pub use model::{
    FinishReason, GenerateContentConfig, Llm, LlmRequest, LlmResponse, LlmResponseStream,
    TokenUsage,
};
pub use tool::{Tool, ToolContext, ToolPredicate, Toolset};
pub use types::{Content, FunctionResponseData, Part};
