//! # agentry-tool
//!
//! Tool implementations for Agentry agents.
//!
//! - [`FunctionTool`] wraps an async closure as a [`Tool`](agentry_core::Tool)
//! - [`BasicToolset`] groups tools with optional filtering
//! - [`OpenApiToolset`] derives one REST-backed tool per operation of an
//!   OpenAPI 3.0 document

mod function_tool;
mod openapi;
mod toolset;

pub use function_tool::FunctionTool;
pub use openapi::{OpenApiToolset, RestApiTool};
pub use toolset::{BasicToolset, string_predicate};
