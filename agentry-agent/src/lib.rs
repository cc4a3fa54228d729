//! # agentry-agent
//!
//! LLM-driven agents for Agentry.
//!
//! [`LlmAgent`] runs a conversation loop against an
//! [`Llm`](agentry_core::Llm): it sends the instruction, session history and
//! current user turn to the model, executes any tools the model calls, feeds
//! the results back, and repeats until the model answers with plain text.
//!
//! ```rust,ignore
//! let agent = LlmAgentBuilder::new("pokemon_expert_agent")
//!     .description("Agent to answer questions about Pokemon.")
//!     .instruction("You are a helpful Pokemon expert.")
//!     .model(model)
//!     .toolset(pokeapi_toolset)
//!     .build()?;
//! ```

mod llm_agent;

pub use llm_agent::{LlmAgent, LlmAgentBuilder};
