//! # agentry-model
//!
//! LLM integrations for Agentry agents.
//!
//! The main entry point is [`OpenAICompatible`], a client for any endpoint
//! speaking the OpenAI chat-completions protocol (OpenAI itself, or local
//! and hosted gateways fronting other models). [`MockLlm`] provides scripted
//! responses for tests.
//!
//! ```rust,no_run
//! use agentry_model::{OpenAICompatible, OpenAICompatibleConfig};
//!
//! let api_key = std::env::var("OPENAI_API_KEY").unwrap();
//! let model = OpenAICompatible::new(
//!     OpenAICompatibleConfig::new(api_key, "gpt-4o-mini"),
//! ).unwrap();
//! ```

mod convert;
pub mod mock;
mod openai_compatible;
pub mod retry;

pub use mock::MockLlm;
pub use openai_compatible::{OpenAICompatible, OpenAICompatibleConfig};
pub use retry::RetryPolicy;
