//! Scripted model for tests.

use agentry_core::{AgentryError, Content, Llm, LlmRequest, LlmResponse, LlmResponseStream, Part};
use async_trait::async_trait;
use futures::stream;
use std::collections::VecDeque;
use std::sync::Mutex;

/// A mock LLM that replays scripted turns.
///
/// Each call to [`generate_content`](Llm::generate_content) pops one turn
/// from the script and streams its responses in order. This mirrors how a
/// tool-calling agent drives a real model: the first turn can return a
/// function call, the second turn the final answer. When the script runs
/// dry the mock returns an error, which makes a test that over-calls the
/// model fail loudly instead of hanging.
pub struct MockLlm {
    turns: Mutex<VecDeque<Vec<LlmResponse>>>,
}

impl MockLlm {
    pub fn new() -> Self {
        Self { turns: Mutex::new(VecDeque::new()) }
    }

    /// Script a single-response turn with the given text.
    #[must_use]
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.with_turn(vec![LlmResponse::new(Content::new("model").with_text(text))])
    }

    /// Script a turn that requests a function call.
    #[must_use]
    pub fn with_function_call(
        self,
        name: impl Into<String>,
        args: serde_json::Value,
        id: Option<String>,
    ) -> Self {
        self.with_turn(vec![LlmResponse::new(
            Content::new("model").with_part(Part::function_call(name, args, id)),
        )])
    }

    /// Script a full turn: the responses one `generate_content` call streams.
    #[must_use]
    pub fn with_turn(self, responses: Vec<LlmResponse>) -> Self {
        {
            let mut turns = self.turns.lock().unwrap();
            turns.push_back(responses);
        }
        self
    }

    /// Number of scripted turns remaining.
    pub fn remaining_turns(&self) -> usize {
        self.turns.lock().unwrap().len()
    }
}

impl Default for MockLlm {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Llm for MockLlm {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate_content(
        &self,
        _req: LlmRequest,
        _stream: bool,
    ) -> Result<LlmResponseStream, AgentryError> {
        let turn = {
            let mut turns = self.turns.lock().map_err(|_| {
                AgentryError::Model("Mock script lock poisoned".to_string())
            })?;
            turns.pop_front()
        };

        match turn {
            Some(responses) => {
                let items: Vec<_> = responses.into_iter().map(Ok).collect();
                Ok(Box::pin(stream::iter(items)))
            }
            None => Err(AgentryError::Model("Mock script exhausted".to_string())),
        }
    }
}
