use crate::{Result, types::Content};
use async_trait::async_trait;
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::pin::Pin;

/// Streaming handle returned by [`Llm::generate_content`]. Partial chunks
/// arrive first; the turn ends with a response whose `turn_complete` is set.
pub type LlmResponseStream = Pin<Box<dyn Stream<Item = Result<LlmResponse>> + Send>>;

/// A language model that can be driven by an agent.
#[async_trait]
pub trait Llm: Send + Sync {
    fn name(&self) -> &str;
    async fn generate_content(&self, req: LlmRequest, stream: bool) -> Result<LlmResponseStream>;
}

/// One model call: the conversation so far plus the tools the model may use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    pub model: String,
    pub contents: Vec<Content>,
    pub config: Option<GenerateContentConfig>,
    /// Tool declarations keyed by tool name. Each value is a JSON function
    /// declaration (`name`, `description`, optional `parameters`).
    #[serde(skip)]
    pub tools: HashMap<String, serde_json::Value>,
}

impl LlmRequest {
    pub fn new(model: impl Into<String>, contents: Vec<Content>) -> Self {
        Self { model: model.into(), contents, config: None, tools: HashMap::new() }
    }

    pub fn with_config(mut self, config: GenerateContentConfig) -> Self {
        self.config = Some(config);
        self
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerateContentConfig {
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_output_tokens: Option<i32>,
}

/// One element of a model's response stream.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: Option<Content>,
    pub usage: Option<TokenUsage>,
    pub finish_reason: Option<FinishReason>,
    /// True for an incremental delta; the whole turn follows separately.
    pub partial: bool,
    pub turn_complete: bool,
}

impl LlmResponse {
    /// A complete, non-partial response carrying the given content.
    pub fn new(content: Content) -> Self {
        Self {
            content: Some(content),
            usage: None,
            finish_reason: Some(FinishReason::Stop),
            partial: false,
            turn_complete: true,
        }
    }

    /// An incremental delta within a streamed turn.
    pub fn chunk(content: Content) -> Self {
        Self {
            content: Some(content),
            usage: None,
            finish_reason: None,
            partial: true,
            turn_complete: false,
        }
    }
}

/// Token accounting, following the OpenAI usage object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinishReason {
    Stop,
    /// The output hit the token limit.
    Length,
    ContentFilter,
    Other,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_starts_without_config_or_tools() {
        let req = LlmRequest::new("test-model", vec![]);
        assert_eq!(req.model, "test-model");
        assert!(req.contents.is_empty());
        assert!(req.config.is_none());
        assert!(req.tools.is_empty());
    }

    #[test]
    fn request_with_config() {
        let config = GenerateContentConfig {
            temperature: Some(0.7),
            top_p: Some(0.9),
            max_output_tokens: Some(1024),
        };
        let req = LlmRequest::new("test-model", vec![]).with_config(config);

        let config = req.config.unwrap();
        assert_eq!(config.temperature, Some(0.7));
        assert_eq!(config.max_output_tokens, Some(1024));
    }

    #[test]
    fn complete_response() {
        let resp = LlmResponse::new(Content::new("model").with_text("hi"));
        assert!(resp.content.is_some());
        assert!(resp.turn_complete);
        assert!(!resp.partial);
        assert_eq!(resp.finish_reason, Some(FinishReason::Stop));
    }

    #[test]
    fn chunk_response_is_partial() {
        let resp = LlmResponse::chunk(Content::new("model").with_text("hi"));
        assert!(resp.partial);
        assert!(!resp.turn_complete);
        assert!(resp.finish_reason.is_none());
    }
}
