use crate::model::LlmResponse;
use crate::types::{Content, FunctionResponseData, Part};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

// State scope prefixes
pub const KEY_PREFIX_APP: &str = "app:";
pub const KEY_PREFIX_TEMP: &str = "temp:";
pub const KEY_PREFIX_USER: &str = "user:";

/// Event represents a single interaction in a conversation. It embeds the
/// LlmResponse that produced it; user turns carry the user content the same
/// way, with `author` set to `"user"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub invocation_id: String,
    pub author: String,
    /// The LLM response containing content and metadata.
    #[serde(flatten)]
    pub llm_response: LlmResponse,
    pub actions: EventActions,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventActions {
    pub state_delta: HashMap<String, serde_json::Value>,
    pub escalate: bool,
}

impl Event {
    pub fn new(invocation_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            invocation_id: invocation_id.into(),
            author: String::new(),
            llm_response: LlmResponse::default(),
            actions: EventActions::default(),
        }
    }

    /// Convenience method to access content directly.
    pub fn content(&self) -> Option<&Content> {
        self.llm_response.content.as_ref()
    }

    /// Convenience method to set content directly.
    pub fn set_content(&mut self, content: Content) {
        self.llm_response.content = Some(content);
    }

    /// Function calls carried by this event, as `(name, args)` pairs.
    pub fn function_calls(&self) -> Vec<(&str, &serde_json::Value)> {
        self.content()
            .map(|c| {
                c.parts
                    .iter()
                    .filter_map(|p| match p {
                        Part::FunctionCall { name, args, .. } => Some((name.as_str(), args)),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Function responses carried by this event.
    pub fn function_responses(&self) -> Vec<&FunctionResponseData> {
        self.content()
            .map(|c| {
                c.parts
                    .iter()
                    .filter_map(|p| match p {
                        Part::FunctionResponse { function_response, .. } => Some(function_response),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// A final response is a complete (non-partial) event carrying text and
    /// no pending function traffic.
    pub fn is_final_response(&self) -> bool {
        !self.llm_response.partial
            && self.function_calls().is_empty()
            && self.function_responses().is_empty()
            && self.content().is_some_and(|c| c.parts.iter().any(|p| p.text().is_some()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_creation() {
        let event = Event::new("inv-123");
        assert_eq!(event.invocation_id, "inv-123");
        assert!(!event.id.is_empty());
    }

    #[test]
    fn test_event_actions_default() {
        let actions = EventActions::default();
        assert!(actions.state_delta.is_empty());
        assert!(!actions.escalate);
    }

    #[test]
    fn test_function_calls_accessor() {
        let mut event = Event::new("inv-1");
        event.set_content(Content::new("model").with_part(Part::function_call(
            "getPokemonByName",
            serde_json::json!({"name": "pikachu"}),
            None,
        )));

        let calls = event.function_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "getPokemonByName");
        assert_eq!(calls[0].1["name"], "pikachu");
        assert!(!event.is_final_response());
    }

    #[test]
    fn test_function_responses_accessor() {
        let mut event = Event::new("inv-1");
        event.set_content(Content::new("function").with_part(Part::function_response(
            "listTypes",
            serde_json::json!({"count": 20}),
            None,
        )));

        let responses = event.function_responses();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].name, "listTypes");
        assert!(!event.is_final_response());
    }

    #[test]
    fn test_is_final_response() {
        let mut event = Event::new("inv-1");
        event.set_content(Content::new("model").with_text("Pikachu is an Electric-type."));
        assert!(event.is_final_response());

        // A partial chunk with text is not final.
        event.llm_response.partial = true;
        assert!(!event.is_final_response());

        // An event without content is not final.
        let empty = Event::new("inv-2");
        assert!(!empty.is_final_response());
    }

    #[test]
    fn test_state_prefixes() {
        assert_eq!(KEY_PREFIX_APP, "app:");
        assert_eq!(KEY_PREFIX_TEMP, "temp:");
        assert_eq!(KEY_PREFIX_USER, "user:");
    }
}
