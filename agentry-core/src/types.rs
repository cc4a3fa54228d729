use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponseData {
    pub name: String,
    pub response: serde_json::Value,
}

/// One conversational message: a role plus an ordered list of parts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text {
        text: String,
    },
    FunctionCall {
        name: String,
        args: serde_json::Value,
        /// Tool call ID assigned by OpenAI-style providers.
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    FunctionResponse {
        function_response: FunctionResponseData,
        /// Tool call ID this response answers, for OpenAI-style providers.
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
}

impl Content {
    pub fn new(role: impl Into<String>) -> Self {
        Self { role: role.into(), parts: Vec::new() }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.parts.push(Part::Text { text: text.into() });
        self
    }

    pub fn with_part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    /// Concatenated text of all text parts, or `None` if there is none.
    pub fn text(&self) -> Option<String> {
        let text: String =
            self.parts.iter().filter_map(Part::text).collect::<Vec<_>>().join("\n");
        if text.is_empty() { None } else { Some(text) }
    }
}

impl Part {
    /// Returns the text content if this is a Text part, None otherwise
    pub fn text(&self) -> Option<&str> {
        match self {
            Part::Text { text } => Some(text.as_str()),
            _ => None,
        }
    }

    /// Create a new text part
    pub fn text_part(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    /// Create a new function call part
    pub fn function_call(
        name: impl Into<String>,
        args: serde_json::Value,
        id: Option<String>,
    ) -> Self {
        Part::FunctionCall { name: name.into(), args, id }
    }

    /// Create a new function response part
    pub fn function_response(
        name: impl Into<String>,
        response: serde_json::Value,
        id: Option<String>,
    ) -> Self {
        Part::FunctionResponse {
            function_response: FunctionResponseData { name: name.into(), response },
            id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_creation() {
        let content = Content::new("user").with_text("Hello");
        assert_eq!(content.role, "user");
        assert_eq!(content.parts.len(), 1);
    }

    #[test]
    fn test_content_text_concatenates_parts() {
        let content = Content::new("model").with_text("Hello").with_text("World");
        assert_eq!(content.text(), Some("Hello\nWorld".to_string()));

        let empty = Content::new("model");
        assert_eq!(empty.text(), None);
    }

    #[test]
    fn test_part_text_accessor() {
        let text_part = Part::Text { text: "hello".to_string() };
        assert_eq!(text_part.text(), Some("hello"));

        let call_part = Part::function_call("lookup", serde_json::json!({}), None);
        assert_eq!(call_part.text(), None);
    }

    #[test]
    fn test_part_serialization() {
        let part = Part::Text { text: "test".to_string() };
        let json = serde_json::to_string(&part).unwrap();
        assert!(json.contains("test"));
    }

    #[test]
    fn test_function_response_serializes_camel_case() {
        let part = Part::function_response("getPokemonByName", serde_json::json!({"id": 25}), None);
        let json = serde_json::to_value(&part).unwrap();
        assert!(json.get("functionResponse").is_some());
        assert_eq!(json["functionResponse"]["name"], "getPokemonByName");
    }

    #[test]
    fn test_part_roundtrip() {
        let part = Part::function_call(
            "getAbility",
            serde_json::json!({"name": "blaze"}),
            Some("call_0".to_string()),
        );
        let encoded = serde_json::to_string(&part).unwrap();
        let decoded: Part = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, part);
    }
}
