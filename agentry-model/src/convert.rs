//! Mapping between Agentry conversation types and the chat API wire types.

use agentry_core::{Content, FinishReason, LlmResponse, Part, TokenUsage};
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestToolMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionRequestUserMessageContent, ChatCompletionTool, ChatCompletionToolType,
    CompletionUsage, CreateChatCompletionStreamResponse, FunctionCall, FunctionObject,
};
use std::collections::HashMap;

/// Build the request message for one conversation turn.
///
/// `system` becomes the system message, `model` the assistant message (text
/// plus tool calls), `function` a tool result, and everything else a plain
/// user message.
pub fn to_request_message(content: &Content) -> ChatCompletionRequestMessage {
    match content.role.as_str() {
        "system" => ChatCompletionRequestSystemMessageArgs::default()
            .content(joined_text(&content.parts).unwrap_or_default())
            .build()
            .unwrap()
            .into(),
        "model" | "assistant" => assistant_message(content),
        "function" | "tool" => tool_result_message(content),
        _ => ChatCompletionRequestUserMessageArgs::default()
            .content(ChatCompletionRequestUserMessageContent::Text(
                joined_text(&content.parts).unwrap_or_default(),
            ))
            .build()
            .unwrap()
            .into(),
    }
}

fn assistant_message(content: &Content) -> ChatCompletionRequestMessage {
    let mut builder = ChatCompletionRequestAssistantMessageArgs::default();

    let text = joined_text(&content.parts);
    let calls: Vec<ChatCompletionMessageToolCall> =
        content.parts.iter().filter_map(as_tool_call).collect();

    if let Some(text) = text {
        builder.content(text);
    } else if calls.is_empty() {
        // The API rejects an assistant message with neither text nor calls.
        builder.content(" ".to_string());
    }

    if !calls.is_empty() {
        builder.tool_calls(calls);
    }

    builder.build().unwrap().into()
}

fn tool_result_message(content: &Content) -> ChatCompletionRequestMessage {
    match content.parts.first() {
        Some(Part::FunctionResponse { function_response, id }) => {
            ChatCompletionRequestToolMessageArgs::default()
                .tool_call_id(id.clone().unwrap_or_else(|| "unknown".to_string()))
                .content(serde_json::to_string(&function_response.response).unwrap_or_default())
                .build()
                .unwrap()
                .into()
        }
        _ => ChatCompletionRequestUserMessageArgs::default()
            .content(ChatCompletionRequestUserMessageContent::Text(String::new()))
            .build()
            .unwrap()
            .into(),
    }
}

fn joined_text(parts: &[Part]) -> Option<String> {
    let text: Vec<&str> = parts.iter().filter_map(Part::text).collect();
    if text.is_empty() { None } else { Some(text.join("\n")) }
}

fn as_tool_call(part: &Part) -> Option<ChatCompletionMessageToolCall> {
    let Part::FunctionCall { name, args, id } = part else {
        return None;
    };

    Some(ChatCompletionMessageToolCall {
        id: id.clone().unwrap_or_else(|| format!("call_{name}")),
        r#type: ChatCompletionToolType::Function,
        function: FunctionCall {
            name: name.clone(),
            arguments: serde_json::to_string(args).unwrap_or_default(),
        },
    })
}

/// Lower the agent's tool declarations into chat API tool definitions.
pub fn tool_definitions(tools: &HashMap<String, serde_json::Value>) -> Vec<ChatCompletionTool> {
    tools
        .iter()
        .map(|(name, declaration)| ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: name.clone(),
                description: declaration
                    .get("description")
                    .and_then(|d| d.as_str())
                    .map(String::from),
                parameters: declaration.get("parameters").cloned(),
                strict: None,
            },
        })
        .collect()
}

/// Map one stream chunk onto an [`LlmResponse`] delta.
pub fn chunk_to_response(chunk: &CreateChatCompletionStreamResponse) -> LlmResponse {
    let choice = chunk.choices.first();

    let mut parts = Vec::new();
    if let Some(choice) = choice {
        if let Some(text) = &choice.delta.content {
            if !text.is_empty() {
                parts.push(Part::text_part(text.clone()));
            }
        }

        for tc in choice.delta.tool_calls.as_deref().unwrap_or_default() {
            let Some(func) = &tc.function else { continue };
            let Some(name) = func.name.as_deref().filter(|n| !n.is_empty()) else { continue };
            let args = func
                .arguments
                .as_deref()
                .and_then(|a| serde_json::from_str(a).ok())
                .unwrap_or_else(|| serde_json::json!({}));
            parts.push(Part::function_call(name, args, tc.id.clone()));
        }
    }

    let finish_reason = choice.and_then(|c| c.finish_reason).map(finish_reason_from);
    let done = finish_reason.is_some();

    LlmResponse {
        // An empty delta (the usual finish chunk) carries no content at all.
        content: if parts.is_empty() {
            None
        } else {
            Some(Content { role: "model".to_string(), parts })
        },
        usage: chunk.usage.as_ref().map(usage_from),
        finish_reason,
        partial: !done,
        turn_complete: done,
    }
}

pub fn usage_from(usage: &CompletionUsage) -> TokenUsage {
    TokenUsage {
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
        total_tokens: usage.total_tokens,
    }
}

pub fn finish_reason_from(reason: async_openai::types::FinishReason) -> FinishReason {
    use async_openai::types::FinishReason as Api;
    match reason {
        Api::Stop | Api::ToolCalls | Api::FunctionCall => FinishReason::Stop,
        Api::Length => FinishReason::Length,
        Api::ContentFilter => FinishReason::ContentFilter,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joined_text_concatenates_parts() {
        let parts = vec![Part::text_part("Hello"), Part::text_part("World")];
        assert_eq!(joined_text(&parts), Some("Hello\nWorld".to_string()));
        assert_eq!(joined_text(&[]), None);
    }

    #[test]
    fn user_turn_becomes_user_message() {
        let msg = to_request_message(&Content::new("user").with_text("Hello"));

        if let ChatCompletionRequestMessage::User(user_msg) = &msg {
            assert!(matches!(
                &user_msg.content,
                ChatCompletionRequestUserMessageContent::Text(t) if t == "Hello"
            ));
        } else {
            panic!("Expected User message");
        }
    }

    #[test]
    fn system_turn_becomes_system_message() {
        let msg =
            to_request_message(&Content::new("system").with_text("You are a helpful assistant."));
        assert!(matches!(msg, ChatCompletionRequestMessage::System(_)));
    }

    #[test]
    fn model_turn_carries_tool_calls() {
        let content = Content::new("model").with_part(Part::function_call(
            "getPokemonByName",
            serde_json::json!({"name": "pikachu"}),
            Some("call_0".to_string()),
        ));
        let msg = to_request_message(&content);

        if let ChatCompletionRequestMessage::Assistant(assistant) = &msg {
            let calls = assistant.tool_calls.as_ref().expect("tool calls present");
            assert_eq!(calls.len(), 1);
            assert_eq!(calls[0].function.name, "getPokemonByName");
            assert_eq!(calls[0].id, "call_0");
        } else {
            panic!("Expected Assistant message");
        }
    }

    #[test]
    fn function_turn_becomes_tool_result() {
        let content = Content::new("function").with_part(Part::function_response(
            "listTypes",
            serde_json::json!({"count": 20}),
            Some("call_1".to_string()),
        ));
        let msg = to_request_message(&content);

        if let ChatCompletionRequestMessage::Tool(tool_msg) = &msg {
            assert_eq!(tool_msg.tool_call_id, "call_1");
        } else {
            panic!("Expected Tool message");
        }
    }

    #[test]
    fn tool_definitions_keep_schema() {
        let mut tools = HashMap::new();
        tools.insert(
            "getAbility".to_string(),
            serde_json::json!({
                "description": "Get info about an ability",
                "parameters": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" }
                    }
                }
            }),
        );

        let definitions = tool_definitions(&tools);
        assert_eq!(definitions.len(), 1);
        assert_eq!(definitions[0].function.name, "getAbility");
        assert!(definitions[0].function.parameters.is_some());
    }

    #[test]
    fn finish_reason_mapping() {
        use async_openai::types::FinishReason as Api;
        assert_eq!(finish_reason_from(Api::Stop), FinishReason::Stop);
        assert_eq!(finish_reason_from(Api::ToolCalls), FinishReason::Stop);
        assert_eq!(finish_reason_from(Api::Length), FinishReason::Length);
        assert_eq!(finish_reason_from(Api::ContentFilter), FinishReason::ContentFilter);
    }
}
