use agentry_core::{
    Agent, AgentryError, Content, Event, EventStream, GenerateContentConfig, InvocationContext,
    Llm, LlmRequest, LlmResponse, Part, ReadonlyContext, Result, Tool, ToolContext, Toolset,
};
use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;

/// An agent driven by a language model.
///
/// Each invocation assembles the prompt from the instruction, the session's
/// prior turns and the current user content, then loops: stream the model's
/// chunks out as events, execute any function calls it made, append the
/// responses to the working history, and ask again. The loop ends when the
/// model produces a turn with no function calls.
pub struct LlmAgent {
    name: String,
    description: String,
    model: Arc<dyn Llm>,
    instruction: Option<String>,
    tools: Vec<Arc<dyn Tool>>,
    toolsets: Vec<Arc<dyn Toolset>>,
    output_key: Option<String>,
    generate_content_config: Option<GenerateContentConfig>,
}

impl std::fmt::Debug for LlmAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmAgent")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("model", &self.model.name())
            .field("instruction", &self.instruction)
            .field("tools_count", &self.tools.len())
            .field("toolsets_count", &self.toolsets.len())
            .field("output_key", &self.output_key)
            .finish()
    }
}

impl LlmAgent {
    pub fn instruction(&self) -> Option<&str> {
        self.instruction.as_deref()
    }

    pub fn model_name(&self) -> &str {
        self.model.name()
    }

    pub fn output_key(&self) -> Option<&str> {
        self.output_key.as_deref()
    }
}

pub struct LlmAgentBuilder {
    name: String,
    description: Option<String>,
    model: Option<Arc<dyn Llm>>,
    instruction: Option<String>,
    tools: Vec<Arc<dyn Tool>>,
    toolsets: Vec<Arc<dyn Toolset>>,
    output_key: Option<String>,
    generate_content_config: Option<GenerateContentConfig>,
}

impl LlmAgentBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            model: None,
            instruction: None,
            tools: Vec::new(),
            toolsets: Vec::new(),
            output_key: None,
            generate_content_config: None,
        }
    }

    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn model(mut self, model: Arc<dyn Llm>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = Some(instruction.into());
        self
    }

    pub fn tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn toolset(mut self, toolset: Arc<dyn Toolset>) -> Self {
        self.toolsets.push(toolset);
        self
    }

    /// Save the agent's final text answer under this session state key.
    pub fn output_key(mut self, key: impl Into<String>) -> Self {
        self.output_key = Some(key.into());
        self
    }

    pub fn generate_content_config(mut self, config: GenerateContentConfig) -> Self {
        self.generate_content_config = Some(config);
        self
    }

    pub fn build(self) -> Result<LlmAgent> {
        let model =
            self.model.ok_or_else(|| AgentryError::Agent("Model is required".to_string()))?;

        Ok(LlmAgent {
            name: self.name,
            description: self.description.unwrap_or_default(),
            model,
            instruction: self.instruction,
            tools: self.tools,
            toolsets: self.toolsets,
            output_key: self.output_key,
            generate_content_config: self.generate_content_config,
        })
    }
}

/// Tool context that delegates to the parent invocation and pins the call ID.
struct AgentToolContext {
    parent_ctx: Arc<dyn InvocationContext>,
    function_call_id: String,
}

impl AgentToolContext {
    fn new(parent_ctx: Arc<dyn InvocationContext>, function_call_id: String) -> Self {
        Self { parent_ctx, function_call_id }
    }
}

impl ReadonlyContext for AgentToolContext {
    fn invocation_id(&self) -> &str {
        self.parent_ctx.invocation_id()
    }

    fn agent_name(&self) -> &str {
        self.parent_ctx.agent_name()
    }

    fn user_id(&self) -> &str {
        self.parent_ctx.user_id()
    }

    fn app_name(&self) -> &str {
        self.parent_ctx.app_name()
    }

    fn session_id(&self) -> &str {
        self.parent_ctx.session_id()
    }

    fn user_content(&self) -> &Content {
        self.parent_ctx.user_content()
    }
}

impl ToolContext for AgentToolContext {
    fn function_call_id(&self) -> &str {
        &self.function_call_id
    }
}

/// Merge a streamed chunk into the accumulated turn content. Consecutive
/// text deltas are appended to the same part so the history carries whole
/// messages rather than one part per chunk.
fn merge_chunk(accumulated: &mut Option<Content>, chunk_content: Content) {
    match accumulated {
        Some(acc) => {
            for part in chunk_content.parts {
                match (&part, acc.parts.last_mut()) {
                    (Part::Text { text }, Some(Part::Text { text: last })) => {
                        last.push_str(text);
                    }
                    _ => acc.parts.push(part),
                }
            }
        }
        None => *accumulated = Some(chunk_content),
    }
}

#[async_trait]
impl Agent for LlmAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn run(&self, ctx: Arc<dyn InvocationContext>) -> Result<EventStream> {
        let agent_name = self.name.clone();
        let invocation_id = ctx.invocation_id().to_string();
        let model = self.model.clone();
        let static_tools = self.tools.clone();
        let toolsets = self.toolsets.clone();
        let instruction = self.instruction.clone();
        let output_key = self.output_key.clone();
        let config = self.generate_content_config.clone();

        tracing::info!(
            agent = %agent_name,
            invocation_id = %invocation_id,
            session_id = %ctx.session_id(),
            "Starting agent invocation"
        );

        let s = stream! {
            // Resolve toolsets against the current invocation.
            let mut tools = static_tools;
            for toolset in &toolsets {
                match toolset.tools(ctx.clone() as Arc<dyn ReadonlyContext>).await {
                    Ok(resolved) => tools.extend(resolved),
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }

            let mut tool_declarations = HashMap::new();
            for tool in &tools {
                let mut decl = serde_json::json!({
                    "name": tool.name(),
                    "description": tool.description(),
                });
                if let Some(params) = tool.parameters_schema() {
                    decl["parameters"] = params;
                }
                tool_declarations.insert(tool.name().to_string(), decl);
            }

            let mut conversation_history = Vec::new();
            if let Some(instruction) = &instruction {
                conversation_history.push(Content::new("system").with_text(instruction.clone()));
            }
            conversation_history.extend(ctx.conversation_history());
            conversation_history.push(ctx.user_content().clone());

            let max_iterations = 10;
            let mut iteration = 0;

            loop {
                iteration += 1;
                if iteration > max_iterations {
                    yield Err(AgentryError::Agent(
                        format!("Max iterations ({max_iterations}) exceeded")
                    ));
                    return;
                }

                let mut request =
                    LlmRequest::new(model.name(), conversation_history.clone());
                request.tools = tool_declarations.clone();
                if let Some(config) = &config {
                    request = request.with_config(config.clone());
                }

                let mut response_stream = match model.generate_content(request, true).await {
                    Ok(stream) => stream,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };

                let mut accumulated_content: Option<Content> = None;
                let mut saw_partial = false;

                while let Some(chunk_result) = response_stream.next().await {
                    let chunk = match chunk_result {
                        Ok(c) => c,
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    };

                    saw_partial |= chunk.partial;

                    let mut event = Event::new(&invocation_id);
                    event.author = agent_name.clone();
                    event.llm_response = chunk.clone();
                    yield Ok(event);

                    if let Some(chunk_content) = chunk.content {
                        merge_chunk(&mut accumulated_content, chunk_content);
                    }

                    if chunk.turn_complete {
                        break;
                    }
                }

                let function_calls: Vec<(String, serde_json::Value, Option<String>)> =
                    accumulated_content
                        .as_ref()
                        .map(|c| {
                            c.parts
                                .iter()
                                .filter_map(|p| match p {
                                    Part::FunctionCall { name, args, id } => {
                                        Some((name.clone(), args.clone(), id.clone()))
                                    }
                                    _ => None,
                                })
                                .collect()
                        })
                        .unwrap_or_default();

                if let Some(content) = &accumulated_content {
                    conversation_history.push(content.clone());
                }

                if function_calls.is_empty() {
                    // Streamed text arrives as partial deltas followed by a
                    // content-less finish chunk, so nothing yielded above is
                    // a complete turn. Emit the merged content as one final
                    // event; it is also what the session log replays.
                    if saw_partial {
                        if let Some(content) = &accumulated_content {
                            if content.parts.iter().any(|p| p.text().is_some()) {
                                let mut final_event = Event::new(&invocation_id);
                                final_event.author = agent_name.clone();
                                final_event.llm_response = LlmResponse::new(content.clone());
                                yield Ok(final_event);
                            }
                        }
                    }

                    if let Some(output_key) = &output_key {
                        let text = accumulated_content
                            .as_ref()
                            .and_then(|c| c.text())
                            .unwrap_or_default();
                        if !text.is_empty() {
                            let mut state_event = Event::new(&invocation_id);
                            state_event.author = agent_name.clone();
                            state_event.actions.state_delta.insert(
                                output_key.clone(),
                                serde_json::Value::String(text),
                            );
                            yield Ok(state_event);
                        }
                    }
                    break;
                }

                for (name, args, call_id) in function_calls {
                    let call_id = call_id
                        .unwrap_or_else(|| format!("{invocation_id}-{name}"));

                    tracing::debug!(
                        agent = %agent_name,
                        tool = %name,
                        call_id = %call_id,
                        "Executing tool call"
                    );

                    let result = if let Some(tool) = tools.iter().find(|t| t.name() == name) {
                        let tool_ctx: Arc<dyn ToolContext> =
                            Arc::new(AgentToolContext::new(ctx.clone(), call_id.clone()));
                        match tool.execute(tool_ctx, args).await {
                            Ok(result) => result,
                            // Tool failures go back to the model as data so
                            // it can recover or apologize in text.
                            Err(e) => serde_json::json!({ "error": e.to_string() }),
                        }
                    } else {
                        serde_json::json!({ "error": format!("Tool {name} not found") })
                    };

                    let response_content = Content::new("function").with_part(
                        Part::function_response(&name, result, Some(call_id)),
                    );

                    let mut tool_event = Event::new(&invocation_id);
                    tool_event.author = agent_name.clone();
                    tool_event.set_content(response_content.clone());
                    yield Ok(tool_event);

                    conversation_history.push(response_content);
                }
            }
        };

        Ok(Box::pin(s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentry_model::MockLlm;
    use agentry_tool::FunctionTool;
    use serde_json::json;

    struct TestInvocation {
        content: Content,
        history: Vec<Content>,
    }

    impl TestInvocation {
        fn new(text: &str) -> Self {
            Self { content: Content::new("user").with_text(text), history: Vec::new() }
        }
    }

    impl ReadonlyContext for TestInvocation {
        fn invocation_id(&self) -> &str {
            "inv-1"
        }
        fn agent_name(&self) -> &str {
            "test_agent"
        }
        fn user_id(&self) -> &str {
            "user"
        }
        fn app_name(&self) -> &str {
            "app"
        }
        fn session_id(&self) -> &str {
            "session"
        }
        fn user_content(&self) -> &Content {
            &self.content
        }
    }

    impl InvocationContext for TestInvocation {
        fn conversation_history(&self) -> Vec<Content> {
            self.history.clone()
        }
    }

    #[test]
    fn build_requires_model() {
        let err = LlmAgentBuilder::new("dice_agent")
            .description("hello world agent")
            .build()
            .expect_err("missing model");
        assert!(matches!(err, AgentryError::Agent(_)));
    }

    #[tokio::test]
    async fn text_only_turn_yields_final_event() {
        let model = Arc::new(MockLlm::new().with_text("Pikachu is an Electric-type."));
        let agent = LlmAgentBuilder::new("pokemon_expert_agent")
            .description("Agent to answer questions about Pokemon.")
            .instruction("You are a helpful Pokemon expert.")
            .model(model)
            .build()
            .unwrap();

        let ctx: Arc<dyn InvocationContext> =
            Arc::new(TestInvocation::new("Tell me about Pikachu."));
        let events: Vec<Event> = agent
            .run(ctx)
            .await
            .unwrap()
            .map(|e| e.unwrap())
            .collect::<Vec<_>>()
            .await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].author, "pokemon_expert_agent");
        assert!(events[0].is_final_response());
        assert_eq!(
            events[0].content().and_then(|c| c.text()),
            Some("Pikachu is an Electric-type.".to_string())
        );
    }

    #[tokio::test]
    async fn streamed_turn_yields_merged_final_event() {
        // A streaming provider sends text as partial deltas and closes the
        // turn with an empty chunk carrying only the finish reason.
        let finish = LlmResponse {
            content: None,
            usage: None,
            finish_reason: Some(agentry_core::FinishReason::Stop),
            partial: false,
            turn_complete: true,
        };
        let model = Arc::new(MockLlm::new().with_turn(vec![
            LlmResponse::chunk(Content::new("model").with_text("Pikachu is an ")),
            LlmResponse::chunk(Content::new("model").with_text("Electric-type.")),
            finish,
        ]));

        let agent = LlmAgentBuilder::new("pokemon_expert_agent").model(model).build().unwrap();

        let ctx: Arc<dyn InvocationContext> =
            Arc::new(TestInvocation::new("Tell me about Pikachu."));
        let events: Vec<Event> = agent
            .run(ctx)
            .await
            .unwrap()
            .map(|e| e.unwrap())
            .collect::<Vec<_>>()
            .await;

        // Two deltas, the finish chunk, then the merged turn.
        assert_eq!(events.len(), 4);
        assert!(events[0].llm_response.partial);
        assert!(!events[2].is_final_response());

        let finals: Vec<&Event> = events.iter().filter(|e| e.is_final_response()).collect();
        assert_eq!(finals.len(), 1);
        assert_eq!(
            finals[0].content().and_then(|c| c.text()),
            Some("Pikachu is an Electric-type.".to_string())
        );
    }

    #[tokio::test]
    async fn tool_call_loop_feeds_response_back() {
        let model = Arc::new(
            MockLlm::new()
                .with_function_call(
                    "getPokemonByName",
                    json!({"name": "pikachu"}),
                    Some("call_0".to_string()),
                )
                .with_text("Pikachu weighs 60 hectograms."),
        );

        let tool = Arc::new(FunctionTool::new(
            "getPokemonByName",
            "Get details about a Pokemon by name.",
            |_ctx, args| async move {
                assert_eq!(args["name"], "pikachu");
                Ok(json!({"weight": 60}))
            },
        ));

        let agent = LlmAgentBuilder::new("pokemon_expert_agent")
            .model(model)
            .tool(tool)
            .build()
            .unwrap();

        let ctx: Arc<dyn InvocationContext> =
            Arc::new(TestInvocation::new("Tell me about Pikachu."));
        let events: Vec<Event> = agent
            .run(ctx)
            .await
            .unwrap()
            .map(|e| e.unwrap())
            .collect::<Vec<_>>()
            .await;

        // Call event, tool response event, final answer.
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].function_calls().len(), 1);

        let responses = events[1].function_responses();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].name, "getPokemonByName");
        assert_eq!(responses[0].response, json!({"weight": 60}));

        assert!(events[2].is_final_response());
    }

    #[tokio::test]
    async fn tool_error_is_returned_to_the_model() {
        let model = Arc::new(
            MockLlm::new()
                .with_function_call("getAbility", json!({"name": "blaze"}), None)
                .with_text("I could not look that up."),
        );

        let tool = Arc::new(FunctionTool::new(
            "getAbility",
            "Get details about an ability.",
            |_ctx, _args| async move {
                Err::<serde_json::Value, _>(AgentryError::Tool("HTTP 404".to_string()))
            },
        ));

        let agent =
            LlmAgentBuilder::new("pokemon_expert_agent").model(model).tool(tool).build().unwrap();

        let ctx: Arc<dyn InvocationContext> = Arc::new(TestInvocation::new("ability blaze?"));
        let events: Vec<Event> = agent
            .run(ctx)
            .await
            .unwrap()
            .map(|e| e.unwrap())
            .collect::<Vec<_>>()
            .await;

        let responses = events[1].function_responses();
        assert_eq!(responses[0].response, json!({"error": "Tool error: HTTP 404"}));
        assert!(events[2].is_final_response());
    }

    #[tokio::test]
    async fn output_key_emits_state_delta() {
        let model = Arc::new(MockLlm::new().with_text("You rolled a 7."));
        let agent = LlmAgentBuilder::new("dice_agent")
            .model(model)
            .output_key("last_roll")
            .build()
            .unwrap();

        let ctx: Arc<dyn InvocationContext> = Arc::new(TestInvocation::new("roll the die"));
        let events: Vec<Event> = agent
            .run(ctx)
            .await
            .unwrap()
            .map(|e| e.unwrap())
            .collect::<Vec<_>>()
            .await;

        assert_eq!(events.len(), 2);
        let delta = &events[1].actions.state_delta;
        assert_eq!(delta.get("last_roll"), Some(&json!("You rolled a 7.")));
    }

    #[test]
    fn merge_chunk_appends_text_deltas() {
        let mut acc = None;
        merge_chunk(&mut acc, Content::new("model").with_text("Pika"));
        merge_chunk(&mut acc, Content::new("model").with_text("chu"));
        merge_chunk(
            &mut acc,
            Content::new("model").with_part(Part::function_call("listTypes", json!({}), None)),
        );

        let acc = acc.unwrap();
        assert_eq!(acc.parts.len(), 2);
        assert_eq!(acc.parts[0].text(), Some("Pikachu"));
    }
}
