use agentry_core::{Content, InvocationContext as InvocationContextTrait, ReadonlyContext};

/// Concrete invocation context handed to the agent by the [`Runner`].
///
/// [`Runner`]: crate::Runner
pub struct InvocationContext {
    invocation_id: String,
    agent_name: String,
    user_id: String,
    app_name: String,
    session_id: String,
    user_content: Content,
    history: Vec<Content>,
}

impl InvocationContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        invocation_id: String,
        agent_name: String,
        user_id: String,
        app_name: String,
        session_id: String,
        user_content: Content,
        history: Vec<Content>,
    ) -> Self {
        Self { invocation_id, agent_name, user_id, app_name, session_id, user_content, history }
    }
}

impl ReadonlyContext for InvocationContext {
    fn invocation_id(&self) -> &str {
        &self.invocation_id
    }

    fn agent_name(&self) -> &str {
        &self.agent_name
    }

    fn user_id(&self) -> &str {
        &self.user_id
    }

    fn app_name(&self) -> &str {
        &self.app_name
    }

    fn session_id(&self) -> &str {
        &self.session_id
    }

    fn user_content(&self) -> &Content {
        &self.user_content
    }
}

impl InvocationContextTrait for InvocationContext {
    fn conversation_history(&self) -> Vec<Content> {
        self.history.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exposes_all_fields() {
        let ctx = InvocationContext::new(
            "inv-1".to_string(),
            "pokemon_expert_agent".to_string(),
            "user_pokemon".to_string(),
            "pokemon_agent_app".to_string(),
            "session_1".to_string(),
            Content::new("user").with_text("Tell me about Pikachu."),
            vec![Content::new("user").with_text("hi")],
        );

        assert_eq!(ctx.invocation_id(), "inv-1");
        assert_eq!(ctx.agent_name(), "pokemon_expert_agent");
        assert_eq!(ctx.app_name(), "pokemon_agent_app");
        assert_eq!(ctx.conversation_history().len(), 1);
    }
}
