use crate::types::Content;

/// Read-only view of the current invocation, available to tools and
/// instruction assembly.
pub trait ReadonlyContext: Send + Sync {
    fn invocation_id(&self) -> &str;
    fn agent_name(&self) -> &str;
    fn user_id(&self) -> &str;
    fn app_name(&self) -> &str;
    fn session_id(&self) -> &str;
    fn user_content(&self) -> &Content;
}

/// Full invocation context handed to an agent by the runner.
pub trait InvocationContext: ReadonlyContext {
    /// Prior conversation turns loaded from the session, oldest first.
    fn conversation_history(&self) -> Vec<Content>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct TestContext {
        content: Content,
    }

    impl ReadonlyContext for TestContext {
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

    impl InvocationContext for TestContext {
        fn conversation_history(&self) -> Vec<Content> {
            vec![]
        }
    }

    #[test]
    fn test_context_trait_object() {
        let ctx: Box<dyn InvocationContext> =
            Box::new(TestContext { content: Content::new("user").with_text("hi") });
        assert_eq!(ctx.agent_name(), "test_agent");
        assert!(ctx.conversation_history().is_empty());
        assert_eq!(ctx.user_content().text(), Some("hi".to_string()));
    }
}
