use agentry_core::{ReadonlyContext, Result, Tool, ToolPredicate, Toolset};
use async_trait::async_trait;
use std::sync::Arc;

/// A fixed collection of tools with optional filtering.
pub struct BasicToolset {
    name: String,
    tools: Vec<Arc<dyn Tool>>,
    predicate: Option<ToolPredicate>,
}

impl BasicToolset {
    pub fn new(name: impl Into<String>, tools: Vec<Arc<dyn Tool>>) -> Self {
        Self { name: name.into(), tools, predicate: None }
    }

    #[must_use]
    pub fn with_predicate(mut self, predicate: ToolPredicate) -> Self {
        self.predicate = Some(predicate);
        self
    }
}

#[async_trait]
impl Toolset for BasicToolset {
    fn name(&self) -> &str {
        &self.name
    }

    async fn tools(&self, _ctx: Arc<dyn ReadonlyContext>) -> Result<Vec<Arc<dyn Tool>>> {
        if let Some(predicate) = &self.predicate {
            Ok(self.tools.iter().filter(|tool| predicate(tool.as_ref())).cloned().collect())
        } else {
            Ok(self.tools.clone())
        }
    }
}

/// Creates a predicate that allows only tools with names in the provided list.
pub fn string_predicate(allowed_tools: Vec<String>) -> ToolPredicate {
    let allowed_set: std::collections::HashSet<String> = allowed_tools.into_iter().collect();
    Box::new(move |tool: &dyn Tool| allowed_set.contains(tool.name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FunctionTool;
    use agentry_core::Content;
    use serde_json::Value;

    struct TestContext {
        content: Content,
    }

    impl ReadonlyContext for TestContext {
        fn invocation_id(&self) -> &str {
            "inv-1"
        }
        fn agent_name(&self) -> &str {
            "agent"
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

    fn test_ctx() -> Arc<dyn ReadonlyContext> {
        Arc::new(TestContext { content: Content::new("user") })
    }

    fn noop(name: &str) -> Arc<dyn Tool> {
        Arc::new(FunctionTool::new(name, "noop", |_ctx, _args| async move { Ok(Value::Null) }))
    }

    #[tokio::test]
    async fn returns_all_tools_without_predicate() {
        let toolset = BasicToolset::new("dice", vec![noop("roll_die"), noop("check_prime")]);
        let tools = toolset.tools(test_ctx()).await.unwrap();
        assert_eq!(tools.len(), 2);
    }

    #[tokio::test]
    async fn predicate_filters_by_name() {
        let toolset = BasicToolset::new("dice", vec![noop("roll_die"), noop("check_prime")])
            .with_predicate(string_predicate(vec!["roll_die".to_string()]));
        let tools = toolset.tools(test_ctx()).await.unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name(), "roll_die");
    }
}
