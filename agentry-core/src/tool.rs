use crate::{ReadonlyContext, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// A callable operation the model may invoke during a turn.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;

    /// JSON schema describing the tool's arguments, if any.
    fn parameters_schema(&self) -> Option<Value> {
        None
    }

    async fn execute(&self, ctx: Arc<dyn ToolContext>, args: Value) -> Result<Value>;
}

/// Context passed to a tool while it executes.
pub trait ToolContext: ReadonlyContext {
    fn function_call_id(&self) -> &str;
}

/// A named group of tools, resolved at invocation time.
#[async_trait]
pub trait Toolset: Send + Sync {
    fn name(&self) -> &str;
    async fn tools(&self, ctx: Arc<dyn ReadonlyContext>) -> Result<Vec<Arc<dyn Tool>>>;
}

pub type ToolPredicate = Box<dyn Fn(&dyn Tool) -> bool + Send + Sync>;
