//! REST tools derived from an OpenAPI 3.0 document.
//!
//! Each operation carrying an `operationId` becomes one [`RestApiTool`] whose
//! name is the operation ID and whose argument schema is assembled from the
//! operation's path and query parameters. Executing the tool performs the
//! HTTP request against the document's first server URL.

use agentry_core::{AgentryError, ReadonlyContext, Result, Tool, ToolContext, Toolset};
use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct OpenApiDocument {
    #[serde(default)]
    openapi: String,
    info: ApiInfo,
    #[serde(default)]
    servers: Vec<ApiServer>,
    #[serde(default)]
    paths: BTreeMap<String, PathItem>,
}

#[derive(Debug, Deserialize)]
struct ApiInfo {
    title: String,
    #[serde(default)]
    version: String,
}

#[derive(Debug, Deserialize)]
struct ApiServer {
    url: String,
}

#[derive(Debug, Default, Deserialize)]
struct PathItem {
    get: Option<ApiOperation>,
    put: Option<ApiOperation>,
    post: Option<ApiOperation>,
    delete: Option<ApiOperation>,
    patch: Option<ApiOperation>,
}

impl PathItem {
    fn operations(&self) -> Vec<(Method, &ApiOperation)> {
        let mut ops = Vec::new();
        if let Some(op) = &self.get {
            ops.push((Method::GET, op));
        }
        if let Some(op) = &self.put {
            ops.push((Method::PUT, op));
        }
        if let Some(op) = &self.post {
            ops.push((Method::POST, op));
        }
        if let Some(op) = &self.delete {
            ops.push((Method::DELETE, op));
        }
        if let Some(op) = &self.patch {
            ops.push((Method::PATCH, op));
        }
        ops
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiOperation {
    operation_id: Option<String>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Vec<ApiParameter>,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiParameter {
    name: String,
    #[serde(rename = "in")]
    location: String,
    #[serde(default)]
    required: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    schema: Option<Value>,
}

/// One REST operation exposed as a [`Tool`].
pub struct RestApiTool {
    name: String,
    description: String,
    method: Method,
    base_url: String,
    path_template: String,
    parameters: Vec<ApiParameter>,
    client: reqwest::Client,
}

impl RestApiTool {
    fn new(
        name: String,
        description: String,
        method: Method,
        base_url: String,
        path_template: String,
        parameters: Vec<ApiParameter>,
        client: reqwest::Client,
    ) -> Self {
        Self { name, description, method, base_url, path_template, parameters, client }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path_template(&self) -> &str {
        &self.path_template
    }

    fn value_to_string(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Resolve the request URL and query pairs from the call arguments.
    fn build_request_parts(&self, args: &Value) -> Result<(String, Vec<(String, String)>)> {
        let empty = Map::new();
        let args = match args {
            Value::Object(map) => map,
            Value::Null => &empty,
            other => {
                return Err(AgentryError::Tool(format!(
                    "Tool '{}' expects an object argument, got {other}",
                    self.name
                )));
            }
        };

        let mut path = self.path_template.clone();
        let mut query = Vec::new();

        for param in &self.parameters {
            let value = args.get(&param.name);

            let Some(value) = value else {
                if param.required {
                    return Err(AgentryError::Tool(format!(
                        "Tool '{}' missing required parameter '{}'",
                        self.name, param.name
                    )));
                }
                continue;
            };

            let rendered = Self::value_to_string(value);
            match param.location.as_str() {
                "path" => {
                    path = path.replace(&format!("{{{}}}", param.name), &rendered);
                }
                "query" => {
                    query.push((param.name.clone(), rendered));
                }
                other => {
                    return Err(AgentryError::Tool(format!(
                        "Tool '{}' has unsupported parameter location '{other}'",
                        self.name
                    )));
                }
            }
        }

        Ok((format!("{}{}", self.base_url, path), query))
    }
}

#[async_trait]
impl Tool for RestApiTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn parameters_schema(&self) -> Option<Value> {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in &self.parameters {
            let mut schema = match &param.schema {
                Some(Value::Object(map)) => map.clone(),
                _ => {
                    let mut map = Map::new();
                    map.insert("type".to_string(), json!("string"));
                    map
                }
            };
            if let Some(description) = &param.description {
                schema.entry("description".to_string()).or_insert_with(|| json!(description));
            }
            properties.insert(param.name.clone(), Value::Object(schema));

            if param.required {
                required.push(json!(param.name));
            }
        }

        Some(json!({
            "type": "object",
            "properties": properties,
            "required": required,
        }))
    }

    async fn execute(&self, _ctx: Arc<dyn ToolContext>, args: Value) -> Result<Value> {
        let (url, query) = self.build_request_parts(&args)?;

        tracing::debug!(tool = %self.name, method = %self.method, url = %url, "Executing REST tool");

        let mut request = self.client.request(self.method.clone(), &url);
        if !query.is_empty() {
            request = request.query(&query);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AgentryError::Tool(format!("Request to {url} failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AgentryError::Tool(format!("Failed to read response from {url}: {e}")))?;

        if !status.is_success() {
            return Err(AgentryError::Tool(format!(
                "Tool '{}' got HTTP {status} from {url}",
                self.name
            )));
        }

        // Non-JSON bodies are wrapped so the model always sees JSON.
        Ok(serde_json::from_str(&body).unwrap_or_else(|_| json!({ "text": body })))
    }
}

/// Toolset derived from an OpenAPI 3.0 JSON document.
pub struct OpenApiToolset {
    name: String,
    tools: Vec<Arc<dyn Tool>>,
}

impl std::fmt::Debug for OpenApiToolset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenApiToolset").field("name", &self.name).finish_non_exhaustive()
    }
}

impl OpenApiToolset {
    /// Parse an OpenAPI 3.0 JSON document into a toolset.
    ///
    /// Operations without an `operationId` are skipped with a warning, since
    /// the operation ID is what the model calls the tool by.
    pub fn from_json_str(document: &str) -> Result<Self> {
        let doc: OpenApiDocument = serde_json::from_str(document)
            .map_err(|e| AgentryError::Config(format!("Invalid OpenAPI document: {e}")))?;

        let base_url = doc
            .servers
            .first()
            .map(|s| s.url.trim_end_matches('/').to_string())
            .ok_or_else(|| {
                AgentryError::Config("OpenAPI document declares no servers".to_string())
            })?;

        tracing::debug!(
            title = %doc.info.title,
            version = %doc.info.version,
            openapi = %doc.openapi,
            base_url = %base_url,
            "Loading OpenAPI toolset"
        );

        let client = reqwest::Client::new();
        let mut tools: Vec<Arc<dyn Tool>> = Vec::new();

        for (path, item) in &doc.paths {
            for (method, op) in item.operations() {
                let Some(operation_id) = &op.operation_id else {
                    tracing::warn!(path = %path, method = %method, "Skipping operation without operationId");
                    continue;
                };

                let description = op
                    .description
                    .clone()
                    .or_else(|| op.summary.clone())
                    .unwrap_or_default();

                tools.push(Arc::new(RestApiTool::new(
                    operation_id.clone(),
                    description,
                    method,
                    base_url.clone(),
                    path.clone(),
                    op.parameters.clone(),
                    client.clone(),
                )));
            }
        }

        Ok(Self { name: doc.info.title, tools })
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[async_trait]
impl Toolset for OpenApiToolset {
    fn name(&self) -> &str {
        &self.name
    }

    async fn tools(&self, _ctx: Arc<dyn ReadonlyContext>) -> Result<Vec<Arc<dyn Tool>>> {
        Ok(self.tools.clone())
    }
}
