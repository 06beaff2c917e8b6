//! Tools callable by workers
//!
//! A [`Tool`] takes a JSON arguments object and returns text. The
//! [`ToolRegistry`] is the only call site the graph nodes use. A broken search
//! backend or a model asking for a tool that does not exist ends up as text in
//! the worker's transcript instead of aborting the run; [`ToolRegistry::try_invoke`]
//! additionally hands the error back so the caller can record the failure.
//!
//! ```text
//!  worker ──ToolCall──→ ToolRegistry::invoke ──→ Tool::call ──Ok(text)──→ text
//!                              │                           └─Err(e)───→ "Error executing {tool}: {e}"
//!                              └─ unknown tool ──────────────────────→ "Error executing {tool}: ..."
//! ```

mod autocomplete;
mod scrape;
mod tavily;

pub use autocomplete::AutocompleteTool;
pub use scrape::ScrapePageTool;
pub use tavily::TavilySearchTool;

use async_trait::async_trait;
use llm::ToolSpec;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool '{0}' not found")]
    NotFound(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Missing API key: {0}")]
    MissingApiKey(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Failed(String),
}

/// A named capability the model may call
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema of the arguments object
    fn parameters(&self) -> Value;

    async fn call(&self, args: Value) -> Result<String, ToolError>;

    fn spec(&self) -> ToolSpec {
        ToolSpec::new(self.name(), self.description(), self.parameters())
    }
}

/// Read a required string argument
pub(crate) fn string_arg(args: &Value, key: &str) -> Result<String, ToolError> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ToolError::InvalidArguments(format!("'{key}' must be a string")))
}

/// Tools by name. Cheap to clone.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Web search, page scraping and autocomplete backed by their HTTP services
    pub fn standard(client: reqwest::Client) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(TavilySearchTool::from_env(client.clone())));
        registry.register(Arc::new(ScrapePageTool::new(client.clone())));
        registry.register(Arc::new(AutocompleteTool::new(client)));
        registry
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn with_tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.keys().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Schemas offered to the model
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.tools.values().map(|tool| tool.spec()).collect()
    }

    /// Call a tool, keeping its failure as an error
    pub async fn try_invoke(&self, name: &str, args: Value) -> Result<String, ToolError> {
        let result = match self.get(name) {
            Some(tool) => tool.call(args).await,
            None => Err(ToolError::NotFound(name.to_string())),
        };
        if let Err(e) = &result {
            tracing::warn!(tool = name, error = %e, "Tool invocation failed");
        }
        result
    }

    /// Call a tool. Failures come back as `Error executing {tool}: {e}` text.
    pub async fn invoke(&self, name: &str, args: Value) -> String {
        self.try_invoke(name, args)
            .await
            .unwrap_or_else(|e| error_text(name, &e))
    }
}

/// Text a failed tool call leaves in the transcript
pub fn error_text(name: &str, error: &ToolError) -> String {
    format!("Error executing {name}: {error}")
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.tool_names())
            .finish()
    }
}
