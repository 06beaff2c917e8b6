//! Client configuration and per-request model options.

use crate::error::{LlmError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

/// Configuration for an OpenAI-compatible completion service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteLlmConfig {
    /// API key for authentication.
    pub api_key: String,

    /// Base URL for the API, e.g. "https://api.openai.com/v1".
    pub base_url: String,

    /// Default model name.
    pub model: String,

    /// Request timeout duration.
    #[serde(default = "default_timeout")]
    pub timeout: Duration,

    /// Organization ID (optional, for providers that support it).
    pub organization: Option<String>,
}

impl RemoteLlmConfig {
    /// Create a new remote LLM configuration.
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: model.into(),
            timeout: default_timeout(),
            organization: None,
        }
    }

    /// Create configuration reading the API key from an environment variable.
    pub fn from_env(
        env_var: &str,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        let api_key = std::env::var(env_var)
            .map_err(|_| LlmError::ApiKeyNotFound(format!("Environment variable: {}", env_var)))?;

        Ok(Self::new(api_key, base_url, model))
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the organization ID.
    pub fn with_organization(mut self, organization: impl Into<String>) -> Self {
        self.organization = Some(organization.into());
        self
    }
}

fn default_timeout() -> Duration {
    Duration::from_secs(120)
}

/// Per-request model selection and reasoning pass-through.
///
/// Only model families that understand reasoning controls receive them;
/// everything else is sent with service defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelOptions {
    /// Overrides the client's default model for this request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Responses-style reasoning object (`gpt-5*`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<Value>,

    /// Chat-completions reasoning effort (`o1*`, `o3*`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<String>,

    /// Content block layout the caller expects back. Never sent upstream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_version: Option<String>,
}

impl ModelOptions {
    /// Build the options for `model`, with high effort when `thinking`.
    pub fn for_model(model: &str, thinking: bool) -> Self {
        let effort = if thinking { "high" } else { "low" };
        let mut options = Self {
            model: Some(model.to_string()),
            ..Self::default()
        };

        if model.starts_with("gpt-5") {
            let mut reasoning = json!({ "effort": effort });
            if thinking {
                reasoning["summary"] = json!("auto");
            }
            options.reasoning = Some(reasoning);
            options.output_version = Some("responses/v1".to_string());
        } else if model.starts_with("o1") || model.starts_with("o3") {
            options.reasoning_effort = Some(effort.to_string());
        }

        options
    }
}
