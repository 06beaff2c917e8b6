//! Search autocomplete suggestions, a cheap signal of what people look for

use super::{string_arg, Tool, ToolError};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

const SUGGEST_URL: &str = "http://google.com/complete/search";

pub struct AutocompleteTool {
    client: reqwest::Client,
}

impl AutocompleteTool {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

/// Suggestions from a `[query, [suggestion, ...], ...]` response body
pub fn parse_suggestions(body: &Value) -> Vec<String> {
    body.get(1)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl Tool for AutocompleteTool {
    fn name(&self) -> &str {
        "get_autocomplete_suggestions"
    }

    fn description(&self) -> &str {
        "Get search autocomplete suggestions for a query."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"query": {"type": "string"}},
            "required": ["query"]
        })
    }

    async fn call(&self, args: Value) -> Result<String, ToolError> {
        let query = string_arg(&args, "query")?;
        let body: Value = self
            .client
            .get(SUGGEST_URL)
            .query(&[("client", "chrome"), ("q", query.as_str())])
            .timeout(Duration::from_secs(5))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let suggestions = parse_suggestions(&body);
        if suggestions.is_empty() {
            return Ok(format!("No suggestions for '{query}'."));
        }
        Ok(suggestions.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_suggestions() {
        let body = json!(["cold brew", ["cold brew recipe", "cold brew ratio"], [], {}]);
        assert_eq!(
            parse_suggestions(&body),
            vec!["cold brew recipe".to_string(), "cold brew ratio".to_string()]
        );
        assert!(parse_suggestions(&json!({})).is_empty());
    }
}
