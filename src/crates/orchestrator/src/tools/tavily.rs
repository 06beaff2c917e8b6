//! Tavily web search

use super::{string_arg, Tool, ToolError};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

const TAVILY_URL: &str = "https://api.tavily.com/search";
const MAX_RESULTS: usize = 8;
const SNIPPET_CHARS: usize = 400;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

pub struct TavilySearchTool {
    client: reqwest::Client,
    api_key: Option<String>,
    endpoint: String,
}

impl TavilySearchTool {
    pub fn new(client: reqwest::Client, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key,
            endpoint: TAVILY_URL.to_string(),
        }
    }

    /// Key read from `TAVILY_API_KEY`; calls fail with a tool error when unset
    pub fn from_env(client: reqwest::Client) -> Self {
        Self::new(client, std::env::var("TAVILY_API_KEY").ok())
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// Trim trailing `:` and `/` a search index sometimes leaves on URLs
pub(crate) fn clean_url(url: &str) -> &str {
    url.trim().trim_end_matches(':').trim_end_matches('/')
}

fn is_http(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Render hits as a numbered list followed by the discovered URLs
pub fn format_results(hits: &[SearchHit]) -> String {
    let mut out = String::from("Search Results:\n");
    let mut urls = Vec::new();

    for (i, hit) in hits.iter().enumerate() {
        let url = clean_url(&hit.url);
        let title = hit.title.as_deref().unwrap_or("No Title");
        let snippet: String = hit.content.chars().take(SNIPPET_CHARS).collect();

        if is_http(url) {
            urls.push(url);
            out.push_str(&format!("{}. **{title}**\n   **URL:** {url}\n   {snippet}...\n\n", i + 1));
        } else {
            out.push_str(&format!(
                "{}. **{title}**\n   (Invalid or missing URL)\n   {snippet}...\n\n",
                i + 1
            ));
        }
    }

    if !urls.is_empty() {
        out.push_str(&format!("\n--- URLs DISCOVERED ({} total) ---\n", urls.len()));
        for (i, url) in urls.iter().enumerate() {
            out.push_str(&format!("{}. {url}\n", i + 1));
        }
        out.push_str("--- Use these URLs with scrape_competitor_page ---\n");
    }

    if hits.is_empty() {
        out.push_str("No results found. Try a different query.\n");
    }

    out
}

#[async_trait]
impl Tool for TavilySearchTool {
    fn name(&self) -> &str {
        "tavily_search"
    }

    fn description(&self) -> &str {
        "Search the web. Use it to find pages, competitors and recent news before scraping."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"query": {"type": "string", "description": "Search query"}},
            "required": ["query"]
        })
    }

    async fn call(&self, args: Value) -> Result<String, ToolError> {
        let query = string_arg(&args, "query")?;
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ToolError::MissingApiKey("TAVILY_API_KEY".to_string()))?;

        tracing::debug!(%query, "Tavily search");
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({
                "api_key": api_key,
                "query": query,
                "search_depth": "advanced",
                "max_results": MAX_RESULTS,
            }))
            .send()
            .await?
            .error_for_status()?;

        let body: SearchResponse = response.json().await?;
        Ok(format_results(&body.results))
    }
}
