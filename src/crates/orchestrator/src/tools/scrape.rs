//! Fetch a page and reduce it to readable text

use super::tavily::clean_url;
use super::{string_arg, Tool, ToolError};
use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};
use std::sync::OnceLock;

const MAX_PAGE_CHARS: usize = 20_000;

fn patterns() -> &'static [(Regex, &'static str)] {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (r"(?is)<(script|style|noscript|svg)[^>]*>.*?</(script|style|noscript|svg)>", " "),
            (r"(?is)<!--.*?-->", " "),
            (r"(?i)<br\s*/?>|</(p|div|li|h[1-6]|tr|section|article)>", "\n"),
            (r"(?s)<[^>]+>", " "),
            (r"[ \t\r\f]+", " "),
            (r"\n\s*\n\s*", "\n\n"),
        ]
        .into_iter()
        .filter_map(|(pattern, replacement)| Regex::new(pattern).ok().map(|re| (re, replacement)))
        .collect()
    })
}

/// Strip markup from an HTML document, keeping paragraph breaks
pub fn html_to_text(html: &str) -> String {
    let mut text = html.to_string();
    for (re, replacement) in patterns() {
        text = re.replace_all(&text, *replacement).into_owned();
    }
    text.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .trim()
        .to_string()
}

pub struct ScrapePageTool {
    client: reqwest::Client,
}

impl ScrapePageTool {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for ScrapePageTool {
    fn name(&self) -> &str {
        "scrape_competitor_page"
    }

    fn description(&self) -> &str {
        "Fetch a URL and return its readable text. Use it after finding URLs with tavily_search."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {"url": {"type": "string", "description": "Absolute http(s) URL"}},
            "required": ["url"]
        })
    }

    async fn call(&self, args: Value) -> Result<String, ToolError> {
        let raw = string_arg(&args, "url")?;
        let url = clean_url(&raw);
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Ok(format!(
                "Invalid URL format: {url}. Must start with http:// or https://"
            ));
        }

        tracing::debug!(%url, "Scraping page");
        let html = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let text = html_to_text(&html);
        if text.is_empty() {
            return Ok("No content found.".to_string());
        }
        Ok(text.chars().take(MAX_PAGE_CHARS).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_to_text() {
        let html = r#"<html><head><style>p{}</style><script>var x = 1;</script></head>
            <body><h1>Pricing</h1><p>Starter &amp; Pro</p><!-- hidden --><p>$9</p></body></html>"#;
        let text = html_to_text(html);
        assert!(text.contains("Pricing"));
        assert!(text.contains("Starter & Pro"));
        assert!(text.contains("$9"));
        assert!(!text.contains("var x"));
        assert!(!text.contains("hidden"));
        assert!(!text.contains('<'));
    }

    #[tokio::test]
    async fn test_rejects_relative_url_as_text() {
        let tool = ScrapePageTool::new(reqwest::Client::new());
        let out = tool.call(json!({"url": " acme.io/pricing: "})).await.unwrap();
        assert_eq!(
            out,
            "Invalid URL format: acme.io/pricing. Must start with http:// or https://"
        );
    }
}
