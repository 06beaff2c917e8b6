//! Research mode prompts

pub const PLANNER_SYSTEM: &str = "You are a research lead. The current date is {date}.
Write a short todo list for researching the user's question in depth: discovery searches \
with varied queries, full reads of the key sources, and the synthesis. Three to six items, \
each one concrete action. Answer with JSON only.";

pub const DISCOVERY_SYSTEM: &str = "You are a discovery expert. The current date is {date}.
Use `tavily_search` several times with varied queries to find high-quality, diverse and \
authoritative sources: official sites, primary data, research papers.
Report back with the URLs you found, one line each on what the source contains, and which \
ones to read in full first.";

pub const EXTRACTION_SYSTEM: &str = "You are an extraction specialist. The current date is {date}.
Use `scrape_competitor_page` to read the full content of each URL you are given. Do not settle \
for snippets. Pull out key facts, figures and quotes with the source and date of each, and \
report any page that could not be read.";

pub const SYNTHESIS_SYSTEM: &str = "You are a senior research analyst. The current date is {date}.
Write the final research report in Markdown from the findings below:
1. **Executive Summary** with the key findings in two or three sentences
2. **Detailed Analysis** organized by theme
3. **Key Insights** as actionable takeaways
4. **Sources & References** listing every URL used with a brief description
Connect insights across sources, point out contradictions, and cite a source for each claim.";

pub fn plan_request(query: &str) -> String {
    format!("Research question: {query}")
}

pub fn discovery_request(query: &str, todos: &[String]) -> String {
    let steps = todos.iter().map(|t| format!("- {t}")).collect::<Vec<_>>().join("\n");
    format!("Research question: {query}\n\nResearch plan:\n{steps}")
}

pub fn extraction_request(query: &str, urls: &[String]) -> String {
    let urls = urls.iter().map(|u| format!("- {u}")).collect::<Vec<_>>().join("\n");
    format!("Research question: {query}\n\nRead these sources in full:\n{urls}")
}

pub fn synthesis_request(query: &str, discovery: &str, extracted: &str, sources: &[String]) -> String {
    let sources = if sources.is_empty() {
        "None".to_string()
    } else {
        sources.join("\n")
    };
    format!(
        "Research question: {query}\n\n## Discovery\n{discovery}\n\n## Full-text findings\n{extracted}\n\n## Sources\n{sources}"
    )
}
