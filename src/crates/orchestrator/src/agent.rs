//! Tool-augmented model loop shared by brew workers and the investigator
//!
//! Each turn sends the transcript to the model. Tool calls are executed
//! through the [`ToolRegistry`], reported as telemetry on the node context and
//! fed back as tool messages. Tools are withheld on the last turn so the model
//! has to answer in text.

use crate::tools::{error_text, ToolRegistry};
use futures::StreamExt;
use langgraph_core::NodeContext;
use llm::{ChatModel, ChatRequest, Message, ModelOptions};
use regex::Regex;
use serde_json::Value;
use std::sync::{Arc, OnceLock};

const MAX_SOURCES: usize = 10;

/// Output of one tool call made during a run
#[derive(Debug, Clone, PartialEq)]
pub struct ToolObservation {
    pub tool: String,
    pub output: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentOutcome {
    /// Text of the model's final answer
    pub answer: String,
    pub observations: Vec<ToolObservation>,
    /// One `Error executing ...` line per failed tool call
    pub tool_errors: Vec<String>,
}

impl AgentOutcome {
    pub fn has_tool_errors(&self) -> bool {
        !self.tool_errors.is_empty()
    }

    /// Distinct URLs seen in tool output, in discovery order
    pub fn sources(&self) -> Vec<String> {
        static URL: OnceLock<Option<Regex>> = OnceLock::new();
        let Some(re) = URL
            .get_or_init(|| Regex::new(r#"https?://[^\s)\]>"'*]+"#).ok())
            .as_ref()
        else {
            return Vec::new();
        };

        let mut sources: Vec<String> = Vec::new();
        for observation in &self.observations {
            for found in re.find_iter(&observation.output) {
                let url = found.as_str().trim_end_matches(['.', ',', ':', '/']);
                if !sources.iter().any(|s| s == url) {
                    sources.push(url.to_string());
                }
                if sources.len() == MAX_SOURCES {
                    return sources;
                }
            }
        }
        sources
    }
}

/// Arguments pinned for one tool, replacing whatever the model proposes
#[derive(Debug, Clone, Copy)]
pub struct PinnedArgs<'a> {
    pub tool: &'a str,
    pub args: &'a Value,
}

pub struct AgentTask<'a> {
    pub system: String,
    pub prompt: String,
    pub options: ModelOptions,
    pub pinned: Option<PinnedArgs<'a>>,
    /// Earlier turns of the conversation, placed before `prompt`
    pub history: Vec<Message>,
}

impl<'a> AgentTask<'a> {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>, options: ModelOptions) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            options,
            pinned: None,
            history: Vec::new(),
        }
    }

    pub fn with_pinned(mut self, pinned: Option<PinnedArgs<'a>>) -> Self {
        self.pinned = pinned;
        self
    }

    pub fn with_history(mut self, history: Vec<Message>) -> Self {
        self.history = history;
        self
    }
}

/// Model plus the tools it may call
#[derive(Clone)]
pub struct ToolAgent {
    model: Arc<dyn ChatModel>,
    tools: ToolRegistry,
    max_turns: usize,
}

impl ToolAgent {
    pub fn new(model: Arc<dyn ChatModel>, tools: ToolRegistry, max_turns: usize) -> Self {
        Self {
            model,
            tools,
            max_turns: max_turns.max(1),
        }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Run the loop until the model answers without tool calls or the turn budget is spent
    pub async fn run(&self, task: AgentTask<'_>, ctx: &NodeContext) -> llm::Result<AgentOutcome> {
        let mut messages = Vec::with_capacity(task.history.len() + 2);
        messages.push(Message::system(task.system));
        messages.extend(task.history);
        messages.push(Message::user(task.prompt));
        let mut outcome = AgentOutcome::default();

        for turn in 0..self.max_turns {
            let last_turn = turn + 1 == self.max_turns;
            let mut request = ChatRequest::new(messages.clone()).with_options(task.options.clone());
            if !last_turn && !self.tools.is_empty() {
                request = request.with_tools(self.tools.specs());
            }

            let response = self.model.chat(request).await?;
            let calls = response.tool_calls().to_vec();
            if calls.is_empty() || last_turn {
                outcome.answer = response.text();
                break;
            }

            tracing::debug!(node = ctx.node(), turn, calls = calls.len(), "Executing tool calls");
            messages.push(response.message.clone());
            for call in calls {
                let args = match task.pinned {
                    Some(pinned) if pinned.tool == call.name && !is_empty_args(pinned.args) => {
                        pinned.args.clone()
                    }
                    _ => call.arguments.clone(),
                };

                ctx.tool_start(&call.name, args.clone());
                let output = match self.tools.try_invoke(&call.name, args).await {
                    Ok(output) => output,
                    Err(e) => {
                        let text = error_text(&call.name, &e);
                        outcome.tool_errors.push(text.clone());
                        text
                    }
                };
                ctx.tool_end(&call.name, output.clone());

                messages.push(Message::tool(call.id.clone(), output.clone()));
                outcome.observations.push(ToolObservation {
                    tool: call.name,
                    output,
                });
            }
        }

        Ok(outcome)
    }
}

/// Stream a reply, forwarding every token to the node context.
///
/// Returns whatever text arrived before the stream ended or broke off; an
/// empty string means the call produced nothing usable.
pub async fn stream_text(model: &dyn ChatModel, request: ChatRequest, ctx: &NodeContext) -> String {
    let mut text = String::new();
    match model.stream(request).await {
        Ok(mut tokens) => {
            while let Some(token) = tokens.next().await {
                match token {
                    Ok(token) => {
                        ctx.emit_token(token.clone());
                        text.push_str(&token);
                    }
                    Err(e) => {
                        tracing::warn!(node = ctx.node(), error = %e, "Token stream broke off");
                        break;
                    }
                }
            }
        }
        Err(e) => tracing::warn!(node = ctx.node(), error = %e, "Streaming call failed"),
    }
    text
}

fn is_empty_args(args: &Value) -> bool {
    match args {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{Tool, ToolError};
    use async_trait::async_trait;
    use langgraph_core::{EventSink, ExecutionEvent};
    use llm::{ChatResponse, ToolCall};
    use parking_lot::Mutex;
    use serde_json::json;

    /// Replays canned responses and records the requests it saw
    struct Scripted {
        responses: Mutex<Vec<ChatResponse>>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl Scripted {
        fn new(mut responses: Vec<ChatResponse>) -> Self {
            responses.reverse();
            Self {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ChatModel for Scripted {
        async fn chat(&self, request: ChatRequest) -> llm::Result<ChatResponse> {
            self.requests.lock().push(request);
            Ok(self
                .responses
                .lock()
                .pop()
                .unwrap_or_else(|| ChatResponse::new(Message::assistant("done"))))
        }
    }

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            "tavily_search"
        }

        fn description(&self) -> &str {
            "echo"
        }

        fn parameters(&self) -> Value {
            json!({"type": "object"})
        }

        async fn call(&self, args: Value) -> Result<String, ToolError> {
            Ok(format!("results for {} at https://acme.io/pricing.", args["query"]))
        }
    }

    fn call(query: &str) -> ChatResponse {
        ChatResponse::new(
            Message::assistant("").with_tool_calls(vec![ToolCall::new(
                "c1",
                "tavily_search",
                json!({"query": query}),
            )]),
        )
    }

    #[tokio::test]
    async fn test_tool_loop_feeds_observations_back() {
        let model = Arc::new(Scripted::new(vec![
            call("coffee"),
            ChatResponse::new(Message::assistant("final answer")),
        ]));
        let agent = ToolAgent::new(model.clone(), ToolRegistry::new().with_tool(Arc::new(Echo)), 3);
        let (sink, mut rx) = EventSink::channel();
        let ctx = NodeContext::new("research_worker", "t", 0, sink);

        let outcome = agent
            .run(AgentTask::new("sys", "find coffee", ModelOptions::default()), &ctx)
            .await
            .unwrap();

        assert_eq!(outcome.answer, "final answer");
        assert_eq!(outcome.observations.len(), 1);
        assert_eq!(outcome.sources(), vec!["https://acme.io/pricing".to_string()]);

        let requests = model.requests.lock();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].messages.last().unwrap().tool_call_id.as_deref(), Some("c1"));

        assert!(matches!(rx.recv().await, Some(ExecutionEvent::ToolStart { .. })));
        assert!(matches!(rx.recv().await, Some(ExecutionEvent::ToolEnd { .. })));
    }

    struct Broken;

    #[async_trait]
    impl Tool for Broken {
        fn name(&self) -> &str {
            "tavily_search"
        }

        fn description(&self) -> &str {
            "always fails"
        }

        fn parameters(&self) -> Value {
            json!({"type": "object"})
        }

        async fn call(&self, _args: Value) -> Result<String, ToolError> {
            Err(ToolError::Failed("backend down".into()))
        }
    }

    #[tokio::test]
    async fn test_tool_failure_is_recorded_and_fed_back() {
        let model = Arc::new(Scripted::new(vec![
            call("coffee"),
            ChatResponse::new(Message::assistant("could not search")),
        ]));
        let agent = ToolAgent::new(model.clone(), ToolRegistry::new().with_tool(Arc::new(Broken)), 3);

        let outcome = agent
            .run(
                AgentTask::new("sys", "find coffee", ModelOptions::default()),
                &NodeContext::detached("content_worker"),
            )
            .await
            .unwrap();

        assert!(outcome.has_tool_errors());
        assert_eq!(outcome.tool_errors, vec!["Error executing tavily_search: backend down".to_string()]);
        assert_eq!(outcome.answer, "could not search");

        let requests = model.requests.lock();
        assert_eq!(requests[1].messages.last().unwrap().text(), "Error executing tavily_search: backend down");
    }

    #[tokio::test]
    async fn test_last_turn_withholds_tools() {
        let model = Arc::new(Scripted::new(vec![call("a"), call("b"), call("c")]));
        let agent = ToolAgent::new(model.clone(), ToolRegistry::new().with_tool(Arc::new(Echo)), 2);

        let outcome = agent
            .run(
                AgentTask::new("sys", "go", ModelOptions::default()),
                &NodeContext::detached("content_worker"),
            )
            .await
            .unwrap();

        let requests = model.requests.lock();
        assert_eq!(requests.len(), 2);
        assert!(!requests[0].tools.is_empty());
        assert!(requests[1].tools.is_empty());
        assert_eq!(outcome.observations.len(), 1);
    }

    #[tokio::test]
    async fn test_pinned_args_override_model_args() {
        let model = Arc::new(Scripted::new(vec![
            call("model guess"),
            ChatResponse::new(Message::assistant("ok")),
        ]));
        let agent = ToolAgent::new(model, ToolRegistry::new().with_tool(Arc::new(Echo)), 3);
        let pinned = json!({"query": "planned query"});

        let outcome = agent
            .run(
                AgentTask::new("sys", "go", ModelOptions::default()).with_pinned(Some(PinnedArgs {
                    tool: "tavily_search",
                    args: &pinned,
                })),
                &NodeContext::detached("executor"),
            )
            .await
            .unwrap();

        assert!(outcome.observations[0].output.contains("planned query"));
    }

    #[tokio::test]
    async fn test_history_sits_between_system_and_prompt() {
        let model = Arc::new(Scripted::new(vec![ChatResponse::new(Message::assistant("ok"))]));
        let agent = ToolAgent::new(model.clone(), ToolRegistry::new(), 2);

        agent
            .run(
                AgentTask::new("sys", "and in Berlin?", ModelOptions::default())
                    .with_history(vec![Message::user("cafes in Paris"), Message::assistant("Three picks")]),
                &NodeContext::detached("search_agent"),
            )
            .await
            .unwrap();

        let requests = model.requests.lock();
        let texts: Vec<String> = requests[0].messages.iter().map(Message::text).collect();
        assert_eq!(texts, vec!["sys", "cafes in Paris", "Three picks", "and in Berlin?"]);
    }
}
