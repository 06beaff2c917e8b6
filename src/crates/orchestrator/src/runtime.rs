//! Agent runtime
//!
//! Owns the compiled graphs, the checkpoint store and one [`EventHub`] per
//! thread, and is the only thing the HTTP layer talks to. Runs on the same
//! thread are serialized by a per-thread lock; different threads never
//! contend. A lock entry lives only while someone holds or waits on it, and a
//! finished run's hub is evicted once the retention window has passed.
//!
//! ```text
//!  chat ───────→ brew | search | research graph ──ExecutionEvent──→ Translator ──ClientEvent──→ EventHub ──→ NDJSON
//!  start ──────→ investigator (pauses after planner) ──────┘                                      │
//!  approve ────→ update_state(as planner) + resume (background) ──────────────────────────────────┴──→ SSE
//! ```

use crate::brew::{build_parallel, build_sequential, BrewNode, BrewSettings};
use crate::config::{ChatMode, DispatchMode, ServerConfig};
use crate::events::{ClientEvent, EventHub, Profile, Translator};
use crate::investigator::{
    build_investigator, resolve_feedback, FeedbackAction, InvestigatorNode, InvestigatorSettings,
    InvestigatorState, ResearchPlan,
};
use crate::research::{build_research, ResearchNode, ResearchSettings};
use crate::search::{build_search, SearchNode};
use crate::tools::ToolRegistry;
use dashmap::DashMap;
use langgraph_core::checkpoint::{CheckpointConfig, CheckpointSaver};
use langgraph_core::{CompiledGraph, EventSink, ExecutionEvent, GraphError, RunOutcome};
use llm::{ChatModel, Message, ModelOptions};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex, OwnedMutexGuard};

/// Completion marker sent when an investigation pauses for review
pub const AWAITING_APPROVAL: &str = "awaiting_approval";

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Graph(#[from] GraphError),
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Tuning of every graph the runtime drives
#[derive(Debug, Clone)]
pub struct RuntimeSettings {
    pub dispatch: DispatchMode,
    pub default_model: String,
    pub default_thinking: bool,
    pub brew: BrewSettings,
    /// Model turns of the search agent
    pub search_max_turns: usize,
    pub research: ResearchSettings,
    pub investigator: InvestigatorSettings,
    /// How long a finished run's hub stays replayable
    pub hub_retention: Duration,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self::from(&ServerConfig::default())
    }
}

impl From<&ServerConfig> for RuntimeSettings {
    fn from(config: &ServerConfig) -> Self {
        let runtime = &config.runtime;
        Self {
            dispatch: runtime.dispatch,
            default_model: config.model.name.clone(),
            default_thinking: config.model.thinking,
            brew: BrewSettings {
                max_research_rounds: runtime.max_research_rounds,
                max_turns: runtime.executor_max_turns,
            },
            search_max_turns: runtime.search_max_turns,
            research: ResearchSettings {
                max_turns: runtime.search_max_turns,
                ..ResearchSettings::default()
            },
            investigator: InvestigatorSettings {
                max_turns: runtime.executor_max_turns,
                context_window_chars: runtime.context_window_chars,
                task_summary_chars: runtime.task_summary_chars,
            },
            hub_retention: Duration::from_secs(runtime.hub_retention_secs),
        }
    }
}

/// One chat turn
#[derive(Debug, Clone)]
pub struct ChatInput {
    pub thread_id: String,
    pub messages: Vec<Message>,
    pub model: Option<String>,
    pub thinking: Option<bool>,
    /// Graph to run; brew with the configured dispatch when absent
    pub mode: Option<ChatMode>,
}

/// Result of starting an investigation
#[derive(Debug, Clone)]
pub struct Investigation {
    pub thread_id: String,
    pub plan: ResearchPlan,
}

type ThreadLocks = DashMap<String, Arc<Mutex<()>>>;

/// Exclusive hold on one thread; the lock entry is removed on drop when
/// nobody else holds or waits on it
pub struct ThreadLease {
    guard: Option<OwnedMutexGuard<()>>,
    locks: Arc<ThreadLocks>,
    thread_id: String,
}

impl Drop for ThreadLease {
    fn drop(&mut self) {
        // release first so the map's reference is the only one left
        drop(self.guard.take());
        self.locks
            .remove_if(&self.thread_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

pub struct AgentRuntime {
    model: Arc<dyn ChatModel>,
    checkpointer: Arc<dyn CheckpointSaver>,
    sequential: CompiledGraph<BrewNode>,
    parallel: CompiledGraph<BrewNode>,
    search: CompiledGraph<SearchNode>,
    research: CompiledGraph<ResearchNode>,
    investigator: CompiledGraph<InvestigatorNode>,
    hubs: DashMap<String, Arc<EventHub>>,
    locks: Arc<ThreadLocks>,
    settings: RuntimeSettings,
}

impl std::fmt::Debug for AgentRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRuntime")
            .field("settings", &self.settings)
            .field("threads", &self.hubs.len())
            .finish()
    }
}

impl AgentRuntime {
    pub fn new(
        model: Arc<dyn ChatModel>,
        tools: ToolRegistry,
        checkpointer: Arc<dyn CheckpointSaver>,
        settings: RuntimeSettings,
    ) -> Result<Self, GraphError> {
        let sequential = crate::brew::graph::compile(
            build_sequential(model.clone(), tools.clone(), settings.brew),
            checkpointer.clone(),
        )?;
        let parallel = crate::brew::graph::compile(
            build_parallel(model.clone(), tools.clone(), settings.brew),
            checkpointer.clone(),
        )?;
        let search = crate::search::graph::compile(
            build_search(model.clone(), tools.clone(), settings.search_max_turns),
            checkpointer.clone(),
        )?;
        let research = crate::research::graph::compile(
            build_research(model.clone(), tools.clone(), settings.research),
            checkpointer.clone(),
        )?;
        let investigator = crate::investigator::graph::compile(
            build_investigator(model.clone(), tools, settings.investigator),
            checkpointer.clone(),
        )?;

        tracing::info!(
            dispatch = settings.dispatch.as_str(),
            model = %settings.default_model,
            "Agent runtime ready"
        );
        Ok(Self {
            model,
            checkpointer,
            sequential,
            parallel,
            search,
            research,
            investigator,
            hubs: DashMap::new(),
            locks: Arc::new(DashMap::new()),
            settings,
        })
    }

    pub fn settings(&self) -> &RuntimeSettings {
        &self.settings
    }

    pub fn checkpointer(&self) -> &Arc<dyn CheckpointSaver> {
        &self.checkpointer
    }

    /// Request options for `model`/`thinking`, falling back to the configured defaults
    pub fn model_options(&self, model: Option<&str>, thinking: Option<bool>) -> ModelOptions {
        let model = model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(&self.settings.default_model);
        ModelOptions::for_model(model, thinking.unwrap_or(self.settings.default_thinking))
    }

    /// Event hub of the latest run on `thread_id`
    pub fn hub(&self, thread_id: &str) -> Option<Arc<EventHub>> {
        self.hubs.get(thread_id).map(|hub| Arc::clone(hub.value()))
    }

    fn new_hub(&self, thread_id: &str) -> Arc<EventHub> {
        self.prune_hubs();
        let hub = EventHub::new();
        self.hubs.insert(thread_id.to_string(), Arc::clone(&hub));
        hub
    }

    /// Drop hubs whose run finished more than the retention window ago.
    /// Returns how many were evicted.
    pub fn prune_hubs(&self) -> usize {
        let retention = self.settings.hub_retention;
        let before = self.hubs.len();
        self.hubs
            .retain(|_, hub| hub.closed_for().map_or(true, |elapsed| elapsed < retention));
        let evicted = before.saturating_sub(self.hubs.len());
        if evicted > 0 {
            tracing::debug!(evicted, live = self.hubs.len(), "Evicted finished event hubs");
        }
        evicted
    }

    /// Threads with a run holding or waiting on their lock
    pub fn active_locks(&self) -> usize {
        self.locks.len()
    }

    async fn lock_thread(&self, thread_id: &str) -> ThreadLease {
        let lock = Arc::clone(self.locks.entry(thread_id.to_string()).or_default().value());
        let guard = lock.lock_owned().await;
        ThreadLease {
            guard: Some(guard),
            locks: Arc::clone(&self.locks),
            thread_id: thread_id.to_string(),
        }
    }

    fn brew_graph(&self, mode: DispatchMode) -> &CompiledGraph<BrewNode> {
        match mode {
            DispatchMode::Parallel => &self.parallel,
            DispatchMode::Sequential => &self.sequential,
        }
    }

    /// Start a chat run in the background and return the hub it streams into
    #[tracing::instrument(skip(self, input), fields(thread_id = %input.thread_id))]
    pub fn chat(self: &Arc<Self>, input: ChatInput) -> RuntimeResult<Arc<EventHub>> {
        if !input
            .messages
            .iter()
            .any(|msg| msg.role == llm::MessageRole::User && !msg.text().trim().is_empty())
        {
            return Err(RuntimeError::InvalidInput("messages must contain a user message".into()));
        }

        let mode = match input.mode.unwrap_or_default() {
            ChatMode::Brew(None) => ChatMode::Brew(Some(self.settings.dispatch)),
            mode => mode,
        };
        let options = self.model_options(input.model.as_deref(), input.thinking);
        let hub = self.new_hub(&input.thread_id);
        tracing::info!(mode = mode.as_str(), model = ?options.model, "Chat request accepted");

        let runtime = Arc::clone(self);
        let run_hub = Arc::clone(&hub);
        tokio::spawn(async move {
            let _lease = runtime.lock_thread(&input.thread_id).await;
            let thread_id = input.thread_id.as_str();
            let config = CheckpointConfig::for_thread(thread_id);
            let graph_input = json!({
                "messages": input.messages,
                "model_options": options,
            });

            match mode {
                ChatMode::Brew(dispatch) => {
                    let graph = runtime.brew_graph(dispatch.unwrap_or(runtime.settings.dispatch));
                    let outcome = drive(&run_hub, Profile::Brew, |sink| {
                        graph.invoke_with_config(Some(graph_input), &config, sink)
                    })
                    .await;
                    let _ = finish(&run_hub, thread_id, outcome);
                }
                ChatMode::Search => {
                    let outcome = drive(&run_hub, Profile::Search, |sink| {
                        runtime.search.invoke_with_config(Some(graph_input), &config, sink)
                    })
                    .await;
                    let _ = finish(&run_hub, thread_id, outcome);
                }
                ChatMode::Research => {
                    let outcome = drive(&run_hub, Profile::Research, |sink| {
                        runtime.research.invoke_with_config(Some(graph_input), &config, sink)
                    })
                    .await;
                    let _ = finish(&run_hub, thread_id, outcome);
                }
            }
        });

        Ok(hub)
    }

    /// Plan an investigation and pause for review
    #[tracing::instrument(skip(self, topic))]
    pub async fn start_investigation(
        &self,
        topic: &str,
        thread_id: Option<String>,
        model: Option<&str>,
        thinking: Option<bool>,
    ) -> RuntimeResult<Investigation> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(RuntimeError::InvalidInput("topic must not be empty".into()));
        }
        let thread_id = thread_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let _lease = self.lock_thread(&thread_id).await;
        let hub = self.new_hub(&thread_id);
        let config = CheckpointConfig::for_thread(&thread_id);
        let input = json!({
            "topic": topic,
            "model_options": self.model_options(model, thinking),
        });

        let outcome = drive(&hub, Profile::Investigator, |sink| {
            self.investigator.invoke_with_config(Some(input), &config, sink)
        })
        .await;
        let state = match &outcome {
            Ok(outcome) => InvestigatorState::from_value(outcome.state()).unwrap_or_default(),
            Err(_) => InvestigatorState::default(),
        };
        finish(&hub, &thread_id, outcome.map_err(RuntimeError::from)).map(|_| Investigation {
            plan: state.research_plan.unwrap_or_else(|| ResearchPlan::fallback(topic)),
            thread_id,
        })
    }

    /// Record review feedback and continue the investigation in the background.
    ///
    /// Feedback is resolved to approve or update here, so the graph only ever
    /// sees an explicit action.
    #[tracing::instrument(skip(self, feedback))]
    pub async fn approve(self: &Arc<Self>, thread_id: &str, feedback: &str) -> RuntimeResult<FeedbackAction> {
        let lease = self.lock_thread(thread_id).await;
        let config = CheckpointConfig::for_thread(thread_id);

        let snapshot = self
            .investigator
            .get_state(&config)
            .await?
            .ok_or_else(|| RuntimeError::NotFound(format!("no investigation for thread '{thread_id}'")))?;
        let state = InvestigatorState::from_value(&snapshot.values).unwrap_or_default();
        if state.topic.trim().is_empty() {
            return Err(RuntimeError::NotFound(format!(
                "thread '{thread_id}' has no topic to resume"
            )));
        }
        if snapshot.next.is_empty() {
            return Err(RuntimeError::InvalidInput(format!(
                "investigation '{thread_id}' has already finished"
            )));
        }

        let (action, feedback) = resolve_feedback(
            self.model.as_ref(),
            feedback,
            state.research_plan.as_ref(),
            state.model_options.clone(),
        )
        .await;
        tracing::info!(?action, "Review feedback resolved");

        let config = self
            .investigator
            .update_state(
                &config,
                json!({
                    "topic": state.topic,
                    "user_feedback": feedback,
                    "feedback_action": action,
                }),
                Some(InvestigatorNode::Planner),
            )
            .await?;

        let hub = self.new_hub(thread_id);
        let runtime = Arc::clone(self);
        let thread_id = thread_id.to_string();
        tokio::spawn(async move {
            let _lease = lease;
            let outcome = drive(&hub, Profile::Investigator, |sink| {
                runtime.investigator.resume(&config, sink)
            })
            .await;
            let _ = finish(&hub, &thread_id, outcome);
        });

        Ok(action)
    }

    /// Current investigator state of a thread
    pub async fn investigation(&self, thread_id: &str) -> RuntimeResult<InvestigatorState> {
        let snapshot = self
            .investigator
            .get_state(&CheckpointConfig::for_thread(thread_id))
            .await?
            .ok_or_else(|| RuntimeError::NotFound(format!("no investigation for thread '{thread_id}'")))?;
        Ok(InvestigatorState::from_value(&snapshot.values).unwrap_or_default())
    }
}

/// Run `start` with a connected sink, translating its telemetry into `hub` as it arrives
async fn drive<N, F, Fut>(hub: &EventHub, profile: Profile, start: F) -> Result<RunOutcome<N>, GraphError>
where
    F: FnOnce(EventSink) -> Fut,
    Fut: Future<Output = Result<RunOutcome<N>, GraphError>>,
{
    let (sink, mut rx) = EventSink::channel();
    let mut translator = Translator::new(profile);

    let run = start(sink);
    tokio::pin!(run);
    let outcome = loop {
        tokio::select! {
            biased;
            Some(event) = rx.recv() => hub.publish_all(translator.translate(&event)),
            outcome = &mut run => break outcome,
        }
    };
    drain(&mut rx, |event| hub.publish_all(translator.translate(&event)));
    outcome
}

fn drain(rx: &mut mpsc::UnboundedReceiver<ExecutionEvent>, mut f: impl FnMut(ExecutionEvent)) {
    while let Ok(event) = rx.try_recv() {
        f(event);
    }
}

/// Publish the terminal event of a run
fn finish<N, E>(hub: &EventHub, thread_id: &str, outcome: Result<RunOutcome<N>, E>) -> Result<(), E>
where
    N: langgraph_core::NodeKey,
    E: std::fmt::Display,
{
    match outcome {
        Ok(RunOutcome::Interrupted { node, .. }) => {
            tracing::info!(thread_id, node = %node.as_str(), "Run paused for review");
            hub.publish(ClientEvent::Complete {
                content: Some(AWAITING_APPROVAL.to_string()),
            });
            Ok(())
        }
        Ok(RunOutcome::Complete(_)) => {
            tracing::info!(thread_id, "Run complete");
            hub.publish(ClientEvent::complete());
            Ok(())
        }
        Err(e) => {
            tracing::error!(thread_id, error = %e, "Run failed");
            hub.publish(ClientEvent::error(e.to_string()));
            Err(e)
        }
    }
}
