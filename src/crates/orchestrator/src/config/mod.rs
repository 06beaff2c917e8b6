//! Server configuration for orchestrator-server
//!
//! Loads `orchestrator.toml` (every section optional, every field defaulted)
//! and applies `ORCHESTRATOR_*` environment overrides on top.
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8000
//!
//! [model]
//! name = "gpt-4.1"
//! thinking = false
//!
//! [runtime]
//! dispatch = "sequential"
//! max_research_rounds = 3
//! hub_retention_secs = 600
//!
//! [database]
//! path = "data/brewgraph.db"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(toml::de::Error),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Worker scheduling discipline of the brew graph
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispatchMode {
    /// Every assignment runs concurrently
    Parallel,
    /// Assignments run one at a time in priority order, with the research debate loop
    #[default]
    Sequential,
}

impl DispatchMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "parallel" => Some(DispatchMode::Parallel),
            "sequential" => Some(DispatchMode::Sequential),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DispatchMode::Parallel => "parallel",
            DispatchMode::Sequential => "sequential",
        }
    }
}

/// Which graph a chat request runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatMode {
    /// Planner, workers and synthesizer; `None` uses the configured dispatch
    Brew(Option<DispatchMode>),
    /// One agent looping over the tools until it can answer
    Search,
    /// Plan, discover sources, extract them, write a report
    Research,
}

impl Default for ChatMode {
    fn default() -> Self {
        ChatMode::Brew(None)
    }
}

impl From<DispatchMode> for ChatMode {
    fn from(mode: DispatchMode) -> Self {
        ChatMode::Brew(Some(mode))
    }
}

impl ChatMode {
    /// Strict parse; `brew_parallel` and bare `parallel` both select the parallel brew graph
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim().to_ascii_lowercase();
        match value.as_str() {
            "" | "brew" => Some(ChatMode::Brew(None)),
            "search" => Some(ChatMode::Search),
            "research" => Some(ChatMode::Research),
            other => DispatchMode::parse(other.strip_prefix("brew_").unwrap_or(other)).map(ChatMode::from),
        }
    }

    /// Parse a client-supplied mode; anything unrecognized runs brew
    pub fn from_request(value: Option<&str>) -> Self {
        let Some(value) = value else {
            return ChatMode::default();
        };
        Self::parse(value).unwrap_or_else(|| {
            tracing::warn!(mode = value, "Unknown chat mode, falling back to brew");
            ChatMode::default()
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ChatMode::Brew(None) => "brew",
            ChatMode::Brew(Some(DispatchMode::Parallel)) => "brew_parallel",
            ChatMode::Brew(Some(DispatchMode::Sequential)) => "brew_sequential",
            ChatMode::Search => "search",
            ChatMode::Research => "research",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSection {
    /// Model used when a request does not name one
    pub name: String,
    /// OpenAI-compatible endpoint
    pub base_url: String,
    /// Environment variable holding the API key
    pub api_key_env: String,
    /// Request extended reasoning by default
    pub thinking: bool,
    pub timeout_secs: u64,
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            name: "gpt-4.1".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            thinking: false,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSection {
    pub dispatch: DispatchMode,
    /// Upper bound on research attempts per assignment
    pub max_research_rounds: u32,
    /// Model turns per worker or investigator task
    pub executor_max_turns: usize,
    /// Trailing window of findings fed back into each investigator task
    pub context_window_chars: usize,
    /// Per-task summary length in the investigator log
    pub task_summary_chars: usize,
    /// Model turns of the search agent and of each research stage
    pub search_max_turns: usize,
    /// How long a finished run's event log stays replayable
    pub hub_retention_secs: u64,
}

impl Default for RuntimeSection {
    fn default() -> Self {
        Self {
            dispatch: DispatchMode::Sequential,
            max_research_rounds: 3,
            executor_max_turns: 3,
            context_window_chars: 6000,
            task_summary_chars: 800,
            search_max_turns: 5,
            hub_retention_secs: 600,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    /// SQLite file; the in-memory store is used when unset
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// `tracing_subscriber` filter used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

/// Complete orchestrator-server configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: ServerSection,
    pub model: ModelSection,
    pub runtime: RuntimeSection,
    pub database: DatabaseSection,
    pub logging: LoggingSection,
}

impl ServerConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: ServerConfig = toml::from_str(content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `CONFIG_PATH` or a default location, then apply environment
    /// overrides. Missing files fall back to defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::locate() {
            Some(path) => {
                tracing::info!(path = %path.display(), "Loading configuration");
                Self::from_file(path)?
            }
            None => {
                tracing::info!("No configuration file found, using defaults");
                Self::default()
            }
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn locate() -> Option<PathBuf> {
        if let Ok(config_path) = std::env::var("CONFIG_PATH") {
            return Some(PathBuf::from(config_path));
        }

        [
            PathBuf::from("config/orchestrator.toml"),
            PathBuf::from("./orchestrator.toml"),
        ]
        .into_iter()
        .find(|path| path.exists())
    }

    /// Apply `ORCHESTRATOR_*` overrides read through `lookup`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("ORCHESTRATOR_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("ORCHESTRATOR_PORT") {
            self.server.port = port.parse().map_err(|_| {
                ConfigError::InvalidConfig(format!("ORCHESTRATOR_PORT is not a port: {port}"))
            })?;
        }
        if let Some(model) = lookup("ORCHESTRATOR_MODEL") {
            self.model.name = model;
        }
        if let Some(db) = lookup("ORCHESTRATOR_DB") {
            self.database.path = Some(PathBuf::from(db));
        }
        if let Some(dispatch) = lookup("ORCHESTRATOR_DISPATCH") {
            self.runtime.dispatch = DispatchMode::parse(&dispatch).ok_or_else(|| {
                ConfigError::InvalidConfig(format!("unknown dispatch mode '{dispatch}'"))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.name.trim().is_empty() {
            return Err(ConfigError::InvalidConfig("model.name is empty".to_string()));
        }
        if self.runtime.max_research_rounds == 0 {
            return Err(ConfigError::InvalidConfig(
                "runtime.max_research_rounds must be at least 1".to_string(),
            ));
        }
        if self.runtime.search_max_turns == 0 {
            return Err(ConfigError::InvalidConfig(
                "runtime.search_max_turns must be at least 1".to_string(),
            ));
        }
        if self.runtime.executor_max_turns == 0 {
            return Err(ConfigError::InvalidConfig(
                "runtime.executor_max_turns must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// sqlx connection URL for the configured database file
    pub fn database_url(&self) -> Option<String> {
        self.database
            .path
            .as_ref()
            .map(|path| format!("sqlite://{}?mode=rwc", path.display()))
    }
}
