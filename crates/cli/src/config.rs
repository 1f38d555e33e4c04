//! Configuration loading from mooring.toml.

use std::path::{Path, PathBuf};
use std::time::Duration;

use runtime::providers::DEFAULT_URL;
use runtime::{ClientOptions, DEFAULT_SYSTEM_PROMPT, Limits, OllamaBackend};
use serde::Deserialize;

pub const DEFAULT_CONFIG_FILE: &str = "mooring.toml";
const DEFAULT_SERVERS_FILE: &str = "servers.json";
const DEFAULT_MODEL: &str = "llama3.2";
const DEFAULT_BIND: &str = "127.0.0.1:5001";

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Path to the tool-server configuration (JSON).
    #[serde(default = "default_servers")]
    pub servers: PathBuf,

    /// Replaces the built-in system prompt.
    #[serde(default)]
    pub system_prompt: Option<String>,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub limits: LimitsConfig,

    #[serde(default)]
    pub http: HttpConfig,
}

/// Chat endpoint configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Provider name (currently only "ollama" supported).
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Base URL of the provider.
    #[serde(default = "default_url")]
    pub url: String,

    /// Model to use.
    #[serde(default = "default_model")]
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,
    #[serde(default = "default_chat_timeout")]
    pub chat_timeout_secs: u64,
    #[serde(default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Address the HTTP front end listens on.
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_servers() -> PathBuf {
    PathBuf::from(DEFAULT_SERVERS_FILE)
}

fn default_provider() -> String {
    "ollama".to_string()
}

fn default_url() -> String {
    DEFAULT_URL.to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_max_tool_rounds() -> usize {
    Limits::default().max_tool_rounds
}

fn default_chat_timeout() -> u64 {
    Limits::default().chat_timeout.as_secs()
}

fn default_tool_timeout() -> u64 {
    Limits::default().tool_timeout.as_secs()
}

fn default_connect_timeout() -> u64 {
    Limits::default().connect_timeout.as_secs()
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            url: default_url(),
            model: default_model(),
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_tool_rounds: default_max_tool_rounds(),
            chat_timeout_secs: default_chat_timeout(),
            tool_timeout_secs: default_tool_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            servers: default_servers(),
            system_prompt: None,
            backend: BackendConfig::default(),
            limits: LimitsConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Load the file if it exists, otherwise use defaults.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Build the chat backend.
    pub fn backend(&self) -> runtime::Result<OllamaBackend> {
        match self.backend.provider.as_str() {
            "ollama" => Ok(OllamaBackend::builder(&self.backend.model)
                .url(&self.backend.url)
                .build()),
            other => Err(runtime::Error::Config(format!(
                "unsupported provider {other:?}: only \"ollama\" is available"
            ))),
        }
    }

    pub fn limits(&self) -> Limits {
        Limits {
            max_tool_rounds: self.limits.max_tool_rounds,
            chat_timeout: Duration::from_secs(self.limits.chat_timeout_secs),
            tool_timeout: Duration::from_secs(self.limits.tool_timeout_secs),
            connect_timeout: Duration::from_secs(self.limits.connect_timeout_secs),
        }
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            system_prompt: self
                .system_prompt
                .clone()
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            limits: self.limits(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),
}
