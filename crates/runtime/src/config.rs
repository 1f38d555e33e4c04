//! Tool-server configuration and runtime limits.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::catalog::NAMESPACE_SEPARATOR;
use crate::{Error, Result};

/// How to launch one tool server.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ServerSpec {
    /// Key of the entry in the configuration file.
    #[serde(skip)]
    pub name: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Working directory of the server process.
    #[serde(default)]
    pub cwd: Option<PathBuf>,
}

/// The configured tool servers, in file order.
///
/// The file is a JSON object mapping server names to launch specs:
///
/// ```json
/// { "knowledge": { "command": "knowledge-server", "args": ["--db", "data.db"] } }
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerConfig {
    pub servers: Vec<ServerSpec>,
}

impl ServerConfig {
    /// Load the configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::parse(&content)
    }

    /// Parse the configuration from a JSON string.
    pub fn parse(json: &str) -> Result<Self> {
        let raw: Map<String, Value> = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("invalid server config: {e}")))?;

        let mut servers = Vec::with_capacity(raw.len());
        for (name, value) in raw {
            if name.is_empty() || name.contains(NAMESPACE_SEPARATOR) {
                return Err(Error::Config(format!(
                    "invalid server name {name:?}: must be non-empty and not contain '{NAMESPACE_SEPARATOR}'"
                )));
            }
            let mut spec: ServerSpec = serde_json::from_value(value)
                .map_err(|e| Error::Config(format!("server {name}: {e}")))?;
            spec.name = name;
            servers.push(spec);
        }

        Ok(Self { servers })
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

/// Bounds on a single client's work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Tool-resolution rounds allowed per turn.
    pub max_tool_rounds: usize,
    /// Wait for the chat stream to open and for each streamed unit.
    pub chat_timeout: Duration,
    /// Wait for a single tool call.
    pub tool_timeout: Duration,
    /// Launch, handshake and tool listing of one server.
    pub connect_timeout: Duration,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_tool_rounds: 8,
            chat_timeout: Duration::from_secs(120),
            tool_timeout: Duration::from_secs(60),
            connect_timeout: Duration::from_secs(30),
        }
    }
}
