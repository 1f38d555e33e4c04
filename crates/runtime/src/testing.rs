//! In-process fakes of the chat endpoint and tool servers.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{Map, Value, json};

use crate::catalog::ToolCatalog;
use crate::config::{ServerConfig, ServerSpec};
use crate::manager::SessionManager;
use crate::model::{
    ChatBackend, ChatRequest, ChatStream, Message, ModelError, ParameterSchema, StreamUnit,
    ToolCall,
};
use crate::tools::{Connector, ContentPart, RemoteTool, ToolError, ToolSession};
use crate::{Error, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Chat endpoint
// ─────────────────────────────────────────────────────────────────────────────

enum Round {
    Units(Vec<std::result::Result<StreamUnit, ModelError>>),
    FailOpen(ModelError),
    Stall,
}

/// What the backend was asked in one request.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    pub tools: Vec<String>,
}

/// Replays one scripted response per request.
#[derive(Default)]
pub struct ScriptedBackend {
    script: Mutex<VecDeque<Round>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn round(self, units: Vec<std::result::Result<StreamUnit, ModelError>>) -> Self {
        self.push(Round::Units(units))
    }

    /// A content-only response, streamed as the given fragments.
    pub fn reply<'a>(self, fragments: impl IntoIterator<Item = &'a str>) -> Self {
        let units = fragments
            .into_iter()
            .map(|f| Ok(StreamUnit::Content(f.to_string())))
            .collect();
        self.round(units)
    }

    /// A response requesting the given tool calls.
    pub fn tool_calls<'a>(self, calls: impl IntoIterator<Item = (&'a str, Value)>) -> Self {
        self.round(vec![Ok(StreamUnit::ToolCalls(tool_calls(calls)))])
    }

    pub fn content_and_calls<'a>(
        self,
        content: &str,
        calls: impl IntoIterator<Item = (&'a str, Value)>,
    ) -> Self {
        self.round(vec![
            Ok(StreamUnit::Content(content.to_string())),
            Ok(StreamUnit::ToolCalls(tool_calls(calls))),
        ])
    }

    pub fn fail_open(self, error: ModelError) -> Self {
        self.push(Round::FailOpen(error))
    }

    /// A response that opens but never yields.
    pub fn stall(self) -> Self {
        self.push(Round::Stall)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn push(self, round: Round) -> Self {
        self.script.lock().unwrap().push_back(round);
        self
    }
}

fn tool_calls<'a>(calls: impl IntoIterator<Item = (&'a str, Value)>) -> Vec<ToolCall> {
    calls
        .into_iter()
        .enumerate()
        .map(|(i, (name, arguments))| ToolCall {
            id: format!("call-{i}"),
            name: name.to_string(),
            arguments,
        })
        .collect()
}

impl ChatBackend for ScriptedBackend {
    async fn stream(
        &self,
        request: ChatRequest<'_>,
    ) -> std::result::Result<ChatStream, ModelError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            messages: request.messages.to_vec(),
            tools: request.tools.iter().map(|t| t.name.clone()).collect(),
        });

        let round = self.script.lock().unwrap().pop_front();
        match round {
            Some(Round::Units(units)) => Ok(Box::pin(futures::stream::iter(units))),
            Some(Round::FailOpen(error)) => Err(error),
            Some(Round::Stall) => Ok(Box::pin(futures::stream::pending())),
            None => Err(ModelError::Api("script exhausted".into())),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool servers
// ─────────────────────────────────────────────────────────────────────────────

/// How a fake tool answers.
#[derive(Debug, Clone)]
pub enum FakeReply {
    Parts(Vec<ContentPart>),
    Fail(String),
    Hang,
}

impl FakeReply {
    pub fn text(text: &str) -> Self {
        Self::Parts(vec![ContentPart::Text(text.to_string())])
    }

    pub fn fail(message: &str) -> Self {
        Self::Fail(message.to_string())
    }
}

#[derive(Debug, Clone)]
enum FakeServer {
    Healthy(Vec<(String, FakeReply)>),
    Failing,
    Stalling,
}

#[derive(Debug, Default)]
struct Log {
    events: Vec<String>,
    calls: Vec<(String, String, Map<String, Value>)>,
}

/// A session answering from canned replies, logging calls and release.
pub struct FakeSession {
    server: String,
    tools: Vec<RemoteTool>,
    replies: Vec<(String, FakeReply)>,
    log: Arc<Mutex<Log>>,
}

impl ToolSession for FakeSession {
    fn tools(&self) -> &[RemoteTool] {
        &self.tools
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> std::result::Result<Vec<ContentPart>, ToolError> {
        self.log
            .lock()
            .unwrap()
            .calls
            .push((self.server.clone(), name.to_string(), arguments));

        let reply = self
            .replies
            .iter()
            .find(|(tool, _)| tool == name)
            .map(|(_, reply)| reply.clone())
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;

        match reply {
            FakeReply::Parts(parts) => Ok(parts),
            FakeReply::Fail(message) => Err(ToolError::Remote(message)),
            FakeReply::Hang => std::future::pending().await,
        }
    }

    async fn close(self) {
        self.log
            .lock()
            .unwrap()
            .events
            .push(format!("close {}", self.server));
    }
}

/// Builds fake sessions for a fixed set of servers.
#[derive(Default)]
pub struct FakeConnector {
    servers: Vec<(String, FakeServer)>,
    log: Arc<Mutex<Log>>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn server<'a>(
        mut self,
        name: &str,
        tools: impl IntoIterator<Item = (&'a str, FakeReply)>,
    ) -> Self {
        let tools = tools
            .into_iter()
            .map(|(tool, reply)| (tool.to_string(), reply))
            .collect();
        self.servers.push((name.to_string(), FakeServer::Healthy(tools)));
        self
    }

    /// A server whose connection is refused.
    pub fn failing(mut self, name: &str) -> Self {
        self.servers.push((name.to_string(), FakeServer::Failing));
        self
    }

    /// A server that never completes its handshake.
    pub fn stalling(mut self, name: &str) -> Self {
        self.servers.push((name.to_string(), FakeServer::Stalling));
        self
    }

    /// A configuration naming every server, in registration order.
    pub fn config(&self) -> ServerConfig {
        ServerConfig {
            servers: self
                .servers
                .iter()
                .map(|(name, _)| ServerSpec {
                    name: name.clone(),
                    command: format!("{name}-server"),
                    args: vec![],
                    env: Default::default(),
                    cwd: None,
                })
                .collect(),
        }
    }

    pub fn events(&self) -> Vec<String> {
        self.log.lock().unwrap().events.clone()
    }

    pub fn close_count(&self) -> usize {
        self.events().iter().filter(|e| e.starts_with("close ")).count()
    }

    /// Every tool call as `(server, tool, arguments)`.
    pub fn calls(&self) -> Vec<(String, String, Map<String, Value>)> {
        self.log.lock().unwrap().calls.clone()
    }
}

impl Connector for FakeConnector {
    type Session = FakeSession;

    async fn connect(&self, spec: &ServerSpec) -> Result<FakeSession> {
        let server = self
            .servers
            .iter()
            .find(|(name, _)| *name == spec.name)
            .map(|(_, server)| server.clone())
            .ok_or_else(|| Error::connection(&spec.name, "unknown server"))?;

        let replies = match server {
            FakeServer::Healthy(replies) => replies,
            FakeServer::Failing => return Err(Error::connection(&spec.name, "refused")),
            FakeServer::Stalling => std::future::pending().await,
        };

        self.log
            .lock()
            .unwrap()
            .events
            .push(format!("open {}", spec.name));

        let tools = replies
            .iter()
            .map(|(name, _)| RemoteTool {
                name: name.clone(),
                description: Some(format!("fake {name}")),
                input_schema: ParameterSchema::from_value(json!({"type": "object"}))
                    .unwrap_or_default(),
            })
            .collect();

        Ok(FakeSession {
            server: spec.name.clone(),
            tools,
            replies,
            log: self.log.clone(),
        })
    }
}

/// Connect every server of `connector` into a catalog.
pub async fn catalog_for(connector: &FakeConnector) -> ToolCatalog<FakeSession> {
    let manager = SessionManager::connect(connector, &connector.config(), Duration::from_secs(5))
        .await
        .unwrap();
    ToolCatalog::new(manager)
}
