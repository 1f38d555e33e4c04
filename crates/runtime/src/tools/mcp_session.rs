//! Tool sessions over MCP stdio subprocesses, using the rmcp SDK.

use rmcp::{
    ServiceExt,
    model::{CallToolRequestParams, CallToolResult, Tool},
    service::{RoleClient, RunningService},
    transport::{ConfigureCommandExt, TokioChildProcess},
};
use serde::Deserialize;
use serde_json::{Map, Value};
use tokio::process::Command;
use tracing::debug;

use super::{Connector, ContentPart, RemoteTool, ToolError, ToolSession};
use crate::config::ServerSpec;
use crate::model::ParameterSchema;
use crate::{Error, Result};

// Tool and result shapes as they appear on the wire. Converting through
// these keeps the session independent of the SDK's struct layout.

#[derive(Debug, Deserialize)]
struct WireTool {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "inputSchema", default)]
    input_schema: Value,
}

#[derive(Debug, Deserialize)]
struct WireResult {
    #[serde(default)]
    content: Vec<WireContent>,
    #[serde(rename = "isError", default)]
    is_error: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct WireContent {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

fn remote_tool(tool: &Tool) -> std::result::Result<RemoteTool, String> {
    let value = serde_json::to_value(tool).map_err(|e| e.to_string())?;
    let wire: WireTool = serde_json::from_value(value).map_err(|e| e.to_string())?;
    let input_schema = match wire.input_schema {
        Value::Null => ParameterSchema::default(),
        schema => ParameterSchema::from_value(schema)
            .ok_or_else(|| format!("tool {}: input schema is not an object", wire.name))?,
    };
    Ok(RemoteTool {
        name: wire.name,
        description: wire.description,
        input_schema,
    })
}

fn content_parts(result: &CallToolResult) -> std::result::Result<Vec<ContentPart>, ToolError> {
    let value = serde_json::to_value(result)
        .map_err(|e| ToolError::Execution(format!("serialize result: {e}")))?;
    let wire: WireResult = serde_json::from_value(value)
        .map_err(|e| ToolError::Execution(format!("unexpected result shape: {e}")))?;

    let parts: Vec<ContentPart> = wire
        .content
        .into_iter()
        .map(|item| match (item.kind.as_str(), item.text) {
            ("text", Some(text)) => ContentPart::Text(text),
            _ => ContentPart::Other(item.kind),
        })
        .collect();

    if wire.is_error.unwrap_or(false) {
        let message = parts
            .iter()
            .find_map(|part| match part {
                ContentPart::Text(text) => Some(text.clone()),
                ContentPart::Other(_) => None,
            })
            .unwrap_or_else(|| "no details".to_string());
        return Err(ToolError::Remote(message));
    }

    Ok(parts)
}

/// A connected MCP server subprocess.
pub struct McpSession {
    server: String,
    service: RunningService<RoleClient, ()>,
    tools: Vec<RemoteTool>,
}

impl McpSession {
    /// Launch the server, perform the handshake and list its tools.
    pub async fn spawn(spec: &ServerSpec) -> Result<Self> {
        let transport = TokioChildProcess::new(Command::new(&spec.command).configure(|cmd| {
            cmd.args(&spec.args).envs(&spec.env);
            if let Some(cwd) = &spec.cwd {
                cmd.current_dir(cwd);
            }
        }))
        .map_err(|e| Error::connection(&spec.name, format!("launch `{}`: {e}", spec.command)))?;

        let service = ()
            .serve(transport)
            .await
            .map_err(|e| Error::connection(&spec.name, format!("handshake: {e}")))?;

        let listed = match service.list_tools(Default::default()).await {
            Ok(response) => response.tools,
            Err(e) => {
                let _ = service.cancel().await;
                return Err(Error::connection(&spec.name, format!("list tools: {e}")));
            }
        };

        let tools = match listed.iter().map(remote_tool).collect::<std::result::Result<Vec<_>, _>>() {
            Ok(tools) => tools,
            Err(reason) => {
                let _ = service.cancel().await;
                return Err(Error::connection(&spec.name, reason));
            }
        };

        Ok(Self {
            server: spec.name.clone(),
            service,
            tools,
        })
    }

    pub fn server(&self) -> &str {
        &self.server
    }
}

impl ToolSession for McpSession {
    fn tools(&self) -> &[RemoteTool] {
        &self.tools
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> std::result::Result<Vec<ContentPart>, ToolError> {
        let params = CallToolRequestParams {
            name: name.to_string().into(),
            arguments: Some(arguments),
            meta: None,
            task: None,
        };

        let result = self
            .service
            .call_tool(params)
            .await
            .map_err(|e| ToolError::Execution(e.to_string()))?;

        content_parts(&result)
    }

    async fn close(self) {
        debug!(server = %self.server, "closing session");
        if let Err(e) = self.service.cancel().await {
            debug!(server = %self.server, "session task ended abnormally: {e}");
        }
    }
}

/// Connects to servers by spawning them as stdio subprocesses.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdioConnector;

impl Connector for StdioConnector {
    type Session = McpSession;

    async fn connect(&self, spec: &ServerSpec) -> Result<McpSession> {
        McpSession::spawn(spec).await
    }
}
