//! Resolve a namespaced tool call and turn its outcome into a message.

use std::time::Duration;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{ContentPart, ToolError, ToolSession};
use crate::catalog::{NAMESPACE_SEPARATOR, ToolCatalog};
use crate::model::{Message, ToolCall};

/// Coerce model-supplied arguments into an argument map.
///
/// Objects pass through, `null` is an empty map and a string holding a
/// JSON object is parsed. Anything else is rejected.
pub fn normalize_arguments(arguments: &Value) -> Result<Map<String, Value>, ToolError> {
    match arguments {
        Value::Object(map) => Ok(map.clone()),
        Value::Null => Ok(Map::new()),
        Value::String(raw) if raw.trim().is_empty() => Ok(Map::new()),
        Value::String(raw) => match serde_json::from_str::<Value>(raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(ToolError::InvalidArguments(format!(
                "expected an object, got {other}"
            ))),
            Err(e) => Err(ToolError::InvalidArguments(e.to_string())),
        },
        other => Err(ToolError::InvalidArguments(format!(
            "expected an object, got {other}"
        ))),
    }
}

fn first_text(parts: Vec<ContentPart>) -> Result<String, ToolError> {
    parts
        .into_iter()
        .find_map(|part| match part {
            ContentPart::Text(text) => Some(text),
            ContentPart::Other(_) => None,
        })
        .ok_or(ToolError::NoTextContent)
}

/// Executes tool calls against the sessions visible in a catalog.
#[derive(Debug, Clone, Copy)]
pub struct ToolInvoker {
    timeout: Duration,
}

impl ToolInvoker {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Execute a call and return the `tool` message to append.
    ///
    /// Failures are folded into the message text, never returned.
    pub async fn invoke<S: ToolSession>(&self, catalog: &ToolCatalog<S>, call: &ToolCall) -> Message {
        let args = call.arguments.to_string();
        match self.execute(catalog, call).await {
            Ok(text) => {
                debug!(tool = %call.name, "tool call succeeded");
                Message::tool(
                    &call.name,
                    format!("tool: {}\nargs: {args}\nreturn: {text}", call.name),
                )
            }
            Err(err) => {
                warn!(tool = %call.name, "tool call failed: {err}");
                Message::tool(
                    &call.name,
                    format!("Error in tool: {}\nargs: {args}\n{err}", call.name),
                )
            }
        }
    }

    /// Execute a call, returning the first text content of its result.
    pub async fn execute<S: ToolSession>(
        &self,
        catalog: &ToolCatalog<S>,
        call: &ToolCall,
    ) -> Result<String, ToolError> {
        let (server, tool) = call
            .name
            .split_once(NAMESPACE_SEPARATOR)
            .ok_or_else(|| ToolError::NotFound(call.name.clone()))?;

        let session = catalog
            .session_in_scope(server)
            .ok_or_else(|| ToolError::UnknownServer(server.to_string()))?;

        if !session.tools().iter().any(|t| t.name == tool) {
            return Err(ToolError::NotFound(call.name.clone()));
        }

        let arguments = normalize_arguments(&call.arguments)?;
        debug!(server, tool, "calling tool");

        let parts = tokio::time::timeout(self.timeout, session.call_tool(tool, arguments))
            .await
            .map_err(|_| ToolError::Timeout(self.timeout.as_millis() as u64))??;

        first_text(parts)
    }
}
