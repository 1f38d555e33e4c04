//! Stdio serve loop: read requests line by line, dispatch, write responses.

use std::future::Future;

use serde_json::{Map, Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::protocol::{
    CallToolParams, CallToolResult, INTERNAL_ERROR, INVALID_PARAMS, InitializeResult,
    JsonRpcRequest, JsonRpcResponse, METHOD_NOT_FOUND, PARSE_ERROR, RequestId, ServerInfo, Tool,
};

/// Maximum accepted request line (1MB).
pub const MAX_REQUEST_SIZE: usize = 1024 * 1024;

/// Tools hosted by a server.
///
/// Implementations describe their tools and execute calls. Returning an
/// error from [`ToolHandler::call`] reports the failure to the client as a
/// tool result with `isError` set, except for [`Error::ToolNotFound`],
/// which becomes a JSON-RPC invalid-params error.
pub trait ToolHandler: Send + Sync {
    /// Name and version reported during initialization.
    fn info(&self) -> ServerInfo;

    /// Tools advertised by `tools/list`.
    fn tools(&self) -> Vec<Tool>;

    /// Execute a tool call.
    fn call(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> impl Future<Output = Result<CallToolResult>> + Send;
}

/// A tool server speaking line-delimited JSON-RPC.
pub struct StdioServer<H> {
    handler: H,
}

impl<H: ToolHandler> StdioServer<H> {
    pub fn new(handler: H) -> Self {
        Self { handler }
    }

    /// Serve on the process's stdin/stdout until stdin closes.
    pub async fn serve_stdio(&self) -> Result<()> {
        let stdin = BufReader::new(tokio::io::stdin());
        let stdout = tokio::io::stdout();
        self.serve(stdin, stdout).await
    }

    /// Serve requests read from `reader`, writing responses to `writer`.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }

            let response = if line.len() > MAX_REQUEST_SIZE {
                let err = Error::RequestTooLarge {
                    size: line.len(),
                    max: MAX_REQUEST_SIZE,
                };
                warn!("{err}");
                Some(JsonRpcResponse::error(None, INVALID_PARAMS, err.to_string()))
            } else {
                self.handle_line(&line).await
            };

            if let Some(response) = response {
                let json = serde_json::to_string(&response)?;
                writer.write_all(json.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }

        debug!("input closed, stopping server");
        Ok(())
    }

    /// Handle one raw request line.
    pub async fn handle_line(&self, line: &str) -> Option<JsonRpcResponse> {
        match serde_json::from_str::<JsonRpcRequest>(line) {
            Ok(request) => self.dispatch(request).await,
            Err(e) => Some(JsonRpcResponse::error(
                None,
                PARSE_ERROR,
                format!("parse error: {e}"),
            )),
        }
    }

    /// Dispatch a parsed request. Notifications yield `None`.
    pub async fn dispatch(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            debug!(method = %request.method, "notification");
            return None;
        }

        let id = request.id.clone();
        let response = match request.method.as_str() {
            "initialize" => respond(
                id,
                serde_json::to_value(InitializeResult::new(self.handler.info())),
            ),
            "ping" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => JsonRpcResponse::success(id, json!({ "tools": self.handler.tools() })),
            "tools/call" => self.call_tool(id, request.params).await,
            method => {
                JsonRpcResponse::error(id, METHOD_NOT_FOUND, format!("method not found: {method}"))
            }
        };

        Some(response)
    }

    async fn call_tool(&self, id: Option<RequestId>, params: Option<Value>) -> JsonRpcResponse {
        let Some(params) = params else {
            return JsonRpcResponse::error(id, INVALID_PARAMS, "missing params");
        };

        let params: CallToolParams = match serde_json::from_value(params) {
            Ok(params) => params,
            Err(e) => {
                return JsonRpcResponse::error(id, INVALID_PARAMS, format!("invalid params: {e}"));
            }
        };

        if !self.handler.tools().iter().any(|t| t.name == params.name) {
            let err = Error::ToolNotFound(params.name);
            return JsonRpcResponse::error(id, INVALID_PARAMS, err.to_string());
        }

        debug!(tool = %params.name, "tools/call");
        let arguments = params.arguments.unwrap_or_default();
        let result = match self.handler.call(&params.name, arguments).await {
            Ok(result) => result,
            Err(err @ Error::ToolNotFound(_)) => {
                return JsonRpcResponse::error(id, INVALID_PARAMS, err.to_string());
            }
            Err(err) => {
                warn!(tool = %params.name, "tool failed: {err}");
                CallToolResult::error(err.to_string())
            }
        };

        respond(id, serde_json::to_value(result))
    }
}

fn respond(id: Option<RequestId>, result: serde_json::Result<Value>) -> JsonRpcResponse {
    match result {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => JsonRpcResponse::error(id, INTERNAL_ERROR, e.to_string()),
    }
}
