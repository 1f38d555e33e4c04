//! Minimal MCP (Model Context Protocol) tool-server toolkit.
//!
//! This crate hosts tools inside a subprocess that speaks line-delimited
//! JSON-RPC 2.0 over stdio, the transport clients use when they launch a
//! tool server as a child process.
//!
//! # Example
//!
//! ```no_run
//! use mcp::{CallToolResult, ServerInfo, StdioServer, Tool, ToolHandler};
//! use serde_json::{Map, Value, json};
//!
//! struct Echo;
//!
//! impl ToolHandler for Echo {
//!     fn info(&self) -> ServerInfo {
//!         ServerInfo::new("echo", env!("CARGO_PKG_VERSION"))
//!     }
//!
//!     fn tools(&self) -> Vec<Tool> {
//!         vec![Tool::new("echo", "Echo the input", json!({"type": "object"}))]
//!     }
//!
//!     async fn call(&self, _name: &str, arguments: Map<String, Value>) -> mcp::Result<CallToolResult> {
//!         Ok(CallToolResult::text(Value::Object(arguments).to_string()))
//!     }
//! }
//!
//! # async fn example() -> mcp::Result<()> {
//! StdioServer::new(Echo).serve_stdio().await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod protocol;
mod server;

pub use error::{Error, Result};
pub use protocol::{
    CallToolParams, CallToolResult, INTERNAL_ERROR, INVALID_PARAMS, InitializeResult,
    JsonRpcError, JsonRpcRequest, JsonRpcResponse, METHOD_NOT_FOUND, PARSE_ERROR,
    PROTOCOL_VERSION, RequestId, ServerCapabilities, ServerInfo, Tool, ToolContent,
    ToolsCapability,
};
pub use server::{MAX_REQUEST_SIZE, StdioServer, ToolHandler};
