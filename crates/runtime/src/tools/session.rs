//! Tool session traits.

use std::future::Future;

use serde_json::{Map, Value};

use crate::config::ServerSpec;
use crate::model::ParameterSchema;
use crate::tools::ToolError;

/// A tool as advertised by its own server, before namespacing.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteTool {
    pub name: String,
    pub description: Option<String>,
    pub input_schema: ParameterSchema,
}

/// One content item of a tool result.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    Text(String),
    /// A non-text payload, identified by its content type (`image`, `resource`, ...).
    Other(String),
}

/// A live connection to one tool server.
///
/// Implementations own the connection and its advertised tool list.
/// This is the boundary between the conversation loop and subprocess I/O.
pub trait ToolSession: Send + Sync {
    /// Tools the server advertised at connection time.
    fn tools(&self) -> &[RemoteTool];

    /// Execute a tool by its un-namespaced name.
    ///
    /// A result the server flags as an error is reported as
    /// [`ToolError::Remote`].
    fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> impl Future<Output = Result<Vec<ContentPart>, ToolError>> + Send;

    /// Release the connection and its subprocess.
    fn close(self) -> impl Future<Output = ()> + Send;
}

/// Opens sessions: launch, handshake and tool listing.
pub trait Connector: Send + Sync {
    type Session: ToolSession;

    fn connect(
        &self,
        spec: &ServerSpec,
    ) -> impl Future<Output = crate::Result<Self::Session>> + Send;
}
