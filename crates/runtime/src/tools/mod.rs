//! Tool sessions and invocation.

pub mod errors;
mod invoker;
mod mcp_session;
mod session;

pub use errors::ToolError;
pub use invoker::{ToolInvoker, normalize_arguments};
pub use mcp_session::{McpSession, StdioConnector};
pub use session::{Connector, ContentPart, RemoteTool, ToolSession};
