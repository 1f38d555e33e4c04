use thiserror::Error;

/// Errors that can occur during tool execution.
///
/// These never abort a turn; the invoker folds them into a `tool` message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    #[error("tool not found: {0}")]
    NotFound(String),
    #[error("no server named {0} in the current scope")]
    UnknownServer(String),
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("execution failed: {0}")]
    Execution(String),
    #[error("tool reported an error: {0}")]
    Remote(String),
    #[error("timeout after {0}ms")]
    Timeout(u64),
    #[error("result has no text content")]
    NoTextContent,
}
