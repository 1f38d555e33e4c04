//! MCP error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize response: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("tool call failed: {0}")]
    ToolCallFailed(String),

    #[error("request too large: {size} bytes (max {max})")]
    RequestTooLarge { size: usize, max: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
