use std::time::Duration;

use thiserror::Error;

/// Errors from chat-endpoint calls.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ModelError {
    /// A network error occurred during the call.
    #[error("network: {0}")]
    Network(String),

    /// The endpoint returned an error response.
    #[error("provider api: {0}")]
    Api(String),

    /// The endpoint response could not be parsed.
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),

    /// The endpoint stopped producing output.
    #[error("no response within {0:?}")]
    Timeout(Duration),
}
