use crate::model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("connection error: server {server}: {reason}")]
    Connection { server: String, reason: String },

    #[error("chat endpoint error: {0}")]
    ChatEndpoint(#[from] ModelError),

    #[error("client is closed")]
    Closed,
}

impl Error {
    pub fn connection(server: impl Into<String>, reason: impl ToString) -> Self {
        Self::Connection {
            server: server.into(),
            reason: reason.to_string(),
        }
    }

    /// Short name of the error class, as shown to HTTP clients.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "ConfigError",
            Error::Connection { .. } => "ConnectionError",
            Error::ChatEndpoint(_) => "ChatEndpointError",
            Error::Closed => "ClientClosed",
        }
    }

    /// The message without its category label.
    pub fn detail(&self) -> String {
        match self {
            Error::Config(reason) => reason.clone(),
            Error::Connection { server, reason } => format!("server {server}: {reason}"),
            Error::ChatEndpoint(e) => e.to_string(),
            Error::Closed => "client is closed".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
