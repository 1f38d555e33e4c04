//! Mooring runtime: a chat client that lets a model call tools on several
//! MCP servers.
//!
//! # Overview
//!
//! - **SessionManager**: connects to every configured server and owns the
//!   sessions as a last-in-first-out release stack.
//! - **ToolCatalog**: the merged, namespaced (`<server>/<tool>`) tool list,
//!   optionally narrowed to a subset of servers.
//! - **Client**: the conversation history plus the resolve loop that streams
//!   model output and executes requested tools until the model answers.
//! - **Service**: a construct-once handle for request handlers.
//! - **ChatBackend** / **ToolSession**: the two seams; [`OllamaBackend`] and
//!   [`McpSession`] are the production implementations.
//!
//! # Example
//!
//! ```ignore
//! use runtime::{Client, ClientOptions, OllamaBackend, ServerConfig, StdioConnector};
//!
//! # async fn example() -> runtime::Result<()> {
//! let config = ServerConfig::load("servers.json")?;
//! let backend = OllamaBackend::builder("llama3.2").build();
//! let mut client = Client::connect(backend, &StdioConnector, &config, ClientOptions::default()).await?;
//!
//! let answer = client.chat("What is 2 to the power of 10?", |chunk| print!("{chunk}")).await?;
//! println!("\n{answer}");
//! client.close().await;
//! # Ok(())
//! # }
//! ```

pub mod catalog;
mod client;
pub mod config;
mod conversation;
mod engine;
mod error;
mod manager;
pub mod model;
pub mod providers;
mod service;
pub mod tools;

#[cfg(test)]
mod testing;

pub use catalog::{NAMESPACE_SEPARATOR, ToolCatalog, namespaced};
pub use client::{Client, ClientOptions, DEFAULT_SYSTEM_PROMPT};
pub use config::{Limits, ServerConfig, ServerSpec};
pub use conversation::Conversation;
pub use error::{Error, Result};
pub use manager::SessionManager;
pub use model::{ChatBackend, Message, ModelError, Role, ToolCall, ToolSpec};
pub use providers::{OllamaBackend, OllamaBackendBuilder};
pub use service::{Service, SharedClient};
pub use tools::{Connector, McpSession, StdioConnector, ToolError, ToolSession};
