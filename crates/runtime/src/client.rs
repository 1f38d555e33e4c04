//! The multi-server chat client.

use tracing::info;

use crate::catalog::ToolCatalog;
use crate::config::{Limits, ServerConfig};
use crate::conversation::Conversation;
use crate::engine::Turn;
use crate::manager::SessionManager;
use crate::model::{ChatBackend, Message, ToolSpec};
use crate::tools::{Connector, ToolSession};
use crate::{Error, Result};

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant with access to external tools. \
Call a tool whenever it helps answer the user, then answer using its results. \
Tool names have the form <server>/<tool>.";

/// Options for constructing a [`Client`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub system_prompt: String,
    pub limits: Limits,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            limits: Limits::default(),
        }
    }
}

/// A conversation with a chat endpoint that can call tools on several servers.
///
/// Owns every tool session from construction until [`Client::close`].
pub struct Client<B, S> {
    backend: B,
    catalog: ToolCatalog<S>,
    conversation: Conversation,
    limits: Limits,
    closed: bool,
}

impl<B: ChatBackend, S: ToolSession> Client<B, S> {
    /// Connect to every configured server.
    ///
    /// Fails if any server cannot be reached; sessions opened before the
    /// failure are released.
    pub async fn connect<C>(
        backend: B,
        connector: &C,
        config: &ServerConfig,
        options: ClientOptions,
    ) -> Result<Self>
    where
        C: Connector<Session = S>,
    {
        let manager = SessionManager::connect(connector, config, options.limits.connect_timeout).await?;
        info!(
            servers = manager.len(),
            tools = manager.iter().map(|(_, s)| s.tools().len()).sum::<usize>(),
            "client ready"
        );
        Ok(Self::with_sessions(backend, manager, options))
    }

    /// Build a client around already-open sessions.
    pub fn with_sessions(backend: B, manager: SessionManager<S>, options: ClientOptions) -> Self {
        Self {
            backend,
            catalog: ToolCatalog::new(manager),
            conversation: Conversation::new(options.system_prompt),
            limits: options.limits,
            closed: false,
        }
    }

    /// Run one turn: send `input`, resolve tool calls, return the answer.
    ///
    /// Content fragments are passed to `on_chunk` as they stream in.
    pub async fn chat<F>(&mut self, input: &str, on_chunk: F) -> Result<String>
    where
        F: FnMut(&str) + Send,
    {
        if self.closed {
            return Err(Error::Closed);
        }

        self.conversation.push(Message::user(input));
        Turn {
            backend: &self.backend,
            catalog: &self.catalog,
            conversation: &mut self.conversation,
            limits: &self.limits,
        }
        .run(on_chunk)
        .await
    }

    /// Reset the conversation to the system prompt.
    pub fn clear(&mut self) {
        self.conversation.clear();
    }

    /// Narrow the visible tools to the named servers; returns unknown names.
    pub fn select_scope<I, T>(&mut self, names: I) -> Vec<String>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        self.catalog.select_scope(names)
    }

    pub fn reset_scope(&mut self) {
        self.catalog.reset_scope();
    }

    pub fn tools(&self) -> Vec<ToolSpec> {
        self.catalog.tools()
    }

    pub fn servers(&self) -> Vec<&str> {
        self.catalog.manager().names().collect()
    }

    pub fn history(&self) -> &[Message] {
        self.conversation.messages()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Release every session. Safe to call more than once.
    pub async fn close(&mut self) {
        if !self.closed {
            info!("closing client");
        }
        self.closed = true;
        self.catalog.close().await;
    }
}
