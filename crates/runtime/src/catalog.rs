//! Namespaced view over the tools of every session.

use tracing::{info, warn};

use crate::manager::SessionManager;
use crate::model::ToolSpec;
use crate::tools::ToolSession;

/// Separates the server name from the tool name in a namespaced tool.
pub const NAMESPACE_SEPARATOR: char = '/';

pub fn namespaced(server: &str, tool: &str) -> String {
    format!("{server}{NAMESPACE_SEPARATOR}{tool}")
}

/// The merged tool list, optionally narrowed to a subset of servers.
///
/// Narrowing only changes visibility; sessions are never opened or closed
/// by scope changes.
pub struct ToolCatalog<S> {
    manager: SessionManager<S>,
    scope: Option<Vec<String>>,
}

impl<S: ToolSession> ToolCatalog<S> {
    pub fn new(manager: SessionManager<S>) -> Self {
        Self {
            manager,
            scope: None,
        }
    }

    /// Tools visible under the current scope, in session order.
    pub fn tools(&self) -> Vec<ToolSpec> {
        self.visible()
            .flat_map(|(server, session)| {
                session.tools().iter().map(move |tool| ToolSpec {
                    name: namespaced(server, &tool.name),
                    description: tool.description.clone().unwrap_or_default(),
                    parameters: tool.input_schema.clone(),
                })
            })
            .collect()
    }

    /// Restrict visibility to the named servers.
    ///
    /// Names with no matching session contribute nothing. They are
    /// returned so callers can report them.
    pub fn select_scope<I, T>(&mut self, names: I) -> Vec<String>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let names: Vec<String> = names.into_iter().map(|n| n.as_ref().to_string()).collect();
        let unknown: Vec<String> = names
            .iter()
            .filter(|name| self.manager.get(name).is_none())
            .cloned()
            .collect();

        if !unknown.is_empty() {
            warn!(?unknown, "scope names match no server");
        }
        info!(scope = ?names, "scope selected");

        self.scope = Some(names);
        unknown
    }

    /// Make every session visible again.
    pub fn reset_scope(&mut self) {
        self.scope = None;
    }

    pub fn scope(&self) -> Option<&[String]> {
        self.scope.as_deref()
    }

    fn in_scope(&self, server: &str) -> bool {
        self.scope
            .as_ref()
            .is_none_or(|names| names.iter().any(|n| n == server))
    }

    /// The session for `server`, if it exists and is visible.
    pub fn session_in_scope(&self, server: &str) -> Option<&S> {
        if self.in_scope(server) {
            self.manager.get(server)
        } else {
            None
        }
    }

    fn visible(&self) -> impl Iterator<Item = (&str, &S)> {
        self.manager
            .iter()
            .filter(|(name, _)| self.in_scope(name))
    }

    pub fn manager(&self) -> &SessionManager<S> {
        &self.manager
    }

    pub async fn close(&mut self) {
        self.manager.close().await;
    }
}
