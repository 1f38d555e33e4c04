//! Ownership of the live tool sessions.

use std::time::Duration;

use tracing::{debug, error, info};

use crate::config::ServerConfig;
use crate::tools::{Connector, ToolSession};
use crate::{Error, Result};

/// Named sessions held as a last-in-first-out release stack.
///
/// Sessions are pushed in configuration order and released in reverse.
/// Releasing pops each entry, so every session is closed exactly once no
/// matter how often [`SessionManager::close`] runs.
pub struct SessionManager<S> {
    sessions: Vec<(String, S)>,
}

impl<S: ToolSession> SessionManager<S> {
    /// Connect to every configured server, in order.
    ///
    /// The first failure closes the sessions opened so far and is returned.
    pub async fn connect<C>(connector: &C, config: &ServerConfig, timeout: Duration) -> Result<Self>
    where
        C: Connector<Session = S>,
    {
        let mut manager = Self {
            sessions: Vec::with_capacity(config.len()),
        };

        for spec in &config.servers {
            let result = match tokio::time::timeout(timeout, connector.connect(spec)).await {
                Ok(result) => result,
                Err(_) => Err(Error::connection(
                    &spec.name,
                    format!("no handshake within {timeout:?}"),
                )),
            };

            match result {
                Ok(session) => {
                    let tools: Vec<&str> = session.tools().iter().map(|t| t.name.as_str()).collect();
                    info!(server = %spec.name, ?tools, "connected");
                    manager.sessions.push((spec.name.clone(), session));
                }
                Err(e) => {
                    error!(server = %spec.name, "connection failed: {e}");
                    manager.close().await;
                    return Err(e);
                }
            }
        }

        Ok(manager)
    }

    pub fn get(&self, name: &str) -> Option<&S> {
        self.sessions
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, session)| session)
    }

    /// Sessions in acquisition order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &S)> {
        self.sessions.iter().map(|(name, s)| (name.as_str(), s))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sessions.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Release all sessions, most recently acquired first.
    pub async fn close(&mut self) {
        while let Some((name, session)) = self.sessions.pop() {
            debug!(server = %name, "releasing session");
            session.close().await;
        }
    }
}
