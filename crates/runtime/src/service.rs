//! Process-wide client handle for request handlers.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{Mutex, OnceCell};

use crate::Result;
use crate::client::Client;
use crate::model::ChatBackend;
use crate::tools::ToolSession;

/// A shared client.
pub type SharedClient<B, S> = Arc<Mutex<Client<B, S>>>;

/// Holds at most one client, constructed on first use.
///
/// Concurrent first callers wait on a single construction. A failed
/// construction leaves the handle empty, so the next caller retries.
pub struct Service<B, S> {
    client: OnceCell<SharedClient<B, S>>,
}

impl<B, S> Default for Service<B, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B, S> Service<B, S> {
    pub fn new() -> Self {
        Self {
            client: OnceCell::new(),
        }
    }

    /// The client, if one has been constructed.
    pub fn get(&self) -> Option<SharedClient<B, S>> {
        self.client.get().cloned()
    }

    /// Return the client, constructing it with `connect` if absent.
    pub async fn get_or_connect<F, Fut>(&self, connect: F) -> Result<SharedClient<B, S>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Client<B, S>>>,
    {
        self.client
            .get_or_try_init(|| async { connect().await.map(|c| Arc::new(Mutex::new(c))) })
            .await
            .cloned()
    }
}

impl<B: ChatBackend, S: ToolSession> Service<B, S> {
    /// Close the client if one was constructed.
    pub async fn close(&self) {
        if let Some(client) = self.client.get() {
            client.lock().await.close().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::client::ClientOptions;
    use crate::testing::{FakeConnector, FakeReply, FakeSession, ScriptedBackend};
    use std::sync::atomic::{AtomicUsize, Ordering};

    type TestService = Service<ScriptedBackend, FakeSession>;

    fn connector() -> FakeConnector {
        FakeConnector::new().server("a", [("one", FakeReply::text("1"))])
    }

    async fn connect(connector: &FakeConnector) -> Result<Client<ScriptedBackend, FakeSession>> {
        Client::connect(
            ScriptedBackend::new(),
            connector,
            &connector.config(),
            ClientOptions::default(),
        )
        .await
    }

    #[tokio::test]
    async fn concurrent_first_use_connects_once() {
        let service = Arc::new(TestService::new());
        let connector = Arc::new(connector());
        let attempts = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = service.clone();
            let connector = connector.clone();
            let attempts = attempts.clone();
            handles.push(tokio::spawn(async move {
                service
                    .get_or_connect(|| async {
                        attempts.fetch_add(1, Ordering::SeqCst);
                        tokio::task::yield_now().await;
                        connect(&connector).await
                    })
                    .await
                    .map(|_| ())
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        assert_eq!(connector.events(), vec!["open a"]);
    }

    #[tokio::test]
    async fn failed_construction_is_retried() {
        let service = TestService::new();
        let broken = connector().failing("b");

        let err = service.get_or_connect(|| connect(&broken)).await.err().unwrap();
        assert!(matches!(err, Error::Connection { .. }));
        assert!(service.get().is_none());

        let healthy = connector();
        service.get_or_connect(|| connect(&healthy)).await.unwrap();
        assert!(service.get().is_some());

        service.close().await;
        assert_eq!(healthy.close_count(), 1);
    }
}
