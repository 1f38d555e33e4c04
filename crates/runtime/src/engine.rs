//! The per-turn resolve loop.
//!
//! A turn alternates between prompting the chat endpoint, consuming its
//! stream, and executing the tool calls it requested, until a round asks
//! for no tools or the round limit is reached:
//!
//! ```text
//! Prompting -> Streaming -> Done
//!                  |
//!                  v
//!              Executing -> Prompting
//! ```

use futures::StreamExt;
use tracing::{debug, warn};

use crate::Result;
use crate::catalog::ToolCatalog;
use crate::config::Limits;
use crate::conversation::Conversation;
use crate::model::{ChatBackend, ChatRequest, ChatStream, Message, ModelError, StreamUnit, ToolCall};
use crate::tools::{ToolInvoker, ToolSession};

enum TurnState {
    Prompting,
    Streaming(ChatStream),
    Executing(Vec<ToolCall>),
    Done(String),
}

/// Borrowed parts of a client needed to run one turn.
pub(crate) struct Turn<'a, B, S> {
    pub backend: &'a B,
    pub catalog: &'a ToolCatalog<S>,
    pub conversation: &'a mut Conversation,
    pub limits: &'a Limits,
}

impl<B: ChatBackend, S: ToolSession> Turn<'_, B, S> {
    /// Resolve the pending user message into a final answer.
    ///
    /// Every content fragment is passed to `on_chunk` as it arrives. The
    /// returned answer is the content of the last round.
    pub async fn run<F>(mut self, mut on_chunk: F) -> Result<String>
    where
        F: FnMut(&str) + Send,
    {
        let invoker = ToolInvoker::new(self.limits.tool_timeout);
        let max_rounds = self.limits.max_tool_rounds.max(1);
        let chat_timeout = self.limits.chat_timeout;

        let mut state = TurnState::Prompting;
        let mut content = String::new();
        let mut rounds = 0;

        loop {
            state = match state {
                TurnState::Prompting => {
                    let tools = self.catalog.tools();
                    let request = ChatRequest {
                        messages: self.conversation.messages(),
                        tools: &tools,
                    };
                    debug!(round = rounds, tools = tools.len(), "prompting");
                    let stream = tokio::time::timeout(chat_timeout, self.backend.stream(request))
                        .await
                        .map_err(|_| ModelError::Timeout(chat_timeout))??;
                    content.clear();
                    TurnState::Streaming(stream)
                }

                TurnState::Streaming(mut stream) => {
                    let mut calls = Vec::new();
                    loop {
                        let unit = tokio::time::timeout(chat_timeout, stream.next())
                            .await
                            .map_err(|_| ModelError::Timeout(chat_timeout))?;
                        match unit {
                            None => break,
                            Some(Err(e)) => return Err(e.into()),
                            Some(Ok(StreamUnit::Content(fragment))) => {
                                on_chunk(&fragment);
                                content.push_str(&fragment);
                            }
                            Some(Ok(StreamUnit::ToolCalls(batch))) => calls.extend(batch),
                        }
                    }

                    if !content.is_empty() || !calls.is_empty() {
                        self.conversation
                            .push(Message::assistant(content.clone(), calls.clone()));
                    }

                    if calls.is_empty() {
                        TurnState::Done(std::mem::take(&mut content))
                    } else {
                        TurnState::Executing(calls)
                    }
                }

                TurnState::Executing(calls) => {
                    debug!(round = rounds, calls = calls.len(), "executing tool calls");
                    for call in &calls {
                        let message = invoker.invoke(self.catalog, call).await;
                        self.conversation.push(message);
                    }
                    rounds += 1;

                    if rounds >= max_rounds {
                        warn!(rounds, "tool round limit reached, ending turn");
                        TurnState::Done(std::mem::take(&mut content))
                    } else {
                        TurnState::Prompting
                    }
                }

                TurnState::Done(answer) => {
                    debug!(rounds, "turn complete");
                    return Ok(answer);
                }
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use crate::model::Role;
    use crate::testing::{FakeConnector, FakeReply, ScriptedBackend, catalog_for};
    use serde_json::json;
    use std::time::Duration;

    fn connector() -> FakeConnector {
        FakeConnector::new()
            .server("math", [("pow", FakeReply::text("8")), ("div", FakeReply::fail("boom"))])
            .server("web", [("fetch", FakeReply::text("ok"))])
    }

    async fn run(
        backend: &ScriptedBackend,
        connector: &FakeConnector,
        limits: Limits,
    ) -> (Result<String>, Conversation, Vec<String>) {
        let catalog = catalog_for(connector).await;
        let mut conversation = Conversation::new("system");
        conversation.push(Message::user("question"));
        let mut chunks = Vec::new();

        let result = Turn {
            backend,
            catalog: &catalog,
            conversation: &mut conversation,
            limits: &limits,
        }
        .run(|chunk| chunks.push(chunk.to_string()))
        .await;

        (result, conversation, chunks)
    }

    fn tool_messages(conversation: &Conversation) -> Vec<&Message> {
        conversation
            .messages()
            .iter()
            .filter(|m| m.role == Role::Tool)
            .collect()
    }

    #[tokio::test]
    async fn two_tool_rounds_then_content() {
        let backend = ScriptedBackend::new()
            .tool_calls([("math/pow", json!({"a": 2, "b": 3}))])
            .tool_calls([("web/fetch", json!({"url": "x"}))])
            .reply(["The answer ", "is 8."]);
        let connector = connector();

        let (result, conversation, chunks) = run(&backend, &connector, Limits::default()).await;

        assert_eq!(result.unwrap(), "The answer is 8.");
        assert_eq!(chunks, vec!["The answer ", "is 8."]);
        assert_eq!(connector.calls().len(), 2);

        let tools = tool_messages(&conversation);
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0].tool_name.as_deref(), Some("math/pow"));
        assert_eq!(tools[1].tool_name.as_deref(), Some("web/fetch"));

        let requests = backend.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].tools, vec!["math/pow", "math/div", "web/fetch"]);
        assert_eq!(requests[2].messages.len(), conversation.messages().len() - 1);
    }

    #[tokio::test]
    async fn results_follow_request_order() {
        let backend = ScriptedBackend::new()
            .tool_calls([
                ("web/fetch", json!({})),
                ("math/pow", json!({})),
                ("math/div", json!({})),
            ])
            .reply(["done"]);
        let connector = connector();

        let (result, conversation, _) = run(&backend, &connector, Limits::default()).await;
        assert_eq!(result.unwrap(), "done");

        let names: Vec<_> = tool_messages(&conversation)
            .iter()
            .map(|m| m.tool_name.clone().unwrap())
            .collect();
        assert_eq!(names, vec!["web/fetch", "math/pow", "math/div"]);

        let called: Vec<_> = connector.calls().into_iter().map(|c| c.1).collect();
        assert_eq!(called, vec!["fetch", "pow", "div"]);
    }

    #[tokio::test]
    async fn failing_tool_does_not_abort_turn() {
        let backend = ScriptedBackend::new()
            .tool_calls([("math/div", json!({"a": 1, "b": 0})), ("nope/tool", json!({}))])
            .reply(["Could not divide."]);
        let connector = connector();

        let (result, conversation, _) = run(&backend, &connector, Limits::default()).await;
        assert_eq!(result.unwrap(), "Could not divide.");

        let tools = tool_messages(&conversation);
        assert_eq!(tools.len(), 2);
        assert!(tools[0].content.starts_with("Error in tool: math/div"));
        assert!(tools[1].content.contains("no server named nope"));
    }

    #[tokio::test]
    async fn assistant_rounds_are_recorded() {
        let backend = ScriptedBackend::new()
            .content_and_calls("Let me check. ", [("math/pow", json!({}))])
            .reply(["8"]);
        let connector = connector();

        let (result, conversation, chunks) = run(&backend, &connector, Limits::default()).await;
        assert_eq!(result.unwrap(), "8");
        assert_eq!(chunks, vec!["Let me check. ", "8"]);

        let roles: Vec<Role> = conversation.messages().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::System, Role::User, Role::Assistant, Role::Tool, Role::Assistant]
        );
        assert_eq!(conversation.messages()[2].tool_calls[0].name, "math/pow");
        assert_eq!(conversation.messages()[2].content, "Let me check. ");
    }

    #[tokio::test]
    async fn round_limit_ends_turn() {
        let backend = ScriptedBackend::new()
            .content_and_calls("a", [("math/pow", json!({}))])
            .content_and_calls("b", [("math/pow", json!({}))])
            .content_and_calls("c", [("math/pow", json!({}))]);
        let connector = connector();
        let limits = Limits {
            max_tool_rounds: 2,
            ..Limits::default()
        };

        let (result, conversation, _) = run(&backend, &connector, limits).await;
        assert_eq!(result.unwrap(), "b");
        assert_eq!(connector.calls().len(), 2);
        assert_eq!(tool_messages(&conversation).len(), 2);
        assert_eq!(backend.requests().len(), 2);
    }

    #[tokio::test]
    async fn endpoint_failure_fails_turn() {
        let backend = ScriptedBackend::new().fail_open(ModelError::Network("refused".into()));
        let (result, _, _) = run(&backend, &connector(), Limits::default()).await;

        let err = result.unwrap_err();
        assert!(matches!(err, Error::ChatEndpoint(ModelError::Network(_))));
        assert_eq!(err.kind(), "ChatEndpointError");
    }

    #[tokio::test]
    async fn mid_stream_error_fails_turn() {
        let backend = ScriptedBackend::new().round(vec![
            Ok(StreamUnit::Content("partial".into())),
            Err(ModelError::InvalidResponse("garbage".into())),
        ]);
        let (result, _, chunks) = run(&backend, &connector(), Limits::default()).await;

        assert!(matches!(result, Err(Error::ChatEndpoint(ModelError::InvalidResponse(_)))));
        assert_eq!(chunks, vec!["partial"]);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_stream_times_out() {
        let backend = ScriptedBackend::new().stall();
        let limits = Limits {
            chat_timeout: Duration::from_secs(5),
            ..Limits::default()
        };
        let (result, _, _) = run(&backend, &connector(), limits).await;

        assert!(matches!(result, Err(Error::ChatEndpoint(ModelError::Timeout(_)))));
    }

    #[tokio::test]
    async fn empty_response_is_empty_answer() {
        let backend = ScriptedBackend::new().round(vec![]);
        let (result, conversation, _) = run(&backend, &connector(), Limits::default()).await;

        assert_eq!(result.unwrap(), "");
        assert_eq!(conversation.messages().len(), 2);
    }
}
