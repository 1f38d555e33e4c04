use super::errors::ModelError;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::future::Future;

/// The role of a message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    /// Namespaced tool name, `<server>/<tool>`.
    pub name: String,
    /// Arguments as sent by the model; normally a JSON object.
    pub arguments: Value,
}

/// A message in the conversation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Calls requested by an assistant message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Tool that produced a `tool` message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_name: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// An assistant message, optionally carrying requested tool calls.
    pub fn assistant(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls,
            ..Self::new(Role::Assistant, content)
        }
    }

    /// The result of a tool call, fed back to the model.
    pub fn tool(tool_name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_name: Some(tool_name.into()),
            ..Self::new(Role::Tool, content)
        }
    }
}

/// JSON Schema describing a tool's parameters.
///
/// Always a JSON object. The runtime forwards it to the model unchanged;
/// validation of actual arguments is left to the server owning the tool.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSchema(Map<String, Value>);

impl ParameterSchema {
    pub fn new(schema: Map<String, Value>) -> Self {
        Self(schema)
    }

    /// Accept a schema value, rejecting anything that is not an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

/// A tool definition as declared to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    /// Namespaced name, `<server>/<tool>`.
    pub name: String,
    pub description: String,
    pub parameters: ParameterSchema,
}

/// One unit of a streamed chat response.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamUnit {
    /// A fragment of assistant text.
    Content(String),
    /// A batch of tool calls requested by the model.
    ToolCalls(Vec<ToolCall>),
}

/// A streamed chat response.
pub type ChatStream = BoxStream<'static, Result<StreamUnit, ModelError>>;

/// Everything needed for a chat request.
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    pub messages: &'a [Message],
    pub tools: &'a [ToolSpec],
}

/// Trait for streaming chat endpoints.
pub trait ChatBackend: Send + Sync {
    /// Submit the history and tool declarations, returning the response stream.
    fn stream(
        &self,
        request: ChatRequest<'_>,
    ) -> impl Future<Output = Result<ChatStream, ModelError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tool_message_carries_tool_name() {
        let msg = Message::tool("math/pow", "8");
        assert_eq!(msg.role, Role::Tool);
        assert_eq!(msg.tool_name.as_deref(), Some("math/pow"));
        assert!(msg.tool_calls.is_empty());
    }

    #[test]
    fn assistant_message_keeps_calls() {
        let call = ToolCall {
            id: "1".into(),
            name: "math/pow".into(),
            arguments: json!({"a": 2, "b": 3}),
        };
        let msg = Message::assistant("", vec![call.clone()]);
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.tool_calls, vec![call]);
    }

    #[test]
    fn schema_must_be_object() {
        assert!(ParameterSchema::from_value(json!({"type": "object"})).is_some());
        assert!(ParameterSchema::from_value(json!("object")).is_none());
        assert!(serde_json::from_value::<ParameterSchema>(json!([1, 2])).is_err());
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_value(Role::Tool).unwrap(), json!("tool"));
        assert_eq!(Role::Assistant.as_str(), "assistant");
    }
}
