//! Ollama chat API backend.

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::io::StreamReader;
use tracing::debug;

use crate::model::{
    ChatBackend, ChatRequest, ChatStream, Message, ModelError, ParameterSchema, StreamUnit,
    ToolCall, ToolSpec,
};

pub const DEFAULT_URL: &str = "http://localhost:11434";

// ─────────────────────────────────────────────────────────────────────────────
// API Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ApiTool<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<ApiToolCall<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct ApiToolCall<'a> {
    function: ApiFunctionCall<'a>,
}

#[derive(Debug, Serialize)]
struct ApiFunctionCall<'a> {
    name: &'a str,
    arguments: &'a Value,
}

#[derive(Debug, Serialize)]
struct ApiTool<'a> {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: ApiFunction<'a>,
}

#[derive(Debug, Serialize)]
struct ApiFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a ParameterSchema,
}

#[derive(Debug, Deserialize)]
struct ApiChunk {
    #[serde(default)]
    message: Option<ApiChunkMessage>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiChunkMessage {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Vec<ApiChunkToolCall>,
}

#[derive(Debug, Deserialize)]
struct ApiChunkToolCall {
    #[serde(default)]
    id: Option<String>,
    function: ApiChunkFunction,
}

#[derive(Debug, Deserialize)]
struct ApiChunkFunction {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// One decoded line of the response stream.
#[derive(Debug, Default, PartialEq)]
struct Chunk {
    units: Vec<StreamUnit>,
    done: bool,
}

/// Decode one NDJSON line. Text is emitted before tool calls.
fn parse_chunk(line: &str) -> Result<Chunk, ModelError> {
    let chunk: ApiChunk = serde_json::from_str(line)
        .map_err(|e| ModelError::InvalidResponse(format!("{e}: {line}")))?;

    if let Some(error) = chunk.error {
        return Err(ModelError::Api(error));
    }

    let mut units = Vec::new();
    if let Some(message) = chunk.message {
        if !message.content.is_empty() {
            units.push(StreamUnit::Content(message.content));
        }
        if !message.tool_calls.is_empty() {
            let calls = message
                .tool_calls
                .into_iter()
                .map(|call| ToolCall {
                    id: call
                        .id
                        .filter(|id| !id.is_empty())
                        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
                    name: call.function.name,
                    arguments: call.function.arguments,
                })
                .collect();
            units.push(StreamUnit::ToolCalls(calls));
        }
    }

    Ok(Chunk {
        units,
        done: chunk.done,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend Implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for creating an Ollama backend.
#[derive(Debug, Clone)]
pub struct OllamaBackendBuilder {
    url: String,
    model: String,
}

impl OllamaBackendBuilder {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            model: model.into(),
        }
    }

    /// Base URL of the Ollama server.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn build(self) -> OllamaBackend {
        let base = self.url.trim_end_matches('/');
        OllamaBackend {
            client: reqwest::Client::new(),
            endpoint: format!("{base}/api/chat"),
            model: self.model,
        }
    }
}

/// Streaming backend for a local Ollama server.
pub struct OllamaBackend {
    client: reqwest::Client,
    endpoint: String,
    model: String,
}

impl OllamaBackend {
    pub fn builder(model: impl Into<String>) -> OllamaBackendBuilder {
        OllamaBackendBuilder::new(model)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn message_to_api(msg: &Message) -> ApiMessage<'_> {
        ApiMessage {
            role: msg.role.as_str(),
            content: &msg.content,
            tool_calls: msg
                .tool_calls
                .iter()
                .map(|call| ApiToolCall {
                    function: ApiFunctionCall {
                        name: &call.name,
                        arguments: &call.arguments,
                    },
                })
                .collect(),
            tool_name: msg.tool_name.as_deref(),
        }
    }

    fn tool_to_api(spec: &ToolSpec) -> ApiTool<'_> {
        ApiTool {
            tool_type: "function",
            function: ApiFunction {
                name: &spec.name,
                description: &spec.description,
                parameters: &spec.parameters,
            },
        }
    }

    fn request_body<'a>(&'a self, request: ChatRequest<'a>) -> ApiRequest<'a> {
        ApiRequest {
            model: &self.model,
            messages: request.messages.iter().map(Self::message_to_api).collect(),
            tools: request.tools.iter().map(Self::tool_to_api).collect(),
            stream: true,
        }
    }
}

impl std::fmt::Display for OllamaBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ollama({})", self.model)
    }
}

impl ChatBackend for OllamaBackend {
    async fn stream(&self, request: ChatRequest<'_>) -> Result<ChatStream, ModelError> {
        let body = self.request_body(request);
        debug!(
            model = %self.model,
            messages = body.messages.len(),
            tools = body.tools.len(),
            "chat request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api(format!("{status}: {body}")));
        }

        let bytes = response
            .bytes_stream()
            .map(|result| result.map_err(std::io::Error::other));
        let mut lines = BufReader::new(StreamReader::new(bytes)).lines();

        let stream = async_stream::stream! {
            loop {
                let line = match lines.next_line().await {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(e) => {
                        yield Err(ModelError::Network(e.to_string()));
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                match parse_chunk(&line) {
                    Ok(chunk) => {
                        for unit in chunk.units {
                            yield Ok(unit);
                        }
                        if chunk.done {
                            break;
                        }
                    }
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}
