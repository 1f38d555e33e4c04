//! HTTP front end: a chat page and a streaming chat endpoint.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::State,
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use runtime::{McpSession, OllamaBackend, Service};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::config::Config;
use crate::error::Result;

const INDEX_HTML: &str = include_str!("index.html");

#[derive(Clone)]
pub struct AppState {
    service: Arc<Service<OllamaBackend, McpSession>>,
    config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            service: Arc::new(Service::new()),
            config: Arc::new(config),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/chat", post(chat))
        .with_state(state)
}

/// Serve until Ctrl-C, then close the client's sessions.
pub async fn serve(config: Config) -> Result<()> {
    let bind = config.http.bind.clone();
    let state = AppState::new(config);
    let service = state.service.clone();

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    service.close().await;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

#[derive(Debug, Deserialize)]
struct ChatBody {
    #[serde(default)]
    message: Option<String>,
}

/// Output of a turn running in the background.
enum Event {
    Chunk(String),
    Failed(runtime::Error),
}

/// `<kind>: <detail>`, as shown to HTTP clients.
fn error_text(e: &runtime::Error) -> String {
    format!("{}: {}", e.kind(), e.detail())
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

/// POST /chat - stream the answer to `{message}` as plain text.
async fn chat(State(state): State<AppState>, body: Bytes) -> Response {
    let message = serde_json::from_slice::<ChatBody>(&body)
        .ok()
        .and_then(|body| body.message)
        .filter(|m| !m.trim().is_empty());
    let Some(message) = message else {
        return error_response(StatusCode::BAD_REQUEST, "No message provided");
    };

    let config = state.config.clone();
    let client = match state
        .service
        .get_or_connect(|| crate::connect(&config))
        .await
    {
        Ok(client) => client,
        Err(e) => {
            error!("client construction failed: {e}");
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, error_text(&e));
        }
    };

    let (tx, mut rx) = mpsc::unbounded_channel::<Event>();
    tokio::spawn(async move {
        let mut client = client.lock().await;
        let result = client
            .chat(&message, |chunk| {
                let _ = tx.send(Event::Chunk(chunk.to_string()));
            })
            .await;
        if let Err(e) = result {
            error!("chat failed: {e}");
            let _ = tx.send(Event::Failed(e));
        }
    });

    // Hold the status until the turn has produced something.
    let first = match rx.recv().await {
        None => String::new(),
        Some(Event::Chunk(chunk)) => chunk,
        Some(Event::Failed(e)) => {
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, error_text(&e));
        }
    };

    let stream = async_stream::stream! {
        yield Ok::<_, Infallible>(first);
        while let Some(event) = rx.recv().await {
            match event {
                Event::Chunk(chunk) => yield Ok(chunk),
                Event::Failed(e) => yield Ok(format!("\n{}", error_text(&e))),
            }
        }
    };

    (
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(stream),
    )
        .into_response()
}
