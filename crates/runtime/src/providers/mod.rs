//! Chat endpoint adapters.
//!
//! Each provider implements [`ChatBackend`](crate::model::ChatBackend) for its API.

mod ollama;

pub use ollama::{DEFAULT_URL, OllamaBackend, OllamaBackendBuilder};
