//! Chat protocol types and the streaming backend trait.

pub mod errors;
pub mod types;

pub use errors::ModelError;
pub use types::{
    ChatBackend, ChatRequest, ChatStream, Message, ParameterSchema, Role, StreamUnit, ToolCall,
    ToolSpec,
};
