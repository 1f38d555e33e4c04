//! MCP tools backed by the knowledge base.

use std::sync::Mutex;

use mcp::{CallToolResult, ServerInfo, Tool, ToolHandler};
use serde_json::{Map, Value, json};

use crate::KnowledgeBase;

pub const SMART_QUERY: &str = "smart_query";
pub const QUERY_DB: &str = "query_db";

/// Serves `smart_query` and `query_db` over a [`KnowledgeBase`].
pub struct KnowledgeTools {
    kb: Mutex<KnowledgeBase>,
}

impl KnowledgeTools {
    pub fn new(kb: KnowledgeBase) -> Self {
        Self { kb: Mutex::new(kb) }
    }

    fn run(&self, name: &str, arguments: &Map<String, Value>) -> mcp::Result<CallToolResult> {
        let query = arguments
            .get("query")
            .and_then(Value::as_str)
            .ok_or_else(|| mcp::Error::InvalidArguments("`query` must be a string".into()))?;

        let kb = self
            .kb
            .lock()
            .map_err(|_| mcp::Error::ToolCallFailed("knowledge base lock poisoned".into()))?;

        match name {
            SMART_QUERY => {
                let lookup = kb
                    .smart_query(query)
                    .map_err(|e| mcp::Error::ToolCallFailed(e.to_string()))?;
                Ok(CallToolResult::text(lookup.to_string()))
            }
            QUERY_DB => {
                let rows: Vec<Value> = match kb.query_rows(query) {
                    Ok(rows) => rows.into_iter().map(Value::Object).collect(),
                    Err(e) => vec![json!({ "error": e.to_string() })],
                };
                let text = serde_json::to_string(&rows)?;
                Ok(CallToolResult::text(text))
            }
            other => Err(mcp::Error::ToolNotFound(other.to_string())),
        }
    }
}

impl ToolHandler for KnowledgeTools {
    fn info(&self) -> ServerInfo {
        ServerInfo::new("knowledge", env!("CARGO_PKG_VERSION"))
    }

    fn tools(&self) -> Vec<Tool> {
        vec![
            Tool::new(
                SMART_QUERY,
                "Search the question/answer knowledge base by keywords and return the \
                 best matching entries with their relevance.",
                json!({
                    "type": "object",
                    "properties": {
                        "query": { "type": "string", "description": "Free-text question" }
                    },
                    "required": ["query"]
                }),
            ),
            Tool::new(
                QUERY_DB,
                "Run a SQL query against the knowledge base. The table is `main` with \
                 columns id, question, answer. Returns rows as JSON objects.",
                json!({
                    "type": "object",
                    "properties": {
                        "query": { "type": "string", "description": "SQL statement" }
                    },
                    "required": ["query"]
                }),
            ),
        ]
    }

    async fn call(&self, name: &str, arguments: Map<String, Value>) -> mcp::Result<CallToolResult> {
        self.run(name, &arguments)
    }
}
