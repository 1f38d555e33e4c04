//! Stored question/answer pairs.

use serde::{Deserialize, Serialize};

/// One row of the knowledge base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: i64,
    pub question: String,
    pub answer: String,
}
