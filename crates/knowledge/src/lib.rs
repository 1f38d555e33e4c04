//! SQLite-backed knowledge base of question/answer pairs.
//!
//! The store holds a single `main` table of questions and answers. Lookups
//! are keyword based: a free-text query is reduced to its significant
//! words, each stored question is scored by the fraction of those words it
//! contains, and the best three are returned.
//!
//! The [`tools`] module exposes the store as MCP tools, served by the
//! `knowledge-server` binary.
//!
//! # Example
//!
//! ```no_run
//! use knowledge::KnowledgeBase;
//!
//! let kb = KnowledgeBase::open("data.db")?;
//! kb.insert("Where is NTUST located?", "Taipei, Taiwan.")?;
//!
//! let lookup = kb.smart_query("where is ntust located")?;
//! println!("{lookup}");
//! # Ok::<(), knowledge::Error>(())
//! ```

mod entry;
mod error;
pub mod lookup;
mod store;
pub mod tools;

pub use entry::Entry;
pub use error::{Error, Result};
pub use lookup::{Lookup, Match, extract_keywords, match_score};
pub use store::KnowledgeBase;
pub use tools::KnowledgeTools;
