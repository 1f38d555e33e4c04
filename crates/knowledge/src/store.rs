//! SQLite knowledge store implementation.

use crate::{Entry, Result};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, params};
use serde_json::{Map, Number, Value};
use std::path::Path;

const TABLE: &str = "main";

/// SQLite-backed question/answer store.
pub struct KnowledgeBase {
    conn: Connection,
}

impl KnowledgeBase {
    /// Open or create a knowledge base at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory knowledge base (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {TABLE} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                question TEXT NOT NULL,
                answer TEXT NOT NULL
            );
            "#
        ))?;
        Ok(())
    }

    /// Insert a question/answer pair, returning its row id.
    pub fn insert(&self, question: &str, answer: &str) -> Result<i64> {
        self.conn.execute(
            &format!("INSERT INTO {TABLE} (question, answer) VALUES (?1, ?2)"),
            params![question, answer],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Insert many pairs in one transaction.
    pub fn insert_many<'a>(
        &mut self,
        pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut count = 0;
        {
            let mut stmt =
                tx.prepare(&format!("INSERT INTO {TABLE} (question, answer) VALUES (?1, ?2)"))?;
            for (question, answer) in pairs {
                stmt.execute(params![question, answer])?;
                count += 1;
            }
        }
        tx.commit()?;
        Ok(count)
    }

    /// Number of stored pairs.
    pub fn len(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {TABLE}"), [], |row| {
                row.get(0)
            })?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// All entries, ordered by id.
    pub fn entries(&self) -> Result<Vec<Entry>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT id, question, answer FROM {TABLE} ORDER BY id"))?;

        let entries = stmt
            .query_map([], |row| {
                Ok(Entry {
                    id: row.get(0)?,
                    question: row.get(1)?,
                    answer: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(entries)
    }

    /// Entries whose question contains `needle`, ignoring ASCII case.
    pub fn search_questions(&self, needle: &str, limit: usize) -> Result<Vec<Entry>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, question, answer FROM {TABLE}
             WHERE instr(lower(question), lower(?1)) > 0
             ORDER BY id LIMIT ?2"
        ))?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let entries = stmt
            .query_map(params![needle, limit], |row| {
                Ok(Entry {
                    id: row.get(0)?,
                    question: row.get(1)?,
                    answer: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(entries)
    }

    /// Run arbitrary SQL and return each row as a column → value object.
    pub fn query_rows(&self, sql: &str) -> Result<Vec<Map<String, Value>>> {
        let mut stmt = self.conn.prepare(sql)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

        let mut rows = stmt.query([])?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            let mut object = Map::new();
            for (i, column) in columns.iter().enumerate() {
                object.insert(column.clone(), sql_to_json(row.get_ref(i)?));
            }
            out.push(object);
        }
        Ok(out)
    }
}

fn sql_to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Value::String(format!("<blob {} bytes>", bytes.len())),
    }
}
