//! Backend collaborator contract.
//!
//! # Responsibilities
//! - Define the condition-based primitives every storage engine exposes
//! - Carry rows as flat JSON objects so the engine never sees Rust types
//! - Report rows affected so the store can reject silent no-op writes
//!
//! # Design Decisions
//! - Object safe (`async_trait`) so one `Arc<dyn Backend>` is threaded from
//!   the process root through every component
//! - Conditions are equality-only; that is all single-resource CRUD needs
//! - Hard vs soft delete is a backend decision, invisible to callers

use async_trait::async_trait;
use serde_json::{Map, Value};

/// A stored row: a flat JSON object keyed by column name.
pub type Row = Map<String, Value>;

/// Column holding the record identity in every table.
pub const ID_COLUMN: &str = "id";

/// Errors raised by a storage engine.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("duplicate key `{id}` in table `{table}`")]
    DuplicateKey { table: String, id: String },

    #[error("unknown table `{0}`")]
    UnknownTable(String),

    #[error("row is missing the `id` column")]
    MissingId,

    #[error("query failed: {0}")]
    Query(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// A conjunction of `column = value` filters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conditions {
    terms: Vec<(String, Value)>,
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Filter on the identity column.
    pub fn by_id(id: &str) -> Self {
        Self::new().eq(ID_COLUMN, Value::String(id.to_string()))
    }

    /// Add an equality term.
    pub fn eq(mut self, column: impl Into<String>, value: Value) -> Self {
        self.terms.push((column.into(), value));
        self
    }

    pub fn terms(&self) -> &[(String, Value)] {
        &self.terms
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Evaluate against a row. A missing column never matches.
    pub fn matches(&self, row: &Row) -> bool {
        self.terms
            .iter()
            .all(|(column, expected)| row.get(column) == Some(expected))
    }
}

/// Condition-based storage primitives consumed by the record store.
#[async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Insert a row. Returns rows affected.
    async fn create(&self, table: &str, row: Row) -> Result<u64, BackendError>;

    /// Return every live row matching `conditions`.
    async fn read_where(&self, table: &str, conditions: &Conditions) -> Result<Vec<Row>, BackendError>;

    /// Merge `fields` into every live row matching `conditions`. Returns rows affected.
    async fn update_where(
        &self,
        table: &str,
        conditions: &Conditions,
        fields: Row,
    ) -> Result<u64, BackendError>;

    /// Remove (or mark unavailable) every live row matching `conditions`. Returns rows affected.
    async fn delete_where(&self, table: &str, conditions: &Conditions) -> Result<u64, BackendError>;

    /// Create the given tables if they do not exist yet.
    async fn ensure_tables(&self, tables: &[&str]) -> Result<(), BackendError>;

    /// Short engine name for logs.
    fn name(&self) -> &'static str;
}
