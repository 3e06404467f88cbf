//! In-process backend.
//!
//! # Design Decisions
//! - One `DashMap` shard entry per table; each table is an ordered map of
//!   id → row so scans are deterministic
//! - Soft delete keeps the row and flips `deleted`; reads skip such rows
//! - A soft-deleted id still occupies its key, matching a relational primary key

use std::collections::BTreeMap;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use crate::store::backend::{Backend, BackendError, Conditions, Row, ID_COLUMN};

/// Column flipped by soft deletes.
pub const DELETED_COLUMN: &str = "deleted";

#[derive(Debug, Clone)]
struct StoredRow {
    row: Row,
    deleted: bool,
}

/// Concurrent in-memory backend.
#[derive(Debug)]
pub struct MemoryBackend {
    tables: DashMap<String, BTreeMap<String, StoredRow>>,
    soft_delete: bool,
}

impl MemoryBackend {
    pub fn new(soft_delete: bool) -> Self {
        Self {
            tables: DashMap::new(),
            soft_delete,
        }
    }

    /// A backend whose `tables` already exist.
    pub fn with_tables(soft_delete: bool, tables: &[&str]) -> Self {
        let backend = Self::new(soft_delete);
        for table in tables {
            backend.tables.insert(table.to_string(), BTreeMap::new());
        }
        backend
    }

    /// Number of live rows in `table`.
    pub fn live_rows(&self, table: &str) -> usize {
        self.tables
            .get(table)
            .map(|t| t.values().filter(|r| !r.deleted).count())
            .unwrap_or(0)
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(true)
    }
}

fn row_id(row: &Row) -> Result<String, BackendError> {
    match row.get(ID_COLUMN) {
        Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
        _ => Err(BackendError::MissingId),
    }
}

#[async_trait]
impl Backend for MemoryBackend {
    async fn create(&self, table: &str, row: Row) -> Result<u64, BackendError> {
        let id = row_id(&row)?;
        let mut rows = self
            .tables
            .get_mut(table)
            .ok_or_else(|| BackendError::UnknownTable(table.to_string()))?;

        if rows.contains_key(&id) {
            return Err(BackendError::DuplicateKey {
                table: table.to_string(),
                id,
            });
        }
        rows.insert(id, StoredRow { row, deleted: false });
        Ok(1)
    }

    async fn read_where(&self, table: &str, conditions: &Conditions) -> Result<Vec<Row>, BackendError> {
        let rows = self
            .tables
            .get(table)
            .ok_or_else(|| BackendError::UnknownTable(table.to_string()))?;

        Ok(rows
            .values()
            .filter(|r| !r.deleted && conditions.matches(&r.row))
            .map(|r| r.row.clone())
            .collect())
    }

    async fn update_where(
        &self,
        table: &str,
        conditions: &Conditions,
        fields: Row,
    ) -> Result<u64, BackendError> {
        let mut rows = self
            .tables
            .get_mut(table)
            .ok_or_else(|| BackendError::UnknownTable(table.to_string()))?;

        let mut affected = 0;
        for stored in rows.values_mut() {
            if stored.deleted || !conditions.matches(&stored.row) {
                continue;
            }
            for (column, value) in &fields {
                if column == ID_COLUMN {
                    continue;
                }
                stored.row.insert(column.clone(), value.clone());
            }
            affected += 1;
        }
        Ok(affected)
    }

    async fn delete_where(&self, table: &str, conditions: &Conditions) -> Result<u64, BackendError> {
        let mut rows = self
            .tables
            .get_mut(table)
            .ok_or_else(|| BackendError::UnknownTable(table.to_string()))?;

        let matched: Vec<String> = rows
            .iter()
            .filter(|(_, r)| !r.deleted && conditions.matches(&r.row))
            .map(|(id, _)| id.clone())
            .collect();

        for id in &matched {
            if self.soft_delete {
                if let Some(stored) = rows.get_mut(id) {
                    stored.deleted = true;
                    stored.row.insert(DELETED_COLUMN.to_string(), Value::Bool(true));
                }
            } else {
                rows.remove(id);
            }
        }
        Ok(matched.len() as u64)
    }

    async fn ensure_tables(&self, tables: &[&str]) -> Result<(), BackendError> {
        for table in tables {
            self.tables.entry(table.to_string()).or_default();
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
