//! SQLite backend over an `sqlx` connection pool.
//!
//! Each table stores one JSON document per row next to its primary key:
//!
//! ```text
//! CREATE TABLE person (
//!     id      TEXT PRIMARY KEY,
//!     data    TEXT NOT NULL,     -- flat JSON object, includes "id"
//!     deleted INTEGER NOT NULL DEFAULT 0
//! )
//! ```
//!
//! Conditions on `id` hit the primary key; any other column is matched with
//! `json_extract(data, '$.<column>')`. Updates use `json_patch`.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::sqlite::{SqliteArguments, SqlitePoolOptions};
use sqlx::{Arguments, Row as _, SqlitePool};

use crate::store::backend::{Backend, BackendError, Conditions, Row, ID_COLUMN};

/// SQLite-backed storage engine.
#[derive(Debug, Clone)]
pub struct SqliteBackend {
    pool: SqlitePool,
    soft_delete: bool,
}

impl SqliteBackend {
    /// Open a pool against `url` (e.g. `sqlite://menagerie.db?mode=rwc`).
    pub async fn connect(url: &str, max_connections: u32, soft_delete: bool) -> Result<Self, BackendError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(|e| BackendError::Unavailable(e.to_string()))?;

        tracing::info!(url, max_connections, soft_delete, "SQLite pool opened");
        Ok(Self { pool, soft_delete })
    }
}

/// Table and column names come from code, never from requests; still refuse
/// anything that is not a plain identifier before splicing it into SQL.
fn identifier(name: &str) -> Result<&str, BackendError> {
    let valid = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit());
    if valid {
        Ok(name)
    } else {
        Err(BackendError::Query(format!("invalid identifier `{name}`")))
    }
}

fn bind_value(args: &mut SqliteArguments<'_>, value: &Value) -> Result<(), BackendError> {
    let bound = match value {
        Value::String(s) => args.add(s.clone()),
        Value::Bool(b) => args.add(i64::from(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => args.add(i),
            None => args.add(n.as_f64().unwrap_or_default()),
        },
        Value::Null => args.add(Option::<String>::None),
        other => args.add(other.to_string()),
    };
    bound.map_err(|e| BackendError::Query(e.to_string()))
}

/// Build `deleted = 0 AND <terms>` plus the bound arguments.
fn where_clause(conditions: &Conditions, args: &mut SqliteArguments<'_>) -> Result<String, BackendError> {
    let mut clause = String::from("deleted = 0");
    for (column, value) in conditions.terms() {
        let column = identifier(column)?;
        if column == ID_COLUMN {
            clause.push_str(" AND id = ?");
        } else {
            clause.push_str(&format!(" AND json_extract(data, '$.{column}') = ?"));
        }
        bind_value(args, value)?;
    }
    Ok(clause)
}

fn query_error(e: sqlx::Error) -> BackendError {
    BackendError::Query(e.to_string())
}

#[async_trait]
impl Backend for SqliteBackend {
    async fn create(&self, table: &str, row: Row) -> Result<u64, BackendError> {
        let table = identifier(table)?;
        let id = match row.get(ID_COLUMN) {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            _ => return Err(BackendError::MissingId),
        };
        let data = Value::Object(row).to_string();

        let result = sqlx::query(&format!("INSERT INTO {table} (id, data) VALUES (?, ?)"))
            .bind(&id)
            .bind(data)
            .execute(&self.pool)
            .await;

        match result {
            Ok(done) => Ok(done.rows_affected()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(BackendError::DuplicateKey {
                table: table.to_string(),
                id,
            }),
            Err(e) => Err(query_error(e)),
        }
    }

    async fn read_where(&self, table: &str, conditions: &Conditions) -> Result<Vec<Row>, BackendError> {
        let table = identifier(table)?;
        let mut args = SqliteArguments::default();
        let clause = where_clause(conditions, &mut args)?;

        let rows = sqlx::query_with(&format!("SELECT data FROM {table} WHERE {clause}"), args)
            .fetch_all(&self.pool)
            .await
            .map_err(query_error)?;

        rows.iter()
            .map(|r| {
                let data: String = r.try_get("data").map_err(query_error)?;
                match serde_json::from_str::<Value>(&data) {
                    Ok(Value::Object(row)) => Ok(row),
                    Ok(_) => Err(BackendError::Query(format!("row in `{table}` is not a JSON object"))),
                    Err(e) => Err(BackendError::Query(e.to_string())),
                }
            })
            .collect()
    }

    async fn update_where(
        &self,
        table: &str,
        conditions: &Conditions,
        mut fields: Row,
    ) -> Result<u64, BackendError> {
        let table = identifier(table)?;
        fields.remove(ID_COLUMN);

        let mut args = SqliteArguments::default();
        args.add(Value::Object(fields).to_string())
            .map_err(|e| BackendError::Query(e.to_string()))?;
        let clause = where_clause(conditions, &mut args)?;

        let done = sqlx::query_with(
            &format!("UPDATE {table} SET data = json_patch(data, ?) WHERE {clause}"),
            args,
        )
        .execute(&self.pool)
        .await
        .map_err(query_error)?;
        Ok(done.rows_affected())
    }

    async fn delete_where(&self, table: &str, conditions: &Conditions) -> Result<u64, BackendError> {
        let table = identifier(table)?;
        let mut args = SqliteArguments::default();
        let clause = where_clause(conditions, &mut args)?;

        let sql = if self.soft_delete {
            format!("UPDATE {table} SET deleted = 1, data = json_set(data, '$.deleted', json('true')) WHERE {clause}")
        } else {
            format!("DELETE FROM {table} WHERE {clause}")
        };

        let done = sqlx::query_with(&sql, args)
            .execute(&self.pool)
            .await
            .map_err(query_error)?;
        Ok(done.rows_affected())
    }

    async fn ensure_tables(&self, tables: &[&str]) -> Result<(), BackendError> {
        for table in tables {
            let table = identifier(table)?;
            sqlx::query(&format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    id      TEXT PRIMARY KEY,
                    data    TEXT NOT NULL,
                    deleted INTEGER NOT NULL DEFAULT 0
                )"
            ))
            .execute(&self.pool)
            .await
            .map_err(query_error)?;
            tracing::debug!(table, "Table ready");
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "sqlite"
    }
}
