//! Generic record store.
//!
//! # Data Flow
//! ```text
//! handler (typed value / id)
//!     → RecordStore<T: Record> (serde to flat row, id condition)
//!     → Backend (condition-based primitives)
//!     → rows affected / rows
//!     → RecordStore (zero-row check, decode)
//!     → handler (owned T or StoreError)
//! ```
//!
//! # Design Decisions
//! - One store, generic per call: the type parameter picks the table
//! - Zero rows affected on a write is an error, never a soft success
//! - The store keeps no per-request state; `bound_to` only attaches the
//!   request's cancellation token to a cheap clone

pub mod backend;
pub mod error;
pub mod memory;
pub mod sqlite;

use std::future::Future;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::http::request::RequestContext;

pub use backend::{Backend, BackendError, Conditions, Row};
pub use error::{PersistenceError, StoreError};
pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

/// A value the store can persist.
pub trait Record: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Backend table holding this record type.
    const TABLE: &'static str;

    fn id(&self) -> &str;
}

/// Typed CRUD over any [`Record`], delegating to a shared [`Backend`].
#[derive(Clone)]
pub struct RecordStore {
    backend: Arc<dyn Backend>,
    cancel: Option<CancellationToken>,
}

impl RecordStore {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend, cancel: None }
    }

    /// A clone whose backend calls stop once the request is cancelled.
    pub fn bound_to(&self, ctx: &RequestContext) -> Self {
        Self {
            backend: self.backend.clone(),
            cancel: Some(ctx.cancellation().clone()),
        }
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Insert a fully populated record.
    pub async fn create<T: Record>(&self, record: &T) -> Result<(), StoreError> {
        let row = encode(record)?;
        let backend = self.backend.clone();
        let affected = self
            .guarded("create", T::TABLE, async move { backend.create(T::TABLE, row).await })
            .await?;
        expect_rows("create", T::TABLE, record.id(), affected)
    }

    /// Fetch the live record with the given id.
    pub async fn read<T: Record>(&self, id: &str) -> Result<T, StoreError> {
        let backend = self.backend.clone();
        let conditions = Conditions::by_id(id);
        let mut rows = self
            .guarded("read", T::TABLE, async move {
                backend.read_where(T::TABLE, &conditions).await
            })
            .await?;

        if rows.len() > 1 {
            tracing::warn!(table = T::TABLE, id, rows = rows.len(), "Read matched more than one row");
        }
        match rows.pop() {
            Some(row) => decode(row),
            None => Err(StoreError::NotFound {
                table: T::TABLE,
                id: id.to_string(),
            }),
        }
    }

    /// Write every field of `record` over the stored row with the same id.
    pub async fn update<T: Record>(&self, record: &T) -> Result<(), StoreError> {
        let mut fields = encode(record)?;
        fields.remove(backend::ID_COLUMN);
        self.update_fields::<T>(record.id(), fields).await
    }

    /// Write a partial row over the stored row with the given id.
    pub async fn update_fields<T: Record>(&self, id: &str, fields: Row) -> Result<(), StoreError> {
        let backend = self.backend.clone();
        let conditions = Conditions::by_id(id);
        let affected = self
            .guarded("update", T::TABLE, async move {
                backend.update_where(T::TABLE, &conditions, fields).await
            })
            .await?;
        expect_rows("update", T::TABLE, id, affected)
    }

    /// Delete the stored row with the record's id.
    pub async fn delete<T: Record>(&self, record: &T) -> Result<(), StoreError> {
        let backend = self.backend.clone();
        let conditions = Conditions::by_id(record.id());
        let affected = self
            .guarded("delete", T::TABLE, async move {
                backend.delete_where(T::TABLE, &conditions).await
            })
            .await?;
        expect_rows("delete", T::TABLE, record.id(), affected)
    }

    /// Run a backend call, racing it against the bound cancellation token.
    async fn guarded<O, F>(&self, op: &'static str, table: &'static str, call: F) -> Result<O, StoreError>
    where
        F: Future<Output = Result<O, BackendError>>,
    {
        let result = match &self.cancel {
            Some(token) => {
                if token.is_cancelled() {
                    return Err(StoreError::Cancelled { op, table });
                }
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return Err(StoreError::Cancelled { op, table }),
                    result = call => result,
                }
            }
            None => call.await,
        };

        result.map_err(|source| {
            tracing::error!(op, table, error = %source, "Backend call failed");
            PersistenceError::Backend { op, table, source }.into()
        })
    }
}

fn expect_rows(op: &'static str, table: &'static str, id: &str, affected: u64) -> Result<(), StoreError> {
    if affected == 0 {
        return Err(PersistenceError::NoRowsAffected {
            op,
            table,
            id: id.to_string(),
        }
        .into());
    }
    Ok(())
}

fn encode<T: Record>(record: &T) -> Result<Row, StoreError> {
    let value = serde_json::to_value(record).map_err(|source| PersistenceError::Encode {
        table: T::TABLE,
        source,
    })?;
    match value {
        Value::Object(row) => Ok(row),
        _ => Err(PersistenceError::NotAnObject { table: T::TABLE }.into()),
    }
}

fn decode<T: Record>(row: Row) -> Result<T, StoreError> {
    serde_json::from_value(Value::Object(row)).map_err(|source| {
        PersistenceError::Decode {
            table: T::TABLE,
            source,
        }
        .into()
    })
}
