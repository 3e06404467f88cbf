//! Record store errors.

use crate::store::backend::BackendError;

/// Errors surfaced by [`RecordStore`](crate::store::RecordStore) operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A read matched no live row.
    #[error("no `{table}` record with id `{id}`")]
    NotFound { table: &'static str, id: String },

    /// The backend faulted or a write silently did nothing.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// The owning request was cancelled before the backend call was issued.
    #[error("request cancelled before `{op}` on `{table}`")]
    Cancelled { op: &'static str, table: &'static str },
}

/// Backend faults and write anomalies.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("backend rejected {op} on `{table}`: {source}")]
    Backend {
        op: &'static str,
        table: &'static str,
        #[source]
        source: BackendError,
    },

    #[error("{op} on `{table}` for id `{id}` affected no rows")]
    NoRowsAffected {
        op: &'static str,
        table: &'static str,
        id: String,
    },

    #[error("failed to encode `{table}` record: {source}")]
    Encode {
        table: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to decode `{table}` row: {source}")]
    Decode {
        table: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("`{table}` record did not serialize to a JSON object")]
    NotAnObject { table: &'static str },
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    /// The id is already taken, live or soft-deleted.
    pub fn is_duplicate(&self) -> bool {
        matches!(
            self,
            StoreError::Persistence(PersistenceError::Backend {
                source: BackendError::DuplicateKey { .. },
                ..
            })
        )
    }
}
