//! Startup orchestration.
//!
//! # Responsibilities
//! - Open the configured backend
//! - Create a table for every resource kind
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners start last (traffic only when ready), in `main`

use std::sync::Arc;

use crate::config::{BackendKind, StorageConfig};
use crate::resources::ResourceKind;
use crate::store::{Backend, BackendError, MemoryBackend, RecordStore, SqliteBackend};

/// Open the backend named by `config` and bootstrap its tables.
pub async fn open_store(config: &StorageConfig) -> Result<RecordStore, BackendError> {
    let backend: Arc<dyn Backend> = match config.backend {
        BackendKind::Memory => Arc::new(MemoryBackend::new(config.soft_delete)),
        BackendKind::Sqlite => Arc::new(
            SqliteBackend::connect(&config.sqlite_url, config.max_connections, config.soft_delete).await?,
        ),
    };

    backend.ensure_tables(&ResourceKind::tables()).await?;
    tracing::info!(
        backend = backend.name(),
        soft_delete = config.soft_delete,
        "Storage ready"
    );
    Ok(RecordStore::new(backend))
}
