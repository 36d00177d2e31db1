use std::sync::Arc;

// Re-export core storage types so handlers only need crate::storage::*
pub use cashcard_core::storage::{CashCardStore, StorageError};
pub use cashcard_memory::InMemoryStore;
pub use cashcard_sqlite::SqliteStore;

use crate::config::{StorageConfig, StorageKind};

/// Builds the backend named in the configuration.
pub fn open_store(config: &StorageConfig) -> Result<Arc<dyn CashCardStore>, StorageError> {
    let store: Arc<dyn CashCardStore> = match config.backend {
        StorageKind::Memory => Arc::new(InMemoryStore::new()),
        StorageKind::Sqlite => Arc::new(SqliteStore::new(&config.path)?),
    };
    tracing::info!(backend = ?config.backend, "Storage backend ready");
    Ok(store)
}
