//! Storage implementations.

use std::sync::Arc;

use tracing::info;

use crate::config::{StorageConfig, StorageType};

pub mod helpers;
pub mod mock;

#[cfg(feature = "sqlite")]
pub mod schema;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use crate::interfaces::{
    FactChange, FactStore, PositionStore, Result, StorageError, SummaryStore,
};
pub use mock::{MockFactStore, MockPositionStore, MockSummaryStore};

#[cfg(feature = "sqlite")]
pub use sqlite::{SqliteFactStore, SqlitePositionStore, SqliteSummaryStore};

/// The three stores backing one engine instance.
#[derive(Clone)]
pub struct Storage {
    pub facts: Arc<dyn FactStore>,
    pub summaries: Arc<dyn SummaryStore>,
    pub positions: Arc<dyn PositionStore>,
}

impl Storage {
    /// Fresh in-memory stores.
    pub fn memory() -> Self {
        Self {
            facts: Arc::new(MockFactStore::new()),
            summaries: Arc::new(MockSummaryStore::new()),
            positions: Arc::new(MockPositionStore::new()),
        }
    }
}

/// Initialize storage based on configuration.
///
/// SQLite databases are migrated before the stores are returned.
pub async fn init_storage(config: &StorageConfig) -> Result<Storage> {
    match config.storage_type {
        StorageType::Memory => {
            info!(storage_type = "memory", "Storage initialized");
            Ok(Storage::memory())
        }
        #[cfg(feature = "sqlite")]
        StorageType::Sqlite => {
            let pool = sqlite::connect(&config.sqlite).await?;
            sqlite::migrate(&pool).await?;
            info!(storage_type = "sqlite", path = %config.sqlite.path, "Storage initialized");

            Ok(Storage {
                facts: Arc::new(SqliteFactStore::new(pool.clone())),
                summaries: Arc::new(SqliteSummaryStore::new(pool.clone())),
                positions: Arc::new(SqlitePositionStore::new(pool)),
            })
        }
        #[cfg(not(feature = "sqlite"))]
        StorageType::Sqlite => {
            tracing::error!("SQLite storage requested but 'sqlite' feature is not enabled");
            Err(StorageError::Unavailable(
                "sqlite feature not enabled".to_string(),
            ))
        }
    }
}
