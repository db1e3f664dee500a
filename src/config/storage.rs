//! Storage configuration types.

use serde::Deserialize;

/// Path value that selects a private in-memory SQLite database.
pub const SQLITE_MEMORY_PATH: &str = ":memory:";

/// Storage type discriminator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    #[default]
    Sqlite,
    /// In-process mock stores; nothing survives the process.
    Memory,
}

/// Storage configuration (discriminated union).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage type discriminator.
    #[serde(rename = "type")]
    pub storage_type: StorageType,
    /// SQLite-specific configuration.
    pub sqlite: SqliteConfig,
}

/// SQLite-specific configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SqliteConfig {
    /// Database file path, or `:memory:`.
    pub path: String,
    /// Pool size. Forced to 1 for in-memory databases, where every
    /// connection would otherwise see its own empty database.
    pub max_connections: u32,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: "database/restaurant_sales.db".to_string(),
            max_connections: 4,
        }
    }
}

impl SqliteConfig {
    pub fn is_memory(&self) -> bool {
        self.path == SQLITE_MEMORY_PATH
    }
}
