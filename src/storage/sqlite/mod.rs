//! SQLite implementations of storage interfaces.

mod fact_store;
mod position_store;
mod summary_store;

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;

use crate::config::SqliteConfig;
use crate::storage::schema::{CREATE_INDEXES, CREATE_TABLES};
use crate::storage::Result;

pub use fact_store::SqliteFactStore;
pub use position_store::SqlitePositionStore;
pub use summary_store::SqliteSummaryStore;

/// Open a connection pool for the configured database.
///
/// File databases are created if missing. In-memory databases are pinned to
/// a single connection that is never recycled, since the database lives
/// and dies with that connection.
pub async fn connect(config: &SqliteConfig) -> Result<SqlitePool> {
    let pool = if config.is_memory() {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?
    } else {
        if let Some(parent) = std::path::Path::new(&config.path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(sqlx::Error::Io)?;
            }
        }
        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true)
            .foreign_keys(true);
        SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await?
    };

    info!(path = %config.path, "Connected to SQLite");
    Ok(pool)
}

/// Create every table and index if absent.
pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    for statement in CREATE_TABLES.iter().chain(CREATE_INDEXES) {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
