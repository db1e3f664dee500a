//! PositionStore trait definition.

use async_trait::async_trait;

use super::fact_store::Result;

/// Interface for position tracking.
///
/// Tracks the last fact change-log sequence a handler has fully rolled up,
/// so that pull-mode catch-up resumes from its checkpoint instead of
/// re-deriving every key.
///
/// # Implementations
///
/// - `SqlitePositionStore`: SQLite storage
/// - `MockPositionStore`: In-memory mock for testing
#[async_trait]
pub trait PositionStore: Send + Sync {
    /// Get the last-processed sequence for a handler.
    ///
    /// Returns `None` if no position has been recorded.
    async fn get(&self, handler: &str) -> Result<Option<u64>>;

    /// Store the last-processed sequence for a handler.
    ///
    /// Upserts: creates the position if it doesn't exist, updates if it does.
    async fn put(&self, handler: &str, sequence: u64) -> Result<()>;
}
