//! Rollup engine errors.

use super::result::{KeyFailure, RollupResult};
use crate::storage::StorageError;

/// Errors returned by the rollup engine.
#[derive(Debug, thiserror::Error)]
pub enum RollupError {
    /// Failure before any derived row was touched.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Some keys could not be recomputed. Each listed key kept its prior
    /// row; every other touched key was fully updated.
    #[error("Partial recompute failure: {} key(s) not updated", failed.len())]
    PartialRecomputeFailure {
        failed: Vec<KeyFailure>,
        /// What the keys that did succeed changed.
        partial: Box<RollupResult>,
    },
}

impl RollupError {
    /// Keys left at their prior value, empty for whole-call failures.
    pub fn failed_keys(&self) -> &[KeyFailure] {
        match self {
            Self::PartialRecomputeFailure { failed, .. } => failed,
            Self::Storage(_) => &[],
        }
    }
}
