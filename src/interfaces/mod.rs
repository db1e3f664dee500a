//! Storage interfaces shared by every backend.

pub mod fact_store;
pub mod position_store;
pub mod summary_store;

pub use fact_store::{FactChange, FactStore, Result, StorageError};
pub use position_store::PositionStore;
pub use summary_store::SummaryStore;
