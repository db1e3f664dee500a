//! Mock storage implementations for testing.
//!
//! In-memory stores with failure injection. No persistence.

mod fact_store;
mod position_store;
mod summary_store;

pub use fact_store::MockFactStore;
pub use position_store::MockPositionStore;
pub use summary_store::MockSummaryStore;
