//! Shared storage integration tests.
//!
//! Tests the FactStore, SummaryStore and PositionStore interfaces against
//! all implementations. Each implementation module imports these test
//! functions and runs them.

pub mod fact_store_tests;
pub mod position_store_tests;
pub mod summary_store_tests;
