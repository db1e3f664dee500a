//! Sales rollup engine.
//!
//! Maintains lifetime and per-month per-menu-item aggregates over
//! restaurant sales facts, incrementally and idempotently.
//!
//! Data flow:
//!
//! ```text
//! FactBatch → [IngestionGateway] → FactStore (sales, sales_detail)
//!                                      │
//!                                      ▼
//!                               [RollupEngine] → SummaryStore (menu_summary, monthly_summary)
//!                                                      │
//!                                                      ▼
//!                                              [ReportingReader]
//! ```

pub mod config;
pub mod ingestion;
pub mod interfaces;
pub mod model;
pub mod reporting;
pub mod rollup;
pub mod storage;
pub mod utils;
