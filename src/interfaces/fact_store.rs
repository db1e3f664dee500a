//! Fact storage interface.

use std::collections::HashSet;

use async_trait::async_trait;

use crate::model::{MonthlyKey, ParseYearMonthError, Sale, SaleDetail, YearMonth};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid datetime '{value}': {reason}")]
    InvalidDatetime { value: String, reason: String },

    #[error(transparent)]
    InvalidYearMonth(#[from] ParseYearMonthError),

    #[error("Invalid stored value in {column}: {value}")]
    InvalidValue { column: &'static str, value: i64 },

    #[cfg(feature = "sqlite")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Write rejected: {0}")]
    Rejected(String),
}

impl StorageError {
    /// Whether retrying the same operation may succeed.
    ///
    /// Busy/locked databases, pool exhaustion and I/O failures are
    /// transient; decode and constraint errors are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Unavailable(_) => true,
            #[cfg(feature = "sqlite")]
            Self::Database(e) => match e {
                sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::WorkerCrashed => true,
                sqlx::Error::Database(db) => db
                    .code()
                    .and_then(|code| code.parse::<i32>().ok())
                    // SQLITE_BUSY (5) and SQLITE_LOCKED (6), including extended codes
                    .is_some_and(|code| matches!(code & 0xff, 5 | 6)),
                _ => false,
            },
            _ => false,
        }
    }
}

/// One entry of the fact change log.
///
/// Every write to `sales_detail`, and every sale upsert, records the
/// derived keys it may have changed. Sequences increase monotonically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactChange {
    pub seq: u64,
    pub receipt_number: String,
    pub menu_code: i64,
    pub year_month: YearMonth,
}

impl FactChange {
    pub fn key(&self) -> MonthlyKey {
        MonthlyKey::new(self.year_month, self.menu_code)
    }
}

/// Interface for the fact tables (`sales`, `sales_detail`).
///
/// Written by the ingestion gateway, read by the rollup engine. The engine
/// never calls the mutating methods.
///
/// Implementations:
/// - `SqliteFactStore`: SQLite storage
/// - `MockFactStore`: In-memory mock for testing (no foreign key enforcement)
#[async_trait]
pub trait FactStore: Send + Sync {
    /// Insert or replace receipts by `receipt_number`.
    ///
    /// Records a change for every stored line item of each receipt, so that
    /// lines which arrived before their sale get rolled up.
    async fn upsert_sales(&self, sales: &[Sale]) -> Result<()>;

    /// Replace every line item of one receipt.
    ///
    /// Returns the rows that were replaced. Changes are recorded for both
    /// the replaced and the new rows.
    async fn replace_receipt_details(
        &self,
        receipt_number: &str,
        details: &[SaleDetail],
    ) -> Result<Vec<SaleDetail>>;

    /// Fetch one receipt.
    async fn get_sale(&self, receipt_number: &str) -> Result<Option<Sale>>;

    /// Subset of `receipt_numbers` that have a `sales` row.
    async fn existing_receipts(&self, receipt_numbers: &[String]) -> Result<HashSet<String>>;

    /// Line items of one receipt, ordered by line number.
    async fn details_for_receipt(&self, receipt_number: &str) -> Result<Vec<SaleDetail>>;

    /// Line items of one menu code, ordered by (receipt_number, line_number).
    async fn details_for_menu(&self, menu_code: i64) -> Result<Vec<SaleDetail>>;

    /// Every line item, ordered by (receipt_number, line_number).
    async fn all_details(&self) -> Result<Vec<SaleDetail>>;

    /// Every (year_month, menu_code) present in `sales_detail`.
    async fn detail_keys(&self) -> Result<Vec<MonthlyKey>>;

    /// Change log entries with `seq > after`, oldest first, at most `limit`.
    async fn changes_since(&self, after: u64, limit: u32) -> Result<Vec<FactChange>>;

    /// Highest recorded change sequence, if any change was recorded.
    async fn latest_change(&self) -> Result<Option<u64>>;
}
