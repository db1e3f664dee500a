//! Derived table storage interface.

use async_trait::async_trait;

use super::fact_store::Result;
use crate::model::{MenuSummary, MonthlyKey, MonthlySummary, YearMonth};

/// Interface for the derived tables (`menu_summary`, `monthly_summary`).
///
/// Only the rollup engine writes through this trait. Every `put_*` must
/// replace the stored row in a single atomic step: a reader sees either the
/// previous row or the new one, never a mix.
///
/// Implementations:
/// - `SqliteSummaryStore`: SQLite storage
/// - `MockSummaryStore`: In-memory mock with write-failure injection
#[async_trait]
pub trait SummaryStore: Send + Sync {
    async fn get_menu_summary(&self, menu_code: i64) -> Result<Option<MenuSummary>>;

    /// Insert or replace one lifetime row.
    async fn put_menu_summary(&self, summary: &MenuSummary) -> Result<()>;

    /// Delete one lifetime row. Returns whether a row existed.
    async fn delete_menu_summary(&self, menu_code: i64) -> Result<bool>;

    async fn get_monthly_summary(&self, key: &MonthlyKey) -> Result<Option<MonthlySummary>>;

    /// Insert or replace one monthly row.
    async fn put_monthly_summary(&self, summary: &MonthlySummary) -> Result<()>;

    /// Delete one monthly row. Returns whether a row existed.
    async fn delete_monthly_summary(&self, key: &MonthlyKey) -> Result<bool>;

    /// Lifetime rows ordered by menu code, optionally for one category.
    async fn list_menu_summaries(&self, category: Option<&str>) -> Result<Vec<MenuSummary>>;

    /// Monthly rows ordered by (year_month, menu_code), optionally filtered.
    async fn list_monthly_summaries(
        &self,
        year_month: Option<YearMonth>,
        category: Option<&str>,
    ) -> Result<Vec<MonthlySummary>>;

    /// Months that currently have a row for `menu_code`, ascending.
    async fn monthly_keys_for_menu(&self, menu_code: i64) -> Result<Vec<YearMonth>>;
}
