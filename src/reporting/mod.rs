//! Read-only views over the derived tables.
//!
//! Never touches the fact tables and never writes. Aggregates here are
//! sums of already-materialized rows.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;

use crate::model::{MenuSummary, MonthlyKey, MonthlySummary, YearMonth};
use crate::storage::{Result, SummaryStore};


/// Lifetime totals of one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotals {
    pub category: String,
    /// Distinct menu codes in the category.
    pub unique_items: usize,
    pub total_quantity: f64,
    pub total_revenue: f64,
    pub total_discount: f64,
}

/// Totals of one month, optionally restricted to one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTrend {
    pub year_month: YearMonth,
    pub total_quantity: f64,
    pub total_revenue: f64,
    pub unique_items: usize,
}

/// Read-only access to `menu_summary` and `monthly_summary`.
pub struct ReportingReader {
    summaries: Arc<dyn SummaryStore>,
}

impl ReportingReader {
    pub fn new(summaries: Arc<dyn SummaryStore>) -> Self {
        Self { summaries }
    }

    pub async fn menu_summary(&self, menu_code: i64) -> Result<Option<MenuSummary>> {
        self.summaries.get_menu_summary(menu_code).await
    }

    pub async fn monthly_summary(
        &self,
        year_month: YearMonth,
        menu_code: i64,
    ) -> Result<Option<MonthlySummary>> {
        self.summaries
            .get_monthly_summary(&MonthlyKey::new(year_month, menu_code))
            .await
    }

    /// Distinct categories, sorted.
    pub async fn categories(&self) -> Result<Vec<String>> {
        let menus = self.summaries.list_menu_summaries(None).await?;
        let categories: BTreeSet<String> = menus.into_iter().map(|m| m.category).collect();
        Ok(categories.into_iter().collect())
    }

    /// Per-category lifetime totals, sorted by category.
    pub async fn category_totals(&self) -> Result<Vec<CategoryTotals>> {
        let menus = self.summaries.list_menu_summaries(None).await?;

        let mut totals: BTreeMap<String, CategoryTotals> = BTreeMap::new();
        for menu in menus {
            let entry = totals
                .entry(menu.category.clone())
                .or_insert_with(|| CategoryTotals {
                    category: menu.category.clone(),
                    unique_items: 0,
                    total_quantity: 0.0,
                    total_revenue: 0.0,
                    total_discount: 0.0,
                });
            entry.unique_items += 1;
            entry.total_quantity += menu.total_quantity;
            entry.total_revenue += menu.total_revenue;
            entry.total_discount += menu.total_discount;
        }

        Ok(totals.into_values().collect())
    }

    /// Per-month totals in chronological order.
    pub async fn monthly_trends(&self, category: Option<&str>) -> Result<Vec<MonthlyTrend>> {
        let rows = self.summaries.list_monthly_summaries(None, category).await?;

        let mut trends: BTreeMap<YearMonth, (MonthlyTrend, BTreeSet<i64>)> = BTreeMap::new();
        for row in rows {
            let (trend, items) = trends.entry(row.year_month).or_insert_with(|| {
                let trend = MonthlyTrend {
                    year_month: row.year_month,
                    total_quantity: 0.0,
                    total_revenue: 0.0,
                    unique_items: 0,
                };
                (trend, BTreeSet::new())
            });
            trend.total_quantity += row.quantity;
            trend.total_revenue += row.revenue;
            items.insert(row.menu_code);
        }

        Ok(trends
            .into_values()
            .map(|(mut trend, items)| {
                trend.unique_items = items.len();
                trend
            })
            .collect())
    }

    /// Best sellers by lifetime revenue. Ties go to the lower menu code.
    pub async fn top_items(&self, limit: usize) -> Result<Vec<MenuSummary>> {
        let mut menus = self.summaries.list_menu_summaries(None).await?;
        menus.sort_by(|a, b| {
            b.total_revenue
                .total_cmp(&a.total_revenue)
                .then(a.menu_code.cmp(&b.menu_code))
        });
        menus.truncate(limit);
        Ok(menus)
    }
}
