//! Derived rows maintained by the rollup engine.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::YearMonth;

/// Lifetime totals for one menu item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuSummary {
    pub menu_code: i64,
    pub menu_name: String,
    pub category: String,
    pub total_quantity: f64,
    pub total_revenue: f64,
    pub total_discount: f64,
    /// Distinct receipts that ordered this item.
    pub times_ordered: u64,
}

/// Totals for one menu item within one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub year_month: YearMonth,
    pub menu_code: i64,
    pub menu_name: String,
    pub category: String,
    pub quantity: f64,
    pub revenue: f64,
    pub discount_amount: f64,
    /// Distinct receipts in this month that ordered this item.
    pub orders: u64,
}

impl MonthlySummary {
    pub fn key(&self) -> MonthlyKey {
        MonthlyKey::new(self.year_month, self.menu_code)
    }
}

/// Identity of a monthly rollup row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MonthlyKey {
    pub year_month: YearMonth,
    pub menu_code: i64,
}

impl MonthlyKey {
    pub fn new(year_month: YearMonth, menu_code: i64) -> Self {
        Self {
            year_month,
            menu_code,
        }
    }
}

impl fmt::Display for MonthlyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.year_month, self.menu_code)
    }
}

/// Identity of any derived row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "table", rename_all = "snake_case")]
pub enum DerivedKey {
    MenuSummary { menu_code: i64 },
    MonthlySummary { year_month: YearMonth, menu_code: i64 },
}

impl DerivedKey {
    pub fn menu(menu_code: i64) -> Self {
        Self::MenuSummary { menu_code }
    }

    pub fn monthly(key: MonthlyKey) -> Self {
        Self::MonthlySummary {
            year_month: key.year_month,
            menu_code: key.menu_code,
        }
    }

    pub fn menu_code(&self) -> i64 {
        match self {
            Self::MenuSummary { menu_code } | Self::MonthlySummary { menu_code, .. } => *menu_code,
        }
    }
}

impl fmt::Display for DerivedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MenuSummary { menu_code } => write!(f, "menu_summary[{}]", menu_code),
            Self::MonthlySummary {
                year_month,
                menu_code,
            } => write!(f, "monthly_summary[{}, {}]", year_month, menu_code),
        }
    }
}
