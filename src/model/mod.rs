//! Fact and derived row types.

mod diagnostic;
mod sale;
mod summary;
mod year_month;

pub use diagnostic::{Diagnostic, DimensionField};
pub use sale::{Sale, SaleDetail};
pub use summary::{DerivedKey, MenuSummary, MonthlyKey, MonthlySummary};
pub use year_month::{ParseYearMonthError, YearMonth};

/// Name stored when no row of a menu code carries a name.
pub const UNKNOWN_MENU_NAME: &str = "Unknown";
/// Category stored when no row of a menu code carries a category.
pub const UNCATEGORIZED: &str = "Uncategorized";
