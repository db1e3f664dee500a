//! Pure aggregation of line items into derived rows.
//!
//! No storage access here. Lines are always folded in
//! `(receipt_number, line_number)` order, so the same fact set yields
//! bit-identical sums whichever path computed them.

use std::collections::{BTreeMap, BTreeSet};

use crate::model::{
    Diagnostic, DimensionField, MenuSummary, MonthlySummary, SaleDetail, YearMonth,
    UNCATEGORIZED, UNKNOWN_MENU_NAME,
};

/// Sums over one group of lines.
#[derive(Default)]
struct Totals<'a> {
    quantity: f64,
    revenue: f64,
    discount: f64,
    receipts: BTreeSet<&'a str>,
}

impl<'a> Totals<'a> {
    fn add(&mut self, detail: &'a SaleDetail) {
        self.quantity += detail.quantity;
        self.revenue += detail.revenue;
        self.discount += detail.discount_amount;
        self.receipts.insert(&detail.receipt_number);
    }

    /// Distinct receipts, not line rows.
    fn receipt_count(&self) -> u64 {
        self.receipts.len() as u64
    }
}

/// Every derived row of one menu code.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuRollup {
    pub summary: MenuSummary,
    pub monthly: BTreeMap<YearMonth, MonthlySummary>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Pick one value for a descriptive field.
///
/// The lexicographically smallest non-blank value wins; `fallback` is used
/// when there is none. More than one distinct value yields an
/// `InconsistentDimensionData` diagnostic.
pub fn resolve_dimension<'a>(
    menu_code: i64,
    field: DimensionField,
    values: impl IntoIterator<Item = Option<&'a str>>,
    fallback: &str,
) -> (String, Option<Diagnostic>) {
    let distinct: BTreeSet<&str> = values
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .collect();

    let resolved = distinct
        .first()
        .map_or_else(|| fallback.to_string(), |v| v.to_string());

    let diagnostic = (distinct.len() > 1).then(|| Diagnostic::InconsistentDimensionData {
        menu_code,
        field,
        values: distinct.iter().map(|v| v.to_string()).collect(),
        resolved: resolved.clone(),
    });

    (resolved, diagnostic)
}

fn fold_menu(menu_code: i64, mut lines: Vec<&SaleDetail>) -> Option<MenuRollup> {
    if lines.is_empty() {
        return None;
    }
    lines.sort_by(|a, b| {
        (a.receipt_number.as_str(), a.line_number).cmp(&(b.receipt_number.as_str(), b.line_number))
    });

    let mut diagnostics = Vec::new();
    let (menu_name, name_conflict) = resolve_dimension(
        menu_code,
        DimensionField::MenuName,
        lines.iter().map(|d| d.menu_name.as_deref()),
        UNKNOWN_MENU_NAME,
    );
    let (category, category_conflict) = resolve_dimension(
        menu_code,
        DimensionField::Category,
        lines.iter().map(|d| d.category.as_deref()),
        UNCATEGORIZED,
    );
    diagnostics.extend(name_conflict);
    diagnostics.extend(category_conflict);

    let mut lifetime = Totals::default();
    let mut months: BTreeMap<YearMonth, Totals> = BTreeMap::new();
    for &line in &lines {
        lifetime.add(line);
        months.entry(line.year_month()).or_default().add(line);
    }

    let monthly = months
        .into_iter()
        .map(|(year_month, totals)| {
            let row = MonthlySummary {
                year_month,
                menu_code,
                menu_name: menu_name.clone(),
                category: category.clone(),
                quantity: totals.quantity,
                revenue: totals.revenue,
                discount_amount: totals.discount,
                orders: totals.receipt_count(),
            };
            (year_month, row)
        })
        .collect();

    let summary = MenuSummary {
        menu_code,
        menu_name,
        category,
        total_quantity: lifetime.quantity,
        total_revenue: lifetime.revenue,
        total_discount: lifetime.discount,
        times_ordered: lifetime.receipt_count(),
    };

    Some(MenuRollup {
        summary,
        monthly,
        diagnostics,
    })
}

/// Roll up the lines of one menu code. Lines of other codes are ignored.
///
/// Returns `None` when no line carries `menu_code`.
pub fn rollup_menu(menu_code: i64, details: &[SaleDetail]) -> Option<MenuRollup> {
    let lines = details.iter().filter(|d| d.menu_code == menu_code).collect();
    fold_menu(menu_code, lines)
}

/// Roll up every menu code present in `details`.
pub fn rollup_all(details: &[SaleDetail]) -> BTreeMap<i64, MenuRollup> {
    let mut by_code: BTreeMap<i64, Vec<&SaleDetail>> = BTreeMap::new();
    for detail in details {
        by_code.entry(detail.menu_code).or_default().push(detail);
    }

    by_code
        .into_iter()
        .filter_map(|(code, lines)| fold_menu(code, lines).map(|rollup| (code, rollup)))
        .collect()
}
