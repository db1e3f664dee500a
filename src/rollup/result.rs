//! Outcome types of rollup operations.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use crate::model::{DerivedKey, Diagnostic, MonthlyKey, SaleDetail, YearMonth};

/// Counts and findings of one engine call.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RollupResult {
    pub menu_updated: usize,
    pub menu_deleted: usize,
    pub monthly_updated: usize,
    pub monthly_deleted: usize,
    /// Sorted and free of duplicates.
    pub diagnostics: Vec<Diagnostic>,
}

impl RollupResult {
    pub fn merge(&mut self, other: RollupResult) {
        self.menu_updated += other.menu_updated;
        self.menu_deleted += other.menu_deleted;
        self.monthly_updated += other.monthly_updated;
        self.monthly_deleted += other.monthly_deleted;
        self.diagnostics.extend(other.diagnostics);
        self.diagnostics.sort();
        self.diagnostics.dedup();
    }

    /// Derived rows written or removed.
    pub fn rows_changed(&self) -> usize {
        self.menu_updated + self.menu_deleted + self.monthly_updated + self.monthly_deleted
    }
}

/// A derived row that was left at its prior value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KeyFailure {
    pub key: DerivedKey,
    pub error: String,
}

impl KeyFailure {
    pub fn new(key: DerivedKey, error: impl ToString) -> Self {
        Self {
            key,
            error: error.to_string(),
        }
    }
}

/// Derived keys to re-derive, grouped by menu code.
///
/// A menu code with an empty month set still gets its lifetime row
/// recomputed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TouchedKeys {
    keys: BTreeMap<i64, BTreeSet<YearMonth>>,
}

impl TouchedKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn touch_menu(&mut self, menu_code: i64) {
        self.keys.entry(menu_code).or_default();
    }

    pub fn touch(&mut self, key: MonthlyKey) {
        self.keys
            .entry(key.menu_code)
            .or_default()
            .insert(key.year_month);
    }

    pub fn touch_details<'a>(&mut self, details: impl IntoIterator<Item = &'a SaleDetail>) {
        for detail in details {
            self.touch(detail.monthly_key());
        }
    }

    pub fn extend(&mut self, other: TouchedKeys) {
        for (menu_code, months) in other.keys {
            self.keys.entry(menu_code).or_default().extend(months);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Number of distinct menu codes.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (i64, &BTreeSet<YearMonth>)> {
        self.keys.iter().map(|(code, months)| (*code, months))
    }
}

impl FromIterator<MonthlyKey> for TouchedKeys {
    fn from_iter<I: IntoIterator<Item = MonthlyKey>>(iter: I) -> Self {
        let mut touched = Self::new();
        for key in iter {
            touched.touch(key);
        }
        touched
    }
}

/// How a stored derived row differs from the facts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftKind {
    /// Facts exist but no row is stored.
    Missing,
    /// The stored row disagrees with the facts.
    Stale,
    /// A row is stored but no valid facts back it.
    Unexpected,
}

/// One derived row found out of sync by `RollupEngine::verify`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Drift {
    pub key: DerivedKey,
    pub kind: DriftKind,
}
