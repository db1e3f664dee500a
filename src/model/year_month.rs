//! Calendar month bucket used to key monthly rollups.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A calendar month, rendered as `YYYY-MM`.
///
/// Years are limited to `0000..=9999` so the rendered form always parses
/// back and its lexical order matches the chronological order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

/// Error returned when a `YYYY-MM` string cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid year_month '{0}', expected YYYY-MM")]
pub struct ParseYearMonthError(pub String);

impl YearMonth {
    pub const MIN_YEAR: i32 = 0;
    pub const MAX_YEAR: i32 = 9999;

    /// Build a month bucket, returning `None` when `month` is outside 1..=12
    /// or `year` is outside `MIN_YEAR..=MAX_YEAR`.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        let valid = (1..=12).contains(&month) && (Self::MIN_YEAR..=Self::MAX_YEAR).contains(&year);
        valid.then_some(Self { year, month })
    }

    /// The month bucket a fact timestamp falls into, or `None` when its year
    /// has no `YYYY-MM` form.
    pub fn checked_of(datetime: &NaiveDateTime) -> Option<Self> {
        Self::new(datetime.year(), datetime.month())
    }

    /// The month bucket a fact timestamp falls into.
    ///
    /// Facts are range-checked at ingestion, see [`YearMonth::checked_of`].
    pub fn of(datetime: &NaiveDateTime) -> Self {
        Self {
            year: datetime.year(),
            month: datetime.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for YearMonth {
    type Err = ParseYearMonthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseYearMonthError(s.to_string());
        let (year, month) = s.split_once('-').ok_or_else(err)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(err());
        }
        let year: i32 = year.parse().map_err(|_| err())?;
        let month: u32 = month.parse().map_err(|_| err())?;
        Self::new(year, month).ok_or_else(err)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for YearMonth {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
