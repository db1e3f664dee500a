//! Data-quality findings raised while rolling up facts.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which descriptive column of a menu item disagreed across rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionField {
    MenuName,
    Category,
}

impl fmt::Display for DimensionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MenuName => f.write_str("menu_name"),
            Self::Category => f.write_str("category"),
        }
    }
}

/// A finding attributable to one receipt line or one menu code.
///
/// Neither kind blocks the rollup: orphaned lines are excluded from every
/// total, conflicting dimensions are resolved deterministically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Diagnostic {
    /// A line item whose receipt has no `sales` row.
    ReferentialIntegrityViolation {
        receipt_number: String,
        line_number: u32,
        menu_code: i64,
    },
    /// A menu code whose rows disagree on a descriptive field.
    InconsistentDimensionData {
        menu_code: i64,
        field: DimensionField,
        /// Every distinct non-blank value seen, sorted.
        values: Vec<String>,
        resolved: String,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReferentialIntegrityViolation {
                receipt_number,
                line_number,
                menu_code,
            } => write!(
                f,
                "ReferentialIntegrityViolation: receipt {} line {} (menu_code {}) has no sale",
                receipt_number, line_number, menu_code
            ),
            Self::InconsistentDimensionData {
                menu_code,
                field,
                values,
                resolved,
            } => write!(
                f,
                "InconsistentDimensionData: menu_code {} has {} values {:?}, using '{}'",
                menu_code, field, values, resolved
            ),
        }
    }
}
