//! sheetplan guard: write-plan safety checks
//!
//! Nothing proposed by the planner reaches the spreadsheet before passing
//! through this crate. Two checks run, both purely structural:
//!
//! ```text
//! plan.writes → Allowlist (first violation is fatal) ─┐
//!             → Formula scan (one error per cell)  ───┴→ ValidationResult
//! ```
//!
//! # Example
//!
//! ```
//! use sheetplan_core::WriteEntry;
//! use sheetplan_guard::{validate_writes, Allowlist};
//!
//! let allowlist = Allowlist::new(["EPS_100!B6"]);
//! let writes = vec![
//!     WriteEntry::single("EPS_100!B6", "Test"),
//!     WriteEntry::single("EPS_100!F3", "2024-01-01"),
//! ];
//!
//! let verdict = validate_writes(&writes, &allowlist);
//! assert!(!verdict.valid);
//! ```

pub mod allowlist;
pub mod formula;

pub use allowlist::{check_allowlist, normalize_address, Allowlist};
pub use formula::{check_formulas, looks_like_formula};

use sheetplan_core::{ValidationResult, WriteEntry};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GuardError {
    #[error("ALLOWLIST/range '{range}' (write #{index}) is not in the template allowlist")]
    RangeNotAllowed { index: usize, range: String },

    #[error("ALLOWLIST/write #{index} has an empty range")]
    EmptyRange { index: usize },
}

impl GuardError {
    /// The offending range, when there is one.
    pub fn range(&self) -> Option<&str> {
        match self {
            GuardError::RangeNotAllowed { range, .. } => Some(range),
            GuardError::EmptyRange { .. } => None,
        }
    }
}

/// Run the allowlist check and the formula scan over a plan's writes.
///
/// The allowlist violation, if any, comes first in `errors`; formula errors
/// follow in cell order.
pub fn validate_writes(writes: &[WriteEntry], allowlist: &Allowlist) -> ValidationResult {
    let mut result = ValidationResult::ok();
    result
        .detail("writes_checked", writes.len())
        .detail(
            "cells_checked",
            writes.iter().map(WriteEntry::cell_count).sum::<usize>(),
        );

    if let Err(err) = check_allowlist(writes, allowlist) {
        if let Some(range) = err.range() {
            result.detail("rejected_range", range.to_string());
        }
        result.error(err.to_string());
    }

    result.merge(check_formulas(writes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_clean_plan_passes() {
        let allowlist = Allowlist::new(["EPS_100!B6", "EPS_100!F3"]);
        let writes = vec![
            WriteEntry::single("EPS_100!B6", "Test"),
            WriteEntry::single("EPS_100!F3", 12.5),
        ];
        let verdict = validate_writes(&writes, &allowlist);
        assert!(verdict.valid, "{}", verdict);
        assert_eq!(verdict.details["cells_checked"], json!(2));
    }

    #[test]
    fn test_allowlist_and_formula_errors_both_reported() {
        let allowlist = Allowlist::new(["EPS_100!B6"]);
        let writes = vec![
            WriteEntry::single("EPS_100!B6", "=IMPORTXML(\"http://x\")"),
            WriteEntry::single("EPS_100!F3", "ok"),
        ];
        let verdict = validate_writes(&writes, &allowlist);
        assert!(!verdict.valid);
        assert_eq!(verdict.errors.len(), 2);
        assert!(verdict.errors[0].contains("EPS_100!F3"));
        assert!(verdict.errors[1].contains("formula"));
        assert_eq!(verdict.details["rejected_range"], json!("EPS_100!F3"));
    }
}
