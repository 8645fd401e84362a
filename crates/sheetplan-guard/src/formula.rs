//! Formula-injection scan
//!
//! Every cell of every write is inspected, not only the first cell of each
//! entry. A string whose first non-whitespace character is `=` counts as a
//! formula.

use serde_json::Value;
use sheetplan_core::{ValidationResult, WriteEntry};

const PREVIEW_CHARS: usize = 40;

pub fn looks_like_formula(value: &Value) -> bool {
    match value {
        Value::String(s) => s.trim_start().starts_with('='),
        _ => false,
    }
}

/// One error per formula-shaped cell, positions 1-based.
pub fn check_formulas(writes: &[WriteEntry]) -> ValidationResult {
    let mut result = ValidationResult::ok();
    let mut offending = 0usize;

    for write in writes {
        for (row, col, value) in write.cells() {
            if looks_like_formula(value) {
                offending += 1;
                result.error(format!(
                    "FORMULA/formula-shaped value in {} at row {}, col {}: {}",
                    write.range,
                    row + 1,
                    col + 1,
                    preview(value)
                ));
            }
        }
    }

    if offending > 0 {
        result.detail("formula_cells", offending);
    }
    result
}

fn preview(value: &Value) -> String {
    let text = value.as_str().unwrap_or_default();
    if text.chars().count() > PREVIEW_CHARS {
        let cut: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{}…", cut)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_detects_formula_shapes() {
        assert!(looks_like_formula(&json!("=1+1")));
        assert!(looks_like_formula(&json!("   =HYPERLINK(\"x\")")));
        assert!(!looks_like_formula(&json!("1=1")));
        assert!(!looks_like_formula(&json!("total = 5")));
        assert!(!looks_like_formula(&json!(5)));
        assert!(!looks_like_formula(&json!(null)));
    }

    #[test]
    fn test_scans_every_cell() {
        // Formula hidden in the last cell of the second row.
        let writes = vec![
            WriteEntry::single("S!A1", "ok"),
            WriteEntry::new(
                "S!B2:D3",
                vec![
                    vec![json!("a"), json!(1), json!(true)],
                    vec![json!("b"), json!(2), json!("=SUM(A1:A9)")],
                ],
            ),
        ];
        let result = check_formulas(&writes);
        assert!(!result.valid);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].contains("S!B2:D3 at row 2, col 3"));
        assert_eq!(result.details["formula_cells"], json!(1));
    }

    #[test]
    fn test_one_error_per_cell() {
        let writes = vec![WriteEntry::new(
            "S!A1:B1",
            vec![vec![json!("=A"), json!("=B")]],
        )];
        assert_eq!(check_formulas(&writes).errors.len(), 2);
    }

    #[test]
    fn test_long_values_are_truncated() {
        let long = format!("={}", "x".repeat(100));
        let result = check_formulas(&[WriteEntry::single("S!A1", long)]);
        assert!(result.errors[0].ends_with('…'));
    }
}
