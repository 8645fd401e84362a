//! Validation verdicts
//!
//! Every validator in the workspace returns a [`ValidationResult`]. Results
//! compose with [`ValidationResult::merge`], so callers can chain several
//! checks and test validity once at the end.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Verdict of one or more validators
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// `false` means the value set must not be applied
    pub valid: bool,
    /// Problems that make the input un-applicable
    #[serde(default)]
    pub errors: Vec<String>,
    /// Informational findings
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Computed values worth surfacing (limits, alternatives, quantities)
    #[serde(default)]
    pub details: Map<String, Value>,
}

impl ValidationResult {
    /// A passing result with nothing to report.
    pub fn ok() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
            details: Map::new(),
        }
    }

    /// A failing result carrying one error.
    pub fn fail(error: impl Into<String>) -> Self {
        let mut result = Self::ok();
        result.error(error);
        result
    }

    /// Record an error; the result becomes invalid.
    pub fn error(&mut self, message: impl Into<String>) -> &mut Self {
        self.valid = false;
        self.errors.push(message.into());
        self
    }

    pub fn warn(&mut self, message: impl Into<String>) -> &mut Self {
        self.warnings.push(message.into());
        self
    }

    pub fn detail(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.detail(key, value);
        self
    }

    pub fn with_warning(mut self, message: impl Into<String>) -> Self {
        self.warn(message);
        self
    }

    /// Combine two results: any failure propagates, lists concatenate in
    /// order and later details overwrite earlier ones with the same key.
    pub fn merge(mut self, other: ValidationResult) -> ValidationResult {
        self.valid = self.valid && other.valid;
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
        self.details.extend(other.details);
        self
    }

    pub fn merge_all(results: impl IntoIterator<Item = ValidationResult>) -> ValidationResult {
        results.into_iter().fold(Self::ok(), Self::merge)
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// One-line summary, used in audit data and error messages.
    pub fn summary(&self) -> String {
        if self.valid {
            format!("VALID ({} warnings)", self.warnings.len())
        } else {
            format!("INVALID: {}", self.errors.join("; "))
        }
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::ok()
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_is_valid() {
        let result = ValidationResult::ok();
        assert!(result.valid);
        assert!(result.errors.is_empty());
        assert!(!result.has_warnings());
    }

    #[test]
    fn test_error_invalidates() {
        let mut result = ValidationResult::ok();
        result.warn("close to the limit");
        assert!(result.valid);
        result.error("over the limit");
        assert!(!result.valid);
        assert_eq!(result.errors, vec!["over the limit".to_string()]);
    }

    #[test]
    fn test_merge_propagates_failure() {
        let good = ValidationResult::ok().with_warning("w1");
        let bad = ValidationResult::fail("e1").with_detail("max", 5.5);

        let merged = good.clone().merge(bad.clone());
        assert!(!merged.valid);
        assert_eq!(merged.errors, vec!["e1".to_string()]);
        assert_eq!(merged.warnings, vec!["w1".to_string()]);
        assert_eq!(merged.details["max"], serde_json::json!(5.5));

        // order of merging does not change validity
        assert!(!bad.merge(good).valid);
    }

    #[test]
    fn test_merge_all() {
        let merged = ValidationResult::merge_all(vec![
            ValidationResult::ok(),
            ValidationResult::fail("a"),
            ValidationResult::fail("b"),
        ]);
        assert!(!merged.valid);
        assert_eq!(merged.errors, vec!["a".to_string(), "b".to_string()]);
        assert!(ValidationResult::merge_all(Vec::new()).valid);
    }

    #[test]
    fn test_summary() {
        assert_eq!(ValidationResult::ok().summary(), "VALID (0 warnings)");
        assert!(ValidationResult::fail("bad range").to_string().contains("bad range"));
    }
}
