//! Template allowlist enforcement
//!
//! A plan may only target addresses the template pre-approved. Matching is
//! exact after normalization; there are no wildcards and no range
//! containment, so `EPS_100!B6:B7` is not covered by `EPS_100!B6`.

use crate::GuardError;
use sheetplan_core::{Template, WriteEntry};
use std::collections::HashSet;

/// Canonical form of an A1 address: trimmed, `$` markers removed, cell part
/// upper-cased, and a quoted sheet name unquoted.
pub fn normalize_address(address: &str) -> String {
    let trimmed = address.trim().replace('$', "");
    match trimmed.rsplit_once('!') {
        Some((sheet, cells)) => {
            let sheet = sheet.trim();
            let sheet = match sheet.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
                Some(inner) => inner.replace("''", "'"),
                None => sheet.to_string(),
            };
            format!("{}!{}", sheet, cells.trim().to_ascii_uppercase())
        }
        None => trimmed.to_ascii_uppercase(),
    }
}

/// Ordered set of writable addresses.
#[derive(Debug, Clone, Default)]
pub struct Allowlist {
    entries: Vec<String>,
    normalized: HashSet<String>,
}

impl Allowlist {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut list = Self::default();
        for entry in entries {
            let entry = entry.into();
            if list.normalized.insert(normalize_address(&entry)) {
                list.entries.push(entry);
            }
        }
        list
    }

    pub fn from_template(template: &Template) -> Self {
        Self::new(template.writes_allowlist.iter().cloned())
    }

    pub fn contains(&self, range: &str) -> bool {
        self.normalized.contains(&normalize_address(range))
    }

    /// Entries in declaration order, duplicates removed.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Fail on the first write whose range is not allowlisted.
pub fn check_allowlist(writes: &[WriteEntry], allowlist: &Allowlist) -> Result<(), GuardError> {
    for (index, write) in writes.iter().enumerate() {
        if write.range.trim().is_empty() {
            return Err(GuardError::EmptyRange { index });
        }
        if !allowlist.contains(&write.range) {
            return Err(GuardError::RangeNotAllowed {
                index,
                range: write.range.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn writes(ranges: &[&str]) -> Vec<WriteEntry> {
        ranges.iter().map(|r| WriteEntry::single(*r, "x")).collect()
    }

    #[test]
    fn test_normalize_address() {
        assert_eq!(normalize_address(" EPS_100!$b$6 "), "EPS_100!B6");
        assert_eq!(normalize_address("'EPS 100'!B6"), "EPS 100!B6");
        assert_eq!(normalize_address("'O''Brien'!a1:b2"), "O'Brien!A1:B2");
        assert_eq!(normalize_address("c3"), "C3");
    }

    #[test]
    fn test_reports_first_violation() {
        let allowlist = Allowlist::new(["EPS_100!B6", "EPS_100!C6"]);
        let err = check_allowlist(
            &writes(&["EPS_100!B6", "EPS_100!F3", "EPS_100!Z9"]),
            &allowlist,
        )
        .unwrap_err();
        assert_eq!(
            err,
            GuardError::RangeNotAllowed {
                index: 1,
                range: "EPS_100!F3".to_string()
            }
        );
    }

    #[test]
    fn test_equivalent_spellings_match() {
        let allowlist = Allowlist::new(["EPS_100!B6"]);
        assert!(check_allowlist(&writes(&["EPS_100!$B$6", "'EPS_100'!b6"]), &allowlist).is_ok());
    }

    #[test]
    fn test_no_containment_or_sheet_confusion() {
        let allowlist = Allowlist::new(["EPS_100!B6"]);
        assert!(check_allowlist(&writes(&["EPS_100!B6:B7"]), &allowlist).is_err());
        assert!(check_allowlist(&writes(&["EPS_150!B6"]), &allowlist).is_err());
        assert!(check_allowlist(&writes(&["B6"]), &allowlist).is_err());
    }

    #[test]
    fn test_empty_range_rejected() {
        let allowlist = Allowlist::new(["EPS_100!B6"]);
        let err = check_allowlist(&writes(&["  "]), &allowlist).unwrap_err();
        assert_eq!(err, GuardError::EmptyRange { index: 0 });
    }

    #[test]
    fn test_empty_plan_passes() {
        assert!(check_allowlist(&[], &Allowlist::default()).is_ok());
    }

    #[test]
    fn test_duplicates_collapse() {
        let allowlist = Allowlist::new(["A!B1", "A!$B$1", "A!C1"]);
        assert_eq!(allowlist.entries(), &["A!B1".to_string(), "A!C1".to_string()]);
    }
}
