//! Unified Error Taxonomy
//!
//! Each crate keeps its own error enum; they all classify into one of these
//! kinds so the HTTP layer and the queue processor can react uniformly.
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Missing or invalid API key
    Authorization,
    /// Required secret/template missing; not retried
    Configuration,
    /// Allowlist, formula, schema or domain rule violation; terminal
    Validation,
    /// 429/5xx from an upstream service after retries were exhausted
    Upstream,
    /// Another attempt owns this job id
    Conflict,
    /// The calling context gave up waiting
    Timeout,
    Internal,
}

impl ErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Authorization => "AUTH",
            ErrorKind::Configuration => "CONFIG",
            ErrorKind::Validation => "VALIDATION",
            ErrorKind::Upstream => "UPSTREAM",
            ErrorKind::Conflict => "CONFLICT",
            ErrorKind::Timeout => "TIMEOUT",
            ErrorKind::Internal => "INTERNAL",
        }
    }

    /// Whether resubmitting the same request unchanged could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, ErrorKind::Upstream | ErrorKind::Timeout)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.code())
    }
}
