//! Spreadsheet errors
use sheetplan_core::ErrorKind;
use thiserror::Error;

/// HTTP statuses worth another attempt.
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("SHEETS/upstream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("SHEETS/transport: {0}")]
    Transport(String),

    #[error("SHEETS/undecodable response: {0}")]
    Decode(String),

    #[error("SHEETS/invalid spreadsheet id '{0}'")]
    InvalidSpreadsheetId(String),

    #[error("SHEETS/gave up after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<SheetsError>,
    },
}

impl SheetsError {
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        SheetsError::Status {
            status,
            body: body.into(),
        }
    }

    /// Only rate limiting and server-side failures are retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            SheetsError::Status { status, .. } => RETRYABLE_STATUSES.contains(status),
            _ => false,
        }
    }

    pub fn http_status(&self) -> Option<u16> {
        match self {
            SheetsError::Status { status, .. } => Some(*status),
            SheetsError::RetriesExhausted { source, .. } => source.http_status(),
            _ => None,
        }
    }

    /// A rejected credential is a deployment problem and a malformed id is
    /// the caller's; everything else is the upstream's.
    pub fn kind(&self) -> ErrorKind {
        if let SheetsError::InvalidSpreadsheetId(_) = self {
            return ErrorKind::Validation;
        }
        match self.http_status() {
            Some(401) | Some(403) => ErrorKind::Configuration,
            _ => ErrorKind::Upstream,
        }
    }
}
