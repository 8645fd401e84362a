//! Google Sheets REST backend
//!
//! `values:batchGet` reads unformatted values; `values:batchUpdate` writes
//! with `valueInputOption=RAW` so the service stores strings verbatim
//! instead of parsing them as formulas.

use crate::{SheetsApi, SheetsError};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use sheetplan_core::{ValueRange, WriteEntry};
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com/v4";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Error bodies are truncated to this many characters.
const MAX_ERROR_BODY: usize = 512;

#[derive(Clone)]
pub struct GoogleSheetsApi {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl GoogleSheetsApi {
    pub fn new(token: impl Into<String>) -> Result<Self, SheetsError> {
        Self::with_base_url(DEFAULT_BASE_URL, token)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, SheetsError> {
        let client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| SheetsError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    /// Spreadsheet ids are URL-safe base64; anything else would change the
    /// request path.
    fn values_url(&self, spreadsheet_id: &str, method: &str) -> Result<String, SheetsError> {
        let well_formed = !spreadsheet_id.is_empty()
            && spreadsheet_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !well_formed {
            return Err(SheetsError::InvalidSpreadsheetId(spreadsheet_id.to_string()));
        }
        Ok(format!(
            "{}/spreadsheets/{}/values:{}",
            self.base_url, spreadsheet_id, method
        ))
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, SheetsError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let body: String = body.chars().take(MAX_ERROR_BODY).collect();
        Err(SheetsError::status(status.as_u16(), body))
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchGetResponse {
    #[serde(default)]
    value_ranges: Vec<ValueRange>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchUpdateResponse {
    #[serde(default)]
    total_updated_cells: u64,
}

#[async_trait]
impl SheetsApi for GoogleSheetsApi {
    async fn batch_get(
        &self,
        spreadsheet_id: &str,
        ranges: &[String],
    ) -> Result<Vec<ValueRange>, SheetsError> {
        let mut query: Vec<(&str, &str)> = ranges.iter().map(|r| ("ranges", r.as_str())).collect();
        query.push(("valueRenderOption", "UNFORMATTED_VALUE"));
        query.push(("majorDimension", "ROWS"));

        let response = self
            .client
            .get(self.values_url(spreadsheet_id, "batchGet")?)
            .bearer_auth(&self.token)
            .query(&query)
            .send()
            .await
            .map_err(|e| SheetsError::Transport(e.to_string()))?;

        let body: BatchGetResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| SheetsError::Decode(e.to_string()))?;
        Ok(body.value_ranges)
    }

    async fn batch_update(
        &self,
        spreadsheet_id: &str,
        writes: &[WriteEntry],
    ) -> Result<u64, SheetsError> {
        let data: Vec<_> = writes
            .iter()
            .map(|w| json!({"range": w.range, "majorDimension": "ROWS", "values": w.values}))
            .collect();

        let response = self
            .client
            .post(self.values_url(spreadsheet_id, "batchUpdate")?)
            .bearer_auth(&self.token)
            .json(&json!({"valueInputOption": "RAW", "data": data}))
            .send()
            .await
            .map_err(|e| SheetsError::Transport(e.to_string()))?;

        let body: BatchUpdateResponse = Self::check(response)
            .await?
            .json()
            .await
            .map_err(|e| SheetsError::Decode(e.to_string()))?;
        Ok(body.total_updated_cells)
    }

    fn backend_name(&self) -> &str {
        "google-sheets"
    }
}
