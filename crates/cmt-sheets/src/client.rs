//! HTTP client for the Google Sheets v4 REST API.
//!
//! Reads a single column out of a sheet identified by its gid, authenticating
//! with an API key. Spreadsheet metadata is fetched once per client.

use std::time::Duration;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;

use crate::error::SheetsError;
use crate::retry::retry_with_backoff;
use crate::types::{cell_text, SpreadsheetMetadata, ValueRange};

const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com/";
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_BACKOFF_BASE_MS: u64 = 1_000;

/// Path-segment encoding; A1 ranges carry quotes, `!` and `:`.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Client for one spreadsheet.
///
/// Use [`SheetsClient::new`] for production or [`SheetsClient::with_base_url`]
/// to point at a mock server in tests.
pub struct SheetsClient {
    client: Client,
    api_key: String,
    spreadsheet_id: String,
    base_url: Url,
    max_retries: u32,
    backoff_base_ms: u64,
    metadata: OnceCell<SpreadsheetMetadata>,
}

impl SheetsClient {
    /// # Errors
    ///
    /// Returns [`SheetsError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        spreadsheet_id: &str,
        api_key: &str,
        timeout_secs: u64,
    ) -> Result<Self, SheetsError> {
        Self::with_base_url(spreadsheet_id, api_key, timeout_secs, DEFAULT_BASE_URL)
    }

    /// # Errors
    ///
    /// Returns [`SheetsError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`SheetsError::InvalidBaseUrl`] if
    /// `base_url` does not parse.
    pub fn with_base_url(
        spreadsheet_id: &str,
        api_key: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, SheetsError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("coupon-mention-tracker/0.1")
            .build()?;

        // Exactly one trailing slash, so `join` appends instead of replacing
        // the last path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| SheetsError::InvalidBaseUrl {
            url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            spreadsheet_id: spreadsheet_id.to_owned(),
            base_url,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base_ms: DEFAULT_BACKOFF_BASE_MS,
            metadata: OnceCell::new(),
        })
    }

    /// Override the retry budget for transient failures.
    #[must_use]
    pub fn with_retry(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    /// Title of the sheet whose `sheetId` is `gid`, or `None`.
    ///
    /// # Errors
    ///
    /// Returns [`SheetsError`] if the metadata request fails.
    pub async fn sheet_title_by_gid(&self, gid: i64) -> Result<Option<String>, SheetsError> {
        let metadata = self.metadata().await?;
        Ok(metadata.sheet_title(gid).map(str::to_owned))
    }

    /// Zero-based position of `column_name` in the sheet's header row.
    ///
    /// # Errors
    ///
    /// Returns [`SheetsError`] if the values request fails.
    pub async fn column_index_by_name(
        &self,
        sheet_title: &str,
        column_name: &str,
    ) -> Result<Option<usize>, SheetsError> {
        let header = self.get_values(&format!("'{sheet_title}'!1:1")).await?;
        Ok(header.values.first().and_then(|cells| {
            cells
                .iter()
                .position(|cell| cell_text(cell).as_deref() == Some(column_name))
        }))
    }

    /// Non-empty, trimmed values of the first cell of each row in a column.
    ///
    /// # Errors
    ///
    /// - [`SheetsError::SheetNotFound`] if no sheet has `gid`.
    /// - [`SheetsError::ColumnNotFound`] if the header row lacks `column_name`.
    /// - [`SheetsError::Http`] / [`SheetsError::Api`] on request failure after
    ///   retries.
    pub async fn get_column_values_by_gid_and_name(
        &self,
        gid: i64,
        column_name: &str,
        skip_header: bool,
    ) -> Result<Vec<String>, SheetsError> {
        let sheet_title = self
            .sheet_title_by_gid(gid)
            .await?
            .ok_or(SheetsError::SheetNotFound(gid))?;

        let column_index = self
            .column_index_by_name(&sheet_title, column_name)
            .await?
            .ok_or_else(|| SheetsError::ColumnNotFound {
                column: column_name.to_owned(),
                sheet: sheet_title.clone(),
            })?;

        let letter = column_index_to_letter(column_index);
        let start_row = if skip_header { 2 } else { 1 };
        let range = format!("'{sheet_title}'!{letter}{start_row}:{letter}");

        let values = self.get_values(&range).await.inspect_err(|e| {
            tracing::error!(
                range = %range,
                spreadsheet_id = %self.spreadsheet_id,
                error = %e,
                "failed to fetch column values"
            );
        })?;

        Ok(values
            .values
            .iter()
            .filter_map(|row| row.first().and_then(cell_text))
            .map(|v| v.trim().to_owned())
            .filter(|v| !v.is_empty())
            .collect())
    }

    /// Coupon codes from the given sheet column, header skipped.
    ///
    /// # Errors
    ///
    /// See [`SheetsClient::get_column_values_by_gid_and_name`].
    pub async fn get_coupons(
        &self,
        gid: i64,
        column_name: &str,
    ) -> Result<Vec<String>, SheetsError> {
        self.get_column_values_by_gid_and_name(gid, column_name, true)
            .await
    }

    async fn metadata(&self) -> Result<&SpreadsheetMetadata, SheetsError> {
        self.metadata
            .get_or_try_init(|| async move {
                let url = self.build_url(&[], &[("fields", "sheets.properties")])?;
                self.request_json(&url, "spreadsheet metadata").await
            })
            .await
    }

    async fn get_values(&self, range: &str) -> Result<ValueRange, SheetsError> {
        let url = self.build_url(&["values", range], &[])?;
        self.request_json(&url, range).await
    }

    /// `{base}/v4/spreadsheets/{id}[/{segment}...]?key=...` with every path
    /// segment percent-encoded.
    fn build_url(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url, SheetsError> {
        let mut path = format!(
            "v4/spreadsheets/{}",
            utf8_percent_encode(&self.spreadsheet_id, SEGMENT)
        );
        for segment in segments {
            path.push('/');
            path.extend(utf8_percent_encode(segment, SEGMENT));
        }

        let mut url = self
            .base_url
            .join(&path)
            .map_err(|e| SheetsError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in query {
                pairs.append_pair(k, v);
            }
            pairs.append_pair("key", &self.api_key);
        }
        Ok(url)
    }

    /// GET `url` with retries and decode the body.
    ///
    /// # Errors
    ///
    /// Returns [`SheetsError::Api`] for a non-2xx status, carrying the API's
    /// error message when present, and [`SheetsError::Deserialize`] for an
    /// unexpected body.
    async fn request_json<T: DeserializeOwned>(
        &self,
        url: &Url,
        context: &str,
    ) -> Result<T, SheetsError> {
        let body = retry_with_backoff(self.max_retries, self.backoff_base_ms, || async move {
            let response = self.client.get(url.clone()).send().await?;
            let status = response.status();
            let text = response.text().await?;
            if !status.is_success() {
                return Err(SheetsError::Api {
                    status: status.as_u16(),
                    message: api_error_message(&text),
                });
            }
            Ok(text)
        })
        .await?;

        serde_json::from_str(&body).map_err(|e| SheetsError::Deserialize {
            context: context.to_owned(),
            source: e,
        })
    }
}

/// `error.message` from a Google API error body, or the raw body.
fn api_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .and_then(|e| e.get("message"))
                .and_then(serde_json::Value::as_str)
                .map(str::to_owned)
        })
        .unwrap_or_else(|| body.to_owned())
}

/// Spreadsheet column letters for a zero-based index: 0 → `A`, 25 → `Z`,
/// 26 → `AA`.
#[must_use]
pub fn column_index_to_letter(index: usize) -> String {
    let mut letters = Vec::new();
    let mut n = index + 1;
    while n > 0 {
        n -= 1;
        #[allow(clippy::cast_possible_truncation)]
        letters.push(char::from(b'A' + (n % 26) as u8));
        n /= 26;
    }
    letters.iter().rev().collect()
}

#[cfg(test)]
#[path = "client_test.rs"]
mod tests;
