use cmt_core::{AllowListProvider, PortError, SheetsConfig};

use crate::client::SheetsClient;
use crate::error::SheetsError;

/// Allow-list read from one column of a Google Sheet on every call.
pub struct SheetsAllowList {
    client: SheetsClient,
    gid: i64,
    column: String,
}

impl SheetsAllowList {
    #[must_use]
    pub fn new(client: SheetsClient, gid: i64, column: impl Into<String>) -> Self {
        Self {
            client,
            gid,
            column: column.into(),
        }
    }

    /// # Errors
    ///
    /// Returns [`SheetsError::Http`] if the HTTP client cannot be built.
    pub fn from_config(
        config: &SheetsConfig,
        timeout_secs: u64,
        max_retries: u32,
        backoff_base_ms: u64,
    ) -> Result<Self, SheetsError> {
        let client = SheetsClient::new(&config.spreadsheet_id, &config.api_key, timeout_secs)?
            .with_retry(max_retries, backoff_base_ms);
        Ok(Self::new(client, config.coupon_gid, &config.coupon_column))
    }
}

#[async_trait::async_trait]
impl AllowListProvider for SheetsAllowList {
    async fn tracked_coupons(&self) -> Result<Vec<String>, PortError> {
        let coupons = self
            .client
            .get_coupons(self.gid, &self.column)
            .await
            .map_err(|e| PortError::new("google sheets", e))?;
        tracing::info!(
            count = coupons.len(),
            gid = self.gid,
            column = %self.column,
            "loaded tracked coupons from sheet"
        );
        Ok(coupons)
    }
}
