//! Retry with exponential back-off and jitter for Sheets requests.

use std::future::Future;
use std::time::Duration;

use crate::error::SheetsError;

const TOO_MANY_REQUESTS: u16 = 429;

/// Returns `true` for errors worth retrying after a back-off delay:
/// timeouts, connect failures, 5xx and 429 responses.
///
/// Lookup failures, 4xx answers and malformed bodies are returned at once.
pub(crate) fn is_retriable(err: &SheetsError) -> bool {
    match err {
        SheetsError::Http(e) => {
            e.is_timeout()
                || e.is_connect()
                || e.status().is_some_and(|s| {
                    s.is_server_error() || s.as_u16() == TOO_MANY_REQUESTS
                })
        }
        SheetsError::Api { status, .. } => *status >= 500 || *status == TOO_MANY_REQUESTS,
        SheetsError::Deserialize { .. }
        | SheetsError::SheetNotFound(_)
        | SheetsError::ColumnNotFound { .. }
        | SheetsError::InvalidBaseUrl { .. } => false,
    }
}

/// Runs `operation` with up to `max_retries` additional attempts on
/// transient errors.
///
/// The delay before retry `n` is `backoff_base_ms × 2ⁿ⁻¹` with ±25 % jitter,
/// capped at 60 s.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_ms: u64,
    mut operation: F,
) -> Result<T, SheetsError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SheetsError>>,
{
    const MAX_DELAY_MS: u64 = 60_000;
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = backoff_base_ms.saturating_mul(1u64 << (attempt - 1).min(10));
                let capped = computed.min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "Sheets request failed, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
