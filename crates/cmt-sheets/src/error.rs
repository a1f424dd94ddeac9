use thiserror::Error;

/// Errors returned by the Google Sheets client.
#[derive(Debug, Error)]
pub enum SheetsError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-2xx status.
    #[error("Sheets API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The response body could not be deserialized into the expected type.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("sheet with gid {0} not found")]
    SheetNotFound(i64),

    #[error("column '{column}' not found in sheet '{sheet}'")]
    ColumnNotFound { column: String, sheet: String },

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}
