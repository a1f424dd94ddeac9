//! Google Sheets access for the tracked-coupon allow-list.

pub mod allow_list;
pub mod client;
pub mod error;
pub(crate) mod retry;
pub mod types;

pub use allow_list::SheetsAllowList;
pub use client::{column_index_to_letter, SheetsClient};
pub use error::SheetsError;
pub use types::{cell_text, Sheet, SheetProperties, SpreadsheetMetadata, ValueRange};
