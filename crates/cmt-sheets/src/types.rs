//! Response shapes for the Sheets v4 endpoints the client calls. Only the
//! fields read are modelled.

use serde::Deserialize;
use serde_json::Value;

/// `GET /v4/spreadsheets/{id}?fields=sheets.properties`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpreadsheetMetadata {
    #[serde(default)]
    pub sheets: Vec<Sheet>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Sheet {
    pub properties: SheetProperties,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetProperties {
    pub sheet_id: i64,
    #[serde(default)]
    pub title: String,
}

/// `GET /v4/spreadsheets/{id}/values/{range}`
///
/// Trailing empty rows and cells are omitted by the API, so rows can be
/// shorter than the range or empty.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ValueRange {
    #[serde(default)]
    pub range: Option<String>,
    #[serde(default)]
    pub values: Vec<Vec<Value>>,
}

impl SpreadsheetMetadata {
    #[must_use]
    pub fn sheet_title(&self, gid: i64) -> Option<&str> {
        self.sheets
            .iter()
            .find(|s| s.properties.sheet_id == gid)
            .map(|s| s.properties.title.as_str())
    }
}

/// Display text of a cell. Numbers and booleans are stringified.
#[must_use]
pub fn cell_text(cell: &Value) -> Option<String> {
    match cell {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
