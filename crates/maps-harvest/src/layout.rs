//! A1 notation helpers and `batchUpdate` request bodies for the header
//! formatting applied after upload.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::types::{HarvestError, HarvestResult};

/// Zero-based column index to A1 letters (`0 → A`, `26 → AA`).
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Range covering the header row, e.g. `A1:G1` for seven columns.
pub fn header_range(columns: usize) -> HarvestResult<String> {
    if columns == 0 {
        return Err(HarvestError::InvalidRange(
            "header needs at least one column".to_string(),
        ));
    }
    Ok(format!("A1:{}1", column_letter(columns - 1)))
}

/// Quote a sheet title for use in an A1 range.
pub fn quote_sheet_title(title: &str) -> String {
    format!("'{}'", title.replace('\'', "''"))
}

/// Styling for the header row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderStyle {
    /// Background as `(red, green, blue)` in `[0.0, 1.0]`.
    pub background: (f64, f64, f64),
    pub bold: bool,
    pub font_size: u32,
    pub horizontal_alignment: String,
}

impl Default for HeaderStyle {
    fn default() -> Self {
        Self {
            background: (0.85, 0.85, 0.85),
            bold: true,
            font_size: 11,
            horizontal_alignment: "CENTER".to_string(),
        }
    }
}

impl HeaderStyle {
    fn user_entered_format(&self) -> Value {
        let (red, green, blue) = self.background;
        json!({
            "backgroundColor": { "red": red, "green": green, "blue": blue },
            "textFormat": { "bold": self.bold, "fontSize": self.font_size },
            "horizontalAlignment": self.horizontal_alignment,
        })
    }
}

/// Freeze row 1, style the header cells, and auto-size the used columns.
pub fn format_requests(sheet_id: i64, columns: usize, style: &HeaderStyle) -> Vec<Value> {
    vec![
        json!({
            "updateSheetProperties": {
                "properties": {
                    "sheetId": sheet_id,
                    "gridProperties": { "frozenRowCount": 1 }
                },
                "fields": "gridProperties.frozenRowCount"
            }
        }),
        json!({
            "repeatCell": {
                "range": {
                    "sheetId": sheet_id,
                    "startRowIndex": 0,
                    "endRowIndex": 1,
                    "startColumnIndex": 0,
                    "endColumnIndex": columns
                },
                "cell": { "userEnteredFormat": style.user_entered_format() },
                "fields": "userEnteredFormat(backgroundColor,textFormat,horizontalAlignment)"
            }
        }),
        json!({
            "autoResizeDimensions": {
                "dimensions": {
                    "sheetId": sheet_id,
                    "dimension": "COLUMNS",
                    "startIndex": 0,
                    "endIndex": columns
                }
            }
        }),
    ]
}
