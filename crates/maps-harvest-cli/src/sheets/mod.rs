//! Publishing the cleaned table to Google Sheets.

pub mod auth;
pub mod client;

use maps_harvest::{format_requests, header_range, HarvestError, HeaderStyle, ListingTable};
use serde::Serialize;
use tracing::info;

use crate::config::SheetTarget;
pub use auth::{ServiceAccountKey, TokenSource};
pub use client::{SheetsClient, Worksheet};

/// Errors from authorizing against or calling the Google APIs.
#[derive(thiserror::Error, Debug)]
pub enum SheetsError {
    #[error("Spreadsheet not found: {0}")]
    SpreadsheetNotFound(String),

    #[error("Spreadsheet {0} has no worksheets")]
    NoWorksheet(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Sheets API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid service account key: {0}")]
    Key(String),

    #[error(transparent)]
    Layout(#[from] HarvestError),
}

/// Summary of a finished upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadReport {
    pub spreadsheet_id: String,
    pub sheet_title: String,
    pub header_range: String,
    pub rows: usize,
    pub columns: usize,
    pub updated_cells: u64,
}

/// Replace the first worksheet's contents with `table` and format the header.
pub async fn upload_table(
    client: &SheetsClient,
    target: &SheetTarget,
    table: &ListingTable,
    style: &HeaderStyle,
) -> Result<UploadReport, SheetsError> {
    let spreadsheet_id = match &target.spreadsheet_id {
        Some(id) => id.clone(),
        None => client.open_by_title(&target.title).await?,
    };
    let worksheet = client.first_worksheet(&spreadsheet_id).await?;
    info!(
        "uploading to spreadsheet {spreadsheet_id}, worksheet {:?}",
        worksheet.title
    );

    let columns = table.width();
    let header = header_range(columns)?;

    client.clear(&spreadsheet_id, &worksheet.title).await?;
    let updated_cells = client
        .update_values(&spreadsheet_id, &worksheet.title, &table.to_rows())
        .await?;
    info!("raw data uploaded ({updated_cells} cells); formatting {header}");

    client
        .batch_update(
            &spreadsheet_id,
            format_requests(worksheet.sheet_id, columns, style),
        )
        .await?;

    Ok(UploadReport {
        spreadsheet_id,
        sheet_title: worksheet.title,
        header_range: header,
        rows: table.len(),
        columns,
        updated_cells,
    })
}
