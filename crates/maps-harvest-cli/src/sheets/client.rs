//! Thin async client over the Sheets v4 and Drive v3 REST endpoints used by
//! the upload.

use std::time::Duration;

use reqwest::{Method, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::auth::TokenSource;
use super::SheetsError;
use maps_harvest::quote_sheet_title;

pub const SHEETS_BASE_URL: &str = "https://sheets.googleapis.com/v4";
pub const DRIVE_BASE_URL: &str = "https://www.googleapis.com/drive/v3";

const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";

/// A worksheet (tab) inside a spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Worksheet {
    pub sheet_id: i64,
    pub title: String,
}

#[derive(Debug, Deserialize)]
struct FileList {
    #[serde(default)]
    files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
struct DriveFile {
    id: String,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMeta {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetProperties {
    sheet_id: i64,
    title: String,
    #[serde(default)]
    index: i64,
}

#[derive(Debug, Deserialize)]
struct GoogleErrorBody {
    error: GoogleError,
}

#[derive(Debug, Deserialize)]
struct GoogleError {
    message: String,
}

/// Authorized client for one upload session.
#[derive(Clone)]
pub struct SheetsClient {
    http: reqwest::Client,
    token: String,
    sheets_base: String,
    drive_base: String,
}

impl SheetsClient {
    /// Client with an already-issued bearer token.
    pub fn new(token: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            http,
            token: token.into(),
            sheets_base: SHEETS_BASE_URL.to_string(),
            drive_base: DRIVE_BASE_URL.to_string(),
        }
    }

    /// Obtain a token from `source` and build a client around it.
    pub async fn authorize(source: &TokenSource) -> Result<Self, SheetsError> {
        let mut client = Self::new(String::new());
        client.token = source.access_token(&client.http).await?;
        Ok(client)
    }

    /// Point the client at alternate API roots.
    pub fn with_base_urls(mut self, sheets_base: &str, drive_base: &str) -> Self {
        self.sheets_base = sheets_base.trim_end_matches('/').to_string();
        self.drive_base = drive_base.trim_end_matches('/').to_string();
        self
    }

    /// Find a spreadsheet the account can see by its exact title.
    pub async fn open_by_title(&self, title: &str) -> Result<String, SheetsError> {
        let query = format!(
            "name = '{}' and mimeType = '{SPREADSHEET_MIME}' and trashed = false",
            title.replace('\\', "\\\\").replace('\'', "\\'")
        );
        let url = endpoint(&self.drive_base, &["files"])?;
        let req = self.http.get(url).query(&[
            ("q", query.as_str()),
            ("fields", "files(id,name)"),
            ("supportsAllDrives", "true"),
            ("includeItemsFromAllDrives", "true"),
        ]);

        let list: FileList = self.send(req).await?;
        list.files
            .into_iter()
            .next()
            .map(|f| f.id)
            .ok_or_else(|| SheetsError::SpreadsheetNotFound(title.to_string()))
    }

    /// The first worksheet by tab order.
    pub async fn first_worksheet(&self, spreadsheet_id: &str) -> Result<Worksheet, SheetsError> {
        let url = endpoint(&self.sheets_base, &["spreadsheets", spreadsheet_id])?;
        let req = self
            .http
            .get(url)
            .query(&[("fields", "sheets.properties(sheetId,title,index)")]);

        let meta: SpreadsheetMeta = self.send(req).await?;
        meta.sheets
            .into_iter()
            .map(|s| s.properties)
            .min_by_key(|p| p.index)
            .map(|p| Worksheet {
                sheet_id: p.sheet_id,
                title: p.title,
            })
            .ok_or_else(|| SheetsError::NoWorksheet(spreadsheet_id.to_string()))
    }

    /// Clear every value on the worksheet, keeping formatting.
    pub async fn clear(&self, spreadsheet_id: &str, sheet_title: &str) -> Result<(), SheetsError> {
        let segment = format!("{}:clear", quote_sheet_title(sheet_title));
        let url = endpoint(
            &self.sheets_base,
            &["spreadsheets", spreadsheet_id, "values", segment.as_str()],
        )?;
        let _: Value = self.send(self.http.post(url).json(&json!({}))).await?;
        Ok(())
    }

    /// Write `rows` starting at `A1`, values stored as given.
    pub async fn update_values(
        &self,
        spreadsheet_id: &str,
        sheet_title: &str,
        rows: &[Vec<String>],
    ) -> Result<u64, SheetsError> {
        let range = format!("{}!A1", quote_sheet_title(sheet_title));
        let url = endpoint(
            &self.sheets_base,
            &["spreadsheets", spreadsheet_id, "values", range.as_str()],
        )?;
        let body = json!({
            "range": range,
            "majorDimension": "ROWS",
            "values": rows,
        });
        let req = self
            .http
            .request(Method::PUT, url)
            .query(&[("valueInputOption", "RAW")])
            .json(&body);

        let resp: Value = self.send(req).await?;
        Ok(resp["updatedCells"].as_u64().unwrap_or(0))
    }

    /// Apply structural/formatting requests in one call.
    pub async fn batch_update(
        &self,
        spreadsheet_id: &str,
        requests: Vec<Value>,
    ) -> Result<(), SheetsError> {
        let segment = format!("{spreadsheet_id}:batchUpdate");
        let url = endpoint(&self.sheets_base, &["spreadsheets", segment.as_str()])?;
        let _: Value = self
            .send(self.http.post(url).json(&json!({ "requests": requests })))
            .await?;
        Ok(())
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<T, SheetsError> {
        let resp = req.bearer_auth(&self.token).send().await?;
        let status = resp.status();
        debug!("{} {}", status.as_u16(), resp.url().path());

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GoogleErrorBody>(&body)
                .map(|b| b.error.message)
                .unwrap_or(body);
            return Err(SheetsError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(resp.json().await?)
    }
}

/// Join path segments onto `base`, percent-encoding each one.
fn endpoint(base: &str, segments: &[&str]) -> Result<Url, SheetsError> {
    let mut url = Url::parse(base).map_err(|e| SheetsError::Api {
        status: 0,
        message: format!("invalid base URL {base}: {e}"),
    })?;
    url.path_segments_mut()
        .map_err(|_| SheetsError::Api {
            status: 0,
            message: format!("base URL {base} cannot take a path"),
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
