//! maps-harvest — scrape restaurant listings from a map search and publish
//! them to Google Sheets.
//!
//! This library crate exposes the pipeline stages for the binary and for
//! integration testing.

pub mod cli;
pub mod config;
pub mod renderer;
pub mod scrape;
pub mod sheets;

pub use config::{HarvestConfig, SheetTarget};
pub use scrape::{scrape, scrape_with, ScrapeOutput};
pub use sheets::{upload_table, SheetsClient, SheetsError, TokenSource, UploadReport};
