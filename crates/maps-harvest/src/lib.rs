//! maps-harvest — core library for turning map-search result pages into a
//! clean restaurant table and the spreadsheet payloads that publish it.
//!
//! Everything here is synchronous and free of I/O beyond reading a saved
//! page from disk. Browser driving and the Sheets API live in
//! `maps-harvest-cli`.

pub mod clean;
pub mod extract;
pub mod layout;
pub mod types;

pub use clean::{clean, clean_with_report, CleanReport};
pub use extract::{
    card_lines, extract_listings, extract_listings_from_file, listing_from_card, read_card,
    CardMatcher, CardSelectors, RawCard,
};
pub use layout::{column_letter, format_requests, header_range, quote_sheet_title, HeaderStyle};
pub use types::*;
