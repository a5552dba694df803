//! Core data types for scraped listings.

use serde::{Deserialize, Serialize};

/// Sheet header, in column order.
pub const COLUMNS: [&str; 7] = [
    "Nama Restoran",
    "Rating",
    "Review",
    "Kategori",
    "Harga",
    "Link Maps",
    "Status",
];

pub const RATING_MISSING: &str = "N/A";
pub const REVIEWS_MISSING: &str = "0";
pub const CATEGORY_MISSING: &str = "Unknown";
pub const PRICE_MISSING: &str = "N/A";
pub const STATUS_ACTIVE: &str = "Active";

/// One restaurant row as it will appear in the sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    pub name: String,
    pub rating: String,
    pub reviews: String,
    pub category: String,
    pub price: String,
    pub link: String,
    pub status: String,
}

impl Listing {
    /// Cells in [`COLUMNS`] order.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.rating.clone(),
            self.reviews.clone(),
            self.category.clone(),
            self.price.clone(),
            self.link.clone(),
            self.status.clone(),
        ]
    }
}

/// Cleaned, ordered set of listings ready for upload.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingTable {
    rows: Vec<Listing>,
}

impl ListingTable {
    pub fn new(rows: Vec<Listing>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of columns every row carries.
    pub fn width(&self) -> usize {
        COLUMNS.len()
    }

    /// The first `n` listings (fewer if the table is shorter).
    pub fn head(&self, n: usize) -> &[Listing] {
        &self.rows[..n.min(self.rows.len())]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Listing> {
        self.rows.iter()
    }

    /// Header row followed by one row per listing.
    pub fn to_rows(&self) -> Vec<Vec<String>> {
        let mut out = Vec::with_capacity(self.rows.len() + 1);
        out.push(COLUMNS.iter().map(|c| c.to_string()).collect());
        out.extend(self.rows.iter().map(Listing::to_row));
        out
    }
}

impl<'a> IntoIterator for &'a ListingTable {
    type Item = &'a Listing;
    type IntoIter = std::slice::Iter<'a, Listing>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Errors that can occur in the harvest library.
#[derive(thiserror::Error, Debug)]
pub enum HarvestError {
    #[error("Invalid selector `{selector}`: {message}")]
    Selector { selector: String, message: String },

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type.
pub type HarvestResult<T> = Result<T, HarvestError>;
