//! Deduplication and blank-name filtering.

use std::collections::HashSet;

use serde::Serialize;

use crate::types::{Listing, ListingTable};

/// Counts from one cleaning pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleanReport {
    pub scraped: usize,
    pub duplicates: usize,
    pub unnamed: usize,
    pub kept: usize,
}

/// Drop repeated names (first occurrence wins), then drop empty names.
pub fn clean(listings: Vec<Listing>) -> ListingTable {
    clean_with_report(listings).0
}

/// [`clean`], also reporting what was removed.
pub fn clean_with_report(listings: Vec<Listing>) -> (ListingTable, CleanReport) {
    let mut report = CleanReport {
        scraped: listings.len(),
        ..Default::default()
    };

    let mut seen: HashSet<String> = HashSet::with_capacity(listings.len());
    let mut kept = Vec::with_capacity(listings.len());

    for listing in listings {
        if !seen.insert(listing.name.clone()) {
            report.duplicates += 1;
            continue;
        }
        if listing.name.is_empty() {
            report.unnamed += 1;
            continue;
        }
        kept.push(listing);
    }

    report.kept = kept.len();
    (ListingTable::new(kept), report)
}
