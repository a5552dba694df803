//! CSS-class based listing extractor for rendered map-search HTML.
//!
//! The result feed renders one card per place. Each card carries a link
//! element (name in `aria-label`, URL in `href`), optional rating and
//! review-count elements, and a few lines of free text whose second line
//! holds `·`-separated metadata such as category and price band.
//!
//! Extraction is two-step: [`read_card`] records the DOM facts of one card
//! as a [`RawCard`], and [`listing_from_card`] applies the fixed fallbacks.
//! Everything is synchronous because `scraper` types are `!Send`; async
//! callers should run it under `tokio::task::spawn_blocking`.

use std::path::Path;

use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use crate::types::{
    HarvestError, HarvestResult, Listing, CATEGORY_MISSING, PRICE_MISSING, RATING_MISSING,
    REVIEWS_MISSING, STATUS_ACTIVE,
};

/// Tags whose content starts on a new rendered line.
const BLOCK_TAGS: &[&str] = &[
    "div", "p", "li", "ul", "ol", "section", "article", "header", "footer", "h1", "h2", "h3",
    "h4", "h5", "h6", "table", "tr",
];

/// Tags whose text never renders.
const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Class names identifying each piece of a result card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSelectors {
    pub card: String,
    pub link: String,
    pub rating: String,
    pub reviews: String,
}

impl Default for CardSelectors {
    fn default() -> Self {
        Self {
            card: "Nv2PK".to_string(),
            link: "hfpxzc".to_string(),
            rating: "MW4etd".to_string(),
            reviews: "UY7F9".to_string(),
        }
    }
}

/// Compiled form of [`CardSelectors`].
#[derive(Debug, Clone)]
pub struct CardMatcher {
    card: Selector,
    link: Selector,
    rating: Selector,
    reviews: Selector,
}

impl CardMatcher {
    pub fn compile(selectors: &CardSelectors) -> HarvestResult<Self> {
        Ok(Self {
            card: class_selector(&selectors.card)?,
            link: class_selector(&selectors.link)?,
            rating: class_selector(&selectors.rating)?,
            reviews: class_selector(&selectors.reviews)?,
        })
    }
}

fn class_selector(class: &str) -> HarvestResult<Selector> {
    let css = format!(".{}", class.trim());
    Selector::parse(&css).map_err(|e| HarvestError::Selector {
        selector: css.clone(),
        message: e.to_string(),
    })
}

/// DOM facts read off a single card before any fallback is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawCard {
    /// `aria-label` of the link element.
    pub name: Option<String>,
    /// `href` of the link element.
    pub link: Option<String>,
    /// Text of the rating element, when present.
    pub rating: Option<String>,
    /// Text of the review-count element, when present.
    pub reviews: Option<String>,
    /// Visible text of the card, one entry per rendered line.
    pub lines: Vec<String>,
}

/// Extract every listing from a rendered results page.
///
/// Cards without a link element are skipped.
pub fn extract_listings(html: &str, selectors: &CardSelectors) -> HarvestResult<Vec<Listing>> {
    let matcher = CardMatcher::compile(selectors)?;
    let document = Html::parse_document(html);

    let mut cards = 0usize;
    let listings: Vec<Listing> = document
        .select(&matcher.card)
        .inspect(|_| cards += 1)
        .filter_map(|card| read_card(card, &matcher))
        .map(listing_from_card)
        .collect();

    tracing::debug!(cards, listings = listings.len(), "extracted result cards");
    Ok(listings)
}

/// Read a saved page from disk and extract its listings.
pub fn extract_listings_from_file(
    path: &Path,
    selectors: &CardSelectors,
) -> HarvestResult<Vec<Listing>> {
    let html = std::fs::read_to_string(path)?;
    extract_listings(&html, selectors)
}

/// Record the DOM facts of one card. `None` when the card has no link.
pub fn read_card(card: ElementRef<'_>, matcher: &CardMatcher) -> Option<RawCard> {
    let link = card.select(&matcher.link).next()?;

    Some(RawCard {
        name: link.value().attr("aria-label").map(str::to_string),
        link: link.value().attr("href").map(str::to_string),
        rating: card.select(&matcher.rating).next().map(visible_text),
        reviews: card.select(&matcher.reviews).next().map(visible_text),
        lines: card_lines(card),
    })
}

/// Apply the fixed fallbacks to a card.
pub fn listing_from_card(card: RawCard) -> Listing {
    let rating = card
        .rating
        .map(|r| r.trim().to_string())
        .unwrap_or_else(|| RATING_MISSING.to_string());

    let reviews = card
        .reviews
        .map(|r| r.replace(['(', ')'], "").trim().to_string())
        .unwrap_or_else(|| REVIEWS_MISSING.to_string());

    let metadata = card.lines.get(1).map(String::as_str).unwrap_or("");
    let (category, price) = parse_metadata(metadata);

    Listing {
        name: card.name.unwrap_or_default(),
        rating,
        reviews,
        category,
        price,
        link: card.link.unwrap_or_default(),
        status: STATUS_ACTIVE.to_string(),
    }
}

/// Split the metadata line into `(category, price)`.
fn parse_metadata(metadata: &str) -> (String, String) {
    let mut parts: Vec<&str> = metadata.split('·').collect();
    if parts.len() < 2 {
        parts = metadata.split('•').collect();
    }

    let category = parts
        .get(1)
        .map(|c| c.trim().to_string())
        .unwrap_or_else(|| CATEGORY_MISSING.to_string());

    let price = parts
        .iter()
        .find(|p| p.contains("Rp") || p.contains('$'))
        .map(|p| p.trim().to_string())
        .unwrap_or_else(|| PRICE_MISSING.to_string());

    (category, price)
}

/// Approximate the rendered text lines of a card.
///
/// Walks the card in document order the way `innerText` lays text out: a
/// block boundary or a `<br>` ends the current line, inline text is
/// concatenated, and whitespace is collapsed. Empty lines are dropped.
pub fn card_lines(card: ElementRef<'_>) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    collect_lines(card, &mut current, &mut lines);
    end_line(&mut current, &mut lines);
    lines
}

fn collect_lines(el: ElementRef<'_>, current: &mut String, lines: &mut Vec<String>) {
    for child in el.children() {
        if let Some(text) = child.value().as_text() {
            current.push_str(text);
            continue;
        }
        let Some(child) = ElementRef::wrap(child) else {
            continue;
        };
        if is_hidden(&child) {
            continue;
        }
        if child.value().name() == "br" {
            end_line(current, lines);
        } else if is_block(&child) {
            end_line(current, lines);
            collect_lines(child, current, lines);
            end_line(current, lines);
        } else {
            collect_lines(child, current, lines);
        }
    }
}

fn end_line(current: &mut String, lines: &mut Vec<String>) {
    let line = current.split_whitespace().collect::<Vec<_>>().join(" ");
    if !line.is_empty() {
        lines.push(line);
    }
    current.clear();
}

fn is_block(el: &ElementRef<'_>) -> bool {
    BLOCK_TAGS.contains(&el.value().name())
}

fn is_hidden(el: &ElementRef<'_>) -> bool {
    HIDDEN_TAGS.contains(&el.value().name())
}

/// Text of an element minus hidden subtrees, whitespace collapsed.
fn visible_text(el: ElementRef<'_>) -> String {
    let mut raw = String::new();
    for node in el.descendants() {
        if let Some(text) = node.value().as_text() {
            let hidden = node
                .ancestors()
                .filter_map(ElementRef::wrap)
                .take_while(|a| a.id() != el.id())
                .any(|a| is_hidden(&a));
            if !hidden {
                raw.push_str(text);
            }
        }
    }
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
    <html><body>
      <div role="feed" aria-label="Hasil untuk restoran di jakarta barat">
        <div class="Nv2PK">
          <a class="hfpxzc" aria-label="Bakmi GM" href="https://maps.example/place/bakmi-gm"></a>
          <div class="qBF1Pd">Bakmi GM</div>
          <div class="W4Efsd"><span class="MW4etd">4.6</span><span class="UY7F9">(2.345)</span> · Restoran Mi · Rp 50–100 rb</div>
          <div class="W4Efsd">Jl. Puri Indah Raya</div>
        </div>
        <div class="Nv2PK">
          <a class="hfpxzc" aria-label="Warung Sederhana" href="https://maps.example/place/warung"></a>
          <div>Warung Sederhana</div>
        </div>
        <div class="Nv2PK">
          <div>Sponsored block without a link</div>
        </div>
      </div>
    </body></html>
    "#;

    #[test]
    fn test_extract_full_card() {
        let listings = extract_listings(PAGE, &CardSelectors::default()).unwrap();
        assert_eq!(listings.len(), 2);

        let first = &listings[0];
        assert_eq!(first.name, "Bakmi GM");
        assert_eq!(first.link, "https://maps.example/place/bakmi-gm");
        assert_eq!(first.rating, "4.6");
        assert_eq!(first.reviews, "2.345");
        assert_eq!(first.category, "Restoran Mi");
        assert_eq!(first.price, "Rp 50–100 rb");
        assert_eq!(first.status, "Active");
    }

    #[test]
    fn test_sparse_card_uses_placeholders() {
        let listings = extract_listings(PAGE, &CardSelectors::default()).unwrap();
        let sparse = &listings[1];
        assert_eq!(sparse.name, "Warung Sederhana");
        assert_eq!(sparse.rating, "N/A");
        assert_eq!(sparse.reviews, "0");
        assert_eq!(sparse.category, "Unknown");
        assert_eq!(sparse.price, "N/A");
    }

    #[test]
    fn test_card_lines_follow_block_structure() {
        let document = Html::parse_document(PAGE);
        let matcher = CardMatcher::compile(&CardSelectors::default()).unwrap();
        let card = document.select(&matcher.card).next().unwrap();
        let lines = card_lines(card);
        assert_eq!(
            lines,
            vec![
                "Bakmi GM".to_string(),
                "4.6(2.345) · Restoran Mi · Rp 50–100 rb".to_string(),
                "Jl. Puri Indah Raya".to_string(),
            ]
        );
    }

    #[test]
    fn test_card_lines_skip_scripts() {
        let html = r#"<div class="Nv2PK"><div>Name</div><div>A · B<script>var x = 1;</script></div></div>"#;
        let document = Html::parse_document(html);
        let matcher = CardMatcher::compile(&CardSelectors::default()).unwrap();
        let card = document.select(&matcher.card).next().unwrap();
        assert_eq!(card_lines(card), vec!["Name", "A · B"]);
    }

    #[test]
    fn test_text_beside_nested_block_keeps_its_own_line() {
        let html = r#"<div class="Nv2PK"><a class="hfpxzc" aria-label="Bakso Solo" href="/b"></a><div>Bakso Solo<div>4,5 · Bakso · Rp 25 rb</div></div></div>"#;
        let document = Html::parse_document(html);
        let matcher = CardMatcher::compile(&CardSelectors::default()).unwrap();
        let card = document.select(&matcher.card).next().unwrap();
        assert_eq!(card_lines(card), vec!["Bakso Solo", "4,5 · Bakso · Rp 25 rb"]);

        let listing = &extract_listings(html, &CardSelectors::default()).unwrap()[0];
        assert_eq!(listing.category, "Bakso");
        assert_eq!(listing.price, "Rp 25 rb");
    }

    #[test]
    fn test_line_break_splits_lines() {
        let html = r#"<div class="Nv2PK"><a class="hfpxzc" aria-label="X" href="/x"></a><div>X<br>4,5 · Bakso · Rp 25 rb</div></div>"#;
        let listing = &extract_listings(html, &CardSelectors::default()).unwrap()[0];
        assert_eq!(listing.category, "Bakso");
        assert_eq!(listing.price, "Rp 25 rb");
    }

    #[test]
    fn test_text_after_nested_block_starts_new_line() {
        let html = r#"<div class="Nv2PK"><div><div>Sate Khas Senayan</div>Buka · Sate · Rp 50 rb</div></div>"#;
        let document = Html::parse_document(html);
        let matcher = CardMatcher::compile(&CardSelectors::default()).unwrap();
        let card = document.select(&matcher.card).next().unwrap();
        assert_eq!(card_lines(card), vec!["Sate Khas Senayan", "Buka · Sate · Rp 50 rb"]);
    }

    #[test]
    fn test_inline_only_card_is_one_line() {
        let html = r#"<div class="Nv2PK"><a class="hfpxzc" aria-label="X" href="/x"></a><span>X</span></div>"#;
        let listings = extract_listings(html, &CardSelectors::default()).unwrap();
        assert_eq!(listings[0].category, "Unknown");
    }

    #[test]
    fn test_missing_aria_label_gives_empty_name() {
        let card = RawCard {
            link: Some("/x".to_string()),
            ..Default::default()
        };
        assert_eq!(listing_from_card(card).name, "");
    }

    #[test]
    fn test_bullet_separator_fallback() {
        let card = RawCard {
            name: Some("Kopi Kenangan".to_string()),
            lines: vec![
                "Kopi Kenangan".to_string(),
                "4.4 • Kedai Kopi • $".to_string(),
            ],
            ..Default::default()
        };
        let listing = listing_from_card(card);
        assert_eq!(listing.category, "Kedai Kopi");
        assert_eq!(listing.price, "$");
    }

    #[test]
    fn test_price_before_category_is_still_found() {
        let (category, price) = parse_metadata("Rp 25 rb · Bakso");
        assert_eq!(category, "Bakso");
        assert_eq!(price, "Rp 25 rb");
    }

    #[test]
    fn test_metadata_without_separator() {
        let (category, price) = parse_metadata("Buka 24 jam");
        assert_eq!(category, "Unknown");
        assert_eq!(price, "N/A");
    }

    #[test]
    fn test_empty_rating_text_is_kept() {
        let card = RawCard {
            rating: Some("  ".to_string()),
            reviews: Some("(12)".to_string()),
            ..Default::default()
        };
        let listing = listing_from_card(card);
        assert_eq!(listing.rating, "");
        assert_eq!(listing.reviews, "12");
    }

    #[test]
    fn test_custom_card_class() {
        let html = r#"<div class="result"><a class="hfpxzc" aria-label="Y" href="/y"></a></div>"#;
        let selectors = CardSelectors {
            card: "result".to_string(),
            ..Default::default()
        };
        let listings = extract_listings(html, &selectors).unwrap();
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].name, "Y");
    }

    #[test]
    fn test_invalid_selector_is_an_error() {
        let selectors = CardSelectors {
            card: "[[".to_string(),
            ..Default::default()
        };
        let err = extract_listings("<html></html>", &selectors).unwrap_err();
        assert!(matches!(err, HarvestError::Selector { .. }));
    }
}
