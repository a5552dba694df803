//! Configuration loading and resolution.
//!
//! Values resolve in order: built-in defaults, then `MAPS_HARVEST_*`
//! environment variables, then CLI flags (applied by the caller).

use std::path::PathBuf;

use maps_harvest::CardSelectors;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const DEFAULT_TARGET_URL: &str =
    "https://www.google.com/maps/search/restoran+di+jakarta+barat";
pub const DEFAULT_FEED_LABEL: &str = "Hasil untuk restoran di jakarta barat";
pub const DEFAULT_SHEET_TITLE: &str = "Data Restoran Jakarta Barat";
pub const DEFAULT_CREDENTIALS: &str = "credentials.json";

/// Which spreadsheet receives the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetTarget {
    /// Spreadsheet title, used when no id is given.
    pub title: String,
    /// Skip the title lookup and open this spreadsheet directly.
    pub spreadsheet_id: Option<String>,
}

impl Default for SheetTarget {
    fn default() -> Self {
        Self {
            title: DEFAULT_SHEET_TITLE.to_string(),
            spreadsheet_id: None,
        }
    }
}

/// Fully resolved settings for one harvest run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestConfig {
    pub target_url: String,
    /// Substring of the results feed's `aria-label`.
    pub feed_label: String,
    pub scroll_rounds: u32,
    pub scroll_pause_ms: u64,
    /// Wait after navigation before touching the page.
    pub settle_ms: u64,
    pub navigation_timeout_ms: u64,
    pub headless: bool,
    pub selectors: CardSelectors,
    pub sheet: SheetTarget,
    pub credentials_path: PathBuf,
    pub preview_rows: usize,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            target_url: DEFAULT_TARGET_URL.to_string(),
            feed_label: DEFAULT_FEED_LABEL.to_string(),
            scroll_rounds: 5,
            scroll_pause_ms: 3000,
            settle_ms: 5000,
            navigation_timeout_ms: 30_000,
            headless: true,
            selectors: CardSelectors::default(),
            sheet: SheetTarget::default(),
            credentials_path: PathBuf::from(DEFAULT_CREDENTIALS),
            preview_rows: 5,
        }
    }
}

impl HarvestConfig {
    /// Defaults overlaid with environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("MAPS_HARVEST_URL") {
            config.target_url = url;
        }
        if let Some(label) = lookup("MAPS_HARVEST_FEED_LABEL") {
            config.feed_label = label;
        }
        if let Some(rounds) = parse_var(&lookup, "MAPS_HARVEST_SCROLL_ROUNDS") {
            config.scroll_rounds = rounds;
        }
        if let Some(pause) = parse_var(&lookup, "MAPS_HARVEST_SCROLL_PAUSE_MS") {
            config.scroll_pause_ms = pause;
        }
        if let Some(settle) = parse_var(&lookup, "MAPS_HARVEST_SETTLE_MS") {
            config.settle_ms = settle;
        }
        if let Some(timeout) = parse_var(&lookup, "MAPS_HARVEST_NAV_TIMEOUT_MS") {
            config.navigation_timeout_ms = timeout;
        }
        if lookup("MAPS_HARVEST_HEADED").is_some_and(|v| is_truthy(&v)) {
            config.headless = false;
        }
        if let Some(title) = lookup("MAPS_HARVEST_SHEET") {
            config.sheet.title = title;
        }
        if let Some(id) = lookup("MAPS_HARVEST_SPREADSHEET_ID") {
            config.sheet.spreadsheet_id = Some(id);
        }
        if let Some(path) = lookup("MAPS_HARVEST_CREDENTIALS") {
            config.credentials_path = PathBuf::from(path);
        }

        config
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Option<T>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("ignoring {key}={raw:?}: not a valid number");
            None
        }
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Find the Chromium binary path.
pub fn find_chromium() -> Option<PathBuf> {
    // 1. MAPS_HARVEST_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("MAPS_HARVEST_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 2. System PATH
    for name in ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 3. Common macOS location
    if cfg!(target_os = "macos") {
        let common =
            PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = HarvestConfig::default();
        assert_eq!(config.scroll_rounds, 5);
        assert_eq!(config.scroll_pause_ms, 3000);
        assert_eq!(config.settle_ms, 5000);
        assert!(config.headless);
        assert_eq!(config.sheet.title, "Data Restoran Jakarta Barat");
        assert_eq!(config.credentials_path, PathBuf::from("credentials.json"));
        assert_eq!(config.selectors.card, "Nv2PK");
    }

    #[test]
    fn test_env_overlay() {
        let config = HarvestConfig::from_lookup(lookup_from(&[
            ("MAPS_HARVEST_URL", "https://maps.example/search/sate"),
            ("MAPS_HARVEST_SCROLL_ROUNDS", "8"),
            ("MAPS_HARVEST_HEADED", "true"),
            ("MAPS_HARVEST_SPREADSHEET_ID", "abc123"),
        ]));
        assert_eq!(config.target_url, "https://maps.example/search/sate");
        assert_eq!(config.scroll_rounds, 8);
        assert!(!config.headless);
        assert_eq!(config.sheet.spreadsheet_id.as_deref(), Some("abc123"));
        assert_eq!(config.sheet.title, DEFAULT_SHEET_TITLE);
    }

    #[test]
    fn test_bad_numbers_are_ignored() {
        let config = HarvestConfig::from_lookup(lookup_from(&[
            ("MAPS_HARVEST_SCROLL_ROUNDS", "many"),
            ("MAPS_HARVEST_SETTLE_MS", " 250 "),
        ]));
        assert_eq!(config.scroll_rounds, 5);
        assert_eq!(config.settle_ms, 250);
    }

    #[test]
    fn test_headed_requires_truthy_value() {
        let config = HarvestConfig::from_lookup(lookup_from(&[("MAPS_HARVEST_HEADED", "0")]));
        assert!(config.headless);
    }

    #[test]
    fn test_config_serializes() {
        let json = serde_json::to_value(HarvestConfig::default()).unwrap();
        assert_eq!(json["sheet"]["title"], "Data Restoran Jakarta Barat");
        assert_eq!(json["selectors"]["link"], "hfpxzc");
    }
}
