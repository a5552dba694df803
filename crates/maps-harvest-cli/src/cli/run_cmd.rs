//! `maps-harvest run` — the full harvest pipeline.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use maps_harvest::{clean_with_report, CleanReport, HeaderStyle, ListingTable};
use serde_json::json;
use tracing::info;

use crate::cli::output::{self, Styled};
use crate::config::HarvestConfig;
use crate::scrape;
use crate::sheets::{self, SheetsClient, TokenSource, UploadReport};

/// Flags that override the resolved configuration.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Map-search URL to scrape
    #[arg(long)]
    pub url: Option<String>,

    /// Spreadsheet title to publish to
    #[arg(long)]
    pub sheet: Option<String>,

    /// Spreadsheet id (skips the title lookup)
    #[arg(long)]
    pub spreadsheet_id: Option<String>,

    /// Service-account JSON key file
    #[arg(long)]
    pub credentials: Option<PathBuf>,

    /// Number of times to scroll the results feed
    #[arg(long)]
    pub scroll_rounds: Option<u32>,

    /// Show the browser window instead of running headless
    #[arg(long)]
    pub headed: bool,
}

impl ConfigArgs {
    /// Apply the flags that were given on top of `config`.
    pub fn apply(&self, config: &mut HarvestConfig) {
        if let Some(url) = &self.url {
            config.target_url = url.clone();
        }
        if let Some(sheet) = &self.sheet {
            config.sheet.title = sheet.clone();
        }
        if let Some(id) = &self.spreadsheet_id {
            config.sheet.spreadsheet_id = Some(id.clone());
        }
        if let Some(path) = &self.credentials {
            config.credentials_path = path.clone();
        }
        if let Some(rounds) = self.scroll_rounds {
            config.scroll_rounds = rounds;
        }
        if self.headed {
            config.headless = false;
        }
    }

    /// Environment-resolved config with these flags applied.
    pub fn resolve(&self) -> HarvestConfig {
        let mut config = HarvestConfig::from_env();
        self.apply(&mut config);
        config
    }
}

/// Flags for `maps-harvest run`.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    #[command(flatten)]
    pub overrides: ConfigArgs,

    /// Scrape and preview only; do not touch the spreadsheet
    #[arg(long)]
    pub no_upload: bool,

    /// Extract from a saved results page instead of launching a browser
    #[arg(long, value_name = "FILE")]
    pub from_html: Option<PathBuf>,

    /// Save the rendered results page to FILE
    #[arg(long, value_name = "FILE", conflicts_with = "from_html")]
    pub save_html: Option<PathBuf>,
}

/// Outcome of a run, also the `--json` payload.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub clean: CleanReport,
    pub table: ListingTable,
    pub upload: Option<UploadReport>,
}

/// Run the scrape → clean → upload pipeline.
pub async fn run(args: &RunArgs) -> Result<()> {
    let config = args.overrides.resolve();
    let (table, clean) = collect(args, &config).await?;

    if table.is_empty() {
        report(&RunSummary { clean, table, upload: None }, &config);
        return Ok(());
    }

    if !output::is_json() {
        output::print_preview(&table, config.preview_rows);
    }

    let upload = if args.no_upload {
        None
    } else {
        Some(publish(&config, &table).await?)
    };

    report(&RunSummary { clean, table, upload }, &config);
    Ok(())
}

/// Obtain listings (live or from a saved page) and clean them.
pub async fn collect(args: &RunArgs, config: &HarvestConfig) -> Result<(ListingTable, CleanReport)> {
    let listings = match &args.from_html {
        Some(path) => {
            info!("extracting listings from saved page {}", path.display());
            scrape::extract_saved_page(path, config).await?
        }
        None => {
            info!("scraping {}", config.target_url);
            let out = scrape::scrape(config).await?;
            if let Some(path) = &args.save_html {
                tokio::fs::write(path, &out.html)
                    .await
                    .with_context(|| format!("cannot write {}", path.display()))?;
                info!("saved rendered page to {}", path.display());
            }
            out.listings
        }
    };

    let (table, clean) = clean_with_report(listings);
    info!(
        scraped = clean.scraped,
        duplicates = clean.duplicates,
        unnamed = clean.unnamed,
        kept = clean.kept,
        "cleaned listings"
    );
    Ok((table, clean))
}

/// Authorize and replace the target worksheet with `table`.
pub async fn publish(config: &HarvestConfig, table: &ListingTable) -> Result<UploadReport> {
    info!("connecting to Google Sheets");
    let source = TokenSource::resolve(&config.credentials_path)?;
    let client = SheetsClient::authorize(&source).await?;
    let upload = sheets::upload_table(&client, &config.sheet, table, &HeaderStyle::default())
        .await
        .with_context(|| format!("upload to {:?} failed", config.sheet.title))?;
    Ok(upload)
}

fn report(summary: &RunSummary, config: &HarvestConfig) {
    if output::is_json() {
        output::print_json(&json!({
            "clean": summary.clean,
            "listings": summary.table,
            "upload": summary.upload,
        }));
        return;
    }

    let s = Styled::new();

    if summary.table.is_empty() {
        eprintln!(
            "  {} No listings were extracted. Check the CSS selectors.",
            s.warn_sym()
        );
        return;
    }

    if output::is_quiet() {
        return;
    }

    match &summary.upload {
        Some(upload) => eprintln!(
            "  {} {} listings uploaded to {} and formatted as a table.",
            s.ok_sym(),
            upload.rows,
            s.bold(&config.sheet.title)
        ),
        None => eprintln!(
            "  {} {} listings kept (upload skipped).",
            s.ok_sym(),
            summary.table.len()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = ConfigArgs {
            url: Some("https://maps.example/search/nasi+goreng".to_string()),
            sheet: Some("Nasi Goreng".to_string()),
            scroll_rounds: Some(2),
            headed: true,
            ..Default::default()
        };
        let mut config = HarvestConfig::default();
        args.apply(&mut config);

        assert_eq!(config.target_url, "https://maps.example/search/nasi+goreng");
        assert_eq!(config.sheet.title, "Nasi Goreng");
        assert_eq!(config.scroll_rounds, 2);
        assert!(!config.headless);
        assert_eq!(config.sheet.spreadsheet_id, None);
    }

    #[test]
    fn test_no_flags_leave_config_alone() {
        let mut config = HarvestConfig::default();
        ConfigArgs::default().apply(&mut config);
        assert_eq!(config, HarvestConfig::default());
    }

    #[test]
    fn test_save_html_conflicts_with_from_html() {
        #[derive(clap::Parser)]
        struct Harness {
            #[command(flatten)]
            run: RunArgs,
        }

        let err = <Harness as clap::Parser>::try_parse_from([
            "maps-harvest",
            "--from-html",
            "page.html",
            "--save-html",
            "copy.html",
        ])
        .err()
        .expect("conflicting flags should be rejected");
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);

        let ok = <Harness as clap::Parser>::try_parse_from([
            "maps-harvest",
            "--save-html",
            "copy.html",
            "--headed",
        ])
        .unwrap();
        assert!(ok.run.overrides.headed);
        assert_eq!(ok.run.save_html, Some(PathBuf::from("copy.html")));
    }
}
