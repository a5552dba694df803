//! Browser stage: load the results page, scroll the feed so lazy-loaded
//! cards render, and hand the final HTML to the extractor.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use maps_harvest::{extract_listings, extract_listings_from_file, Listing};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::HarvestConfig;
use crate::renderer::chromium::ChromiumRenderer;
use crate::renderer::{RenderContext, Renderer};

/// What happened while scrolling the feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScrollOutcome {
    pub feed_found: bool,
    pub rounds_completed: u32,
}

/// JS that scrolls the feed to its bottom once.
///
/// Evaluates to `true` when the feed element was found, `false` otherwise.
pub fn feed_scroll_script(feed_label: &str) -> String {
    let label = serde_json::Value::String(feed_label.to_string());
    format!(
        r#"(() => {{
    const label = {label};
    const feed = Array.from(document.querySelectorAll('div[aria-label]'))
        .find(el => el.getAttribute('aria-label').includes(label));
    if (!feed) return false;
    feed.scrollTop = feed.scrollHeight;
    return true;
}})()"#
    )
}

/// Scroll the results feed `rounds` times, pausing after each round.
pub async fn scroll_feed(
    ctx: &dyn RenderContext,
    feed_label: &str,
    rounds: u32,
    pause: Duration,
) -> Result<ScrollOutcome> {
    let script = feed_scroll_script(feed_label);
    let mut outcome = ScrollOutcome::default();

    for round in 1..=rounds {
        let found = ctx
            .execute_js(&script)
            .await
            .with_context(|| format!("scroll round {round} failed"))?
            .as_bool()
            .unwrap_or(false);

        if !found {
            if round == 1 {
                return Ok(outcome);
            }
            warn!("results feed disappeared after {} rounds", outcome.rounds_completed);
            break;
        }

        outcome.feed_found = true;
        outcome.rounds_completed = round;
        debug!(round, rounds, "scrolled results feed");
        tokio::time::sleep(pause).await;
    }

    Ok(outcome)
}

/// Rendered page plus the listings extracted from it.
#[derive(Debug, Clone)]
pub struct ScrapeOutput {
    pub html: String,
    pub listings: Vec<Listing>,
}

/// Navigate, settle, scroll, and return the rendered HTML.
pub async fn capture_page(ctx: &mut dyn RenderContext, config: &HarvestConfig) -> Result<String> {
    let nav = ctx
        .navigate(&config.target_url, config.navigation_timeout_ms)
        .await
        .with_context(|| format!("failed to open {}", config.target_url))?;
    info!("loaded {} in {}ms", nav.final_url, nav.load_time_ms);

    tokio::time::sleep(Duration::from_millis(config.settle_ms)).await;

    info!("scrolling results feed to load more listings");
    match scroll_feed(
        &*ctx,
        &config.feed_label,
        config.scroll_rounds,
        Duration::from_millis(config.scroll_pause_ms),
    )
    .await
    {
        Ok(outcome) if !outcome.feed_found => {
            warn!(
                "results feed labelled {:?} not found; using visible listings",
                config.feed_label
            );
        }
        Ok(outcome) => {
            info!("scrolled feed {} times", outcome.rounds_completed);
        }
        Err(e) => {
            warn!("automatic scrolling failed: {e:#}");
            warn!("continuing with visible listings");
        }
    }

    ctx.get_html().await
}

/// [`capture_page`] followed by extraction.
pub async fn scrape_page(ctx: &mut dyn RenderContext, config: &HarvestConfig) -> Result<ScrapeOutput> {
    let html = capture_page(ctx, config).await?;
    let listings = extract_off_thread(html.clone(), config).await?;
    Ok(ScrapeOutput { html, listings })
}

/// Run extraction on a blocking thread; `scraper` types are `!Send`.
pub async fn extract_off_thread(html: String, config: &HarvestConfig) -> Result<Vec<Listing>> {
    let selectors = config.selectors.clone();
    let listings = tokio::task::spawn_blocking(move || extract_listings(&html, &selectors))
        .await
        .context("extraction task panicked")??;
    info!("found {} result cards with a link", listings.len());
    Ok(listings)
}

/// Read a saved results page and extract it on a blocking thread.
pub async fn extract_saved_page(path: &Path, config: &HarvestConfig) -> Result<Vec<Listing>> {
    let file = path.to_path_buf();
    let selectors = config.selectors.clone();
    let listings =
        tokio::task::spawn_blocking(move || extract_listings_from_file(&file, &selectors))
            .await
            .context("extraction task panicked")?
            .with_context(|| format!("cannot read {}", path.display()))?;
    info!("found {} result cards with a link", listings.len());
    Ok(listings)
}

/// Launch Chromium, scrape the configured page, and always shut down.
pub async fn scrape(config: &HarvestConfig) -> Result<ScrapeOutput> {
    let renderer = ChromiumRenderer::new(config.headless).await?;
    scrape_with(&renderer, config).await
}

/// [`scrape`] against any renderer.
pub async fn scrape_with(renderer: &dyn Renderer, config: &HarvestConfig) -> Result<ScrapeOutput> {
    let result = match renderer.new_context().await {
        Ok(mut ctx) => {
            let result = scrape_page(&mut *ctx, config).await;
            if let Err(e) = ctx.close().await {
                warn!("failed to close browser tab: {e:#}");
            }
            result
        }
        Err(e) => Err(e),
    };

    renderer.shutdown().await?;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::NavigationResult;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
    use std::sync::Arc;

    const PAGE: &str = r#"<html><body><div aria-label="Hasil untuk restoran di jakarta barat">
        <div class="Nv2PK"><a class="hfpxzc" aria-label="Soto Betawi H. Mamat" href="https://maps.example/soto"></a>
          <div>Soto Betawi H. Mamat</div>
          <div><span class="MW4etd">4.7</span><span class="UY7F9">(980)</span> · Restoran Soto · Rp 25–50 rb</div>
        </div>
    </div></body></html>"#;

    /// Serves fixed HTML and counts scroll calls.
    struct FakeContext {
        feed_present: bool,
        fail_js: bool,
        fail_nav: bool,
        scrolls: Arc<AtomicU32>,
        open: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RenderContext for FakeContext {
        async fn navigate(&mut self, url: &str, _timeout_ms: u64) -> Result<NavigationResult> {
            if self.fail_nav {
                anyhow::bail!("net::ERR_NAME_NOT_RESOLVED");
            }
            Ok(NavigationResult {
                final_url: url.to_string(),
                load_time_ms: 1,
            })
        }
        async fn execute_js(&self, script: &str) -> Result<serde_json::Value> {
            assert!(script.contains("scrollHeight"));
            if self.fail_js {
                anyhow::bail!("target closed");
            }
            self.scrolls.fetch_add(1, Ordering::SeqCst);
            Ok(serde_json::Value::Bool(self.feed_present))
        }
        async fn get_html(&self) -> Result<String> {
            Ok(PAGE.to_string())
        }
        async fn close(self: Box<Self>) -> Result<()> {
            self.open.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FakeRenderer {
        feed_present: bool,
        fail_js: bool,
        fail_nav: bool,
        scrolls: Arc<AtomicU32>,
        open: Arc<AtomicUsize>,
        shut_down: AtomicBool,
    }

    impl FakeRenderer {
        fn new(feed_present: bool, fail_js: bool) -> Self {
            Self {
                feed_present,
                fail_js,
                fail_nav: false,
                scrolls: Arc::new(AtomicU32::new(0)),
                open: Arc::new(AtomicUsize::new(0)),
                shut_down: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl Renderer for FakeRenderer {
        async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
            self.open.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeContext {
                feed_present: self.feed_present,
                fail_js: self.fail_js,
                fail_nav: self.fail_nav,
                scrolls: Arc::clone(&self.scrolls),
                open: Arc::clone(&self.open),
            }))
        }
        async fn shutdown(&self) -> Result<()> {
            self.shut_down.store(true, Ordering::SeqCst);
            Ok(())
        }
        fn active_contexts(&self) -> usize {
            self.open.load(Ordering::SeqCst)
        }
    }

    fn fast_config() -> HarvestConfig {
        HarvestConfig {
            settle_ms: 0,
            scroll_pause_ms: 0,
            ..Default::default()
        }
    }

    #[test]
    fn test_scroll_script_embeds_label_as_string_literal() {
        let script = feed_scroll_script(r#"Hasil "untuk" resto"#);
        assert!(script.contains(r#"const label = "Hasil \"untuk\" resto";"#));
        assert!(script.contains("feed.scrollTop = feed.scrollHeight"));
    }

    #[tokio::test]
    async fn test_scrape_scrolls_every_round() {
        let renderer = FakeRenderer::new(true, false);
        let listings = scrape_with(&renderer, &fast_config()).await.unwrap().listings;

        assert_eq!(renderer.scrolls.load(Ordering::SeqCst), 5);
        assert_eq!(listings.len(), 1);
        assert_eq!(listings[0].name, "Soto Betawi H. Mamat");
        assert_eq!(listings[0].reviews, "980");
        assert_eq!(listings[0].category, "Restoran Soto");
        assert_eq!(renderer.active_contexts(), 0);
        assert!(renderer.shut_down.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_missing_feed_stops_scrolling_but_still_extracts() {
        let renderer = FakeRenderer::new(false, false);
        let listings = scrape_with(&renderer, &fast_config()).await.unwrap().listings;

        assert_eq!(renderer.scrolls.load(Ordering::SeqCst), 1);
        assert_eq!(listings.len(), 1);
    }

    #[tokio::test]
    async fn test_scroll_errors_are_swallowed() {
        let renderer = FakeRenderer::new(true, true);
        let listings = scrape_with(&renderer, &fast_config()).await.unwrap().listings;

        assert_eq!(listings.len(), 1);
        assert!(renderer.shut_down.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_navigation_failure_still_shuts_down() {
        let mut renderer = FakeRenderer::new(true, false);
        renderer.fail_nav = true;
        let err = scrape_with(&renderer, &fast_config()).await.unwrap_err();

        assert!(format!("{err:#}").contains("ERR_NAME_NOT_RESOLVED"));
        assert_eq!(renderer.scrolls.load(Ordering::SeqCst), 0);
        assert_eq!(renderer.active_contexts(), 0);
        assert!(renderer.shut_down.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_saved_page_missing_names_the_file() {
        let err = extract_saved_page(Path::new("/nonexistent/page.html"), &fast_config())
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/page.html"));
    }

    #[tokio::test]
    async fn test_scroll_outcome_counts_rounds() {
        let scrolls = Arc::new(AtomicU32::new(0));
        let ctx = FakeContext {
            feed_present: true,
            fail_js: false,
            fail_nav: false,
            scrolls: Arc::clone(&scrolls),
            open: Arc::new(AtomicUsize::new(1)),
        };
        let outcome = scroll_feed(&ctx, "Hasil", 3, Duration::ZERO).await.unwrap();
        assert_eq!(
            outcome,
            ScrollOutcome {
                feed_found: true,
                rounds_completed: 3,
            }
        );
    }

    #[tokio::test]
    async fn test_zero_rounds_never_touches_page() {
        let scrolls = Arc::new(AtomicU32::new(0));
        let ctx = FakeContext {
            feed_present: true,
            fail_js: false,
            fail_nav: false,
            scrolls: Arc::clone(&scrolls),
            open: Arc::new(AtomicUsize::new(1)),
        };
        let outcome = scroll_feed(&ctx, "Hasil", 0, Duration::ZERO).await.unwrap();
        assert_eq!(outcome, ScrollOutcome::default());
        assert_eq!(scrolls.load(Ordering::SeqCst), 0);
    }
}
