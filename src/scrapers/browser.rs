use crate::scrapers::listing::{parse_listing_html, USER_AGENT};
use crate::scrapers::traits::ScraperTrait;
use crate::scrapers::types::ScrapedListing;
use anyhow::{Context, Result};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions};
use std::time::Duration;
use tracing::{debug, info};

/// Scraper that renders the page in headless Chrome first, for listing
/// sites that build their content with JavaScript.
pub struct BrowserListingScraper {
    timeout: Duration,
}

impl BrowserListingScraper {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn render(url: &str, timeout: Duration) -> Result<String> {
        info!("Launching headless Chrome...");

        let options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(false)
            .window_size(Some((1366, 768)))
            .build()
            .context("Failed to build launch options")?;

        let browser = Browser::new(options).context("Failed to launch Chrome browser")?;
        let tab = browser.new_tab().context("Failed to open tab")?;
        tab.set_default_timeout(timeout);
        tab.set_user_agent(USER_AGENT, None, None)
            .context("Failed to set user agent")?;

        info!("Opening listing page {}", url);
        tab.navigate_to(url)
            .context("Failed to navigate to listing page")?
            .wait_until_navigated()
            .context("Listing page did not finish loading")?;

        let html = tab.get_content().context("Failed to read page HTML")?;
        debug!("Rendered {} bytes of HTML", html.len());
        Ok(html)
    }
}

#[async_trait]
impl ScraperTrait for BrowserListingScraper {
    async fn scrape(&self, url: &str) -> Result<ScrapedListing> {
        let target = url.to_string();
        let timeout = self.timeout;

        // headless_chrome is blocking; keep it off the async workers
        let html = tokio::task::spawn_blocking(move || Self::render(&target, timeout))
            .await
            .context("Browser task panicked")??;

        Ok(parse_listing_html(url, &html))
    }

    fn source_name(&self) -> &'static str {
        "headless-chrome"
    }
}
