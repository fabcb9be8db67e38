use crate::scrapers::types::ScrapedListing;
use anyhow::Result;
use async_trait::async_trait;

/// Common trait for listing page scrapers
#[async_trait]
pub trait ScraperTrait: Send + Sync {
    /// Fetch `url` and extract whatever listing fields can be found
    async fn scrape(&self, url: &str) -> Result<ScrapedListing>;

    /// Get the name of the scraper backend
    fn source_name(&self) -> &'static str;
}
