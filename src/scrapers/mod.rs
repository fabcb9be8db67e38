pub mod browser;
pub mod listing;
pub mod traits;
pub mod types;

pub use browser::BrowserListingScraper;
pub use listing::{parse_listing_html, HttpListingScraper};
pub use traits::ScraperTrait;
pub use types::ScrapedListing;
