use crate::scrapers::traits::ScraperTrait;
use crate::scrapers::types::ScrapedListing;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, info, warn};

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

static ROOMS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+\.?\d*)\s*(rooms|חדרים)").expect("valid rooms regex"));
static FLOOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(floor|קומה)\s*(\d+)").expect("valid floor regex"));
static SQM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)(\d+)\s*(sqm|m²|מ"ר)"#).expect("valid sqm regex"));

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid css selector")
}

static OG_PRICE: Lazy<Selector> = Lazy::new(|| selector(r#"meta[property="og:price:amount"]"#));
static PRICE_CLASS: Lazy<Selector> = Lazy::new(|| selector(".price"));
static PRICE_LIKE: Lazy<Selector> = Lazy::new(|| selector(r#"[class*="price"]"#));
static OG_ADDRESS: Lazy<Selector> = Lazy::new(|| selector(r#"meta[property="og:street-address"]"#));
static H1: Lazy<Selector> = Lazy::new(|| selector("h1"));
static TITLE: Lazy<Selector> = Lazy::new(|| selector("title"));
static OG_IMAGE: Lazy<Selector> = Lazy::new(|| selector(r#"meta[property="og:image"]"#));
static MAIN_IMAGE: Lazy<Selector> = Lazy::new(|| selector(r#"img[class*="main-image"]"#));
static META_DESCRIPTION: Lazy<Selector> = Lazy::new(|| selector(r#"meta[name="description"]"#));
static BODY: Lazy<Selector> = Lazy::new(|| selector("body"));

/// Plain HTTP scraper: one GET, no JavaScript
pub struct HttpListingScraper {
    client: Client,
}

impl HttpListingScraper {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ScraperTrait for HttpListingScraper {
    async fn scrape(&self, url: &str) -> Result<ScrapedListing> {
        info!("Scraping listing {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to fetch listing page")?;

        if !response.status().is_success() {
            warn!("Listing page returned status: {}", response.status());
            anyhow::bail!("Failed to fetch listing page: {}", response.status());
        }

        let html = response.text().await.context("Failed to read response body")?;
        debug!("Downloaded {} bytes of HTML", html.len());

        Ok(parse_listing_html(url, &html))
    }

    fn source_name(&self) -> &'static str {
        "http"
    }
}

/// Extract listing fields from a rendered page. Meta tags win over page
/// content; rooms, floor and size come from patterns in the body text
/// (English or Hebrew markers).
pub fn parse_listing_html(url: &str, html: &str) -> ScrapedListing {
    let document = Html::parse_document(html);

    let raw_price = meta_content(&document, &OG_PRICE)
        .or_else(|| first_text(&document, &PRICE_CLASS))
        .or_else(|| first_text(&document, &PRICE_LIKE))
        .unwrap_or_else(|| "Call for Price".to_string());
    let cleaned: String = raw_price
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '₪' || *c == ',')
        .collect();
    let price = if cleaned.is_empty() { raw_price } else { cleaned };

    let address = meta_content(&document, &OG_ADDRESS)
        .or_else(|| first_text(&document, &H1))
        .or_else(|| {
            first_text(&document, &TITLE)
                .and_then(|title| title.split(" | ").next().map(str::to_string))
        })
        .unwrap_or_default();

    let image_url = meta_content(&document, &OG_IMAGE)
        .or_else(|| {
            document
                .select(&MAIN_IMAGE)
                .next()
                .and_then(|img| img.value().attr("src"))
                .map(str::to_string)
        })
        .unwrap_or_default();

    let description = meta_content(&document, &META_DESCRIPTION).unwrap_or_default();

    let body_text = document
        .select(&BODY)
        .next()
        .map(|body| body.text().collect::<Vec<_>>().join(" "))
        .unwrap_or_default();

    let rooms = capture(&ROOMS_RE, &body_text, 1)
        .and_then(|m| m.parse::<f64>().ok())
        .unwrap_or(0.0);
    let floor = capture(&FLOOR_RE, &body_text, 2)
        .and_then(|m| m.parse::<i32>().ok())
        .unwrap_or(0);
    let sqm = capture(&SQM_RE, &body_text, 1)
        .and_then(|m| m.parse::<f64>().ok())
        .unwrap_or(0.0);

    ScrapedListing {
        url: url.to_string(),
        price: price.trim().to_string(),
        address: address.trim().to_string(),
        rooms,
        floor,
        sqm,
        image_url,
        description,
        posted_time: Utc::now().format("%H:%M:%S").to_string(),
    }
}

fn meta_content(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .and_then(|el| el.value().attr("content"))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

fn capture<'t>(re: &Regex, text: &'t str, group: usize) -> Option<&'t str> {
    re.captures(text)
        .and_then(|caps| caps.get(group))
        .map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_tags_take_priority() {
        let html = r#"
            <html><head>
              <title>Listing | Site</title>
              <meta property="og:price:amount" content="₪ 5,400 per month">
              <meta property="og:street-address" content="Dizengoff 100, Tel Aviv">
              <meta property="og:image" content="https://img.example/1.jpg">
              <meta name="description" content="Bright flat near the beach">
            </head><body>
              <h1>Something else</h1>
              <div class="price">9,999</div>
              <p>3.5 rooms</p><p>Floor 4</p><p>85 sqm</p>
            </body></html>"#;

        let listing = parse_listing_html("https://example.com/a", html);
        assert_eq!(listing.url, "https://example.com/a");
        assert_eq!(listing.price, "₪5,400");
        assert_eq!(listing.address, "Dizengoff 100, Tel Aviv");
        assert_eq!(listing.image_url, "https://img.example/1.jpg");
        assert_eq!(listing.description, "Bright flat near the beach");
        assert_eq!(listing.rooms, 3.5);
        assert_eq!(listing.floor, 4);
        assert_eq!(listing.sqm, 85.0);
    }

    #[test]
    fn falls_back_to_page_content() {
        let html = r#"
            <html><head><title>Herzl 12, Haifa | Listings</title></head>
            <body>
              <span class="listing-price-tag">4,200 ₪</span>
              <img class="gallery main-image" src="/photo.png">
              <ul><li>4 חדרים</li><li>קומה 2</li><li>90 מ"ר</li></ul>
            </body></html>"#;

        let listing = parse_listing_html("https://example.com/b", html);
        assert_eq!(listing.price, "4,200₪");
        assert_eq!(listing.address, "Herzl 12, Haifa");
        assert_eq!(listing.image_url, "/photo.png");
        assert_eq!(listing.rooms, 4.0);
        assert_eq!(listing.floor, 2);
        assert_eq!(listing.sqm, 90.0);
    }

    #[test]
    fn empty_page_yields_blanks() {
        let listing = parse_listing_html("https://example.com/c", "<html></html>");
        assert_eq!(listing.price, "Call for Price");
        assert_eq!(listing.address, "");
        assert_eq!(listing.rooms, 0.0);
        assert_eq!(listing.floor, 0);
        assert_eq!(listing.sqm, 0.0);
    }
}
