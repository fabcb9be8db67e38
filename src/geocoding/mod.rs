use crate::models::GeoPoint;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// Free-text address to coordinates
#[async_trait]
pub trait GeocoderTrait: Send + Sync {
    /// `Ok(None)` when the service has no match for the address
    async fn geocode(&self, address: &str) -> Result<Option<GeoPoint>>;
}

/// One entry of a Nominatim `search` response. Coordinates arrive as strings.
#[derive(Debug, Deserialize)]
pub struct NominatimPlace {
    pub lat: String,
    pub lon: String,
    #[serde(default)]
    pub display_name: String,
}

pub struct NominatimGeocoder {
    client: Client,
    base_url: String,
}

impl NominatimGeocoder {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            // Nominatim's usage policy requires an identifying agent
            .user_agent(concat!("apartment-board/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl GeocoderTrait for NominatimGeocoder {
    async fn geocode(&self, address: &str) -> Result<Option<GeoPoint>> {
        let url = format!("{}/search", self.base_url);
        debug!("Geocoding '{}'", address);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", address),
                ("format", "json"),
                ("limit", "1"),
                ("addressdetails", "1"),
            ])
            .header("Accept-Language", "en-US,en;q=0.9,he;q=0.8")
            .send()
            .await
            .context("Failed to reach geocoding service")?;

        if !response.status().is_success() {
            warn!("Geocoding service returned status: {}", response.status());
            anyhow::bail!("Geocoding failed: {}", response.status());
        }

        let places: Vec<NominatimPlace> = response
            .json()
            .await
            .context("Failed to decode geocoding response")?;
        Ok(first_match(&places))
    }
}

pub fn first_match(places: &[NominatimPlace]) -> Option<GeoPoint> {
    let place = places.first()?;
    let lat = place.lat.parse().ok()?;
    let lng = place.lon.parse().ok()?;
    debug!("Geocoded to {} ({}, {})", place.display_name, lat, lng);
    Some(GeoPoint { lat, lng })
}
