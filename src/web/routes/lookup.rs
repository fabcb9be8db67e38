use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use crate::models::GeoPoint;
use crate::scrapers::ScrapedListing;
use crate::web::{AppError, AppState};

#[derive(Deserialize)]
pub struct ScrapeRequest {
    url: Option<String>,
}

#[derive(Serialize)]
pub struct ScrapeResponse {
    success: bool,
    data: ScrapedListing,
}

#[derive(Deserialize)]
pub struct GeocodeQuery {
    address: Option<String>,
}

/// Best-effort extraction of a listing page. Failures come back as 502 so
/// the client can fall back to the manual entry form.
async fn scrape_handler(
    State(app_state): State<Arc<AppState>>,
    payload: Result<Json<ScrapeRequest>, JsonRejection>,
) -> Result<Json<ScrapeResponse>, AppError> {
    let Json(payload) = payload?;
    let url = payload
        .url
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AppError::InvalidInput("URL is required".to_string()))?;

    info!(url = %url, backend = app_state.scraper.source_name(), "Scraping listing");
    let data = app_state.scraper.scrape(&url).await.map_err(|e| {
        warn!(url = %url, error = ?e, "Scraping failed");
        AppError::Upstream("Failed to scrape URL".to_string())
    })?;

    Ok(Json(ScrapeResponse {
        success: true,
        data,
    }))
}

async fn geocode_handler(
    State(app_state): State<Arc<AppState>>,
    query: Result<Query<GeocodeQuery>, QueryRejection>,
) -> Result<Json<GeoPoint>, AppError> {
    let Query(query) = query?;
    let address = query
        .address
        .filter(|a| !a.trim().is_empty())
        .ok_or_else(|| AppError::InvalidInput("Address is required".to_string()))?;

    let location = app_state.geocoder.geocode(&address).await.map_err(|e| {
        warn!(address = %address, error = ?e, "Geocoding failed");
        AppError::Upstream("Failed to geocode address".to_string())
    })?;

    location
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No location found for '{address}'")))
}

pub fn create_lookup_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/scrape", post(scrape_handler))
        .route("/api/geocode", get(geocode_handler))
}
