use serde::{Deserialize, Serialize};

/// Best-effort fields pulled from a listing page. Any of them may come
/// back blank or zero; the caller reviews them before saving.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapedListing {
    pub url: String,
    pub price: String,
    pub address: String,
    pub rooms: f64,
    pub floor: i32,
    pub sqm: f64,
    pub image_url: String,
    pub description: String,
    /// When the page was fetched
    pub posted_time: String,
}
