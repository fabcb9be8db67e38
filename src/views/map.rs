use crate::models::{ApartmentRecord, GeoPoint};
use serde::Serialize;

const EARTH_RADIUS_KM: f64 = 6371.0;

/// Half-width, in degrees, of the box pseudo-locations are spread over
const FALLBACK_SPREAD_DEG: f64 = 0.05;

/// Great-circle distance in kilometres, rounded to one decimal place.
pub fn haversine_km(from: GeoPoint, to: GeoPoint) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lng = (to.lng - from.lng).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + from.lat.to_radians().cos() * to.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    (EARTH_RADIUS_KM * c * 10.0).round() / 10.0
}

/// Deterministic stand-in position near `center` for a record that was
/// never geocoded. Display only; never written back to the record.
pub fn pseudo_location(id: &str, center: GeoPoint) -> GeoPoint {
    let seed = id
        .encode_utf16()
        .fold(0u64, |acc, unit| acc.wrapping_add(u64::from(unit)));
    GeoPoint {
        lat: center.lat + ((seed % 100) as f64 / 100.0 - 0.5) * FALLBACK_SPREAD_DEG,
        lng: center.lng + ((seed % 77) as f64 / 77.0 - 0.5) * FALLBACK_SPREAD_DEG,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapMarker {
    pub id: String,
    pub address: String,
    pub price: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub location: GeoPoint,
    /// True when `location` is a pseudo-location rather than a geocode
    pub approximate: bool,
    /// Straight-line distance to the reference point, when one is set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_km: Option<f64>,
}

/// Map markers for a collection. Records without a location are dropped
/// unless `fallback_center` is given, in which case they get a
/// pseudo-location around it.
pub fn project_markers(
    records: &[ApartmentRecord],
    reference: Option<GeoPoint>,
    fallback_center: Option<GeoPoint>,
) -> Vec<MapMarker> {
    records
        .iter()
        .filter_map(|record| {
            let (location, approximate) = match (record.location, fallback_center) {
                (Some(location), _) => (location, false),
                (None, Some(center)) => (pseudo_location(&record.id, center), true),
                (None, None) => return None,
            };
            Some(MapMarker {
                id: record.id.clone(),
                address: record.address.clone(),
                price: record.price.clone(),
                image_url: record.image_url.clone(),
                location,
                approximate,
                distance_km: reference.map(|point| haversine_km(point, location)),
            })
        })
        .collect()
}
