use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Prefix of the synthetic `url` given to hand-entered records.
pub const MANUAL_URL_PREFIX: &str = "manual-";

/// Lifecycle stage of a tracked listing
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Active,
    Contacted,
    Visited,
    Irrelevant,
}

impl Status {
    /// Kanban column order
    pub const ALL: [Status; 4] = [
        Status::Active,
        Status::Contacted,
        Status::Visited,
        Status::Irrelevant,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Active => "active",
            Status::Contacted => "contacted",
            Status::Visited => "visited",
            Status::Irrelevant => "irrelevant",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status '{0}' (expected active, contacted, visited or irrelevant)")]
pub struct UnknownStatus(pub String);

impl FromStr for Status {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Status::Active),
            "contacted" => Ok(Status::Contacted),
            "visited" => Ok(Status::Visited),
            "irrelevant" => Ok(Status::Irrelevant),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

// Stored files may carry statuses written by older clients. Anything
// unrecognized (or null) lands in the active bucket instead of failing
// the whole collection.
impl<'de> Deserialize<'de> for Status {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(match raw {
            Some(value) => value.parse().unwrap_or_else(|_| {
                warn!(status = %value, "Unrecognized apartment status, treating as active");
                Status::Active
            }),
            None => Status::Active,
        })
    }
}

/// Geographic point in WGS84 degrees
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// One tracked apartment listing, as persisted in a user's file.
///
/// Every field is read leniently: a missing, `null` or mistyped value falls
/// back to its default so one odd field never drops a record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct ApartmentRecord {
    #[serde(deserialize_with = "lenient")]
    pub id: String,
    #[serde(deserialize_with = "lenient")]
    pub user_id: String,
    #[serde(deserialize_with = "lenient")]
    pub url: String,
    #[serde(deserialize_with = "lenient")]
    pub price: String,
    #[serde(deserialize_with = "lenient")]
    pub address: String,
    #[serde(deserialize_with = "lenient")]
    pub rooms: f64,
    #[serde(deserialize_with = "lenient")]
    pub floor: i32,
    #[serde(deserialize_with = "lenient")]
    pub sqm: f64,
    #[serde(deserialize_with = "lenient")]
    pub has_parking: bool,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub contact_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub contact_phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub entry_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub description: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub posted_time: String,
    #[serde(deserialize_with = "lenient")]
    pub added_at: String,
    pub status: Status,
    #[serde(deserialize_with = "lenient")]
    pub pros: Vec<String>,
    #[serde(deserialize_with = "lenient")]
    pub cons: Vec<String>,
    #[serde(deserialize_with = "lenient")]
    pub amenities: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "lenient")]
    pub location: Option<GeoPoint>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(T::default());
    }
    Ok(T::deserialize(value).unwrap_or_else(|e| {
        warn!(error = %e, "Unreadable apartment field, using default");
        T::default()
    }))
}

impl ApartmentRecord {
    /// Hand-entered records never take part in url deduplication.
    pub fn is_manual(&self) -> bool {
        is_manual_url(&self.url)
    }
}

pub fn is_manual_url(url: &str) -> bool {
    url.starts_with(MANUAL_URL_PREFIX)
}

/// Body of a create request: a record without the server-assigned fields
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewApartment {
    pub url: Option<String>,
    pub price: String,
    pub address: String,
    pub rooms: f64,
    pub floor: i32,
    pub sqm: f64,
    pub has_parking: bool,
    pub contact_name: Option<String>,
    pub contact_phone: Option<String>,
    pub entry_date: Option<String>,
    pub image_url: Option<String>,
    pub description: Option<String>,
    pub posted_time: String,
    pub status: Option<Status>,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    pub amenities: BTreeMap<String, String>,
    pub location: Option<GeoPoint>,
}

/// Shallow partial update. Absent fields are left untouched; nullable
/// fields can be cleared with an explicit `null`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApartmentPatch {
    #[serde(default)]
    pub id: Option<String>,
    pub url: Option<String>,
    pub price: Option<String>,
    pub address: Option<String>,
    pub rooms: Option<f64>,
    pub floor: Option<i32>,
    pub sqm: Option<f64>,
    pub has_parking: Option<bool>,
    #[serde(default, deserialize_with = "nullable")]
    pub contact_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub contact_phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub entry_date: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub image_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    pub posted_time: Option<String>,
    #[serde(default, deserialize_with = "strict_status")]
    pub status: Option<Status>,
    pub pros: Option<Vec<String>>,
    pub cons: Option<Vec<String>>,
    pub amenities: Option<BTreeMap<String, String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub location: Option<Option<GeoPoint>>,
}

impl ApartmentPatch {
    /// Patch that only moves a record to another kanban column
    pub fn status(id: impl Into<String>, status: Status) -> Self {
        Self {
            id: Some(id.into()),
            status: Some(status),
            ..Self::default()
        }
    }

    /// Overwrite every field present in the patch. `id`, `userId` and
    /// `addedAt` are never touched.
    pub fn apply_to(self, record: &mut ApartmentRecord) {
        if let Some(url) = self.url {
            record.url = url;
        }
        if let Some(price) = self.price {
            record.price = price;
        }
        if let Some(address) = self.address {
            record.address = address;
        }
        if let Some(rooms) = self.rooms {
            record.rooms = rooms;
        }
        if let Some(floor) = self.floor {
            record.floor = floor;
        }
        if let Some(sqm) = self.sqm {
            record.sqm = sqm;
        }
        if let Some(has_parking) = self.has_parking {
            record.has_parking = has_parking;
        }
        if let Some(contact_name) = self.contact_name {
            record.contact_name = contact_name;
        }
        if let Some(contact_phone) = self.contact_phone {
            record.contact_phone = contact_phone;
        }
        if let Some(entry_date) = self.entry_date {
            record.entry_date = entry_date;
        }
        if let Some(image_url) = self.image_url {
            record.image_url = image_url;
        }
        if let Some(description) = self.description {
            record.description = description;
        }
        if let Some(posted_time) = self.posted_time {
            record.posted_time = posted_time;
        }
        if let Some(status) = self.status {
            record.status = status;
        }
        if let Some(pros) = self.pros {
            record.pros = pros;
        }
        if let Some(cons) = self.cons {
            record.cons = cons;
        }
        if let Some(amenities) = self.amenities {
            record.amenities = amenities;
        }
        if let Some(location) = self.location {
            record.location = location;
        }
    }
}

fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn strict_status<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Status>, D::Error> {
    match Option::<String>::deserialize(deserializer)? {
        Some(value) => value.parse().map(Some).map_err(serde::de::Error::custom),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_and_mistyped_fields_fall_back_to_defaults() {
        let record: ApartmentRecord = serde_json::from_value(json!({
            "id": "keep1",
            "url": "https://example.com/1",
            "price": "₪5,000",
            "rooms": null,
            "floor": "ground",
            "sqm": 70,
            "pros": "quiet",
            "location": { "lat": "north" },
            "status": "visited"
        }))
        .unwrap();

        assert_eq!(record.id, "keep1");
        assert_eq!(record.price, "₪5,000");
        assert_eq!(record.rooms, 0.0);
        assert_eq!(record.floor, 0);
        assert_eq!(record.sqm, 70.0);
        assert!(record.pros.is_empty());
        assert_eq!(record.location, None);
        assert_eq!(record.status, Status::Visited);
    }

    #[test]
    fn record_defaults_missing_fields() {
        let record: ApartmentRecord = serde_json::from_value(json!({
            "id": "abc",
            "url": "https://example.com/1",
            "price": "₪5,000",
            "address": "Dizengoff 100, Tel Aviv"
        }))
        .unwrap();

        assert_eq!(record.status, Status::Active);
        assert_eq!(record.rooms, 0.0);
        assert!(record.pros.is_empty());
        assert!(record.location.is_none());
    }

    #[test]
    fn unknown_stored_status_reads_as_active() {
        let record: ApartmentRecord =
            serde_json::from_value(json!({ "id": "x", "status": "archived" })).unwrap();
        assert_eq!(record.status, Status::Active);
    }

    #[test]
    fn record_serializes_camel_case() {
        let record = ApartmentRecord {
            id: "a1".into(),
            has_parking: true,
            added_at: "2024-05-01T10:00:00.000Z".into(),
            status: Status::Visited,
            ..Default::default()
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["hasParking"], json!(true));
        assert_eq!(value["addedAt"], json!("2024-05-01T10:00:00.000Z"));
        assert_eq!(value["status"], json!("visited"));
        assert!(value.get("contactName").is_none());
    }

    #[test]
    fn patch_rejects_unknown_status() {
        let result: Result<ApartmentPatch, _> =
            serde_json::from_value(json!({ "id": "a1", "status": "archived" }));
        assert!(result.is_err());
    }

    #[test]
    fn patch_overwrites_only_present_fields() {
        let mut record = ApartmentRecord {
            id: "a1".into(),
            price: "4,000".into(),
            contact_name: Some("Dana".into()),
            pros: vec!["quiet".into()],
            ..Default::default()
        };

        let patch: ApartmentPatch = serde_json::from_value(json!({
            "id": "ignored",
            "price": "4,200",
            "contactName": null,
            "status": "contacted"
        }))
        .unwrap();
        patch.apply_to(&mut record);

        assert_eq!(record.id, "a1");
        assert_eq!(record.price, "4,200");
        assert_eq!(record.contact_name, None);
        assert_eq!(record.status, Status::Contacted);
        assert_eq!(record.pros, vec!["quiet".to_string()]);
    }

    #[test]
    fn manual_marker_detection() {
        assert!(is_manual_url("manual-1700000000000"));
        assert!(!is_manual_url("https://www.yad2.co.il/item/abc"));
    }
}
