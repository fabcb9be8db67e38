use super::{derive_city, parse_price};
use crate::models::ApartmentRecord;
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// `addedAt` descending
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
}

/// Grid filters and ordering. Every filter left unset matches everything.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingQuery {
    pub city: Option<String>,
    #[serde(alias = "roomsFilter")]
    pub rooms: Option<f64>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    #[serde(default)]
    pub sort: SortOrder,
}

impl ListingQuery {
    pub fn matches(&self, record: &ApartmentRecord) -> bool {
        if let Some(city) = self.city.as_deref().filter(|c| !c.is_empty()) {
            if derive_city(&record.address) != city {
                return false;
            }
        }
        if let Some(rooms) = self.rooms {
            if record.rooms != rooms {
                return false;
            }
        }

        let price = parse_price(&record.price);
        if self.min_price.is_some_and(|min| price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| price > max) {
            return false;
        }
        true
    }

    /// Filter then sort. The sort is stable, so ties keep collection order.
    pub fn apply(&self, records: &[ApartmentRecord]) -> Vec<ApartmentRecord> {
        let mut selected: Vec<ApartmentRecord> = records
            .iter()
            .filter(|record| self.matches(record))
            .cloned()
            .collect();
        sort_records(&mut selected, self.sort);
        selected
    }
}

pub fn sort_records(records: &mut [ApartmentRecord], order: SortOrder) {
    match order {
        SortOrder::Newest => {
            records.sort_by_key(|r| std::cmp::Reverse(added_at_millis(&r.added_at)))
        }
        SortOrder::PriceAsc => records.sort_by_key(|r| parse_price(&r.price)),
        SortOrder::PriceDesc => {
            records.sort_by_key(|r| std::cmp::Reverse(parse_price(&r.price)))
        }
    }
}

// Unparseable timestamps sort after every real one.
fn added_at_millis(added_at: &str) -> i64 {
    DateTime::parse_from_rfc3339(added_at)
        .map(|t| t.timestamp_millis())
        .unwrap_or(i64::MIN)
}

/// Values offered by the grid's filter dropdowns
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FilterOptions {
    pub cities: Vec<String>,
    pub rooms: Vec<f64>,
}

pub fn filter_options(records: &[ApartmentRecord]) -> FilterOptions {
    let cities: BTreeSet<String> = records
        .iter()
        .map(|r| derive_city(&r.address))
        .filter(|city| !city.is_empty())
        .map(str::to_string)
        .collect();

    let mut rooms: Vec<f64> = records
        .iter()
        .map(|r| r.rooms)
        .filter(|rooms| *rooms != 0.0 && rooms.is_finite())
        .collect();
    rooms.sort_by(f64::total_cmp);
    rooms.dedup();

    FilterOptions {
        cities: cities.into_iter().collect(),
        rooms,
    }
}
