use super::{derive_city, parse_price};
use crate::models::{ApartmentRecord, Status};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatusCounts {
    pub active: usize,
    pub contacted: usize,
    pub visited: usize,
    pub irrelevant: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CityAverage {
    pub city: String,
    pub average_price: i64,
    pub listings: usize,
}

/// Figures for the dashboard's stats bar
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total: usize,
    pub by_status: StatusCounts,
    pub added_today: usize,
    /// Only listings with a parseable, non-zero price count here
    pub city_averages: Vec<CityAverage>,
}

pub fn summarize(records: &[ApartmentRecord], today: NaiveDate) -> Summary {
    let mut summary = Summary {
        total: records.len(),
        ..Default::default()
    };
    let mut per_city: BTreeMap<&str, (i64, usize)> = BTreeMap::new();

    for record in records {
        let counter = match record.status {
            Status::Active => &mut summary.by_status.active,
            Status::Contacted => &mut summary.by_status.contacted,
            Status::Visited => &mut summary.by_status.visited,
            Status::Irrelevant => &mut summary.by_status.irrelevant,
        };
        *counter += 1;

        let added = DateTime::parse_from_rfc3339(&record.added_at)
            .map(|t| t.with_timezone(&Utc).date_naive());
        if added.is_ok_and(|date| date == today) {
            summary.added_today += 1;
        }

        let city = derive_city(&record.address);
        let price = parse_price(&record.price);
        if !city.is_empty() && price > 0 {
            let entry = per_city.entry(city).or_default();
            entry.0 = entry.0.saturating_add(price);
            entry.1 += 1;
        }
    }

    summary.city_averages = per_city
        .into_iter()
        .map(|(city, (sum, count))| CityAverage {
            city: city.to_string(),
            average_price: sum / count as i64,
            listings: count,
        })
        .collect();
    summary
}
