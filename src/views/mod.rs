//! Display projections derived from a user's collection. Nothing here
//! touches the store.

pub mod filter;
pub mod kanban;
pub mod map;
pub mod stats;

pub use filter::{filter_options, FilterOptions, ListingQuery, SortOrder};
pub use kanban::{group_by_status, KanbanBoard};
pub use map::{haversine_km, project_markers, MapMarker};
pub use stats::{summarize, Summary};

/// City heuristic: the last comma-separated part of the address.
pub fn derive_city(address: &str) -> &str {
    address.rsplit(',').next().unwrap_or_default().trim()
}

/// Numeric value of a free-text price: every non-digit is dropped, and an
/// empty or out-of-range remainder counts as 0.
pub fn parse_price(price: &str) -> i64 {
    let digits: String = price.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}
