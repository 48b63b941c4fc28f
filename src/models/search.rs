//! Search request and response models

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::{Location, Venue, VenueCategory};

/// A request for venues between two locations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchParams {
    pub location1: Location,
    pub location2: Location,
    /// Ordered set, so the order categories were chosen in never matters
    pub venue_categories: BTreeSet<VenueCategory>,
    pub radius_meters: u32,
    #[serde(default)]
    pub max_results: Option<usize>,
}

impl SearchParams {
    #[must_use]
    pub fn new(
        location1: Location,
        location2: Location,
        venue_categories: impl IntoIterator<Item = VenueCategory>,
        radius_meters: u32,
    ) -> Self {
        Self {
            location1,
            location2,
            venue_categories: venue_categories.into_iter().collect(),
            radius_meters,
            max_results: None,
        }
    }

    #[must_use]
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }
}

/// Outcome of a search flow
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub venues: Vec<Venue>,
    pub midpoint: Location,
    pub from_cache: bool,
    pub search_time_ms: u64,
    /// Venues found before `max_results` truncation
    pub total_results: usize,
}

/// Sorted, comma separated wire names of a category set
#[must_use]
pub fn category_set_key(categories: &BTreeSet<VenueCategory>) -> String {
    categories
        .iter()
        .map(|category| category.as_str())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_order_is_irrelevant() {
        let a = SearchParams::new(
            Location::from_coordinates(1.0, 2.0),
            Location::from_coordinates(3.0, 4.0),
            [VenueCategory::Park, VenueCategory::Cafe],
            1000,
        );
        let b = SearchParams::new(
            Location::from_coordinates(1.0, 2.0),
            Location::from_coordinates(3.0, 4.0),
            [VenueCategory::Cafe, VenueCategory::Park, VenueCategory::Cafe],
            1000,
        );
        assert_eq!(a, b);
        assert_eq!(category_set_key(&a.venue_categories), "CAFE,PARK");
    }
}
