//! Venue categories, raw provider candidates and ranked venues

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::Location;
use crate::error::RendezvousError;

/// Kinds of venue a search can ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VenueCategory {
    Restaurant,
    Cafe,
    Bar,
    Park,
    ShoppingMall,
    MovieTheater,
    Museum,
    Gym,
    Library,
    TouristAttraction,
}

impl VenueCategory {
    pub const ALL: [VenueCategory; 10] = [
        VenueCategory::Restaurant,
        VenueCategory::Cafe,
        VenueCategory::Bar,
        VenueCategory::Park,
        VenueCategory::ShoppingMall,
        VenueCategory::MovieTheater,
        VenueCategory::Museum,
        VenueCategory::Gym,
        VenueCategory::Library,
        VenueCategory::TouristAttraction,
    ];

    /// Identifier used on the wire and in persisted data
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            VenueCategory::Restaurant => "RESTAURANT",
            VenueCategory::Cafe => "CAFE",
            VenueCategory::Bar => "BAR",
            VenueCategory::Park => "PARK",
            VenueCategory::ShoppingMall => "SHOPPING_MALL",
            VenueCategory::MovieTheater => "MOVIE_THEATER",
            VenueCategory::Museum => "MUSEUM",
            VenueCategory::Gym => "GYM",
            VenueCategory::Library => "LIBRARY",
            VenueCategory::TouristAttraction => "TOURIST_ATTRACTION",
        }
    }

    /// Place type understood by the provider
    #[must_use]
    pub fn provider_type(self) -> &'static str {
        match self {
            VenueCategory::Restaurant => "restaurant",
            VenueCategory::Cafe => "cafe",
            VenueCategory::Bar => "bar",
            VenueCategory::Park => "park",
            VenueCategory::ShoppingMall => "shopping_mall",
            VenueCategory::MovieTheater => "movie_theater",
            VenueCategory::Museum => "museum",
            VenueCategory::Gym => "gym",
            VenueCategory::Library => "library",
            VenueCategory::TouristAttraction => "tourist_attraction",
        }
    }

    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            VenueCategory::Restaurant => "Restaurant",
            VenueCategory::Cafe => "Cafe",
            VenueCategory::Bar => "Bar",
            VenueCategory::Park => "Park",
            VenueCategory::ShoppingMall => "Shopping Mall",
            VenueCategory::MovieTheater => "Movie Theater",
            VenueCategory::Museum => "Museum",
            VenueCategory::Gym => "Gym",
            VenueCategory::Library => "Library",
            VenueCategory::TouristAttraction => "Tourist Attraction",
        }
    }
}

impl fmt::Display for VenueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for VenueCategory {
    type Err = RendezvousError;

    /// Accepts `RESTAURANT`, `restaurant`, `shopping-mall` or `Shopping Mall`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| match c {
                '-' | ' ' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect();

        VenueCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == normalized)
            .ok_or_else(|| RendezvousError::invalid_input(format!("Unknown venue category: {s}")))
    }
}

/// Candidate place as reported by the provider, before ranking
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RawPlace {
    pub provider_id: String,
    pub name: String,
    #[serde(default)]
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub rating_count: Option<u32>,
    #[serde(default)]
    pub price_level: Option<u8>,
    #[serde(default)]
    pub open_now: Option<bool>,
    #[serde(default)]
    pub categories: Vec<VenueCategory>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

impl RawPlace {
    #[must_use]
    pub fn location(&self) -> Location {
        Location::new(self.latitude, self.longitude, self.address.clone())
            .with_provider_id(self.provider_id.clone())
    }
}

/// A ranked recommendation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Venue {
    pub provider_id: String,
    pub name: String,
    pub address: String,
    pub location: Location,
    /// Average rating in `0.0..=5.0`
    pub rating: f64,
    pub rating_count: u32,
    /// Price bracket `1..=4`, if the provider knows it
    pub price_level: Option<u8>,
    /// Distance to the search midpoint, fixed when the venue is built
    pub distance_meters: f64,
    pub open_now: bool,
    pub categories: Vec<VenueCategory>,
    pub website: Option<String>,
    pub phone_number: Option<String>,
}

impl Venue {
    /// Build a venue from a provider candidate and its precomputed distance.
    ///
    /// Ratings are clamped to `0..=5` and price levels outside `1..=4` are dropped.
    #[must_use]
    pub fn from_raw(raw: RawPlace, distance_meters: f64) -> Self {
        let location = raw.location();
        let rating = raw
            .rating
            .filter(|r| r.is_finite())
            .map_or(0.0, |r| r.clamp(0.0, 5.0));
        Self {
            location,
            provider_id: raw.provider_id,
            name: raw.name,
            address: raw.address,
            rating,
            rating_count: raw.rating_count.unwrap_or(0),
            price_level: raw.price_level.filter(|p| (1..=4).contains(p)),
            distance_meters: distance_meters.max(0.0),
            open_now: raw.open_now.unwrap_or(false),
            categories: raw.categories,
            website: raw.website,
            phone_number: raw.phone_number,
        }
    }

    /// Record an additional category without duplicating existing ones
    pub fn add_category(&mut self, category: VenueCategory) {
        if !self.categories.contains(&category) {
            self.categories.push(category);
            self.categories.sort();
        }
    }

    /// `$`..`$$$$` rendering of the price level
    #[must_use]
    pub fn format_price(&self) -> String {
        self.price_level
            .map(|level| "$".repeat(usize::from(level)))
            .unwrap_or_default()
    }

    #[must_use]
    pub fn format_distance(&self) -> String {
        if self.distance_meters < 1000.0 {
            format!("{:.0} m", self.distance_meters)
        } else {
            format!("{:.1} km", self.distance_meters / 1000.0)
        }
    }
}
