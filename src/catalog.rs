//! File-backed place provider
//!
//! Loads a JSON catalog of known addresses (the gazetteer) and places, and answers
//! provider calls from it. Used by the CLI and for offline runs.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

use crate::error::RendezvousError;
use crate::geo;
use crate::models::{Location, RawPlace, VenueCategory};
use crate::provider::{PlaceProvider, coordinate_label};

/// Reverse geocoding only reports gazetteer entries this close
const REVERSE_GEOCODE_MAX_METERS: f64 = 1000.0;

/// On-disk catalog format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub gazetteer: Vec<Location>,
    #[serde(default)]
    pub places: Vec<RawPlace>,
}

pub struct CatalogPlaceProvider {
    catalog: Catalog,
}

impl CatalogPlaceProvider {
    #[must_use]
    pub fn new(catalog: Catalog) -> Self {
        Self { catalog }
    }

    /// Load a catalog from a JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file: {}", path.display()))?;
        let catalog: Catalog = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse catalog file: {}", path.display()))?;

        info!(
            "Loaded catalog with {} addresses and {} places from {}",
            catalog.gazetteer.len(),
            catalog.places.len(),
            path.display()
        );
        Ok(Self::new(catalog))
    }

    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

#[async_trait]
impl PlaceProvider for CatalogPlaceProvider {
    async fn geocode(&self, address: &str) -> crate::Result<Location> {
        let query = address.trim().to_lowercase();
        if query.is_empty() {
            return Err(RendezvousError::invalid_input("Address cannot be empty"));
        }

        let gazetteer = &self.catalog.gazetteer;
        let found = gazetteer
            .iter()
            .find(|entry| entry.address.to_lowercase() == query)
            .or_else(|| {
                gazetteer
                    .iter()
                    .find(|entry| entry.address.to_lowercase().contains(&query))
            });

        match found {
            Some(location) => {
                debug!("Geocoded '{}' to {}", address, location.format_coordinates());
                Ok(location.clone())
            }
            None => Err(RendezvousError::location_not_found(address)),
        }
    }

    async fn reverse_geocode(&self, latitude: f64, longitude: f64) -> String {
        let point = Location::from_coordinates(latitude, longitude);
        self.catalog
            .gazetteer
            .iter()
            .map(|entry| (entry, geo::distance_meters(&point, entry)))
            .filter(|(_, distance)| *distance <= REVERSE_GEOCODE_MAX_METERS)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map_or_else(
                || coordinate_label(latitude, longitude),
                |(entry, _)| entry.address.clone(),
            )
    }

    async fn search_nearby(
        &self,
        location: &Location,
        category: VenueCategory,
        radius_meters: u32,
    ) -> crate::Result<Vec<RawPlace>> {
        geo::validate_location(location)?;
        let radius = f64::from(radius_meters);

        let places: Vec<RawPlace> = self
            .catalog
            .places
            .iter()
            .filter(|place| place.categories.contains(&category))
            .filter(|place| geo::distance_meters(location, &place.location()) <= radius)
            .cloned()
            .collect();

        debug!(
            "Catalog search for {} within {}m returned {} places",
            category.display_name(),
            radius_meters,
            places.len()
        );
        Ok(places)
    }

    async fn place_details(&self, provider_id: &str) -> crate::Result<RawPlace> {
        self.catalog
            .places
            .iter()
            .find(|place| place.provider_id == provider_id)
            .cloned()
            .ok_or_else(|| {
                RendezvousError::place_details_failed(format!("Unknown place: {provider_id}"))
            })
    }
}
