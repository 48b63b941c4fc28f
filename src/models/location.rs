//! Location model for geographic coordinates and metadata

use serde::{Deserialize, Serialize};

/// A resolved point on the map
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Location {
    /// Human readable address; empty when unresolved (e.g. a computed midpoint)
    pub address: String,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Provider place identifier, when the location came from the provider
    #[serde(default)]
    pub provider_id: Option<String>,
}

impl Location {
    /// Create a new location
    #[must_use]
    pub fn new(latitude: f64, longitude: f64, address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            latitude,
            longitude,
            provider_id: None,
        }
    }

    /// Create a location without an address
    #[must_use]
    pub fn from_coordinates(latitude: f64, longitude: f64) -> Self {
        Self::new(latitude, longitude, String::new())
    }

    #[must_use]
    pub fn with_provider_id(mut self, provider_id: impl Into<String>) -> Self {
        self.provider_id = Some(provider_id.into());
        self
    }

    #[must_use]
    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }

    /// Format location as coordinates string
    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }

    /// Round coordinates to `precision` decimal places
    #[must_use]
    pub fn rounded_coordinates(&self, precision: u32) -> (f64, f64) {
        let multiplier = 10_f64.powi(i32::try_from(precision).unwrap_or(6));
        let lat = (self.latitude * multiplier).round() / multiplier;
        let lon = (self.longitude * multiplier).round() / multiplier;
        (lat, lon)
    }

    /// Stable textual key of the rounded coordinates, used for grouping and fingerprints
    #[must_use]
    pub fn coordinate_key(&self, precision: u32) -> String {
        let (lat, lon) = self.rounded_coordinates(precision);
        let precision = precision as usize;
        // -0.0 and 0.0 must produce the same key
        format!("{:.precision$},{:.precision$}", lat + 0.0, lon + 0.0)
    }

    /// Address if known, otherwise the coordinates
    #[must_use]
    pub fn label(&self) -> String {
        if self.address.trim().is_empty() {
            self.format_coordinates()
        } else {
            self.address.clone()
        }
    }
}
