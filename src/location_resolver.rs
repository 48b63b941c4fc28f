//! Location Resolution Module
//!
//! Turns free-form user input (coordinates or an address) into a structured
//! [`Location`] through the place provider.

use tracing::debug;

use crate::error::RendezvousError;
use crate::geo;
use crate::models::Location;
use crate::provider::PlaceProvider;
use crate::retry::{RetryPolicy, retry_provider_call};

/// Types of location input
#[derive(Debug, Clone, PartialEq)]
pub enum LocationInput {
    /// Coordinates (latitude, longitude)
    Coordinates(f64, f64),
    /// Address or place name
    Address(String),
}

/// Location parsing utilities
pub struct LocationParser;

impl LocationParser {
    /// Parse location input; anything that is not valid coordinates is an address
    pub fn parse(input: &str) -> crate::Result<LocationInput> {
        let input = input.trim();
        if input.is_empty() {
            return Err(RendezvousError::invalid_input("Location cannot be empty"));
        }

        if let Some((lat, lon)) = Self::parse_coordinates(input) {
            return Ok(LocationInput::Coordinates(lat, lon));
        }

        Ok(LocationInput::Address(input.to_string()))
    }

    /// Parse coordinates from string like "46.8182,8.2275" or "46.8182 8.2275"
    #[must_use]
    pub fn parse_coordinates(input: &str) -> Option<(f64, f64)> {
        let parts: Vec<&str> = input
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .collect();

        if parts.len() != 2 {
            return None;
        }

        let lat = parts[0].parse::<f64>().ok()?;
        let lon = parts[1].parse::<f64>().ok()?;
        geo::validate_coordinates(lat, lon).ok()?;
        Some((lat, lon))
    }
}

/// Service for resolving location inputs
pub struct LocationResolver;

impl LocationResolver {
    /// Resolve user input into a structured Location
    pub async fn resolve(
        provider: &dyn PlaceProvider,
        retry_policy: &RetryPolicy,
        input: &str,
    ) -> crate::Result<Location> {
        debug!("Resolving location input: {:?}", input);

        let location = match LocationParser::parse(input)? {
            LocationInput::Coordinates(lat, lon) => {
                Self::resolve_coordinates(provider, lat, lon).await
            }
            LocationInput::Address(address) => {
                Self::resolve_address(provider, retry_policy, &address).await?
            }
        };

        debug!(
            "Resolved location: {} at ({}, {})",
            location.address, location.latitude, location.longitude
        );

        Ok(location)
    }

    /// Coordinates with a name from reverse geocoding
    pub async fn resolve_coordinates(
        provider: &dyn PlaceProvider,
        lat: f64,
        lon: f64,
    ) -> Location {
        let address = provider.reverse_geocode(lat, lon).await;
        Location::new(lat, lon, address)
    }

    async fn resolve_address(
        provider: &dyn PlaceProvider,
        retry_policy: &RetryPolicy,
        address: &str,
    ) -> crate::Result<Location> {
        debug!("Geocoding address: {}", address);
        let location =
            retry_provider_call(retry_policy, "geocode", || provider.geocode(address)).await?;
        geo::validate_location(&location)?;
        Ok(location)
    }
}
