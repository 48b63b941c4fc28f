//! Place provider capability consumed by the search core
//!
//! Adapters own transport concerns (timeouts, authentication, wire format) and report
//! failures as [`RendezvousError`](crate::RendezvousError) kinds the core can classify.

use async_trait::async_trait;
use std::sync::Arc;

use crate::models::{Location, RawPlace, VenueCategory};

#[async_trait]
pub trait PlaceProvider: Send + Sync {
    /// Resolve an address.
    ///
    /// Fails with `LocationNotFound`, `GeocodingFailed`, `QuotaExceeded` or `InvalidInput`.
    async fn geocode(&self, address: &str) -> crate::Result<Location>;

    /// Address for coordinates; falls back to [`coordinate_label`] instead of failing.
    async fn reverse_geocode(&self, latitude: f64, longitude: f64) -> String;

    /// Candidates of one category around `location`.
    ///
    /// Fails with `QuotaExceeded`, `Network` or `PlacesSearchFailed`.
    async fn search_nearby(
        &self,
        location: &Location,
        category: VenueCategory,
        radius_meters: u32,
    ) -> crate::Result<Vec<RawPlace>>;

    /// Full record of one place. Fails with `PlaceDetailsFailed` or `QuotaExceeded`.
    async fn place_details(&self, provider_id: &str) -> crate::Result<RawPlace>;
}

pub type SharedProvider = Arc<dyn PlaceProvider>;

/// `"lat, lng"` text used when no address is known
#[must_use]
pub fn coordinate_label(latitude: f64, longitude: f64) -> String {
    format!("{latitude:.4}, {longitude:.4}")
}
