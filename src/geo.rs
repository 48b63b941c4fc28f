//! Spherical geometry helpers
//!
//! Midpoints are computed on the unit sphere rather than by averaging latitude and
//! longitude, which goes wrong near the poles and across the date line.

use haversine::{Location as HaversineLocation, Units, distance};

use crate::error::RendezvousError;
use crate::models::Location;

/// Mean Earth radius used by the haversine distance
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Flat lat/lng threshold under which two history locations count as the same place.
///
/// Roughly 111 m at the equator; the east-west extent shrinks with latitude.
pub const SAME_LOCATION_TOLERANCE_DEGREES: f64 = 0.001;

/// Reject non-finite or out-of-range coordinates
pub fn validate_coordinates(latitude: f64, longitude: f64) -> crate::Result<()> {
    if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
        return Err(RendezvousError::invalid_input(format!(
            "Latitude must be between -90 and 90, got: {latitude}"
        )));
    }
    if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
        return Err(RendezvousError::invalid_input(format!(
            "Longitude must be between -180 and 180, got: {longitude}"
        )));
    }
    Ok(())
}

pub fn validate_location(location: &Location) -> crate::Result<()> {
    validate_coordinates(location.latitude, location.longitude)
}

/// Geographic midpoint of two locations, with an empty address.
pub fn midpoint(a: &Location, b: &Location) -> crate::Result<Location> {
    validate_location(a)?;
    validate_location(b)?;

    let (x1, y1, z1) = to_unit_vector(a);
    let (x2, y2, z2) = to_unit_vector(b);

    let x = (x1 + x2) / 2.0;
    let y = (y1 + y2) / 2.0;
    let z = (z1 + z2) / 2.0;

    let longitude = y.atan2(x);
    let hypotenuse = x.hypot(y);
    let latitude = z.atan2(hypotenuse);

    Ok(Location::from_coordinates(
        latitude.to_degrees(),
        longitude.to_degrees(),
    ))
}

fn to_unit_vector(location: &Location) -> (f64, f64, f64) {
    let lat = location.latitude.to_radians();
    let lon = location.longitude.to_radians();
    (lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin())
}

/// Great-circle distance in meters (haversine)
#[must_use]
pub fn distance_meters(a: &Location, b: &Location) -> f64 {
    let from = HaversineLocation {
        latitude: a.latitude,
        longitude: a.longitude,
    };
    let to = HaversineLocation {
        latitude: b.latitude,
        longitude: b.longitude,
    };
    distance(from, to, Units::Kilometers) * 1000.0
}

/// History dedup check: both coordinates within [`SAME_LOCATION_TOLERANCE_DEGREES`].
#[must_use]
pub fn is_same_location(a: &Location, b: &Location) -> bool {
    (a.latitude - b.latitude).abs() < SAME_LOCATION_TOLERANCE_DEGREES
        && (a.longitude - b.longitude).abs() < SAME_LOCATION_TOLERANCE_DEGREES
}
