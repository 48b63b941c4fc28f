//! Data models for the rendezvous library
//!
//! This module contains the core domain models organized by concern:
//! - Location: Geographic coordinates and metadata
//! - Venue: Categories, provider candidates and ranked venues
//! - Search: Search requests and results

pub mod location;
pub mod search;
pub mod venue;

// Re-export all public types for convenient access
pub use location::Location;
pub use search::{SearchParams, SearchResult, category_set_key};
pub use venue::{RawPlace, Venue, VenueCategory};
