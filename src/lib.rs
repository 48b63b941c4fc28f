//! Rendezvous - find places to meet halfway
//!
//! This library computes the geographic midpoint between two locations, searches a
//! place provider for venues around it, and keeps a cache of recent searches plus a
//! persisted search history.

pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod geo;
pub mod history;
pub mod location_resolver;
pub mod models;
pub mod orchestrator;
pub mod preferences;
pub mod provider;
pub mod retry;
pub mod services;
pub mod storage;

// Re-export core types for public API
pub use cache::{SearchCache, SweepHandle};
pub use catalog::{Catalog, CatalogPlaceProvider};
pub use config::RendezvousConfig;
pub use error::{ErrorCode, RendezvousError};
pub use history::{HistoryItem, HistorySnapshot, ImportReport, SearchHistoryStore};
pub use location_resolver::{LocationInput, LocationParser, LocationResolver};
pub use models::{Location, RawPlace, SearchParams, SearchResult, Venue, VenueCategory};
pub use orchestrator::SearchOrchestrator;
pub use preferences::CategoryPreferences;
pub use provider::{PlaceProvider, SharedProvider};
pub use retry::RetryPolicy;
pub use services::Services;
pub use storage::{FjallStore, KeyValueStore, MemoryStore, SharedStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, RendezvousError>;
