//! Error types and classification for the rendezvous library

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Stable error kinds surfaced by the search core and the place provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidInput,
    LocationNotFound,
    GeocodingFailed,
    PlacesSearchFailed,
    PlaceDetailsFailed,
    NetworkError,
    QuotaExceeded,
    Config,
    Storage,
}

impl ErrorCode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::LocationNotFound => "LOCATION_NOT_FOUND",
            ErrorCode::GeocodingFailed => "GEOCODING_FAILED",
            ErrorCode::PlacesSearchFailed => "PLACES_SEARCH_FAILED",
            ErrorCode::PlaceDetailsFailed => "PLACE_DETAILS_FAILED",
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::QuotaExceeded => "QUOTA_EXCEEDED",
            ErrorCode::Config => "CONFIG",
            ErrorCode::Storage => "STORAGE",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for the rendezvous library
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RendezvousError {
    /// Malformed request or out-of-range coordinates
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    /// The provider has no match for an address
    #[error("Location not found: {query}")]
    LocationNotFound { query: String },

    #[error("Geocoding failed: {message}")]
    GeocodingFailed { message: String },

    #[error("Places search failed: {message}")]
    PlacesSearchFailed { message: String },

    #[error("Place details failed: {message}")]
    PlaceDetailsFailed { message: String },

    /// Transport-level failure reported by the provider adapter
    #[error("Network error: {message}")]
    Network { message: String },

    /// Provider rate limit or quota exhausted
    #[error("Quota exceeded: {message}")]
    QuotaExceeded { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Durable storage failure (history, preferences)
    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl RendezvousError {
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn location_not_found<S: Into<String>>(query: S) -> Self {
        Self::LocationNotFound {
            query: query.into(),
        }
    }

    pub fn geocoding_failed<S: Into<String>>(message: S) -> Self {
        Self::GeocodingFailed {
            message: message.into(),
        }
    }

    pub fn places_search_failed<S: Into<String>>(message: S) -> Self {
        Self::PlacesSearchFailed {
            message: message.into(),
        }
    }

    pub fn place_details_failed<S: Into<String>>(message: S) -> Self {
        Self::PlaceDetailsFailed {
            message: message.into(),
        }
    }

    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn quota_exceeded<S: Into<String>>(message: S) -> Self {
        Self::QuotaExceeded {
            message: message.into(),
        }
    }

    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn storage<S: Into<String>>(message: S) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Error kind used for matching and retry classification
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            RendezvousError::InvalidInput { .. } => ErrorCode::InvalidInput,
            RendezvousError::LocationNotFound { .. } => ErrorCode::LocationNotFound,
            RendezvousError::GeocodingFailed { .. } => ErrorCode::GeocodingFailed,
            RendezvousError::PlacesSearchFailed { .. } => ErrorCode::PlacesSearchFailed,
            RendezvousError::PlaceDetailsFailed { .. } => ErrorCode::PlaceDetailsFailed,
            RendezvousError::Network { .. } => ErrorCode::NetworkError,
            RendezvousError::QuotaExceeded { .. } => ErrorCode::QuotaExceeded,
            RendezvousError::Config { .. } => ErrorCode::Config,
            RendezvousError::Storage { .. } => ErrorCode::Storage,
        }
    }

    /// Only transient provider failures are worth another attempt.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RendezvousError::Network { .. } | RendezvousError::QuotaExceeded { .. }
        )
    }
}

impl From<anyhow::Error> for RendezvousError {
    fn from(err: anyhow::Error) -> Self {
        RendezvousError::storage(format!("{err:#}"))
    }
}
