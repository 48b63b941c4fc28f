//! Search orchestration
//!
//! Validates a request, computes the midpoint, consults the cache and on a miss
//! queries the provider once per category through the retry executor. Each call is
//! independent; the cache is the only state shared between calls.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::{SearchCache, fingerprint};
use crate::error::RendezvousError;
use crate::geo;
use crate::location_resolver::{LocationParser, LocationResolver};
use crate::models::{Location, SearchParams, SearchResult, Venue, category_set_key};
use crate::provider::SharedProvider;
use crate::retry::{RetryPolicy, retry_provider_call};

const DEFAULT_SUGGESTION_MIN_QUERY_LEN: usize = 3;

pub struct SearchOrchestrator {
    provider: SharedProvider,
    cache: Arc<SearchCache>,
    retry_policy: RetryPolicy,
    suggestion_min_query_len: usize,
}

impl SearchOrchestrator {
    #[must_use]
    pub fn new(provider: SharedProvider, cache: Arc<SearchCache>, retry_policy: RetryPolicy) -> Self {
        Self {
            provider,
            cache,
            retry_policy,
            suggestion_min_query_len: DEFAULT_SUGGESTION_MIN_QUERY_LEN,
        }
    }

    #[must_use]
    pub fn with_suggestion_min_query_len(mut self, min_len: usize) -> Self {
        self.suggestion_min_query_len = min_len;
        self
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<SearchCache> {
        &self.cache
    }

    #[must_use]
    pub fn provider(&self) -> &SharedProvider {
        &self.provider
    }

    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    /// Answer a search request end to end.
    ///
    /// Fails with `InvalidInput` before any provider call, or with the provider error
    /// when every category search failed.
    #[tracing::instrument(
        skip_all,
        fields(
            categories = %category_set_key(&params.venue_categories),
            radius = params.radius_meters
        )
    )]
    pub async fn execute_search_flow(&self, params: &SearchParams) -> crate::Result<SearchResult> {
        let started = Instant::now();

        Self::validate(params)?;

        let midpoint = geo::midpoint(&params.location1, &params.location2)?;
        debug!("Midpoint at {}", midpoint.format_coordinates());

        let key = fingerprint(params, &midpoint);
        if let Some(venues) = self.cache.get(&key).await {
            info!("Serving {} venues from cache", venues.len());
            return Ok(build_result(venues, midpoint, true, started, params.max_results));
        }

        let venues = self.search_provider(params, &midpoint).await?;
        self.cache.put(&key, venues.clone()).await;

        let result = build_result(venues, midpoint, false, started, params.max_results);
        info!(
            "Found {} venues in {}ms",
            result.total_results, result.search_time_ms
        );
        Ok(result)
    }

    fn validate(params: &SearchParams) -> crate::Result<()> {
        geo::validate_location(&params.location1).map_err(|e| {
            RendezvousError::invalid_input(format!("First location is invalid: {e}"))
        })?;
        geo::validate_location(&params.location2).map_err(|e| {
            RendezvousError::invalid_input(format!("Second location is invalid: {e}"))
        })?;

        if params.venue_categories.is_empty() {
            return Err(RendezvousError::invalid_input(
                "At least one venue category is required",
            ));
        }
        if params.radius_meters == 0 {
            return Err(RendezvousError::invalid_input("Search radius must be positive"));
        }
        if params.max_results == Some(0) {
            return Err(RendezvousError::invalid_input("Max results must be positive"));
        }
        Ok(())
    }

    /// One provider search per category; failed categories are skipped unless all fail.
    async fn search_provider(
        &self,
        params: &SearchParams,
        midpoint: &Location,
    ) -> crate::Result<Vec<Venue>> {
        let mut merged: HashMap<String, Venue> = HashMap::new();
        let mut first_error: Option<RendezvousError> = None;
        let mut succeeded = 0usize;

        for &category in &params.venue_categories {
            let result = retry_provider_call(&self.retry_policy, "search_nearby", || {
                self.provider
                    .search_nearby(midpoint, category, params.radius_meters)
            })
            .await;

            let places = match result {
                Ok(places) => places,
                Err(err) => {
                    warn!(
                        "Search for {} failed, continuing with remaining categories: {}",
                        category.display_name(),
                        err
                    );
                    first_error.get_or_insert(err);
                    continue;
                }
            };
            succeeded += 1;

            for place in places {
                if geo::validate_coordinates(place.latitude, place.longitude).is_err() {
                    warn!("Skipping place {} with invalid coordinates", place.provider_id);
                    continue;
                }

                if let Some(existing) = merged.get_mut(&place.provider_id) {
                    existing.add_category(category);
                    continue;
                }

                let distance = geo::distance_meters(midpoint, &place.location());
                let mut venue = Venue::from_raw(place, distance);
                venue.add_category(category);
                merged.insert(venue.provider_id.clone(), venue);
            }
        }

        if succeeded == 0 {
            return Err(first_error.unwrap_or_else(|| {
                RendezvousError::invalid_input("At least one venue category is required")
            }));
        }

        let mut venues: Vec<Venue> = merged.into_values().collect();
        rank_venues(&mut venues);
        Ok(venues)
    }

    /// Address suggestions for an autocomplete box.
    ///
    /// Never fails: short queries and provider errors yield an empty list.
    pub async fn get_location_suggestions(
        &self,
        query: &str,
        bias: Option<&Location>,
    ) -> Vec<Location> {
        let query = query.trim();
        if query.chars().count() < self.suggestion_min_query_len {
            return Vec::new();
        }

        if let Some((lat, lon)) = LocationParser::parse_coordinates(query) {
            return vec![LocationResolver::resolve_coordinates(self.provider.as_ref(), lat, lon).await];
        }

        let biased_query = bias
            .filter(|bias| !bias.address.trim().is_empty())
            .map(|bias| format!("{query}, {}", bias.address));

        let (direct, biased) = futures::future::join(self.provider.geocode(query), async {
            match &biased_query {
                Some(biased_query) => Some(self.provider.geocode(biased_query).await),
                None => None,
            }
        })
        .await;

        let mut suggestions: Vec<Location> = Vec::new();
        for result in std::iter::once(direct).chain(biased) {
            match result {
                Ok(location) => {
                    let duplicate = suggestions.iter().any(|known| {
                        match (&known.provider_id, &location.provider_id) {
                            (Some(a), Some(b)) => a == b,
                            _ => geo::is_same_location(known, &location),
                        }
                    });
                    if !duplicate && geo::validate_location(&location).is_ok() {
                        suggestions.push(location);
                    }
                }
                Err(err) => debug!("Suggestion lookup for '{}' failed: {}", query, err),
            }
        }

        if let Some(bias) = bias {
            suggestions.sort_by(|a, b| {
                geo::distance_meters(bias, a).total_cmp(&geo::distance_meters(bias, b))
            });
        }
        suggestions
    }

    /// Full record for one venue, with its distance from `reference`
    pub async fn venue_details(&self, provider_id: &str, reference: &Location) -> crate::Result<Venue> {
        if provider_id.trim().is_empty() {
            return Err(RendezvousError::invalid_input("Place id cannot be empty"));
        }
        geo::validate_location(reference)?;

        let raw = retry_provider_call(&self.retry_policy, "place_details", || {
            self.provider.place_details(provider_id)
        })
        .await?;

        let distance = geo::distance_meters(reference, &raw.location());
        Ok(Venue::from_raw(raw, distance))
    }
}

/// Nearest first; ties by higher rating, then name, then provider id
pub fn rank_venues(venues: &mut [Venue]) {
    venues.sort_by(|a, b| {
        a.distance_meters
            .total_cmp(&b.distance_meters)
            .then_with(|| b.rating.total_cmp(&a.rating))
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.provider_id.cmp(&b.provider_id))
    });
}

fn build_result(
    mut venues: Vec<Venue>,
    midpoint: Location,
    from_cache: bool,
    started: Instant,
    max_results: Option<usize>,
) -> SearchResult {
    let total_results = venues.len();
    if let Some(max_results) = max_results {
        venues.truncate(max_results);
    }

    SearchResult {
        venues,
        midpoint,
        from_cache,
        search_time_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        total_results,
    }
}
