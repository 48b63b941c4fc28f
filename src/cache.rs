//! Bounded, TTL-based in-memory cache of search results
//!
//! Entries are keyed by a fingerprint of the normalized search parameters. There is
//! no partial invalidation: entries leave the cache by expiring or by being evicted
//! when the cache is full (oldest insertion first).

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::config::CacheConfig;
use crate::models::{Location, SearchParams, Venue, category_set_key};

/// Decimal places kept when fingerprinting coordinates
const FINGERPRINT_PRECISION: u32 = 6;

/// Canonical cache key for a search.
///
/// Built from the rounded locations, the sorted category set, the radius and the
/// rounded midpoint, so equal searches always map to the same key.
#[must_use]
pub fn fingerprint(params: &SearchParams, midpoint: &Location) -> String {
    format!(
        "search:v1|{}|{}|{}|{}|{}",
        params.location1.coordinate_key(FINGERPRINT_PRECISION),
        params.location2.coordinate_key(FINGERPRINT_PRECISION),
        category_set_key(&params.venue_categories),
        params.radius_meters,
        midpoint.coordinate_key(FINGERPRINT_PRECISION),
    )
}

#[derive(Debug, Clone)]
struct CacheEntry {
    venues: Vec<Venue>,
    created_at: Instant,
    expires_at: Instant,
    /// Monotonic insertion order, used for eviction
    sequence: u64,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    next_sequence: u64,
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub active_entries: usize,
}

pub struct SearchCache {
    state: Mutex<CacheState>,
    ttl: Duration,
    max_entries: usize,
}

impl SearchCache {
    #[must_use]
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            ttl,
            max_entries: max_entries.max(1),
        }
    }

    #[must_use]
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(
            Duration::from_secs(config.ttl_minutes * 60),
            config.max_entries,
        )
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    /// Returns a copy of the cached venues if the entry is still fresh.
    #[tracing::instrument(name = "query_search_cache", level = "debug", skip(self))]
    pub async fn get(&self, fingerprint: &str) -> Option<Vec<Venue>> {
        let mut state = self.state.lock().await;
        let now = Instant::now();

        let expired = match state.entries.get(fingerprint) {
            Some(entry) if !entry.is_expired(now) => {
                debug!(
                    "Cache hit, entry is {:.1}s old",
                    now.duration_since(entry.created_at).as_secs_f64()
                );
                return Some(entry.venues.clone());
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            debug!("Key found but expired");
            state.entries.remove(fingerprint);
        } else {
            debug!("Key not found");
        }
        None
    }

    /// Stores venues under `fingerprint`, evicting the oldest insertion when full.
    #[tracing::instrument(name = "put_search_cache", level = "debug", skip(self, venues), fields(venues = venues.len()))]
    pub async fn put(&self, fingerprint: &str, venues: Vec<Venue>) {
        let mut state = self.state.lock().await;
        let now = Instant::now();

        if !state.entries.contains_key(fingerprint) && state.entries.len() >= self.max_entries {
            let oldest = state
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.sequence)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                debug!("Cache full, evicting {}", oldest);
                state.entries.remove(&oldest);
            }
        }

        let sequence = state.next_sequence;
        state.next_sequence += 1;
        state.entries.insert(
            fingerprint.to_string(),
            CacheEntry {
                venues,
                created_at: now,
                expires_at: now + self.ttl,
                sequence,
            },
        );
    }

    /// Drops every expired entry, returning how many were removed
    pub async fn purge_expired(&self) -> usize {
        let mut state = self.state.lock().await;
        let now = Instant::now();
        let before = state.entries.len();
        state.entries.retain(|_, entry| !entry.is_expired(now));
        let removed = before - state.entries.len();

        if removed > 0 {
            info!(
                "Cache sweep removed {} expired entries ({} remaining)",
                removed,
                state.entries.len()
            );
        }
        removed
    }

    /// Number of stored entries, including expired ones not yet purged
    pub async fn len(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn contains(&self, fingerprint: &str) -> bool {
        self.state.lock().await.entries.contains_key(fingerprint)
    }

    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        let count = state.entries.len();
        state.entries.clear();
        info!("Cache cleared: {} entries removed", count);
    }

    pub async fn stats(&self) -> CacheStats {
        let state = self.state.lock().await;
        let now = Instant::now();
        let total = state.entries.len();
        let expired = state
            .entries
            .values()
            .filter(|entry| entry.is_expired(now))
            .count();

        CacheStats {
            total_entries: total,
            expired_entries: expired,
            active_entries: total - expired,
        }
    }

    /// Start the periodic expiry sweep.
    ///
    /// The task holds only a weak reference and ends by itself once the cache is
    /// dropped; the returned handle stops it earlier.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> SweepHandle {
        let cache: Weak<SearchCache> = Arc::downgrade(self);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // the first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(cache) = cache.upgrade() else {
                    debug!("Search cache dropped, stopping sweeper");
                    break;
                };
                cache.purge_expired().await;
            }
        });

        SweepHandle {
            handle: Some(handle),
        }
    }
}

/// Owner of the background sweep task; aborts it on shutdown or drop
pub struct SweepHandle {
    handle: Option<JoinHandle<()>>,
}

impl SweepHandle {
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("Cache sweeper stopped");
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for SweepHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RawPlace, VenueCategory};

    fn venue(id: &str) -> Venue {
        Venue::from_raw(
            RawPlace {
                provider_id: id.to_string(),
                name: format!("Venue {id}"),
                address: String::new(),
                latitude: 0.0,
                longitude: 0.0,
                rating: Some(4.0),
                rating_count: Some(10),
                price_level: None,
                open_now: Some(true),
                categories: vec![VenueCategory::Cafe],
                website: None,
                phone_number: None,
            },
            50.0,
        )
    }

    fn params(categories: &[VenueCategory]) -> SearchParams {
        SearchParams::new(
            Location::new(39.938_812_34, 116.4574, "A"),
            Location::new(39.9833, 116.3167, "B"),
            categories.iter().copied(),
            1500,
        )
    }

    #[test]
    fn test_fingerprint_ignores_category_order_and_addresses() {
        let midpoint = Location::from_coordinates(39.9611, 116.3871);
        let a = params(&[VenueCategory::Bar, VenueCategory::Cafe]);
        let mut b = params(&[VenueCategory::Cafe, VenueCategory::Bar]);
        b.location1.address = "somewhere else".to_string();

        assert_eq!(fingerprint(&a, &midpoint), fingerprint(&b, &midpoint));
        assert_eq!(
            fingerprint(&a, &midpoint),
            "search:v1|39.938812,116.457400|39.983300,116.316700|CAFE,BAR|1500|39.961100,116.387100"
        );
    }

    #[test]
    fn test_fingerprint_distinguishes_radius_and_categories() {
        let midpoint = Location::from_coordinates(39.9611, 116.3871);
        let base = params(&[VenueCategory::Cafe]);
        let mut wider = base.clone();
        wider.radius_meters = 3000;
        let other = params(&[VenueCategory::Park]);

        assert_ne!(fingerprint(&base, &midpoint), fingerprint(&wider, &midpoint));
        assert_ne!(fingerprint(&base, &midpoint), fingerprint(&other, &midpoint));
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_returns_copy_until_ttl() {
        let cache = SearchCache::new(Duration::from_secs(30 * 60), 50);
        cache.put("k", vec![venue("a")]).await;

        let mut copy = cache.get("k").await.unwrap();
        copy[0].name = "mutated".to_string();
        assert_eq!(cache.get("k").await.unwrap()[0].name, "Venue a");

        tokio::time::advance(Duration::from_secs(29 * 60)).await;
        assert!(cache.get("k").await.is_some());

        tokio::time::advance(Duration::from_secs(60)).await;
        assert!(cache.get("k").await.is_none());
        // lazily purged on read
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_capacity_evicts_oldest_insertion() {
        let cache = SearchCache::new(Duration::from_secs(1800), 50);
        for i in 0..51 {
            cache.put(&format!("key-{i}"), vec![venue(&i.to_string())]).await;
            assert!(cache.len().await <= 50);
        }

        assert_eq!(cache.len().await, 50);
        assert!(!cache.contains("key-0").await);
        assert!(cache.contains("key-1").await);
        assert!(cache.contains("key-50").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replacing_existing_key_does_not_evict() {
        let cache = SearchCache::new(Duration::from_secs(1800), 2);
        cache.put("a", vec![venue("1")]).await;
        cache.put("b", vec![venue("2")]).await;
        cache.put("a", vec![venue("3")]).await;

        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.get("a").await.unwrap()[0].provider_id, "3");

        // "b" is now the oldest insertion
        cache.put("c", vec![venue("4")]).await;
        assert!(!cache.contains("b").await);
        assert!(cache.contains("a").await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stats_and_purge() {
        let cache = SearchCache::new(Duration::from_secs(60), 10);
        cache.put("old", vec![venue("1")]).await;
        tokio::time::advance(Duration::from_secs(45)).await;
        cache.put("new", vec![venue("2")]).await;
        tokio::time::advance(Duration::from_secs(30)).await;

        let stats = cache.stats().await;
        assert_eq!(stats.total_entries, 2);
        assert_eq!(stats.expired_entries, 1);
        assert_eq!(stats.active_entries, 1);

        assert_eq!(cache.purge_expired().await, 1);
        assert!(cache.contains("new").await);

        cache.clear().await;
        assert!(cache.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_purges_without_reads() {
        let cache = Arc::new(SearchCache::new(Duration::from_secs(30 * 60), 50));
        let mut sweeper = cache.spawn_sweeper(Duration::from_secs(10 * 60));

        // inserted at minute 5, expires at minute 35
        tokio::time::sleep(Duration::from_secs(5 * 60)).await;
        cache.put("k", vec![venue("a")]).await;

        tokio::time::sleep(Duration::from_secs(33 * 60)).await;
        assert_eq!(cache.len().await, 1, "entry expired but no sweep since");

        tokio::time::sleep(Duration::from_secs(3 * 60)).await;
        assert_eq!(cache.len().await, 0, "sweep at minute 40 removed it");

        assert!(sweeper.is_running());
        sweeper.shutdown();
        assert!(!sweeper.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_stops_when_cache_dropped() {
        let cache = Arc::new(SearchCache::new(Duration::from_secs(60), 5));
        let sweeper = cache.spawn_sweeper(Duration::from_secs(60));
        drop(cache);

        tokio::time::sleep(Duration::from_secs(121)).await;
        assert!(!sweeper.is_running());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_puts_stay_within_capacity() {
        let cache = Arc::new(SearchCache::new(Duration::from_secs(1800), 50));

        let tasks: Vec<_> = (0..60)
            .map(|i| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    cache.put(&format!("search-{i}"), vec![venue("v")]).await;
                    cache.len().await
                })
            })
            .collect();
        for task in tasks {
            assert!(task.await.unwrap() <= 50);
        }

        assert_eq!(cache.len().await, 50);
        let stats = cache.stats().await;
        assert_eq!(stats.active_entries, 50);
    }
}
