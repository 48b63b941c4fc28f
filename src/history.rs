//! Search history
//!
//! An ordered, newest-first log of completed searches. Repeating a search replaces the
//! earlier entry instead of duplicating it, and the log never grows past its cap.
//! Every mutation writes the whole log back to the key-value store.

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::RendezvousError;
use crate::geo;
use crate::models::{Location, SearchParams, VenueCategory, category_set_key};
use crate::storage::{SharedStore, load_value, save_value};

pub const HISTORY_STORAGE_KEY: &str = "rendezvous:search_history";
pub const DEFAULT_MAX_HISTORY_ITEMS: usize = 20;
pub const HISTORY_EXPORT_VERSION: u32 = 1;

/// Decimal places used to group locations in [`SearchHistoryStore::frequent_locations`]
const FREQUENCY_PRECISION: u32 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryItem {
    pub id: Uuid,
    pub location1: Location,
    pub location2: Location,
    pub venue_categories: BTreeSet<VenueCategory>,
    pub timestamp: DateTime<Utc>,
    pub result_count: usize,
}

impl HistoryItem {
    #[must_use]
    pub fn new(params: &SearchParams, result_count: usize) -> Self {
        Self {
            id: Uuid::new_v4(),
            location1: params.location1.clone(),
            location2: params.location2.clone(),
            venue_categories: params.venue_categories.clone(),
            timestamp: Utc::now(),
            result_count,
        }
    }

    /// Same ordered location pair (within tolerance) and identical category set
    #[must_use]
    pub fn is_repeat_of(&self, other: &HistoryItem) -> bool {
        geo::is_same_location(&self.location1, &other.location1)
            && geo::is_same_location(&self.location2, &other.location2)
            && self.venue_categories == other.venue_categories
    }

    fn is_well_formed(&self) -> bool {
        !self.venue_categories.is_empty()
            && geo::validate_location(&self.location1).is_ok()
            && geo::validate_location(&self.location2).is_ok()
    }

    fn matches_query(&self, query: &str) -> bool {
        self.location1.address.to_lowercase().contains(query)
            || self.location2.address.to_lowercase().contains(query)
            || self
                .venue_categories
                .iter()
                .any(|category| category.display_name().to_lowercase().contains(query))
    }

    /// One-line description such as `Home ↔ Office (Cafe, Park)`
    #[must_use]
    pub fn summary(&self) -> String {
        let categories: Vec<&str> = self
            .venue_categories
            .iter()
            .map(|category| category.display_name())
            .collect();
        format!(
            "{} ↔ {} ({})",
            self.location1.label(),
            self.location2.label(),
            categories.join(", ")
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationFrequency {
    /// Most recently used location for this coordinate group
    pub location: Location,
    pub count: usize,
    pub last_used: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryFrequency {
    pub categories: BTreeSet<VenueCategory>,
    pub count: usize,
    pub last_used: DateTime<Utc>,
}

/// Portable JSON form of the history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub version: u32,
    pub exported_at: DateTime<Utc>,
    pub items: Vec<HistoryItem>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// Well-formed items read from the input
    pub accepted: usize,
    /// Malformed items that were discarded
    pub skipped: usize,
    /// History length after merging
    pub total: usize,
}

pub struct SearchHistoryStore {
    items: Mutex<Vec<HistoryItem>>,
    store: SharedStore,
    max_items: usize,
}

impl SearchHistoryStore {
    #[must_use]
    pub fn new(store: SharedStore, max_items: usize) -> Self {
        Self {
            items: Mutex::new(Vec::new()),
            store,
            max_items: max_items.max(1),
        }
    }

    #[must_use]
    pub fn max_items(&self) -> usize {
        self.max_items
    }

    /// Restore persisted history. Unreadable data is logged and treated as empty.
    #[tracing::instrument(skip(self))]
    pub async fn load(&self) -> crate::Result<usize> {
        let loaded = match load_value::<Vec<HistoryItem>>(self.store.as_ref(), HISTORY_STORAGE_KEY)
            .await
        {
            Ok(loaded) => loaded.unwrap_or_default(),
            Err(e) => {
                warn!("Ignoring unreadable search history: {}", e);
                Vec::new()
            }
        };

        let mut items = self.items.lock().await;
        *items = loaded;
        items.truncate(self.max_items);
        debug!("Loaded {} history items", items.len());
        Ok(items.len())
    }

    /// Write `next` to the store, then make it the in-memory log.
    ///
    /// On a failed write the in-memory log is left untouched.
    async fn commit(&self, items: &mut Vec<HistoryItem>, next: Vec<HistoryItem>) -> crate::Result<()> {
        save_value(self.store.as_ref(), HISTORY_STORAGE_KEY, &next)
            .await
            .context("Failed to save search history")?;
        *items = next;
        Ok(())
    }

    /// Record a completed search, replacing an earlier run of the same search
    pub async fn add(&self, params: &SearchParams, result_count: usize) -> crate::Result<HistoryItem> {
        let item = HistoryItem::new(params, result_count);

        let mut items = self.items.lock().await;
        let mut next: Vec<HistoryItem> = items
            .iter()
            .filter(|existing| !existing.is_repeat_of(&item))
            .cloned()
            .collect();
        if next.len() < items.len() {
            debug!("Replacing earlier history entry for {}", item.summary());
        }
        next.insert(0, item.clone());
        next.truncate(self.max_items);
        self.commit(&mut items, next).await?;

        Ok(item)
    }

    pub async fn list(&self) -> Vec<HistoryItem> {
        self.items.lock().await.clone()
    }

    pub async fn recent(&self, limit: usize) -> Vec<HistoryItem> {
        self.items.lock().await.iter().take(limit).cloned().collect()
    }

    pub async fn get(&self, id: Uuid) -> Option<HistoryItem> {
        self.items.lock().await.iter().find(|item| item.id == id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.items.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.lock().await.is_empty()
    }

    /// Returns whether an item was removed
    pub async fn remove(&self, id: Uuid) -> crate::Result<bool> {
        let mut items = self.items.lock().await;
        let next: Vec<HistoryItem> = items.iter().filter(|item| item.id != id).cloned().collect();
        if next.len() == items.len() {
            return Ok(false);
        }
        self.commit(&mut items, next).await?;
        Ok(true)
    }

    pub async fn clear(&self) -> crate::Result<()> {
        let mut items = self.items.lock().await;
        self.commit(&mut items, Vec::new()).await?;
        info!("Search history cleared");
        Ok(())
    }

    /// Case-insensitive match on addresses and category names
    pub async fn search(&self, query: &str) -> Vec<HistoryItem> {
        let query = query.trim().to_lowercase();
        let items = self.items.lock().await;
        if query.is_empty() {
            return items.clone();
        }
        items
            .iter()
            .filter(|item| item.matches_query(&query))
            .cloned()
            .collect()
    }

    pub async fn frequent_locations(&self, limit: usize) -> Vec<LocationFrequency> {
        let items = self.items.lock().await;
        let mut groups: Vec<LocationFrequency> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        // newest first, so the first sighting of a key is its most recent use
        for item in items.iter() {
            for location in [&item.location1, &item.location2] {
                let key = location.coordinate_key(FREQUENCY_PRECISION);
                match index.get(&key) {
                    Some(&position) => groups[position].count += 1,
                    None => {
                        index.insert(key, groups.len());
                        groups.push(LocationFrequency {
                            location: location.clone(),
                            count: 1,
                            last_used: item.timestamp,
                        });
                    }
                }
            }
        }

        // stable sort keeps recency order among equal counts
        groups.sort_by(|a, b| b.count.cmp(&a.count));
        groups.truncate(limit);
        groups
    }

    pub async fn frequent_category_combinations(&self, limit: usize) -> Vec<CategoryFrequency> {
        let items = self.items.lock().await;
        let mut groups: Vec<CategoryFrequency> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for item in items.iter() {
            let key = category_set_key(&item.venue_categories);
            match index.get(&key) {
                Some(&position) => groups[position].count += 1,
                None => {
                    index.insert(key, groups.len());
                    groups.push(CategoryFrequency {
                        categories: item.venue_categories.clone(),
                        count: 1,
                        last_used: item.timestamp,
                    });
                }
            }
        }

        groups.sort_by(|a, b| b.count.cmp(&a.count));
        groups.truncate(limit);
        groups
    }

    pub async fn export(&self) -> HistorySnapshot {
        HistorySnapshot {
            version: HISTORY_EXPORT_VERSION,
            exported_at: Utc::now(),
            items: self.items.lock().await.clone(),
        }
    }

    /// Merge items from an exported snapshot (or a bare item array).
    ///
    /// Malformed items are skipped; the merged log is deduplicated, ordered
    /// newest-first and capped.
    #[tracing::instrument(skip_all)]
    pub async fn import(&self, value: serde_json::Value) -> crate::Result<ImportReport> {
        let raw_items = match value {
            serde_json::Value::Array(items) => items,
            serde_json::Value::Object(mut snapshot) => {
                let version = snapshot
                    .get("version")
                    .and_then(serde_json::Value::as_u64)
                    .unwrap_or(u64::from(HISTORY_EXPORT_VERSION));
                if version > u64::from(HISTORY_EXPORT_VERSION) {
                    return Err(RendezvousError::invalid_input(format!(
                        "Unsupported history export version {version}"
                    )));
                }
                match snapshot.remove("items") {
                    Some(serde_json::Value::Array(items)) => items,
                    _ => {
                        return Err(RendezvousError::invalid_input(
                            "History export has no items list",
                        ));
                    }
                }
            }
            _ => {
                return Err(RendezvousError::invalid_input(
                    "History import expects an export object or an item list",
                ));
            }
        };

        let mut report = ImportReport::default();
        let mut imported = Vec::new();
        for raw in raw_items {
            match serde_json::from_value::<HistoryItem>(raw) {
                Ok(item) if item.is_well_formed() => {
                    report.accepted += 1;
                    imported.push(item);
                }
                Ok(_) => report.skipped += 1,
                Err(e) => {
                    debug!("Skipping malformed history item: {}", e);
                    report.skipped += 1;
                }
            }
        }

        let mut items = self.items.lock().await;
        let mut merged: Vec<HistoryItem> = items.iter().cloned().chain(imported).collect();
        merged.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let mut next: Vec<HistoryItem> = Vec::with_capacity(merged.len());
        for item in merged {
            let duplicate = next
                .iter()
                .any(|kept| kept.id == item.id || kept.is_repeat_of(&item));
            if !duplicate {
                next.push(item);
            }
        }
        next.truncate(self.max_items);
        self.commit(&mut items, next).await?;

        report.total = items.len();
        info!(
            "Imported {} history items ({} skipped), {} total",
            report.accepted, report.skipped, report.total
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{KeyValueStore, MemoryStore};
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Memory store whose writes can be switched off
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        reject_writes: AtomicBool,
    }

    #[async_trait]
    impl KeyValueStore for FlakyStore {
        async fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
            self.inner.get(key).await
        }

        async fn put(&self, key: &str, value: Vec<u8>) -> anyhow::Result<()> {
            if self.reject_writes.load(Ordering::SeqCst) {
                anyhow::bail!("disk full");
            }
            self.inner.put(key, value).await
        }

        async fn remove(&self, key: &str) -> anyhow::Result<()> {
            self.inner.remove(key).await
        }
    }

    fn store() -> SharedStore {
        Arc::new(MemoryStore::new())
    }

    fn params(lat1: f64, name1: &str, lat2: f64, name2: &str, categories: &[VenueCategory]) -> SearchParams {
        SearchParams::new(
            Location::new(lat1, 10.0, name1),
            Location::new(lat2, 11.0, name2),
            categories.iter().copied(),
            1500,
        )
    }

    fn numbered(i: u32) -> SearchParams {
        params(f64::from(i) * 0.01, &format!("Start {i}"), 50.0, "Office", &[VenueCategory::Cafe])
    }

    #[tokio::test]
    async fn test_history_is_capped_newest_first() {
        let history = SearchHistoryStore::new(store(), DEFAULT_MAX_HISTORY_ITEMS);
        for i in 0..25 {
            history.add(&numbered(i), 1).await.unwrap();
        }

        let items = history.list().await;
        assert_eq!(items.len(), 20);
        assert_eq!(items[0].location1.address, "Start 24");
        assert_eq!(items[19].location1.address, "Start 5");
    }

    #[tokio::test]
    async fn test_repeat_search_moves_to_front() {
        let history = SearchHistoryStore::new(store(), DEFAULT_MAX_HISTORY_ITEMS);
        history.add(&numbered(1), 3).await.unwrap();
        history.add(&numbered(2), 4).await.unwrap();

        // within the 0.001 degree tolerance
        let mut repeat = numbered(1);
        repeat.location1.latitude += 0.0005;
        history.add(&repeat, 9).await.unwrap();

        let items = history.list().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].location1.address, "Start 1");
        assert_eq!(items[0].result_count, 9);
        assert_eq!(items[1].location1.address, "Start 2");
    }

    #[tokio::test]
    async fn test_different_categories_or_swapped_locations_are_distinct() {
        let history = SearchHistoryStore::new(store(), DEFAULT_MAX_HISTORY_ITEMS);
        history
            .add(&params(1.0, "A", 2.0, "B", &[VenueCategory::Cafe]), 1)
            .await
            .unwrap();
        history
            .add(&params(1.0, "A", 2.0, "B", &[VenueCategory::Cafe, VenueCategory::Bar]), 1)
            .await
            .unwrap();

        let mut swapped = params(2.0, "B", 1.0, "A", &[VenueCategory::Cafe]);
        swapped.location1.longitude = 11.0;
        swapped.location2.longitude = 10.0;
        history.add(&swapped, 1).await.unwrap();

        assert_eq!(history.len().await, 3);
    }

    #[tokio::test]
    async fn test_remove_get_and_clear() {
        let history = SearchHistoryStore::new(store(), DEFAULT_MAX_HISTORY_ITEMS);
        let first = history.add(&numbered(1), 1).await.unwrap();
        history.add(&numbered(2), 1).await.unwrap();

        assert_eq!(history.get(first.id).await, Some(first.clone()));
        assert!(history.remove(first.id).await.unwrap());
        assert!(!history.remove(first.id).await.unwrap());
        assert_eq!(history.recent(5).await.len(), 1);

        history.clear().await.unwrap();
        assert!(history.is_empty().await);
    }

    #[tokio::test]
    async fn test_search_matches_addresses_and_categories() {
        let history = SearchHistoryStore::new(store(), DEFAULT_MAX_HISTORY_ITEMS);
        history
            .add(&params(1.0, "Central Station", 2.0, "Harbor", &[VenueCategory::MovieTheater]), 1)
            .await
            .unwrap();
        history
            .add(&params(3.0, "Old Town", 4.0, "University", &[VenueCategory::Cafe]), 1)
            .await
            .unwrap();

        assert_eq!(history.search("harbor").await.len(), 1);
        assert_eq!(history.search("movie the").await.len(), 1);
        assert_eq!(history.search("UNIVERSITY").await.len(), 1);
        assert_eq!(history.search("   ").await.len(), 2);
        assert!(history.search("airport").await.is_empty());
    }

    #[tokio::test]
    async fn test_frequency_rankings() {
        let history = SearchHistoryStore::new(store(), DEFAULT_MAX_HISTORY_ITEMS);
        history
            .add(&params(1.0, "Home", 2.0, "Gym", &[VenueCategory::Park]), 1)
            .await
            .unwrap();
        history
            .add(&params(1.0001, "Home", 3.0, "Office", &[VenueCategory::Cafe]), 1)
            .await
            .unwrap();
        history
            .add(&params(5.0, "Beach", 6.0, "Pier", &[VenueCategory::Cafe]), 1)
            .await
            .unwrap();

        let locations = history.frequent_locations(2).await;
        assert_eq!(locations.len(), 2);
        assert_eq!(locations[0].location.address, "Home");
        assert_eq!(locations[0].count, 2);
        // single uses tie, most recent wins
        assert_eq!(locations[1].location.address, "Beach");

        let combinations = history.frequent_category_combinations(5).await;
        assert_eq!(combinations.len(), 2);
        assert_eq!(combinations[0].count, 2);
        assert!(combinations[0].categories.contains(&VenueCategory::Cafe));
        assert_eq!(combinations[1].count, 1);
    }

    #[tokio::test]
    async fn test_history_survives_reload() {
        let shared = store();
        let history = SearchHistoryStore::new(shared.clone(), DEFAULT_MAX_HISTORY_ITEMS);
        let item = history.add(&numbered(7), 12).await.unwrap();

        let reloaded = SearchHistoryStore::new(shared, DEFAULT_MAX_HISTORY_ITEMS);
        assert_eq!(reloaded.load().await.unwrap(), 1);
        assert_eq!(reloaded.list().await, vec![item]);
    }

    #[tokio::test]
    async fn test_corrupt_history_is_ignored() {
        let shared = store();
        shared
            .put(HISTORY_STORAGE_KEY, vec![0xde, 0xad])
            .await
            .unwrap();

        let history = SearchHistoryStore::new(shared, DEFAULT_MAX_HISTORY_ITEMS);
        assert_eq!(history.load().await.unwrap(), 0);
        assert!(history.is_empty().await);
    }

    #[tokio::test]
    async fn test_export_import_merges_and_validates() {
        let source = SearchHistoryStore::new(store(), DEFAULT_MAX_HISTORY_ITEMS);
        source.add(&numbered(1), 1).await.unwrap();
        source.add(&numbered(2), 2).await.unwrap();
        let snapshot = source.export().await;
        assert_eq!(snapshot.version, HISTORY_EXPORT_VERSION);

        let mut value = serde_json::to_value(&snapshot).unwrap();
        let items = value["items"].as_array_mut().unwrap();
        let mut bad_coordinates = items[0].clone();
        bad_coordinates["id"] = serde_json::json!(Uuid::new_v4());
        bad_coordinates["location1"]["latitude"] = serde_json::json!(120.0);
        let mut no_categories = items[0].clone();
        no_categories["venue_categories"] = serde_json::json!([]);
        items.push(bad_coordinates);
        items.push(no_categories);
        items.push(serde_json::json!({"id": "not-a-uuid"}));

        let target = SearchHistoryStore::new(store(), DEFAULT_MAX_HISTORY_ITEMS);
        let mut older = numbered(3);
        older.location2.address = "Elsewhere".into();
        target.add(&older, 5).await.unwrap();
        // same search as one in the snapshot, made later
        target.add(&numbered(2), 7).await.unwrap();

        let report = target.import(value).await.unwrap();
        assert_eq!(report.accepted, 2);
        assert_eq!(report.skipped, 3);
        assert_eq!(report.total, 3);

        let merged = target.list().await;
        assert_eq!(merged[0].location1.address, "Start 2");
        assert_eq!(merged[0].result_count, 7);
        assert!(merged.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
    }

    #[tokio::test]
    async fn test_import_respects_cap_and_rejects_garbage() {
        let history = SearchHistoryStore::new(store(), 3);
        let now = Utc::now();
        let items: Vec<HistoryItem> = (0..5)
            .map(|i| {
                let mut item = HistoryItem::new(&numbered(i), 1);
                item.timestamp = now - Duration::minutes(i64::from(i));
                item
            })
            .collect();

        let report = history
            .import(serde_json::to_value(&items).unwrap())
            .await
            .unwrap();
        assert_eq!(report.accepted, 5);
        assert_eq!(report.total, 3);
        assert_eq!(history.list().await[0].location1.address, "Start 0");

        assert!(matches!(
            history.import(serde_json::json!("nope")).await,
            Err(RendezvousError::InvalidInput { .. })
        ));
        assert!(matches!(
            history.import(serde_json::json!({"version": 99, "items": []})).await,
            Err(RendezvousError::InvalidInput { .. })
        ));
    }

    #[tokio::test]
    async fn test_failed_save_leaves_history_unchanged() {
        let store = Arc::new(FlakyStore::default());
        let history = SearchHistoryStore::new(store.clone(), DEFAULT_MAX_HISTORY_ITEMS);
        let kept = history.add(&numbered(1), 2).await.unwrap();

        store.reject_writes.store(true, Ordering::SeqCst);

        let err = history.add(&numbered(2), 3).await.unwrap_err();
        assert!(matches!(err, RendezvousError::Storage { .. }));
        assert!(err.to_string().contains("Failed to save search history"));
        assert!(history.clear().await.is_err());
        assert!(history.remove(kept.id).await.is_err());
        assert!(
            history
                .import(serde_json::to_value(vec![HistoryItem::new(&numbered(3), 1)]).unwrap())
                .await
                .is_err()
        );
        assert_eq!(history.list().await, vec![kept.clone()]);

        // memory and disk still agree after a restart
        let reloaded = SearchHistoryStore::new(store, DEFAULT_MAX_HISTORY_ITEMS);
        reloaded.load().await.unwrap();
        assert_eq!(reloaded.list().await, vec![kept]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_adds_respect_cap() {
        let history = Arc::new(SearchHistoryStore::new(store(), DEFAULT_MAX_HISTORY_ITEMS));

        let tasks: Vec<_> = (0..25)
            .map(|i| {
                let history = history.clone();
                tokio::spawn(async move { history.add(&numbered(i), 1).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let items = history.list().await;
        assert_eq!(items.len(), DEFAULT_MAX_HISTORY_ITEMS);
        let distinct: std::collections::HashSet<String> = items
            .iter()
            .map(|item| item.location1.address.clone())
            .collect();
        assert_eq!(distinct.len(), DEFAULT_MAX_HISTORY_ITEMS);

        let reloaded = SearchHistoryStore::new(history.store.clone(), DEFAULT_MAX_HISTORY_ITEMS);
        assert_eq!(reloaded.load().await.unwrap(), DEFAULT_MAX_HISTORY_ITEMS);
    }
}
