//! Composition root
//!
//! Builds the shared cache, orchestrator, history and preferences from configuration
//! and owns the cache sweep task.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::cache::{SearchCache, SweepHandle};
use crate::config::RendezvousConfig;
use crate::history::SearchHistoryStore;
use crate::models::{SearchParams, SearchResult};
use crate::orchestrator::SearchOrchestrator;
use crate::preferences::CategoryPreferences;
use crate::provider::SharedProvider;
use crate::retry::RetryPolicy;
use crate::storage::SharedStore;

pub struct Services {
    pub orchestrator: Arc<SearchOrchestrator>,
    pub history: Arc<SearchHistoryStore>,
    pub preferences: Arc<CategoryPreferences>,
    cache: Arc<SearchCache>,
    sweeper: SweepHandle,
}

impl Services {
    /// Wire everything up and restore persisted state. Must run inside a tokio runtime.
    pub async fn start(
        config: &RendezvousConfig,
        provider: SharedProvider,
        store: SharedStore,
    ) -> crate::Result<Self> {
        let cache = Arc::new(SearchCache::from_config(&config.cache));
        let sweeper = cache.spawn_sweeper(Duration::from_secs(
            config.cache.sweep_interval_minutes.max(1).saturating_mul(60),
        ));

        let orchestrator = SearchOrchestrator::new(
            provider,
            cache.clone(),
            RetryPolicy::from_config(&config.retry),
        )
        .with_suggestion_min_query_len(config.search.suggestion_min_query_len);

        let history = SearchHistoryStore::new(store.clone(), config.history.max_items);
        let restored = history.load().await?;

        let preferences = CategoryPreferences::new(store);
        preferences.load().await?;

        info!("Services started with {} history items", restored);
        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            history: Arc::new(history),
            preferences: Arc::new(preferences),
            cache,
            sweeper,
        })
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<SearchCache> {
        &self.cache
    }

    /// Run a search, then record it in history and remember its categories.
    ///
    /// Failing to persist either is logged; the search result is still returned.
    pub async fn search_and_record(&self, params: &SearchParams) -> crate::Result<SearchResult> {
        let result = self.orchestrator.execute_search_flow(params).await?;

        if let Err(e) = self.history.add(params, result.total_results).await {
            warn!("Search succeeded but was not recorded: {}", e);
        }
        if let Err(e) = self.preferences.set(params.venue_categories.clone()).await {
            warn!("Could not save category selection: {}", e);
        }

        Ok(result)
    }

    pub fn shutdown(&mut self) {
        self.sweeper.shutdown();
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.sweeper.is_running()
    }
}
