//! Last-used venue category selection

use anyhow::Context;
use std::collections::BTreeSet;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::RendezvousError;
use crate::models::VenueCategory;
use crate::storage::{SharedStore, load_value, save_value};

pub const PREFERENCES_STORAGE_KEY: &str = "rendezvous:category_preferences";

fn default_categories() -> BTreeSet<VenueCategory> {
    BTreeSet::from([VenueCategory::Restaurant])
}

pub struct CategoryPreferences {
    categories: RwLock<BTreeSet<VenueCategory>>,
    store: SharedStore,
}

impl CategoryPreferences {
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        Self {
            categories: RwLock::new(default_categories()),
            store,
        }
    }

    /// Restore the saved selection; missing or unreadable data keeps the default
    pub async fn load(&self) -> crate::Result<()> {
        let saved = load_value::<BTreeSet<VenueCategory>>(self.store.as_ref(), PREFERENCES_STORAGE_KEY)
            .await
            .unwrap_or_else(|e| {
                warn!("Ignoring unreadable category preferences: {}", e);
                None
            });

        if let Some(saved) = saved.filter(|saved| !saved.is_empty()) {
            debug!("Loaded {} preferred categories", saved.len());
            *self.categories.write().await = saved;
        }
        Ok(())
    }

    pub async fn get(&self) -> BTreeSet<VenueCategory> {
        self.categories.read().await.clone()
    }

    pub async fn set(&self, categories: BTreeSet<VenueCategory>) -> crate::Result<()> {
        if categories.is_empty() {
            return Err(RendezvousError::invalid_input(
                "At least one venue category is required",
            ));
        }

        let mut current = self.categories.write().await;
        save_value(self.store.as_ref(), PREFERENCES_STORAGE_KEY, &categories)
            .await
            .context("Failed to save category preferences")?;
        *current = categories;
        Ok(())
    }
}
