//! Durable key-value storage for history and preferences
//!
//! Values are postcard-encoded inside a versioned envelope. The fjall backend does its
//! blocking I/O on the blocking thread pool.

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use fjall::Keyspace;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task;

/// Current envelope version; older or newer data is ignored on load
pub const STORAGE_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct StoredValue<T> {
    version: u32,
    value: T,
}

/// Byte-oriented persistence used by the history and preference stores
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

pub type SharedStore = Arc<dyn KeyValueStore>;

/// Serialize `value` into the versioned envelope and store it under `key`
pub async fn save_value<T: Serialize + Sync>(
    store: &dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<()> {
    let entry = StoredValue {
        version: STORAGE_VERSION,
        value,
    };
    let bytes = postcard::to_stdvec(&entry)?;
    store.put(key, bytes).await
}

/// Load a value written by [`save_value`]. Unknown versions read as absent.
pub async fn load_value<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>> {
    let Some(bytes) = store.get(key).await? else {
        return Ok(None);
    };
    let entry: StoredValue<T> = postcard::from_bytes(&bytes)?;
    if entry.version != STORAGE_VERSION {
        tracing::warn!(
            "Ignoring stored value for {} with unsupported version {}",
            key,
            entry.version
        );
        return Ok(None);
    }
    Ok(Some(entry.value))
}

fn get_from_store(store: Keyspace, key: Vec<u8>) -> Result<Option<Vec<u8>>> {
    Ok(store.get(key)?.map(|v| v.to_vec()))
}

/// fjall-backed store on local disk
pub struct FjallStore {
    store: Keyspace,
}

impl FjallStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = fjall::Database::builder(path.as_ref())
            .open()
            .map_err(|e| anyhow!("Failed to open storage at {}: {e}", path.as_ref().display()))?;
        let items = db.keyspace("rendezvous", fjall::KeyspaceCreateOptions::default)?;
        Ok(FjallStore { store: items })
    }
}

#[async_trait]
impl KeyValueStore for FjallStore {
    #[tracing::instrument(name = "storage_get", level = "debug", skip(self))]
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let store = self.store.clone();
        let key = key.as_bytes().to_vec();
        task::spawn_blocking(move || get_from_store(store, key)).await?
    }

    #[tracing::instrument(name = "storage_put", level = "debug", skip(self, value))]
    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let store = self.store.clone();
        let key = key.as_bytes().to_vec();
        task::spawn_blocking(move || store.insert(key, value)).await??;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let store = self.store.clone();
        let key = key.as_bytes().to_vec();
        task::spawn_blocking(move || store.remove(key)).await??;
        Ok(())
    }
}

/// Process-local store for tests and ephemeral sessions
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn put(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.entries.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}
