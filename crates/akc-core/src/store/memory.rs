// # Memory Config Store
//
// In-memory implementation of ConfigStore.
//
// ## Purpose
//
// Provides a config store that lives entirely in the process. Useful for
// tests, dry runs of the CLI, and embedding the reconciler without a
// remote service.
//
// ## Label Handling
//
// Mirrors the remote service: the sentinel label and the empty label both
// address the unlabelled partition, and entries stored there are reported
// back with an empty label.
//
// ## Sharing
//
// `MemoryConfigStoreFactory` keeps one store per endpoint host, so clients
// built for the same endpoint by separate operations see the same entries.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::Error;
use crate::identifier::{endpoint_host, is_no_label};
use crate::config::StoreConfig;
use crate::traits::config_store::{ConfigStore, ConfigStoreFactory, KeyValue, StoreBackend};

/// `(label, key)` address of an entry; the null label is stored as ""
type EntryKey = (String, String);

fn entry_key(label: &str, key: &str) -> EntryKey {
    let label = if is_no_label(label) { "" } else { label };
    (label.to_string(), key.to_string())
}

/// In-memory config store implementation
///
/// This implementation stores all entries in a HashMap protected by a RwLock.
/// Clones share the same entries.
///
/// # Example
///
/// ```rust,no_run
/// use akc_core::store::MemoryConfigStore;
/// use akc_core::traits::ConfigStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryConfigStore::new();
///
///     store.set_key_value("prod", "app/name", "demo").await?;
///
///     let entry = store.get_key_value("prod", "app/name").await?;
///     assert_eq!(entry.map(|kv| kv.value), Some("demo".to_string()));
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigStore {
    inner: Arc<RwLock<HashMap<EntryKey, KeyValue>>>,
}

impl MemoryConfigStore {
    /// Create a new empty memory config store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of entries in the store
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }

    /// Insert an entry directly, bypassing the `ConfigStore` interface
    ///
    /// Used to simulate entries created outside the resource's management.
    pub async fn seed(&self, label: &str, key: &str, value: &str) {
        let mut guard = self.inner.write().await;
        let (stored_label, stored_key) = entry_key(label, key);
        guard.insert(
            (stored_label.clone(), stored_key.clone()),
            KeyValue::new(stored_label, stored_key, value),
        );
    }

    /// Remove every entry
    pub async fn clear(&self) {
        self.inner.write().await.clear();
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn get_key_value(&self, label: &str, key: &str) -> Result<Option<KeyValue>, Error> {
        let guard = self.inner.read().await;
        Ok(guard.get(&entry_key(label, key)).cloned())
    }

    async fn set_key_value(&self, label: &str, key: &str, value: &str) -> Result<KeyValue, Error> {
        let mut guard = self.inner.write().await;
        let address = entry_key(label, key);

        let revision = guard
            .get(&address)
            .and_then(|kv| kv.etag.as_deref())
            .and_then(|etag| etag.parse::<u64>().ok())
            .map_or(1, |rev| rev.saturating_add(1));

        let entry = KeyValue {
            etag: Some(revision.to_string()),
            last_modified: Some(chrono::Utc::now()),
            ..KeyValue::new(address.0.clone(), address.1.clone(), value)
        };

        guard.insert(address, entry.clone());
        Ok(entry)
    }

    async fn delete_key_value(&self, label: &str, key: &str) -> Result<Option<KeyValue>, Error> {
        let mut guard = self.inner.write().await;
        Ok(guard.remove(&entry_key(label, key)))
    }

    fn store_name(&self) -> &'static str {
        "memory"
    }
}

/// Factory handing out memory stores keyed by endpoint host
#[derive(Debug, Clone, Default)]
pub struct MemoryConfigStoreFactory {
    stores: Arc<Mutex<HashMap<String, MemoryConfigStore>>>,
}

impl MemoryConfigStoreFactory {
    /// Create a factory with no stores
    pub fn new() -> Self {
        Self::default()
    }

    /// Get (or create) the store backing `endpoint`
    ///
    /// Endpoints are matched by host and port, so `http://h` and `https://h`
    /// resolve to the same store, as decoded identifiers do.
    pub fn store_for(&self, endpoint: &str) -> Result<MemoryConfigStore, Error> {
        let address = endpoint_host(endpoint)
            .map_err(|e| Error::client_construction(endpoint, e.to_string()))?;

        let mut stores = self
            .stores
            .lock()
            .map_err(|_| Error::store("memory store registry lock poisoned"))?;
        Ok(stores.entry(address).or_default().clone())
    }
}

impl ConfigStoreFactory for MemoryConfigStoreFactory {
    fn connect(&self, endpoint: &str) -> Result<Box<dyn ConfigStore>, Error> {
        tracing::debug!("Connecting memory config store for {}", endpoint);
        Ok(Box::new(self.store_for(endpoint)?))
    }
}

/// Backend registered as "memory"
///
/// Each build starts from an empty set of stores.
#[derive(Debug, Clone, Copy, Default)]
pub struct MemoryStoreBackend;

impl StoreBackend for MemoryStoreBackend {
    fn build(&self, config: &StoreConfig) -> Result<Arc<dyn ConfigStoreFactory>, Error> {
        match config {
            StoreConfig::Memory => Ok(Arc::new(MemoryConfigStoreFactory::new())),
            _ => Err(Error::config("Invalid config for memory store")),
        }
    }
}
