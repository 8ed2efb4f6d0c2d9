//! Key/value resource reconciler
//!
//! The KeyValueReconciler is responsible for:
//! - Building a store client for the entry's endpoint on every operation
//! - Refusing to adopt unmanaged entries on create
//! - Mapping create/read/update/delete/import onto store calls
//! - Computing the identifier the framework persists
//!
//! ## Architecture
//!
//! ```text
//!   framework ── KeyValueSpec / ResourceId ──┐
//!                                            ▼
//!                                ┌──────────────────────┐
//!                                │  KeyValueReconciler  │
//!                                └──────────────────────┘
//!                                            │ connect(endpoint)
//!                                            ▼
//!                                ┌──────────────────────┐
//!                                │ ConfigStoreFactory   │──▶ ConfigStore
//!                                └──────────────────────┘   (get/set/delete)
//! ```
//!
//! ## Failure Model
//!
//! No retries. Every store error is returned to the caller as-is, with one
//! exception: an entry missing on read is reported as `Ok(None)` so the
//! framework can drop it from state instead of failing.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::ReconcilerConfig;
use crate::error::{Error, Result};
use crate::identifier::ResourceId;
use crate::resource::{KeyValueSpec, KeyValueState, RESOURCE_TYPE};
use crate::traits::{ConfigStore, ConfigStoreFactory};

/// How `create` treats an entry that already exists remotely
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CreateMode {
    /// Fail with [`Error::NeedsImport`] if the entry exists
    #[default]
    Fresh,
    /// Overwrite the entry; used after the entry has been imported
    Adopt,
}

/// Reconciler for the key/value resource
///
/// Holds no connection: each operation asks the factory for a client bound
/// to the entry's endpoint and drops it when done. The reconciler itself is
/// immutable and can be shared across tasks.
///
/// ## Cancellation
///
/// Dropping an operation future cancels the in-flight store call. When
/// `operation_timeout_secs` is non-zero, each operation is also bounded by
/// that timeout and fails with [`Error::Timeout`].
pub struct KeyValueReconciler {
    /// Builds a store client per operation
    factory: Arc<dyn ConfigStoreFactory>,

    /// Upper bound for one operation
    operation_timeout: Option<Duration>,
}

impl KeyValueReconciler {
    /// Create a new reconciler
    ///
    /// # Parameters
    ///
    /// - `factory`: Builds store clients for endpoints
    /// - `config`: Reconciler configuration
    pub fn new(factory: Arc<dyn ConfigStoreFactory>, config: ReconcilerConfig) -> Self {
        let operation_timeout = match config.operation_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Self {
            factory,
            operation_timeout,
        }
    }

    /// Create the entry described by `spec`
    ///
    /// Fails with [`Error::NeedsImport`] without writing anything if an entry
    /// already exists under the spec's label and key.
    ///
    /// # Returns
    ///
    /// The state read back after the write, carrying the new identifier.
    pub async fn create(&self, spec: &KeyValueSpec) -> Result<KeyValueState> {
        self.create_with(spec, CreateMode::Fresh).await
    }

    /// Create the entry described by `spec` with an explicit [`CreateMode`]
    pub async fn create_with(&self, spec: &KeyValueSpec, mode: CreateMode) -> Result<KeyValueState> {
        self.bounded(self.do_create(spec, mode)).await
    }

    /// Read the entry behind `id`
    ///
    /// # Returns
    ///
    /// - `Ok(Some(state))`: The entry exists
    /// - `Ok(None)`: The entry is gone; the caller should clear its identifier
    /// - `Err(Error)`: The client could not be built or the store call failed
    pub async fn read(&self, id: &ResourceId) -> Result<Option<KeyValueState>> {
        self.bounded(self.do_read(id)).await
    }

    /// Write a new value for the entry behind `id`
    ///
    /// Endpoint, label and key are immutable, so the returned state carries
    /// the same identifier.
    pub async fn update(&self, id: &ResourceId, value: &str) -> Result<KeyValueState> {
        self.bounded(self.do_update(id, value)).await
    }

    /// Delete the entry behind `id`
    ///
    /// On success the caller clears its persisted identifier. Deleting an
    /// entry that is already gone succeeds.
    pub async fn delete(&self, id: &ResourceId) -> Result<()> {
        self.bounded(self.do_delete(id)).await
    }

    /// Import an existing entry by its identifier string
    ///
    /// Pass-through import: the external id is the identifier itself.
    pub async fn import(&self, external_id: &str) -> Result<KeyValueState> {
        let id = ResourceId::parse(external_id)?;
        info!("Importing {} {}", RESOURCE_TYPE, id);

        self.read(&id).await?.ok_or_else(|| {
            Error::not_found(format!("Cannot import non-existent remote object: {}", id))
        })
    }

    async fn do_create(&self, spec: &KeyValueSpec, mode: CreateMode) -> Result<KeyValueState> {
        info!("Creating {} {} ({:?})", RESOURCE_TYPE, spec.key, mode);

        spec.validate()?;
        let id = spec.resource_id()?;
        let store = self.connect(&spec.endpoint)?;

        if mode == CreateMode::Fresh
            && store.get_key_value(&spec.label, &spec.key).await?.is_some()
        {
            warn!("KV {} already exists and is not managed", id);
            return Err(Error::NeedsImport {
                resource_type: RESOURCE_TYPE,
                id: id.to_string(),
            });
        }

        store
            .set_key_value(&spec.label, &spec.key, &spec.value)
            .await?;

        info!("KV {} has been written", id);
        self.read_back(store.as_ref(), id).await
    }

    async fn do_read(&self, id: &ResourceId) -> Result<Option<KeyValueState>> {
        info!("Reading {} {}", RESOURCE_TYPE, id);

        let store = self.connect(&id.endpoint())?;
        self.fetch(store.as_ref(), id).await
    }

    async fn do_update(&self, id: &ResourceId, value: &str) -> Result<KeyValueState> {
        info!("Updating {} {}", RESOURCE_TYPE, id);

        let store = self.connect(&id.endpoint())?;

        store.set_key_value(id.label(), id.key(), value).await?;

        // Keep the identifier exactly as persisted, even when not canonical
        self.read_back(store.as_ref(), id.clone()).await
    }

    async fn do_delete(&self, id: &ResourceId) -> Result<()> {
        info!("Deleting {} {}", RESOURCE_TYPE, id);

        let store = self.connect(&id.endpoint())?;

        match store.delete_key_value(id.label(), id.key()).await? {
            Some(_) => info!("KV {} has been deleted", id),
            None => debug!("KV {} was already absent", id),
        }

        Ok(())
    }

    /// Get `id` through `store`; `None` when the entry is absent
    async fn fetch(&self, store: &dyn ConfigStore, id: &ResourceId) -> Result<Option<KeyValueState>> {
        debug!("Fetching KV {} from {}", id, store.store_name());

        match store.get_key_value(id.label(), id.key()).await? {
            Some(kv) => {
                debug!("KV has been fetched {}={}", id, kv.value);
                Ok(Some(KeyValueState::observed(id.clone(), kv.value, kv.label)))
            }
            None => {
                info!("KV not found, removing from state: {}", id);
                Ok(None)
            }
        }
    }

    /// Refresh state after a write made through `store`
    async fn read_back(&self, store: &dyn ConfigStore, id: ResourceId) -> Result<KeyValueState> {
        self.fetch(store, &id)
            .await?
            .ok_or_else(|| Error::not_found(format!("KV {} vanished after write", id)))
    }

    fn connect(&self, endpoint: &str) -> Result<Box<dyn ConfigStore>> {
        self.factory.connect(endpoint)
    }

    async fn bounded<T>(&self, operation: impl Future<Output = Result<T>>) -> Result<T> {
        match self.operation_timeout {
            Some(limit) => tokio::time::timeout(limit, operation)
                .await
                .map_err(|_| Error::Timeout(limit.as_secs()))?,
            None => operation.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::LABEL_NONE;
    use crate::store::{MemoryConfigStore, MemoryConfigStoreFactory};

    const ENDPOINT: &str = "https://cfg.example.com";

    fn reconciler() -> (KeyValueReconciler, MemoryConfigStore) {
        let factory = MemoryConfigStoreFactory::new();
        let store = factory.store_for(ENDPOINT).unwrap();
        let reconciler = KeyValueReconciler::new(Arc::new(factory), ReconcilerConfig::default());
        (reconciler, store)
    }

    #[tokio::test]
    async fn test_create_then_read() {
        let (reconciler, _store) = reconciler();
        let spec = KeyValueSpec::new(ENDPOINT, "app/name", "demo");

        let created = reconciler.create(&spec).await.unwrap();
        assert_eq!(created.id.to_string(), "cfg.example.com/(no label)/app/name");
        assert_eq!(created.value, "demo");
        assert_eq!(created.label, LABEL_NONE);

        let read = reconciler.read(&created.id).await.unwrap().unwrap();
        assert_eq!(read, created);
    }

    #[tokio::test]
    async fn test_update_keeps_identifier() {
        let (reconciler, _store) = reconciler();
        let spec = KeyValueSpec::new(ENDPOINT, "k", "v1").with_label("prod");

        let created = reconciler.create(&spec).await.unwrap();
        let updated = reconciler.update(&created.id, "v2").await.unwrap();

        assert_eq!(updated.id, created.id);
        assert_eq!(updated.value, "v2");
        assert_eq!(updated.label, "prod");
    }

    #[tokio::test]
    async fn test_delete_then_read_is_absent() {
        let (reconciler, store) = reconciler();
        let spec = KeyValueSpec::new(ENDPOINT, "k", "v");

        let created = reconciler.create(&spec).await.unwrap();
        reconciler.delete(&created.id).await.unwrap();

        assert!(store.is_empty().await);
        assert!(reconciler.read(&created.id).await.unwrap().is_none());

        // Deleting again is not an error
        reconciler.delete(&created.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_adopt_overwrites_existing() {
        let (reconciler, store) = reconciler();
        store.seed("prod", "k", "foreign").await;

        let spec = KeyValueSpec::new(ENDPOINT, "k", "mine").with_label("prod");
        assert!(reconciler.create(&spec).await.unwrap_err().is_needs_import());

        let adopted = reconciler.create_with(&spec, CreateMode::Adopt).await.unwrap();
        assert_eq!(adopted.value, "mine");
    }

    #[tokio::test]
    async fn test_import() {
        let (reconciler, store) = reconciler();
        store.seed("", "app/name", "demo").await;

        let imported = reconciler
            .import("cfg.example.com/(no label)/app/name")
            .await
            .unwrap();
        assert_eq!(imported.value, "demo");
        assert_eq!(imported.endpoint, ENDPOINT);

        let err = reconciler.import("cfg.example.com/prod/missing").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));

        let err = reconciler.import("garbage").await.unwrap_err();
        assert!(matches!(err, Error::InvalidId(_)));
    }

    #[tokio::test]
    async fn test_update_keeps_non_canonical_identifier() {
        let (reconciler, store) = reconciler();
        store.seed("prod", "k", "v1").await;

        for raw in ["cfg.example.com:443/prod/k", "CFG.Example.com/prod/k"] {
            let imported = reconciler.import(raw).await.unwrap();
            assert_eq!(imported.id.to_string(), raw);

            let updated = reconciler.update(&imported.id, "v2").await.unwrap();
            assert_eq!(updated.id, imported.id);
            assert_eq!(updated.id.to_string(), raw);
            assert_eq!(updated.value, "v2");

            let read = reconciler.read(&updated.id).await.unwrap().unwrap();
            assert_eq!(read.id, imported.id);
        }
    }

    #[tokio::test]
    async fn test_invalid_spec_makes_no_call() {
        let (reconciler, store) = reconciler();
        let spec = KeyValueSpec::new("cfg.example.com", "k", "v");

        let err = reconciler.create(&spec).await.unwrap_err();
        assert!(matches!(err, Error::InvalidEndpoint(_)));
        assert!(store.is_empty().await);
    }
}
