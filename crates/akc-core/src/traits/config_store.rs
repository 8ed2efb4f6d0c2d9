// # Config Store Trait
//
// Defines the interface for reading and writing key/value entries in a
// remote configuration store.
//
// ## Implementations
//
// - App Configuration REST API: `akc-store-appconfig` crate
// - In-memory: `akc_core::store::MemoryConfigStore`
//
// ## Usage
//
// ```rust,ignore
// use akc_core::traits::ConfigStoreFactory;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let factory = /* ConfigStoreFactory implementation */;
//
//     // One client per operation, bound to one endpoint
//     let store = factory.connect("https://cfg.example.com")?;
//     store.set_key_value("(no label)", "app/name", "demo").await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One key/value record as reported by a config store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    /// The lookup name
    pub key: String,
    /// The label; empty when the store reports no label
    #[serde(default)]
    pub label: String,
    /// The payload
    pub value: String,
    /// Optional content type attached to the entry
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    /// Entity tag of the current revision
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// Last modification time
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<chrono::DateTime<chrono::Utc>>,
}

impl KeyValue {
    /// Create a record with no store metadata
    pub fn new(label: impl Into<String>, key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            label: label.into(),
            value: value.into(),
            content_type: None,
            etag: None,
            last_modified: None,
        }
    }
}

/// Trait for config store clients
///
/// A client is bound to a single endpoint at construction time (see
/// [`ConfigStoreFactory::connect`]) and addresses entries by `(label, key)`.
///
/// # Stateless, single-shot
///
/// Implementations perform one remote call per method and return the
/// outcome. They do not retry, back off or cache: failures are returned to
/// the reconciler, which forwards them to its caller unchanged.
///
/// # Absence
///
/// A missing entry is not an error for [`get_key_value`](Self::get_key_value)
/// or [`delete_key_value`](Self::delete_key_value): both return `Ok(None)`.
/// Every other failure (transport, authentication, server) is `Err`.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Fetch the entry stored under `(label, key)`
    ///
    /// # Returns
    ///
    /// - `Ok(Some(KeyValue))`: The entry exists
    /// - `Ok(None)`: No entry under that label and key
    /// - `Err(Error)`: The request failed
    async fn get_key_value(&self, label: &str, key: &str)
    -> Result<Option<KeyValue>, crate::Error>;

    /// Create or overwrite the entry stored under `(label, key)`
    ///
    /// # Returns
    ///
    /// - `Ok(KeyValue)`: The entry as stored
    /// - `Err(Error)`: The request failed
    async fn set_key_value(
        &self,
        label: &str,
        key: &str,
        value: &str,
    ) -> Result<KeyValue, crate::Error>;

    /// Delete the entry stored under `(label, key)`
    ///
    /// # Returns
    ///
    /// - `Ok(Some(KeyValue))`: The deleted entry
    /// - `Ok(None)`: There was nothing to delete
    /// - `Err(Error)`: The request failed
    async fn delete_key_value(
        &self,
        label: &str,
        key: &str,
    ) -> Result<Option<KeyValue>, crate::Error>;

    /// Get the store backend name (for logging/debugging)
    fn store_name(&self) -> &'static str;
}

/// Helper trait for constructing store clients bound to an endpoint
pub trait ConfigStoreFactory: Send + Sync {
    /// Build a client for `endpoint`
    ///
    /// Called once per reconciler operation; clients are never cached.
    ///
    /// # Returns
    ///
    /// - `Ok(Box<dyn ConfigStore>)`: A client bound to `endpoint`
    /// - `Err(Error)`: The client could not be built
    fn connect(&self, endpoint: &str) -> Result<Box<dyn ConfigStore>, crate::Error>;
}

/// A store backend that can be selected by name from configuration
///
/// Backends are registered with a [`StoreRegistry`](crate::StoreRegistry)
/// and turn a [`StoreConfig`](crate::config::StoreConfig) into the factory
/// the reconciler connects through.
pub trait StoreBackend: Send + Sync {
    /// Build a client factory from configuration
    fn build(
        &self,
        config: &crate::config::StoreConfig,
    ) -> Result<std::sync::Arc<dyn ConfigStoreFactory>, crate::Error>;
}
