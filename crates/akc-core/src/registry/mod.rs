//! Plugin-based store registry
//!
//! The registry allows config store backends to be registered dynamically
//! at runtime, avoiding hardcoded if-else chains on the store type.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use akc_core::registry::StoreRegistry;
//! use akc_core::config::StoreConfig;
//!
//! // Create a registry with the in-memory backend
//! let registry = StoreRegistry::with_builtin();
//!
//! // Remote backends register themselves
//! akc_store_appconfig::register(&registry);
//!
//! // Build the client factory for the configured backend
//! let factory = registry.create_factory(&StoreConfig::Memory)?;
//! ```

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::store::MemoryStoreBackend;
use crate::traits::{ConfigStoreFactory, StoreBackend};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Registry of config store backends
///
/// The registry maintains a map of store type names to backends, allowing
/// dynamic construction of client factories based on configuration.
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct StoreRegistry {
    /// Registered store backends
    stores: RwLock<HashMap<String, Box<dyn StoreBackend>>>,
}

impl StoreRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the backends shipped in this crate
    pub fn with_builtin() -> Self {
        let registry = Self::new();
        registry.register_store("memory", Box::new(MemoryStoreBackend));
        registry
    }

    /// Register a store backend
    ///
    /// # Parameters
    ///
    /// - `name`: Store type name (e.g., "memory", "app_configuration")
    /// - `backend`: Backend object for building client factories
    ///
    /// Registering a name twice replaces the earlier backend.
    pub fn register_store(&self, name: impl Into<String>, backend: Box<dyn StoreBackend>) {
        let name = name.into();
        match self.stores.write() {
            Ok(mut stores) => {
                tracing::debug!("Registering store backend: {}", name);
                stores.insert(name, backend);
            }
            Err(_) => tracing::error!("Store registry lock poisoned, dropping backend {}", name),
        }
    }

    /// Build a client factory from configuration
    ///
    /// # Returns
    ///
    /// - `Ok(Arc<dyn ConfigStoreFactory>)`: Factory for the configured backend
    /// - `Err(Error)`: If the store type is not registered or the build fails
    pub fn create_factory(&self, config: &StoreConfig) -> Result<Arc<dyn ConfigStoreFactory>> {
        config.validate()?;

        let store_type = config.type_name();
        let stores = self
            .stores
            .read()
            .map_err(|_| Error::store("store registry lock poisoned"))?;

        let backend = stores
            .get(store_type)
            .ok_or_else(|| Error::config(format!("Unknown store type: {}", store_type)))?;

        backend.build(config)
    }

    /// List all registered store types
    pub fn list_stores(&self) -> Vec<String> {
        self.stores
            .read()
            .map(|stores| stores.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Check if a store type is registered
    pub fn has_store(&self, name: &str) -> bool {
        self.stores
            .read()
            .map(|stores| stores.contains_key(name))
            .unwrap_or(false)
    }
}
