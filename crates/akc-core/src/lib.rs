// # akc-core
//
// Core library for the App Configuration key/value resource.
//
// ## Architecture Overview
//
// This library manages one key/value entry in a remote configuration store
// on behalf of a declarative-state framework:
// - **ConfigStore**: Trait for reading and writing entries in a store
// - **ConfigStoreFactory**: Builds a store client for one endpoint
// - **ResourceId**: Flat `<host>/<label>/<key>` identifier persisted by the framework
// - **KeyValueReconciler**: Maps create/read/update/delete/import onto store calls
// - **StoreRegistry**: Plugin-based registry for store backends
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Resource logic is separate from store backends
// 2. **Fresh Clients**: Every operation builds its own client; nothing is cached
// 3. **Plugin-Based**: Backends are registered by name, no hard-coded if-else
// 4. **Library-First**: The CLI is a thin layer over this crate
// 5. **Soft Absence**: An entry deleted out of band reads as absent, not as an error

pub mod traits;
pub mod identifier;
pub mod resource;
pub mod reconciler;
pub mod registry;
pub mod config;
pub mod error;
pub mod store;

// Re-export core types for convenience
pub use traits::{ConfigStore, ConfigStoreFactory, KeyValue, StoreBackend};
pub use identifier::{LABEL_NONE, ResourceId};
pub use resource::{KeyValueSpec, KeyValueState, RESOURCE_TYPE};
pub use reconciler::{CreateMode, KeyValueReconciler};
pub use registry::StoreRegistry;
pub use config::{AkcConfig, ReconcilerConfig, StoreConfig};
pub use error::{Error, Result};
pub use store::{MemoryConfigStore, MemoryConfigStoreFactory};
