//! Core traits for the key/value resource
//!
//! This module defines the abstract interfaces that store backends must follow.
//!
//! - [`ConfigStore`]: Read and write entries in a remote configuration store
//! - [`ConfigStoreFactory`]: Build a store client for a given endpoint
//! - [`StoreBackend`]: Turn store configuration into a factory

pub mod config_store;

pub use config_store::{ConfigStore, ConfigStoreFactory, KeyValue, StoreBackend};
