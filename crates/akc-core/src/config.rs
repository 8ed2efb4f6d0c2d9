//! Configuration types for the key/value resource
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AkcConfig {
    /// Config store backend configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Optional reconciler settings
    #[serde(default)]
    pub reconciler: ReconcilerConfig,
}

impl AkcConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.store.validate()
    }
}

/// Config store backend configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// App Configuration REST API
    AppConfiguration {
        /// Bearer token used for every request
        access_token: String,
        /// REST api-version query parameter (defaults to "1.0")
        #[serde(default)]
        api_version: Option<String>,
    },

    /// In-process store (not persistent)
    #[default]
    Memory,

    /// Custom store backend
    Custom {
        /// Factory name to use
        factory: String,
        /// Custom configuration data
        config: serde_json::Value,
    },
}

impl StoreConfig {
    /// Validate the store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            StoreConfig::AppConfiguration { access_token, api_version } => {
                if access_token.is_empty() {
                    return Err(crate::Error::config(
                        "App Configuration access token cannot be empty",
                    ));
                }
                if api_version.as_deref().is_some_and(str::is_empty) {
                    return Err(crate::Error::config(
                        "App Configuration api_version cannot be empty when set",
                    ));
                }
                Ok(())
            }
            StoreConfig::Custom { factory, config } => {
                if factory.is_empty() {
                    return Err(crate::Error::config("Custom store factory cannot be empty"));
                }
                if config.is_null() {
                    return Err(crate::Error::config("Custom store config cannot be null"));
                }
                Ok(())
            }
            StoreConfig::Memory => Ok(()),
        }
    }

    /// Get the store type name used for registry lookups
    pub fn type_name(&self) -> &str {
        match self {
            StoreConfig::AppConfiguration { .. } => "app_configuration",
            StoreConfig::Memory => "memory",
            StoreConfig::Custom { factory, .. } => factory,
        }
    }
}

/// Reconciler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Upper bound for a single operation, in seconds
    ///
    /// Covers client construction and every remote call the operation makes.
    /// Set to 0 to disable.
    #[serde(default = "default_operation_timeout_secs")]
    pub operation_timeout_secs: u64,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            operation_timeout_secs: default_operation_timeout_secs(),
        }
    }
}

fn default_operation_timeout_secs() -> u64 {
    300
}
