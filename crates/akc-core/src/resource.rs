//! Resource schema and the typed mapping layer
//!
//! The reconciliation framework hands resources around as untyped attribute
//! maps. This module owns the conversion between those maps and the typed
//! [`KeyValueSpec`] / [`KeyValueState`] the reconciler works with.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use url::Url;

use crate::error::{Error, Result};
use crate::identifier::{LABEL_NONE, ResourceId};

/// Resource type name as registered with the framework
pub const RESOURCE_TYPE: &str = "akc_key_value";

/// Attribute names
pub const ATTR_ID: &str = "id";
pub const ATTR_ENDPOINT: &str = "endpoint";
pub const ATTR_KEY: &str = "key";
pub const ATTR_VALUE: &str = "value";
pub const ATTR_LABEL: &str = "label";

/// Description of one resource attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    /// Attribute name
    pub name: &'static str,
    /// Must be set in configuration
    pub required: bool,
    /// Changing the value replaces the resource
    pub force_new: bool,
    /// Value used when the attribute is omitted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<&'static str>,
}

const ENDPOINT: Attribute = Attribute {
    name: ATTR_ENDPOINT,
    required: true,
    force_new: true,
    default: None,
};

const KEY: Attribute = Attribute {
    name: ATTR_KEY,
    required: true,
    force_new: true,
    default: None,
};

const VALUE: Attribute = Attribute {
    name: ATTR_VALUE,
    required: true,
    force_new: false,
    default: None,
};

const LABEL: Attribute = Attribute {
    name: ATTR_LABEL,
    required: false,
    force_new: true,
    default: Some(LABEL_NONE),
};

/// The attribute table of the key/value resource
pub fn schema() -> Vec<Attribute> {
    vec![ENDPOINT, KEY, VALUE, LABEL]
}

/// Desired state of a key/value entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValueSpec {
    /// Store endpoint URL
    pub endpoint: String,
    /// Entry key
    pub key: String,
    /// Entry value
    pub value: String,
    /// Entry label
    #[serde(default = "default_label")]
    pub label: String,
}

fn default_label() -> String {
    LABEL_NONE.to_string()
}

impl KeyValueSpec {
    /// Create a spec with the default label
    pub fn new(
        endpoint: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            key: key.into(),
            value: value.into(),
            label: default_label(),
        }
    }

    /// Set the label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Map a framework attribute map onto a spec
    ///
    /// Applies the label default, rejects missing required attributes,
    /// non-string values and attributes the schema does not know. A
    /// computed `id` attribute is accepted and ignored.
    pub fn from_value(value: &Value) -> Result<Self> {
        let attrs = value
            .as_object()
            .ok_or_else(|| Error::invalid_input("resource attributes must be an object"))?;

        for name in attrs.keys() {
            let known = name == ATTR_ID || schema().iter().any(|attr| attr.name == name.as_str());
            if !known {
                return Err(Error::invalid_input(format!(
                    "unknown attribute '{}' for {}",
                    name, RESOURCE_TYPE
                )));
            }
        }

        Ok(Self {
            endpoint: string_attr(attrs, &ENDPOINT)?,
            key: string_attr(attrs, &KEY)?,
            value: string_attr(attrs, &VALUE)?,
            label: string_attr(attrs, &LABEL)?,
        })
    }

    /// Check attribute values before any remote call is made
    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.endpoint).map_err(|_| Error::invalid_endpoint(&self.endpoint))?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(Error::invalid_endpoint(&self.endpoint));
        }

        if self.key.is_empty() {
            return Err(Error::invalid_input("key cannot be empty"));
        }

        if self.label.contains('/') {
            return Err(Error::invalid_input(format!(
                "label cannot contain '/': {}",
                self.label
            )));
        }

        Ok(())
    }

    /// Identifier this spec will be persisted under
    pub fn resource_id(&self) -> Result<ResourceId> {
        ResourceId::new(&self.endpoint, self.label.clone(), self.key.clone())
    }
}

/// Observed state of a managed key/value entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValueState {
    /// Persisted identifier
    pub id: ResourceId,
    /// Store endpoint, normalized to `https://<host>`
    pub endpoint: String,
    /// Entry key
    pub key: String,
    /// Entry value as last read
    pub value: String,
    /// Entry label, [`LABEL_NONE`] when the store reported none
    pub label: String,
}

impl KeyValueState {
    /// Build the observed state from an identifier and what the store returned
    pub(crate) fn observed(id: ResourceId, value: String, label: String) -> Self {
        let label = if label.is_empty() {
            LABEL_NONE.to_string()
        } else {
            label
        };

        Self {
            endpoint: id.endpoint(),
            key: id.key().to_string(),
            id,
            value,
            label,
        }
    }

    /// Map the state back onto a framework attribute map
    pub fn to_value(&self) -> Value {
        let mut attrs = Map::new();
        attrs.insert(ATTR_ID.to_string(), Value::String(self.id.to_string()));
        attrs.insert(ATTR_ENDPOINT.to_string(), Value::String(self.endpoint.clone()));
        attrs.insert(ATTR_KEY.to_string(), Value::String(self.key.clone()));
        attrs.insert(ATTR_VALUE.to_string(), Value::String(self.value.clone()));
        attrs.insert(ATTR_LABEL.to_string(), Value::String(self.label.clone()));
        Value::Object(attrs)
    }
}

fn string_attr(attrs: &Map<String, Value>, attr: &Attribute) -> Result<String> {
    match attrs.get(attr.name) {
        Some(Value::String(s)) => Ok(s.clone()),
        None | Some(Value::Null) => match (attr.required, attr.default) {
            (false, Some(default)) => Ok(default.to_string()),
            _ => Err(Error::invalid_input(format!(
                "missing required attribute '{}'",
                attr.name
            ))),
        },
        Some(other) => Err(Error::invalid_input(format!(
            "attribute '{}' must be a string, got {}",
            attr.name, other
        ))),
    }
}
