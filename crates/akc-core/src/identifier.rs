//! Resource identifiers
//!
//! A key/value entry is persisted by the framework as a single flat string
//! encoding the triple `(endpoint host, label, key)`:
//!
//! ```text
//! cfg.example.com/(no label)/app/name
//! └──── host ───┘ └─ label ─┘ └ key ─┘
//! ```
//!
//! Keys may themselves contain `/`, so decoding only splits on the first two
//! separators. Labels may not contain `/`; [`ResourceId::new`] rejects them so
//! that every identifier it produces decodes back to the same triple.
//!
//! The scheme is not part of the identifier: decoding always yields an
//! `https://` endpoint.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use url::Url;

use crate::error::{Error, Result};

/// Sentinel label for entries that carry no label
pub const LABEL_NONE: &str = "(no label)";

/// Whether `label` addresses the store's unlabelled partition
///
/// Both the sentinel and the empty string map to the store's null label;
/// they only differ in the identifier they produce.
pub fn is_no_label(label: &str) -> bool {
    label.is_empty() || label == LABEL_NONE
}

/// Scheme re-added to the host when an identifier is decoded
const ENDPOINT_SCHEME: &str = "https";

/// Field separator inside an encoded identifier
const SEPARATOR: char = '/';

/// Canonical identity of a key/value entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId {
    host: String,
    label: String,
    key: String,
}

impl ResourceId {
    /// Build the identifier for `key` under `label` in the store at `endpoint`
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidEndpoint`] if `endpoint` is not a URL with a host
    /// - [`Error::InvalidInput`] if `key` is empty or `label` contains `/`
    pub fn new(endpoint: &str, label: impl Into<String>, key: impl Into<String>) -> Result<Self> {
        let label = label.into();
        let key = key.into();

        if key.is_empty() {
            return Err(Error::invalid_input("key cannot be empty"));
        }
        if label.contains(SEPARATOR) {
            return Err(Error::invalid_input(format!(
                "label cannot contain '{}': {}",
                SEPARATOR, label
            )));
        }

        Ok(Self {
            host: endpoint_host(endpoint)?,
            label,
            key,
        })
    }

    /// Decode an identifier previously produced by [`ResourceId::to_string`]
    pub fn parse(id: &str) -> Result<Self> {
        let mut fields = id.splitn(3, SEPARATOR);

        let (Some(host), Some(label), Some(key)) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(Error::invalid_id(format!(
                "expected <host>/<label>/<key>, got '{}'",
                id
            )));
        };

        if host.is_empty() {
            return Err(Error::invalid_id(format!("missing host in '{}'", id)));
        }
        if key.is_empty() {
            return Err(Error::invalid_id(format!("missing key in '{}'", id)));
        }

        Ok(Self {
            host: host.to_string(),
            label: label.to_string(),
            key: key.to_string(),
        })
    }

    /// The store endpoint, normalized to `https://<host>`
    pub fn endpoint(&self) -> String {
        format!("{}://{}", ENDPOINT_SCHEME, self.host)
    }

    /// The endpoint host (with port, when the endpoint carried one)
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The entry label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The entry key
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}{}",
            self.host,
            self.label,
            self.key,
            sep = SEPARATOR
        )
    }
}

impl FromStr for ResourceId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for ResourceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ResourceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Extract `host[:port]` from an endpoint URL
///
/// The host is lowercased and a default port is dropped, so `http://H` and
/// `https://h:443` both yield `h`.
pub(crate) fn endpoint_host(endpoint: &str) -> Result<String> {
    let url = Url::parse(endpoint).map_err(|_| Error::invalid_endpoint(endpoint))?;

    let host = url
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| Error::invalid_endpoint(endpoint))?;

    Ok(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}
