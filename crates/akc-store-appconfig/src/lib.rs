// # App Configuration Store
//
// This crate provides a ConfigStore implementation backed by the App
// Configuration REST API.
//
// ## Behaviour
//
// - ✅ One HTTP request per store call
// - ✅ A new HTTP client per `connect`, bound to a single endpoint
// - ✅ HTTP timeout configured (30 seconds by default)
// - ✅ Specific error mapping for HTTP status codes (401/403, 404, 409/412, 429, 5xx)
// - ✅ Keys containing `/` are sent as a single escaped path segment
// - ❌ NO retry logic (failures go straight back to the reconciler)
// - ❌ NO caching (every read hits the service)
//
// ## Security Requirements
//
// - Access token NEVER appears in logs or `Debug` output
// - Factory MUST fail fast if the token is empty
//
// ## API Reference
//
// - Get key-value:    GET    `{endpoint}/kv/{key}?label={label}&api-version=1.0`
// - Set key-value:    PUT    `{endpoint}/kv/{key}?label={label}&api-version=1.0`
// - Delete key-value: DELETE `{endpoint}/kv/{key}?label={label}&api-version=1.0`
//
// The unlabelled partition is addressed with the null label `\0` (`%00`).

use std::sync::Arc;
use std::time::Duration;

use akc_core::config::StoreConfig;
use akc_core::identifier::is_no_label;
use akc_core::traits::{ConfigStore, ConfigStoreFactory, KeyValue, StoreBackend};
use akc_core::{Error, Result};
use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use url::Url;

/// Store backend name, used for registry lookups and error messages
pub const STORE_NAME: &str = "app_configuration";

/// Default REST api-version
pub const DEFAULT_API_VERSION: &str = "1.0";

/// Media type of single key-value payloads
const KV_MEDIA_TYPE: &str = "application/vnd.microsoft.appconfig.kv+json";

/// Wire value of the null label
const NULL_LABEL: &str = "\0";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Key-value as returned by the REST API
///
/// `label` and `value` are `null` for unlabelled / empty entries.
#[derive(Debug, Deserialize)]
struct WireKeyValue {
    key: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    content_type: Option<String>,
    #[serde(default)]
    etag: Option<String>,
    #[serde(default)]
    last_modified: Option<chrono::DateTime<chrono::Utc>>,
}

impl From<WireKeyValue> for KeyValue {
    fn from(wire: WireKeyValue) -> Self {
        Self {
            key: wire.key,
            label: wire.label.unwrap_or_default(),
            value: wire.value.unwrap_or_default(),
            content_type: wire.content_type,
            etag: wire.etag,
            last_modified: wire.last_modified,
        }
    }
}

/// App Configuration store client bound to one endpoint
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the access token.
pub struct AppConfigurationStore {
    /// Store endpoint, e.g. `https://cfg.example.com`
    endpoint: Url,

    /// Bearer token
    /// ⚠️ NEVER log this value
    access_token: String,

    /// REST api-version query parameter
    api_version: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the access token
impl std::fmt::Debug for AppConfigurationStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfigurationStore")
            .field("endpoint", &self.endpoint.as_str())
            .field("access_token", &"<REDACTED>")
            .field("api_version", &self.api_version)
            .finish()
    }
}

impl AppConfigurationStore {
    /// Create a client for `endpoint`
    ///
    /// # Errors
    ///
    /// [`Error::ClientConstruction`] if the endpoint is not an http(s) URL
    /// with a host, the token is empty, or the HTTP client cannot be built.
    pub fn new(
        endpoint: &str,
        access_token: impl Into<String>,
        api_version: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let access_token = access_token.into();
        if access_token.is_empty() {
            return Err(Error::client_construction(endpoint, "access token cannot be empty"));
        }

        let url = Url::parse(endpoint)
            .map_err(|e| Error::client_construction(endpoint, format!("invalid endpoint: {}", e)))?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(Error::client_construction(
                endpoint,
                "endpoint must be an http(s) URL with a host",
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::client_construction(endpoint, e.to_string()))?;

        Ok(Self {
            endpoint: url,
            access_token,
            api_version: api_version.into(),
            client,
        })
    }

    /// Build `{endpoint}/kv/{key}?label={label}&api-version={v}`
    fn kv_url(&self, label: &str, key: &str) -> Result<Url> {
        let mut url = self.endpoint.clone();

        url.path_segments_mut()
            .map_err(|_| Error::store(format!("endpoint cannot be a base: {}", self.endpoint)))?
            .pop_if_empty()
            .push("kv")
            .push(key);

        let label = if is_no_label(label) { NULL_LABEL } else { label };
        url.query_pairs_mut()
            .clear()
            .append_pair("label", label)
            .append_pair("api-version", &self.api_version);

        Ok(url)
    }

    /// Send one request and return the response, mapping transport failures
    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Response> {
        tracing::debug!("{} {}", method, url.path());

        let mut request = self
            .client
            .request(method, url)
            .bearer_auth(&self.access_token)
            .header(reqwest::header::ACCEPT, KV_MEDIA_TYPE);

        if let Some(body) = body {
            request = request
                .header(reqwest::header::CONTENT_TYPE, KV_MEDIA_TYPE)
                .body(body.to_string());
        }

        request
            .send()
            .await
            .map_err(|e| Error::http(format!("HTTP request failed: {}", e)))
    }

    async fn parse(response: reqwest::Response) -> Result<KeyValue> {
        let wire: WireKeyValue = response
            .json()
            .await
            .map_err(|e| Error::provider(STORE_NAME, format!("Failed to parse response: {}", e)))?;
        Ok(wire.into())
    }
}

/// Map a non-success response onto the error taxonomy
async fn status_error(response: reqwest::Response, action: &str) -> Error {
    let status = response.status();
    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string());

    match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "Invalid access token or insufficient permissions. Status: {}",
            status
        )),
        409 | 412 => Error::provider(
            STORE_NAME,
            format!("Conflict: entry is locked or was modified concurrently. Status: {}", status),
        ),
        429 => Error::rate_limited(format!("Please retry later. Status: {}", status)),
        500..=599 => Error::provider(
            STORE_NAME,
            format!("Server error (transient): {} - {}", status, error_text),
        ),
        _ => Error::provider(STORE_NAME, format!("{} failed: {} - {}", action, status, error_text)),
    }
}

#[async_trait]
impl ConfigStore for AppConfigurationStore {
    async fn get_key_value(&self, label: &str, key: &str) -> Result<Option<KeyValue>> {
        let url = self.kv_url(label, key)?;
        let response = self.send(Method::GET, url, None).await?;

        match response.status() {
            status if status.is_success() => Ok(Some(Self::parse(response).await?)),
            StatusCode::NOT_FOUND => {
                tracing::debug!("Key-value not found: {} (label: {})", key, label);
                Ok(None)
            }
            _ => Err(status_error(response, "Get key-value").await),
        }
    }

    async fn set_key_value(&self, label: &str, key: &str, value: &str) -> Result<KeyValue> {
        let url = self.kv_url(label, key)?;
        let body = serde_json::json!({ "value": value });
        let response = self.send(Method::PUT, url, Some(body)).await?;

        if !response.status().is_success() {
            return Err(status_error(response, "Set key-value").await);
        }

        tracing::info!("Key-value written: {} (label: {})", key, label);
        Self::parse(response).await
    }

    async fn delete_key_value(&self, label: &str, key: &str) -> Result<Option<KeyValue>> {
        let url = self.kv_url(label, key)?;
        let response = self.send(Method::DELETE, url, None).await?;

        match response.status() {
            StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(Self::parse(response).await?)),
            _ => Err(status_error(response, "Delete key-value").await),
        }
    }

    fn store_name(&self) -> &'static str {
        STORE_NAME
    }
}

/// Builds an [`AppConfigurationStore`] per endpoint
pub struct AppConfigurationFactory {
    access_token: String,
    api_version: String,
    timeout: Duration,
}

impl std::fmt::Debug for AppConfigurationFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfigurationFactory")
            .field("access_token", &"<REDACTED>")
            .field("api_version", &self.api_version)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl AppConfigurationFactory {
    /// Create a factory using the default api-version and HTTP timeout
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    /// Override the REST api-version
    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    /// Override the HTTP timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl ConfigStoreFactory for AppConfigurationFactory {
    fn connect(&self, endpoint: &str) -> Result<Box<dyn ConfigStore>> {
        tracing::debug!("Building App Configuration client for {}", endpoint);
        Ok(Box::new(AppConfigurationStore::new(
            endpoint,
            self.access_token.clone(),
            self.api_version.clone(),
            self.timeout,
        )?))
    }
}

/// Backend registered as "app_configuration"
pub struct AppConfigurationBackend;

impl StoreBackend for AppConfigurationBackend {
    fn build(&self, config: &StoreConfig) -> Result<Arc<dyn ConfigStoreFactory>> {
        match config {
            StoreConfig::AppConfiguration {
                access_token,
                api_version,
            } => {
                if access_token.is_empty() {
                    return Err(Error::config("App Configuration access token is required"));
                }

                let factory = AppConfigurationFactory::new(access_token.clone()).with_api_version(
                    api_version
                        .clone()
                        .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
                );
                Ok(Arc::new(factory))
            }
            _ => Err(Error::config("Invalid config for App Configuration store")),
        }
    }
}

/// Register the App Configuration backend with a registry
///
/// # Example
///
/// ```rust
/// use akc_core::StoreRegistry;
///
/// let registry = StoreRegistry::with_builtin();
/// akc_store_appconfig::register(&registry);
/// assert!(registry.has_store("app_configuration"));
/// ```
pub fn register(registry: &akc_core::StoreRegistry) {
    registry.register_store(STORE_NAME, Box::new(AppConfigurationBackend));
}

#[cfg(test)]
mod tests {
    use super::*;
    use akc_core::LABEL_NONE;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store(server: &MockServer) -> Box<dyn ConfigStore> {
        AppConfigurationFactory::new("secret_token_12345")
            .connect(&server.uri())
            .unwrap()
    }

    fn kv_json(key: &str, label: Option<&str>, value: &str) -> serde_json::Value {
        serde_json::json!({
            "etag": "e1",
            "key": key,
            "label": label,
            "content_type": null,
            "value": value,
            "last_modified": "2024-05-01T10:00:00+00:00",
            "locked": false,
            "tags": {}
        })
    }

    #[tokio::test]
    async fn test_get_existing_entry() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/kv/app%2Fname"))
            .and(query_param("label", "prod"))
            .and(query_param("api-version", "1.0"))
            .and(header("authorization", "Bearer secret_token_12345"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(kv_json("app/name", Some("prod"), "demo")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let kv = store(&server)
            .get_key_value("prod", "app/name")
            .await
            .unwrap()
            .unwrap();

        assert_eq!(kv.key, "app/name");
        assert_eq!(kv.label, "prod");
        assert_eq!(kv.value, "demo");
        assert_eq!(kv.etag.as_deref(), Some("e1"));
        assert!(kv.last_modified.is_some());
    }

    #[tokio::test]
    async fn test_get_missing_entry_is_none() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let kv = store(&server).get_key_value("prod", "missing").await.unwrap();
        assert!(kv.is_none());
    }

    #[tokio::test]
    async fn test_sentinel_label_sent_as_null_label() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/kv/k"))
            .and(query_param("label", "\0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(kv_json("k", None, "v")))
            .expect(1)
            .mount(&server)
            .await;

        let kv = store(&server)
            .get_key_value(LABEL_NONE, "k")
            .await
            .unwrap()
            .unwrap();

        // A null label comes back empty; the reconciler normalizes it
        assert_eq!(kv.label, "");
    }

    #[tokio::test]
    async fn test_set_sends_value() {
        let server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/kv/k"))
            .and(query_param("label", "dev"))
            .and(header("content-type", KV_MEDIA_TYPE))
            .and(body_json(serde_json::json!({ "value": "v2" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(kv_json("k", Some("dev"), "v2")))
            .expect(1)
            .mount(&server)
            .await;

        let kv = store(&server).set_key_value("dev", "k", "v2").await.unwrap();
        assert_eq!(kv.value, "v2");
    }

    #[tokio::test]
    async fn test_delete() {
        let server = MockServer::start().await;

        Mock::given(method("DELETE"))
            .and(path("/kv/present"))
            .respond_with(ResponseTemplate::new(200).set_body_json(kv_json("present", None, "v")))
            .mount(&server)
            .await;

        Mock::given(method("DELETE"))
            .and(path("/kv/absent"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let store = store(&server);
        assert!(store.delete_key_value("", "present").await.unwrap().is_some());
        assert!(store.delete_key_value("", "absent").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_status_mapping() {
        let cases = [
            (401, "auth"),
            (403, "auth"),
            (409, "provider"),
            (429, "rate"),
            (503, "provider"),
            (400, "provider"),
        ];

        for (status, expected) in cases {
            let server = MockServer::start().await;
            Mock::given(method("PUT"))
                .respond_with(ResponseTemplate::new(status).set_body_string("nope"))
                .expect(1)
                .mount(&server)
                .await;

            let err = store(&server).set_key_value("dev", "k", "v").await.unwrap_err();
            let matched = match expected {
                "auth" => matches!(err, Error::Authentication(_)),
                "rate" => matches!(err, Error::RateLimited(_)),
                _ => matches!(err, Error::Provider { .. }),
            };
            assert!(matched, "status {} gave {:?}", status, err);
        }
    }

    #[tokio::test]
    async fn test_server_error_on_get_is_not_absence() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
            .expect(1)
            .mount(&server)
            .await;

        let err = store(&server).get_key_value("dev", "k").await.unwrap_err();
        assert!(err.to_string().contains("Internal Server Error"));
    }

    #[test]
    fn test_connect_rejects_bad_endpoints() {
        let factory = AppConfigurationFactory::new("token");

        for endpoint in ["cfg.example.com", "ftp://cfg.example.com", ""] {
            let err = factory.connect(endpoint).err().unwrap();
            assert!(matches!(err, Error::ClientConstruction { .. }), "{}", endpoint);
        }

        let err = AppConfigurationFactory::new("")
            .connect("https://cfg.example.com")
            .err()
            .unwrap();
        assert!(matches!(err, Error::ClientConstruction { .. }));
    }

    #[test]
    fn test_kv_url_escapes_key() {
        let store = AppConfigurationStore::new(
            "https://cfg.example.com",
            "token",
            DEFAULT_API_VERSION,
            DEFAULT_HTTP_TIMEOUT,
        )
        .unwrap();

        let url = store.kv_url("", "app/name").unwrap();
        assert_eq!(
            url.as_str(),
            "https://cfg.example.com/kv/app%2Fname?label=%00&api-version=1.0"
        );
    }

    #[test]
    fn test_access_token_not_exposed_in_debug() {
        let store = AppConfigurationStore::new(
            "https://cfg.example.com",
            "secret_token_12345",
            DEFAULT_API_VERSION,
            DEFAULT_HTTP_TIMEOUT,
        )
        .unwrap();

        let debug_str = format!("{:?}", store);
        assert!(!debug_str.contains("secret_token_12345"));
        assert!(debug_str.contains("AppConfigurationStore"));

        let factory = AppConfigurationFactory::new("secret_token_12345");
        assert!(!format!("{:?}", factory).contains("secret_token"));
    }

    #[test]
    fn test_register() {
        let registry = akc_core::StoreRegistry::new();
        register(&registry);

        let config = StoreConfig::AppConfiguration {
            access_token: "token".to_string(),
            api_version: Some("2023-11-01".to_string()),
        };
        let factory = registry.create_factory(&config).unwrap();
        assert!(factory.connect("https://cfg.example.com").is_ok());
    }
}
