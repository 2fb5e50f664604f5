//! Client configuration
//!
//! [`ClientConfig`] carries everything needed to reach a project: the base
//! URL, the project `hash`, the `jwt` bearer credential, and the
//! reconnection policy. It deserializes from the same camelCase keys the
//! hosted service documents (`autoReconnect`, `maxReconnectAttempts`,
//! `reconnectDelay`, ...), and can also be read from the environment.
//!
//! Validation happens when a client is built, not when the struct is
//! created, so a config can be assembled field by field.
//!
//! # Examples
//!
//! ```rust
//! use socketbase_client::ClientConfig;
//!
//! let config = ClientConfig::new("project-hash", "eyJhbGciOi...");
//! assert!(config.validate().is_ok());
//!
//! let url = config.endpoint().unwrap();
//! assert_eq!(url.path(), "/ws/project-hash");
//! ```

use serde::Deserialize;
use socketbase_core::{Error, Result};
use std::time::Duration;
use url::Url;

/// Default service endpoint
pub const DEFAULT_URL: &str = "wss://api.socket-base.com";
/// Default reconnection budget
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;
/// Default linear backoff unit in milliseconds
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 1000;

/// Validated connection settings for a client
#[derive(Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ClientConfig {
    /// Base URL of the service, without the `/ws/...` suffix
    pub url: String,
    /// Project identifier embedded in the connection path
    pub hash: String,
    /// Bearer credential sent as the `jwt` query parameter
    pub jwt: String,
    /// Queue frames and reconnect while disconnected
    pub auto_reconnect: bool,
    /// Start connecting as soon as the client is built
    pub auto_connect: bool,
    /// Reconnection attempts after an unexpected close before giving up
    pub max_reconnect_attempts: u32,
    /// Linear backoff unit in milliseconds
    #[serde(rename = "reconnectDelay")]
    pub reconnect_delay_ms: u64,
    /// Give up on an unacknowledged join/leave after this many milliseconds
    #[serde(rename = "requestTimeout")]
    pub request_timeout_ms: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            hash: String::new(),
            jwt: String::new(),
            auto_reconnect: true,
            auto_connect: true,
            max_reconnect_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            reconnect_delay_ms: DEFAULT_RECONNECT_DELAY_MS,
            request_timeout_ms: None,
        }
    }
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("url", &self.url)
            .field("hash", &self.hash)
            .field("jwt", &"<redacted>")
            .field("auto_reconnect", &self.auto_reconnect)
            .field("auto_connect", &self.auto_connect)
            .field("max_reconnect_attempts", &self.max_reconnect_attempts)
            .field("reconnect_delay_ms", &self.reconnect_delay_ms)
            .field("request_timeout_ms", &self.request_timeout_ms)
            .finish()
    }
}

impl ClientConfig {
    /// Create a configuration with defaults for everything but the credentials
    pub fn new(hash: impl Into<String>, jwt: impl Into<String>) -> Self {
        Self {
            hash: hash.into(),
            jwt: jwt.into(),
            ..Default::default()
        }
    }

    /// Read the configuration from `SOCKETBASE_*` environment variables
    ///
    /// Recognized: `SOCKETBASE_URL`, `SOCKETBASE_HASH`, `SOCKETBASE_JWT`,
    /// `SOCKETBASE_AUTO_RECONNECT`, `SOCKETBASE_AUTO_CONNECT`,
    /// `SOCKETBASE_MAX_RECONNECT_ATTEMPTS`, `SOCKETBASE_RECONNECT_DELAY_MS`,
    /// `SOCKETBASE_REQUEST_TIMEOUT_MS`. Unset variables keep their default.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = lookup("SOCKETBASE_URL") {
            config.url = url;
        }
        if let Some(hash) = lookup("SOCKETBASE_HASH") {
            config.hash = hash;
        }
        if let Some(jwt) = lookup("SOCKETBASE_JWT") {
            config.jwt = jwt;
        }
        if let Some(value) = lookup("SOCKETBASE_AUTO_RECONNECT") {
            config.auto_reconnect = parse_var("SOCKETBASE_AUTO_RECONNECT", &value)?;
        }
        if let Some(value) = lookup("SOCKETBASE_AUTO_CONNECT") {
            config.auto_connect = parse_var("SOCKETBASE_AUTO_CONNECT", &value)?;
        }
        if let Some(value) = lookup("SOCKETBASE_MAX_RECONNECT_ATTEMPTS") {
            config.max_reconnect_attempts =
                parse_var("SOCKETBASE_MAX_RECONNECT_ATTEMPTS", &value)?;
        }
        if let Some(value) = lookup("SOCKETBASE_RECONNECT_DELAY_MS") {
            config.reconnect_delay_ms = parse_var("SOCKETBASE_RECONNECT_DELAY_MS", &value)?;
        }
        if let Some(value) = lookup("SOCKETBASE_REQUEST_TIMEOUT_MS") {
            config.request_timeout_ms = Some(parse_var("SOCKETBASE_REQUEST_TIMEOUT_MS", &value)?);
        }

        Ok(config)
    }

    /// Check that the configuration can produce a connection target
    ///
    /// # Errors
    ///
    /// `Error::Config` naming the missing field (`hash` first, then `JWT`),
    /// or describing why `url` cannot be used.
    pub fn validate(&self) -> Result<()> {
        if self.hash.trim().is_empty() {
            return Err(Error::Config("hash is required".to_string()));
        }
        if self.jwt.trim().is_empty() {
            return Err(Error::Config("JWT is required".to_string()));
        }
        self.endpoint().map(|_| ())
    }

    /// Build the connection target `{url}/ws/{hash}?jwt={jwt}`
    ///
    /// The hash is added as a path segment and the JWT as a query pair, so
    /// both are percent-encoded.
    pub fn endpoint(&self) -> Result<Url> {
        let mut url = Url::parse(&self.url)
            .map_err(|e| Error::Config(format!("invalid url '{}': {}", self.url, e)))?;

        url.path_segments_mut()
            .map_err(|_| Error::Config(format!("invalid url '{}': cannot be a base", self.url)))?
            .pop_if_empty()
            .push("ws")
            .push(&self.hash);
        url.query_pairs_mut().append_pair("jwt", &self.jwt);

        Ok(url)
    }

    /// Linear backoff unit
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Join/leave acknowledgement timeout, `None` to wait indefinitely
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::Config(format!("{} has invalid value '{}': {}", key, value, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.url, "wss://api.socket-base.com");
        assert!(config.auto_reconnect);
        assert!(config.auto_connect);
        assert_eq!(config.max_reconnect_attempts, 5);
        assert_eq!(config.reconnect_delay(), Duration::from_millis(1000));
        assert_eq!(config.request_timeout(), None);
    }

    #[test]
    fn test_validate_requires_hash_then_jwt() {
        let err = ClientConfig::new("", "").validate().unwrap_err();
        assert!(err.to_string().contains("hash"));

        let err = ClientConfig::new("proj", "").validate().unwrap_err();
        assert!(err.to_string().contains("JWT"));

        assert!(ClientConfig::new("proj", "token").validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let mut config = ClientConfig::new("proj", "token");
        config.url = "not a url".to_string();
        assert!(config.validate().unwrap_err().is_config());
    }

    #[test]
    fn test_endpoint_default_url() {
        let config = ClientConfig::new("proj", "aaa.bbb.ccc");
        assert_eq!(
            config.endpoint().unwrap().as_str(),
            "wss://api.socket-base.com/ws/proj?jwt=aaa.bbb.ccc"
        );
    }

    #[test]
    fn test_endpoint_keeps_base_path_and_encodes_jwt() {
        let mut config = ClientConfig::new("proj", "a b&c=d");
        config.url = "ws://localhost:9000/api/".to_string();

        let url = config.endpoint().unwrap();
        assert_eq!(url.path(), "/api/ws/proj");

        let jwt: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(jwt, vec![("jwt".to_string(), "a b&c=d".to_string())]);
        assert!(!url.as_str().contains("a b&c=d"));
    }

    #[test]
    fn test_deserialize_camel_case() {
        let config: ClientConfig = serde_json::from_value(serde_json::json!({
            "hash": "proj",
            "jwt": "t",
            "autoReconnect": false,
            "maxReconnectAttempts": 2,
            "reconnectDelay": 250
        }))
        .unwrap();

        assert_eq!(config.hash, "proj");
        assert!(!config.auto_reconnect);
        assert!(config.auto_connect);
        assert_eq!(config.max_reconnect_attempts, 2);
        assert_eq!(config.reconnect_delay(), Duration::from_millis(250));
        assert_eq!(config.url, DEFAULT_URL);
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            ("SOCKETBASE_HASH", "proj"),
            ("SOCKETBASE_JWT", "token"),
            ("SOCKETBASE_AUTO_RECONNECT", "false"),
            ("SOCKETBASE_RECONNECT_DELAY_MS", "20"),
            ("SOCKETBASE_REQUEST_TIMEOUT_MS", "3000"),
        ]
        .into_iter()
        .collect();

        let config = ClientConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.hash, "proj");
        assert_eq!(config.jwt, "token");
        assert!(!config.auto_reconnect);
        assert_eq!(config.reconnect_delay_ms, 20);
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(3)));
        assert_eq!(config.max_reconnect_attempts, 5);
    }

    #[test]
    fn test_from_lookup_invalid_number() {
        let err = ClientConfig::from_lookup(|key| {
            (key == "SOCKETBASE_MAX_RECONNECT_ATTEMPTS").then(|| "many".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("SOCKETBASE_MAX_RECONNECT_ATTEMPTS"));
    }

    #[test]
    fn test_debug_redacts_jwt() {
        let config = ClientConfig::new("proj", "super-secret");
        let debug = format!("{:?}", config);
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("proj"));
    }
}
