//! Connection settings for the feed.
//!
//! The access key is always injected (environment or caller), never compiled
//! in, and is kept out of `Debug` output.

use crate::error::ConfigError;

pub const DEFAULT_BASE_URL: &str = "https://api.nasa.gov/planetary/apod";
pub const API_KEY_VAR: &str = "APOD_API_KEY";
pub const BASE_URL_VAR: &str = "APOD_BASE_URL";

#[derive(Clone, PartialEq, Eq)]
pub struct ApodConfig {
    pub base_url: String,
    api_key: String,
}

impl std::fmt::Debug for ApodConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApodConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl ApodConfig {
    /// Config for the public endpoint.
    pub fn new(api_key: &str) -> Result<Self, ConfigError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: &str, base_url: &str) -> Result<Self, ConfigError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(ConfigError::MissingApiKey(API_KEY_VAR));
        }
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ConfigError::InvalidBaseUrl(base_url.to_string()));
        }
        Ok(Self {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Read `APOD_API_KEY` (required) and `APOD_BASE_URL` (optional).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = lookup(API_KEY_VAR).ok_or(ConfigError::MissingApiKey(API_KEY_VAR))?;
        let base_url = lookup(BASE_URL_VAR).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self::with_base_url(&api_key, &base_url)
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_to_public_endpoint() {
        let cfg = ApodConfig::from_lookup(lookup(&[(API_KEY_VAR, "abc")])).unwrap();
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.api_key(), "abc");
    }

    #[test]
    fn base_url_override() {
        let cfg = ApodConfig::from_lookup(lookup(&[
            (API_KEY_VAR, "abc"),
            (BASE_URL_VAR, "http://127.0.0.1:3000/planetary/apod"),
        ]))
        .unwrap();
        assert_eq!(cfg.base_url, "http://127.0.0.1:3000/planetary/apod");
    }

    #[test]
    fn missing_or_blank_key_is_rejected() {
        assert_eq!(
            ApodConfig::from_lookup(lookup(&[])).unwrap_err(),
            ConfigError::MissingApiKey(API_KEY_VAR)
        );
        assert_eq!(
            ApodConfig::new("   ").unwrap_err(),
            ConfigError::MissingApiKey(API_KEY_VAR)
        );
    }

    #[test]
    fn non_http_base_url_is_rejected() {
        let err = ApodConfig::with_base_url("k", "ftp://example.test").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseUrl(_)));
    }

    #[test]
    fn debug_redacts_key() {
        let cfg = ApodConfig::new("super-secret").unwrap();
        assert!(!format!("{cfg:?}").contains("super-secret"));
    }
}
