//! cartsync configuration
//!
//! One flat table, loadable from TOML. Every field has a default so a config
//! file only needs to name the storefront endpoint and token.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CartSyncConfig {
    /// Storefront GraphQL endpoint
    pub endpoint: String,
    /// Storefront access token sent with every request
    pub access_token: String,
    /// Durable storage key for the cart id
    pub storage_key: String,
    /// Label used for the free-text note attribute
    pub note_label: String,
    /// Attribute keys with this prefix are never shown in overlays
    pub reserved_prefix: String,
    /// Coalescing window for render signals
    pub debounce_ms: u64,
    /// Settle delay after each fetch
    pub settle_ms: u64,
    /// How long a submit result stays visible before the control resets
    pub feedback_reset_ms: u64,
    /// HTTP request timeout
    pub request_timeout_ms: u64,
}

impl CartSyncConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check values that would make the engine unusable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid("endpoint must not be empty".into()));
        }
        if self.storage_key.trim().is_empty() {
            return Err(ConfigError::Invalid("storage_key must not be empty".into()));
        }
        if self.note_label.trim().is_empty() {
            return Err(ConfigError::Invalid("note_label must not be empty".into()));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_ms must be positive".into(),
            ));
        }
        Ok(())
    }

    /// With endpoint
    #[inline]
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// With access token
    #[inline]
    #[must_use]
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = token.into();
        self
    }

    /// With debounce window
    #[inline]
    #[must_use]
    pub fn with_debounce(mut self, window: Duration) -> Self {
        self.debounce_ms = window.as_millis() as u64;
        self
    }

    /// With post-fetch settle delay
    #[inline]
    #[must_use]
    pub fn with_settle(mut self, delay: Duration) -> Self {
        self.settle_ms = delay.as_millis() as u64;
        self
    }

    /// Render debounce window
    #[inline]
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// Post-fetch cooldown
    #[inline]
    #[must_use]
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// How long submit feedback stays up
    #[inline]
    #[must_use]
    pub fn feedback_reset(&self) -> Duration {
        Duration::from_millis(self.feedback_reset_ms)
    }

    /// Per-request HTTP timeout
    #[inline]
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for CartSyncConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://example.myshopify.com/api/graphql".to_string(),
            access_token: String::new(),
            storage_key: "__shopify:cartId".to_string(),
            note_label: "Monogram".to_string(),
            reserved_prefix: "_".to_string(),
            debounce_ms: 50,
            settle_ms: 50,
            feedback_reset_ms: 2000,
            request_timeout_ms: 15_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = CartSyncConfig::new();
        assert!(config.validate().is_ok());
        assert_eq!(config.debounce(), Duration::from_millis(50));
        assert_eq!(config.storage_key, "__shopify:cartId");
    }

    #[test]
    fn parses_partial_toml() {
        let config = CartSyncConfig::from_toml_str(
            r#"
            endpoint = "https://shop.example/api/graphql"
            access_token = "abc"
            debounce_ms = 300
            "#,
        )
        .unwrap();
        assert_eq!(config.access_token, "abc");
        assert_eq!(config.debounce_ms, 300);
        assert_eq!(config.note_label, "Monogram");
    }

    #[test]
    fn rejects_empty_endpoint() {
        let err = CartSyncConfig::from_toml_str(r#"endpoint = "  ""#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn rejects_malformed_toml() {
        let err = CartSyncConfig::from_toml_str("endpoint = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn builders_set_durations() {
        let config = CartSyncConfig::new()
            .with_debounce(Duration::from_millis(120))
            .with_settle(Duration::from_millis(10));
        assert_eq!(config.debounce_ms, 120);
        assert_eq!(config.settle(), Duration::from_millis(10));
    }
}
