//! Remote Transform Providers
//!
//! Concrete HTTP-backed implementations of the `Translator` and
//! `Transliterator` traits. Compiled against real endpoints only when the
//! `remote-providers` feature is enabled; without it the trait methods
//! return `NotSupported` so the crate still builds for offline use.

mod google;
mod microsoft;

pub use google::GoogleTranslator;
pub use microsoft::MicrosoftTransliterator;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::provider::{Translator, Transliterator};
use crate::CoreResult;

// =============================================================================
// Provider Configuration
// =============================================================================

/// Configuration for creating a remote provider
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    /// API key
    pub api_key: Option<String>,
    /// Base URL (for custom endpoints or proxies)
    pub base_url: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: Option<u64>,
}

impl ProviderConfig {
    /// Creates a Google translation provider config
    pub fn google(api_key: &str) -> Self {
        Self {
            api_key: Some(api_key.to_string()),
            base_url: None,
            timeout_secs: Some(10),
        }
    }

    /// Creates a Microsoft transliteration provider config
    pub fn microsoft(api_key: &str) -> Self {
        Self {
            api_key: Some(api_key.to_string()),
            base_url: None,
            timeout_secs: Some(10),
        }
    }

    /// Sets the base URL
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = Some(url.to_string());
        self
    }

    /// Sets the request timeout
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }
}

// =============================================================================
// Provider Factory
// =============================================================================

/// Creates a translator from configuration
pub fn create_translator(config: ProviderConfig) -> CoreResult<Arc<dyn Translator>> {
    let provider = GoogleTranslator::new(config)?;
    Ok(Arc::new(provider))
}

/// Creates a transliterator from configuration
pub fn create_transliterator(config: ProviderConfig) -> CoreResult<Arc<dyn Transliterator>> {
    let provider = MicrosoftTransliterator::new(config)?;
    Ok(Arc::new(provider))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_config_google() {
        let config = ProviderConfig::google("test-key");
        assert_eq!(config.api_key, Some("test-key".to_string()));
        assert!(config.base_url.is_none());
        assert_eq!(config.timeout_secs, Some(10));
    }

    #[test]
    fn test_provider_config_microsoft() {
        let config = ProviderConfig::microsoft("test-key").with_timeout_secs(30);
        assert_eq!(config.api_key, Some("test-key".to_string()));
        assert_eq!(config.timeout_secs, Some(30));
    }

    #[test]
    fn test_provider_config_custom_base_url() {
        let config = ProviderConfig::google("test-key").with_base_url("https://proxy.example.com");
        assert_eq!(config.base_url, Some("https://proxy.example.com".to_string()));
    }

    #[test]
    fn test_create_translator_requires_key() {
        assert!(create_translator(ProviderConfig::google("key")).is_ok());
        assert!(create_translator(ProviderConfig::google("")).is_err());
    }

    #[test]
    fn test_create_transliterator_requires_key() {
        assert!(create_transliterator(ProviderConfig::microsoft("key")).is_ok());
        assert!(create_transliterator(ProviderConfig::microsoft("")).is_err());
    }
}
