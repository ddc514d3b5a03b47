//! Google Translation Provider
//!
//! Implements the Translator trait against the Google Cloud Translation v2
//! endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::ProviderConfig;
use crate::transform::provider::Translator;
use crate::{CoreError, CoreResult};

// =============================================================================
// Google Translator
// =============================================================================

/// Google Cloud Translation v2 provider
pub struct GoogleTranslator {
    /// API key
    api_key: String,
    /// Base URL for API requests
    #[allow(dead_code)]
    base_url: String,
    /// Request timeout in seconds
    #[allow(dead_code)]
    timeout_secs: u64,
    /// HTTP client
    #[cfg(feature = "remote-providers")]
    client: reqwest::Client,
}

impl GoogleTranslator {
    /// Default Translation API base URL
    pub const DEFAULT_BASE_URL: &'static str = "https://translation.googleapis.com";

    /// Creates a new Google translation provider
    pub fn new(config: ProviderConfig) -> CoreResult<Self> {
        let api_key = config
            .api_key
            .ok_or_else(|| CoreError::ValidationError("Google API key is required".to_string()))?;

        if api_key.is_empty() {
            return Err(CoreError::ValidationError(
                "Google API key cannot be empty".to_string(),
            ));
        }

        let base_url = config
            .base_url
            .unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_string());

        let timeout_secs = config.timeout_secs.unwrap_or(10);

        #[cfg(feature = "remote-providers")]
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| CoreError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key,
            base_url,
            timeout_secs,
            #[cfg(feature = "remote-providers")]
            client,
        })
    }
}

// =============================================================================
// Google API Types
// =============================================================================

#[cfg_attr(not(feature = "remote-providers"), allow(dead_code))]
#[derive(Serialize)]
struct TranslateRequest {
    q: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    target: String,
    format: String,
}

#[cfg_attr(not(feature = "remote-providers"), allow(dead_code))]
#[derive(Deserialize)]
struct TranslateResponse {
    data: TranslateData,
}

#[cfg_attr(not(feature = "remote-providers"), allow(dead_code))]
#[derive(Deserialize)]
struct TranslateData {
    translations: Vec<Translation>,
}

#[cfg_attr(not(feature = "remote-providers"), allow(dead_code))]
#[derive(Deserialize)]
struct Translation {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

// =============================================================================
// Translator Implementation
// =============================================================================

#[async_trait]
impl Translator for GoogleTranslator {
    fn name(&self) -> &str {
        "google-translate"
    }

    #[cfg(feature = "remote-providers")]
    async fn translate(&self, text: &str, source_lang: &str, target_lang: &str) -> CoreResult<String> {
        // empty source means auto-detect; the field is omitted entirely
        let api_request = TranslateRequest {
            q: text.to_string(),
            source: if source_lang.is_empty() {
                None
            } else {
                Some(source_lang.to_string())
            },
            target: target_lang.to_string(),
            format: "text".to_string(),
        };

        let url = format!("{}/language/translate/v2", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&api_request)
            .send()
            .await
            .map_err(|e| CoreError::ProviderRequestFailed(format!("Request failed: {}", e)))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            CoreError::ProviderRequestFailed(format!("Failed to read response: {}", e))
        })?;

        if !status.is_success() {
            return Err(CoreError::ProviderRequestFailed(format!(
                "Google Translation API error ({}): {}",
                status, body
            )));
        }

        let api_response: TranslateResponse = serde_json::from_str(&body).map_err(|e| {
            CoreError::ProviderRequestFailed(format!("Failed to parse response: {}", e))
        })?;

        let translation = api_response.data.translations.first().ok_or_else(|| {
            CoreError::ProviderRequestFailed("No translations returned".to_string())
        })?;

        Ok(translation.translated_text.clone())
    }

    #[cfg(not(feature = "remote-providers"))]
    async fn translate(
        &self,
        _text: &str,
        _source_lang: &str,
        _target_lang: &str,
    ) -> CoreResult<String> {
        Err(CoreError::NotSupported(
            "Remote providers feature not enabled. Build with --features remote-providers"
                .to_string(),
        ))
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
