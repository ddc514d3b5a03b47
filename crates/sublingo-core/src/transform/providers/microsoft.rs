//! Microsoft Transliteration Provider
//!
//! Implements the Transliterator trait against the Microsoft Translator
//! transliterate endpoint (API version 3.0).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::ProviderConfig;
use crate::transform::provider::Transliterator;
use crate::{CoreError, CoreResult};

// =============================================================================
// Microsoft Transliterator
// =============================================================================

/// Microsoft Translator transliteration provider
pub struct MicrosoftTransliterator {
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

impl MicrosoftTransliterator {
    /// Default Translator API base URL
    pub const DEFAULT_BASE_URL: &'static str = "https://api.cognitive.microsofttranslator.com";

    /// Creates a new Microsoft transliteration provider
    pub fn new(config: ProviderConfig) -> CoreResult<Self> {
        let api_key = config.api_key.ok_or_else(|| {
            CoreError::ValidationError("Microsoft API key is required".to_string())
        })?;

        if api_key.is_empty() {
            return Err(CoreError::ValidationError(
                "Microsoft API key cannot be empty".to_string(),
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
// Microsoft API Types
// =============================================================================

#[cfg_attr(not(feature = "remote-providers"), allow(dead_code))]
#[derive(Serialize)]
struct TransliterateRequest {
    text: String,
    language: String,
    #[serde(rename = "fromScript")]
    from_script: String,
    #[serde(rename = "toScript")]
    to_script: String,
}

#[cfg_attr(not(feature = "remote-providers"), allow(dead_code))]
#[derive(Deserialize)]
struct TransliterateResponse {
    text: String,
}

// =============================================================================
// Transliterator Implementation
// =============================================================================

#[async_trait]
impl Transliterator for MicrosoftTransliterator {
    fn name(&self) -> &str {
        "microsoft-transliterate"
    }

    #[cfg(feature = "remote-providers")]
    async fn transliterate(
        &self,
        text: &str,
        language: &str,
        from_script: &str,
        to_script: &str,
    ) -> CoreResult<String> {
        // the endpoint takes a batch array; one element per call here
        let api_request = vec![TransliterateRequest {
            text: text.to_string(),
            language: language.to_string(),
            from_script: from_script.to_string(),
            to_script: to_script.to_string(),
        }];

        let url = format!("{}/transliterate?api-version=3.0", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("Ocp-Apim-Subscription-Key", &self.api_key)
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
                "Microsoft Translator API error ({}): {}",
                status, body
            )));
        }

        let api_response: Vec<TransliterateResponse> = serde_json::from_str(&body).map_err(|e| {
            CoreError::ProviderRequestFailed(format!("Failed to parse response: {}", e))
        })?;

        let first = api_response.into_iter().next().ok_or_else(|| {
            CoreError::ProviderRequestFailed("No transliterations returned".to_string())
        })?;

        Ok(first.text)
    }

    #[cfg(not(feature = "remote-providers"))]
    async fn transliterate(
        &self,
        _text: &str,
        _language: &str,
        _from_script: &str,
        _to_script: &str,
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
