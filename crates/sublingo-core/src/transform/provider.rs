//! Transform provider abstraction
//!
//! Defines the trait interface for text transform providers (translation
//! and transliteration), the [`TransformRequest`] type that doubles as the
//! cache key, and mock implementations for testing.

use crate::{CoreError, CoreResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

// ============================================================================
// Transform Mode
// ============================================================================

/// How cue text is adapted for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransformMode {
    /// Translate into the target language
    Translate,
    /// Convert between writing scripts, keeping the language
    #[default]
    Transliterate,
}

impl std::fmt::Display for TransformMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransformMode::Translate => write!(f, "translate"),
            TransformMode::Transliterate => write!(f, "transliterate"),
        }
    }
}

impl std::str::FromStr for TransformMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "translate" | "translated" => Ok(TransformMode::Translate),
            "transliterate" | "transliterated" => Ok(TransformMode::Transliterate),
            _ => Err(format!("Unknown transform mode: {}", s)),
        }
    }
}

// ============================================================================
// Transform Request
// ============================================================================

/// A transform request; also the cache key.
///
/// Two requests with identical fields are the same work regardless of which
/// cue produced them, which is what makes caching and request coalescing
/// sound.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformRequest {
    pub text: String,
    pub mode: TransformMode,
    pub source_lang: String,
    pub target_lang: String,
}

impl TransformRequest {
    pub fn new(
        text: impl Into<String>,
        mode: TransformMode,
        source_lang: impl Into<String>,
        target_lang: impl Into<String>,
    ) -> Self {
        Self {
            text: text.into(),
            mode,
            source_lang: source_lang.into(),
            target_lang: target_lang.into(),
        }
    }

    /// True when the transform cannot change the text, so no provider call
    /// is needed. Holds for translation into the source language itself.
    pub fn is_identity(&self) -> bool {
        match self.mode {
            TransformMode::Translate => {
                !self.source_lang.is_empty() && self.source_lang == self.target_lang
            }
            // same-script transliteration is decided after script resolution
            TransformMode::Transliterate => false,
        }
    }
}

// ============================================================================
// Provider Traits
// ============================================================================

/// A translation provider.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Provider name for logging and diagnostics
    fn name(&self) -> &str;

    /// Whether the provider is ready to serve requests (e.g. has an API key)
    fn is_available(&self) -> bool;

    /// Translates `text` into `target_lang`.
    ///
    /// An empty `source_lang` lets the provider auto-detect.
    async fn translate(&self, text: &str, source_lang: &str, target_lang: &str)
        -> CoreResult<String>;
}

/// A transliteration provider (script conversion within one language).
#[async_trait]
pub trait Transliterator: Send + Sync {
    fn name(&self) -> &str;

    fn is_available(&self) -> bool;

    /// Converts `text` of `language` from `from_script` to `to_script`
    /// (ISO 15924 script codes).
    async fn transliterate(
        &self,
        text: &str,
        language: &str,
        from_script: &str,
        to_script: &str,
    ) -> CoreResult<String>;
}

// ============================================================================
// Mock Providers (for testing)
// ============================================================================

/// Mock translator with configurable responses and an invocation counter.
pub struct MockTranslator {
    name: String,
    available: bool,
    fixed_response: Option<String>,
    mappings: HashMap<String, String>,
    delay: Option<Duration>,
    fail_with: Option<String>,
    calls: AtomicUsize,
}

impl MockTranslator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            available: true,
            fixed_response: None,
            mappings: HashMap::new(),
            delay: None,
            fail_with: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Always respond with this text, ignoring the input.
    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.fixed_response = Some(response.into());
        self
    }

    /// Respond with `output` when the input text equals `input`.
    pub fn with_mapping(mut self, input: impl Into<String>, output: impl Into<String>) -> Self {
        self.mappings.insert(input.into(), output.into());
        self
    }

    /// Sleep this long before responding.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_available(mut self, available: bool) -> Self {
        self.available = available;
        self
    }

    /// Fail every call with this message.
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.fail_with = Some(message.into());
        self
    }

    /// Number of translate calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn respond(&self, text: &str) -> String {
        if let Some(fixed) = &self.fixed_response {
            return fixed.clone();
        }
        if let Some(mapped) = self.mappings.get(text) {
            return mapped.clone();
        }
        text.to_string()
    }
}

#[async_trait]
impl Translator for MockTranslator {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn translate(
        &self,
        text: &str,
        _source_lang: &str,
        _target_lang: &str,
    ) -> CoreResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if !self.available {
            return Err(CoreError::ProviderUnavailable(self.name.clone()));
        }
        if let Some(message) = &self.fail_with {
            return Err(CoreError::ProviderRequestFailed(message.clone()));
        }
        Ok(self.respond(text))
    }
}

/// Mock transliterator, mirroring [`MockTranslator`].
pub struct MockTransliterator {
    name: String,
    available: bool,
    fixed_response: Option<String>,
    mappings: HashMap<String, String>,
    delay: Option<Duration>,
    fail_with: Option<String>,
    calls: AtomicUsize,
}

impl MockTransliterator {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            available: true,
            fixed_response: None,
            mappings: HashMap::new(),
            delay: None,
            fail_with: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_response(mut self, response: impl Into<String>) -> Self {
        self.fixed_response = Some(response.into());
        self
    }

    pub fn with_mapping(mut self, input: impl Into<String>, output: impl Into<String>) -> Self {
        self.mappings.insert(input.into(), output.into());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn with_available(mut self, available: bool) -> Self {
        self.available = available;
        self
    }

    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.fail_with = Some(message.into());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn respond(&self, text: &str) -> String {
        if let Some(fixed) = &self.fixed_response {
            return fixed.clone();
        }
        if let Some(mapped) = self.mappings.get(text) {
            return mapped.clone();
        }
        text.to_string()
    }
}

#[async_trait]
impl Transliterator for MockTransliterator {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_available(&self) -> bool {
        self.available
    }

    async fn transliterate(
        &self,
        text: &str,
        _language: &str,
        _from_script: &str,
        _to_script: &str,
    ) -> CoreResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if !self.available {
            return Err(CoreError::ProviderUnavailable(self.name.clone()));
        }
        if let Some(message) = &self.fail_with {
            return Err(CoreError::ProviderRequestFailed(message.clone()));
        }
        Ok(self.respond(text))
    }
}
