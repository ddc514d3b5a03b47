//! Transform dispatch: cached, coalesced, staleness-safe provider calls
//!
//! [`TransformDispatcher::resolve`] is the synchronous entry the sync loop
//! calls when the active cue changes. It consults the cache, coalesces
//! duplicate in-flight work, and spawns at most one provider task per
//! distinct request key. Completions arrive on an event channel; the
//! caller decides whether a completion is still current before publishing
//! it. Stale results are not published, but they stay cached for reuse.

use super::cache::{CacheConfig, CacheStats, TransformCache};
use super::provider::{TransformMode, TransformRequest, Translator, Transliterator};
use super::script::script_pair;
use crate::CoreResult;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

// ============================================================================
// Events
// ============================================================================

/// Completion event for a dispatched transform.
#[derive(Debug)]
pub struct TransformEvent {
    pub request: TransformRequest,
    pub outcome: CoreResult<String>,
}

// ============================================================================
// Resolution
// ============================================================================

/// Result of a resolve call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The text is available now (cache hit, identity, or fail-fast fallback)
    Ready(String),
    /// A provider call is in flight; a [`TransformEvent`] will follow
    Pending,
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Routes transform requests to the right provider with caching and
/// in-flight coalescing.
pub struct TransformDispatcher {
    translator: Arc<dyn Translator>,
    transliterator: Arc<dyn Transliterator>,
    cache: Arc<Mutex<TransformCache>>,
    in_flight: Arc<Mutex<HashSet<TransformRequest>>>,
    event_tx: mpsc::UnboundedSender<TransformEvent>,
    event_rx: Mutex<Option<mpsc::UnboundedReceiver<TransformEvent>>>,
}

impl TransformDispatcher {
    pub fn new(translator: Arc<dyn Translator>, transliterator: Arc<dyn Transliterator>) -> Self {
        Self::with_cache_config(translator, transliterator, CacheConfig::default())
    }

    pub fn with_cache_config(
        translator: Arc<dyn Translator>,
        transliterator: Arc<dyn Transliterator>,
        cache_config: CacheConfig,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        Self {
            translator,
            transliterator,
            cache: Arc::new(Mutex::new(TransformCache::new(cache_config))),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            event_tx,
            event_rx: Mutex::new(Some(event_rx)),
        }
    }

    /// Takes the completion event receiver. Returns `None` after the first
    /// call; there is exactly one consumer per dispatcher.
    pub fn take_event_receiver(&self) -> Option<mpsc::UnboundedReceiver<TransformEvent>> {
        self.event_rx.lock().ok().and_then(|mut rx| rx.take())
    }

    /// Snapshot of cache statistics.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache
            .lock()
            .map(|cache| cache.stats())
            .unwrap_or_default()
    }

    /// Number of requests currently in flight.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.lock().map(|set| set.len()).unwrap_or(0)
    }

    /// Resolves a transform request.
    ///
    /// Never blocks on a provider: either the answer is already known
    /// (`Ready`) or work is dispatched/coalesced (`Pending`). Fail-fast
    /// paths (unsupported language, unavailable provider) return the
    /// original text; only the unsupported-language case is cached, since
    /// it can never succeed on retry.
    pub fn resolve(&self, request: TransformRequest) -> Resolution {
        if request.text.trim().is_empty() || request.is_identity() {
            return Resolution::Ready(request.text);
        }

        if let Ok(mut cache) = self.cache.lock() {
            if let Some(text) = cache.get(&request) {
                return Resolution::Ready(text);
            }
        }

        // transliteration resolves its script pair before any provider work
        let scripts = match request.mode {
            TransformMode::Transliterate => {
                match script_pair(&request.source_lang, &request.target_lang) {
                    Ok((from, to)) if from == to => {
                        // same script on both sides; cache the identity so
                        // the next lookup short-circuits
                        self.cache_result(&request, request.text.clone());
                        return Resolution::Ready(request.text);
                    }
                    Ok(pair) => Some(pair),
                    Err(err) => {
                        tracing::warn!(
                            source = %request.source_lang,
                            target = %request.target_lang,
                            %err,
                            "transliteration unsupported, displaying original text"
                        );
                        self.cache_result(&request, request.text.clone());
                        return Resolution::Ready(request.text);
                    }
                }
            }
            TransformMode::Translate => None,
        };

        let available = match request.mode {
            TransformMode::Translate => self.translator.is_available(),
            TransformMode::Transliterate => self.transliterator.is_available(),
        };
        if !available {
            tracing::warn!(mode = %request.mode, "transform provider unavailable, displaying original text");
            return Resolution::Ready(request.text);
        }

        {
            let Ok(mut in_flight) = self.in_flight.lock() else {
                return Resolution::Ready(request.text);
            };
            if in_flight.contains(&request) {
                // coalesced: the earlier dispatch will complete for both
                return Resolution::Pending;
            }
            in_flight.insert(request.clone());
        }

        self.spawn_transform(request, scripts);
        Resolution::Pending
    }

    fn cache_result(&self, request: &TransformRequest, text: String) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(request.clone(), text);
        }
    }

    fn spawn_transform(
        &self,
        request: TransformRequest,
        scripts: Option<(&'static str, &'static str)>,
    ) {
        let translator = Arc::clone(&self.translator);
        let transliterator = Arc::clone(&self.transliterator);
        let cache = Arc::clone(&self.cache);
        let in_flight = Arc::clone(&self.in_flight);
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            let outcome = match scripts {
                Some((from, to)) => {
                    transliterator
                        .transliterate(&request.text, &request.source_lang, from, to)
                        .await
                }
                None => {
                    translator
                        .translate(&request.text, &request.source_lang, &request.target_lang)
                        .await
                }
            };

            // cache before clearing in-flight so a racing resolve sees
            // either the in-flight marker or the cached result
            if let Ok(text) = &outcome {
                if let Ok(mut cache) = cache.lock() {
                    cache.insert(request.clone(), text.clone());
                }
            }
            if let Ok(mut in_flight) = in_flight.lock() {
                in_flight.remove(&request);
            }
            // the receiver may be gone after shutdown; completion is moot then
            let _ = event_tx.send(TransformEvent { request, outcome });
        });
    }
}
