//! Transform result caching
//!
//! Session-lifetime memoization of transform results keyed by
//! [`TransformRequest`]. Entries beyond the configured cap are evicted
//! least-recently-used. Hit/miss/eviction counts are tracked for
//! diagnostics.

use super::provider::TransformRequest;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Configuration
// ============================================================================

/// Cache configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheConfig {
    /// Maximum number of cached entries (0 disables caching)
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

fn default_max_entries() -> usize {
    2048
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: default_max_entries(),
        }
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// Cache statistics snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    /// Hit rate in [0, 1]; zero when nothing was looked up yet.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

// ============================================================================
// Transform Cache
// ============================================================================

#[derive(Debug, Clone)]
struct CacheEntry {
    text: String,
    /// Recency stamp from the cache's own sequence counter
    last_used: u64,
}

/// LRU-evicting map of transform results.
///
/// Not internally synchronized; the dispatcher wraps it in a mutex. Recency
/// uses a sequence counter rather than wall time so eviction order is
/// deterministic.
#[derive(Debug)]
pub struct TransformCache {
    config: CacheConfig,
    entries: HashMap<TransformRequest, CacheEntry>,
    seq: u64,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl TransformCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: HashMap::new(),
            seq: 0,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    /// Looks up a cached result, bumping its recency.
    pub fn get(&mut self, key: &TransformRequest) -> Option<String> {
        self.seq += 1;
        let seq = self.seq;
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.last_used = seq;
                self.hits += 1;
                Some(entry.text.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Stores a result, evicting the least recently used entry when full.
    pub fn insert(&mut self, key: TransformRequest, text: String) {
        if self.config.max_entries == 0 {
            return;
        }
        self.seq += 1;
        if !self.entries.contains_key(&key) && self.entries.len() >= self.config.max_entries {
            self.evict_oldest();
        }
        self.entries.insert(
            key,
            CacheEntry {
                text,
                last_used: self.seq,
            },
        );
    }

    pub fn contains(&self, key: &TransformRequest) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
            evictions: self.evictions,
        }
    }

    fn evict_oldest(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
            self.evictions += 1;
            tracing::debug!("transform cache evicted least recently used entry");
        }
    }
}

impl Default for TransformCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
