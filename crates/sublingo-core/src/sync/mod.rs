//! Sync Module
//!
//! Drives the live overlay: a periodic loop samples playback time, resolves
//! the active cue, and publishes (possibly transformed) text to a display
//! sink.
//!
//! ```text
//!  PlaybackClock ──► SyncEngine tick ──► CueIndex ──► TransformDispatcher
//!                         │                                   │
//!                         ▼                                   ▼
//!                    DisplaySink  ◄──── dedup ◄──── completion events
//! ```

pub mod engine;

pub use engine::{SyncEngine, SyncStatus};

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use std::time::Instant;

use crate::transform::CacheConfig;
use crate::TimeSec;

// =============================================================================
// Session State
// =============================================================================

/// Lifecycle state of a sync session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// No track loaded yet
    Idle,
    /// A track is loaded and the session can start
    TrackLoaded,
    /// The periodic loop is running
    Running,
    /// The session ended; terminal for this engine instance
    Stopped,
}

impl std::fmt::Display for SyncState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncState::Idle => write!(f, "idle"),
            SyncState::TrackLoaded => write!(f, "track_loaded"),
            SyncState::Running => write!(f, "running"),
            SyncState::Stopped => write!(f, "stopped"),
        }
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Sync engine configuration
#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// Poll interval of the sync loop in milliseconds
    pub tick_interval_ms: u64,
    /// Transform cache sizing
    pub cache: CacheConfig,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            cache: CacheConfig::default(),
        }
    }
}

// =============================================================================
// Clock and Sink Traits
// =============================================================================

/// Source of the current playback position
pub trait PlaybackClock: Send + Sync {
    /// Current playback time in seconds
    fn current_time(&self) -> TimeSec;
}

/// Receiver for settled overlay text
///
/// An empty string means "clear the overlay". The engine only calls this
/// when the settled text changes.
pub trait DisplaySink: Send + Sync {
    fn display(&self, text: &str);
}

// =============================================================================
// Clock Implementations
// =============================================================================

/// Manually driven clock, for tests and stepped playback
#[derive(Debug, Default)]
pub struct ManualClock {
    time: Mutex<TimeSec>,
}

impl ManualClock {
    pub fn new(start: TimeSec) -> Self {
        Self {
            time: Mutex::new(start),
        }
    }

    /// Moves the clock to the given position
    pub fn set(&self, time: TimeSec) {
        if let Ok(mut guard) = self.time.lock() {
            *guard = time;
        }
    }
}

impl PlaybackClock for ManualClock {
    fn current_time(&self) -> TimeSec {
        self.time.lock().map(|guard| *guard).unwrap_or(0.0)
    }
}

/// Wall-clock playback: elapsed real time scaled by a speed factor,
/// offset by a start position
#[derive(Debug)]
pub struct SystemClock {
    started: Instant,
    start_offset: TimeSec,
    speed: f64,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
            start_offset: 0.0,
            speed: 1.0,
        }
    }

    /// Sets the playback position at which the clock begins
    pub fn with_start(mut self, offset: TimeSec) -> Self {
        self.start_offset = if offset.is_finite() { offset } else { 0.0 };
        self
    }

    /// Sets the playback speed factor; non-finite or non-positive values
    /// fall back to real time
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = if speed.is_finite() && speed > 0.0 {
            speed
        } else {
            1.0
        };
        self
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackClock for SystemClock {
    fn current_time(&self) -> TimeSec {
        self.start_offset + self.started.elapsed().as_secs_f64() * self.speed
    }
}

// =============================================================================
// Sink Implementations
// =============================================================================

/// Sink that records every published text, for tests and diagnostics
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All texts published so far, in order
    pub fn events(&self) -> Vec<String> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Most recently published text
    pub fn last(&self) -> Option<String> {
        self.events
            .lock()
            .ok()
            .and_then(|e| e.last().cloned())
    }
}

impl DisplaySink for RecordingSink {
    fn display(&self, text: &str) {
        if let Ok(mut events) = self.events.lock() {
            events.push(text.to_string());
        }
    }
}
