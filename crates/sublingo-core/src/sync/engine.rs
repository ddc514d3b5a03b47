//! Sync Engine
//!
//! Owns one overlay session: load a track, start the periodic loop, stop.
//! Each tick samples the playback clock, finds the active cue, and resolves
//! its text through the transform dispatcher. Settled text reaches the
//! display sink only when it changes; transform completions that no longer
//! match the expected request are discarded as stale.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, Notify};

use super::{DisplaySink, PlaybackClock, SyncConfig, SyncState};
use crate::captions::{CueIndex, SubtitleTrack};
use crate::settings::Preferences;
use crate::transform::{
    CacheStats, Resolution, TransformDispatcher, TransformEvent, TransformRequest, Translator,
    Transliterator,
};
use crate::{CoreError, CoreResult, SessionId, TrackId};

// =============================================================================
// Session Status
// =============================================================================

/// Snapshot of a session for diagnostics
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub session_id: SessionId,
    pub state: SyncState,
    pub track_id: Option<TrackId>,
    pub cue_count: usize,
    /// RFC3339 timestamp of when the loop started
    pub started_at: Option<String>,
    pub last_displayed: Option<String>,
}

// =============================================================================
// Session State
// =============================================================================

/// Mutable state shared between the engine API and the running loop
struct SessionState {
    state: SyncState,
    track: Option<SubtitleTrack>,
    index: Option<CueIndex>,
    /// Bumped on every track load so gate keys from an old track never
    /// collide with the new one
    generation: u64,
    preferences: Preferences,
    /// Change gate: (generation, cue position) of the last handled cue
    last_active: Option<(u64, usize)>,
    /// Last text given to the sink; publishing is skipped when unchanged
    last_displayed: Option<String>,
    /// The in-flight request whose completion is still wanted
    expected: Option<TransformRequest>,
    started_at: Option<String>,
}

impl SessionState {
    fn new(preferences: Preferences) -> Self {
        Self {
            state: SyncState::Idle,
            track: None,
            index: None,
            generation: 0,
            preferences,
            last_active: None,
            last_displayed: None,
            expected: None,
            started_at: None,
        }
    }

    /// Stages `text` for publishing. Returns it when it differs from the
    /// last displayed text, updating the dedup record; `None` otherwise.
    fn stage(&mut self, text: String) -> Option<String> {
        if self.last_displayed.as_deref() == Some(text.as_str()) {
            return None;
        }
        self.last_displayed = Some(text.clone());
        Some(text)
    }
}

// =============================================================================
// Sync Engine
// =============================================================================

/// One overlay session: track, preferences, periodic loop, display output
pub struct SyncEngine {
    config: SyncConfig,
    session_id: SessionId,
    clock: Arc<dyn PlaybackClock>,
    sink: Arc<dyn DisplaySink>,
    dispatcher: Arc<TransformDispatcher>,
    shared: Arc<Mutex<SessionState>>,
    shutdown: Arc<Notify>,
    /// Completion receiver, handed to the loop on start
    event_rx: Mutex<Option<mpsc::UnboundedReceiver<TransformEvent>>>,
}

impl SyncEngine {
    /// Creates an engine wired to the given clock, sink, and providers
    pub fn new(
        config: SyncConfig,
        clock: Arc<dyn PlaybackClock>,
        sink: Arc<dyn DisplaySink>,
        translator: Arc<dyn Translator>,
        transliterator: Arc<dyn Transliterator>,
    ) -> Self {
        let dispatcher = Arc::new(TransformDispatcher::with_cache_config(
            translator,
            transliterator,
            config.cache.clone(),
        ));
        let event_rx = Mutex::new(dispatcher.take_event_receiver());

        Self {
            config,
            session_id: ulid::Ulid::new().to_string(),
            clock,
            sink,
            dispatcher,
            shared: Arc::new(Mutex::new(SessionState::new(Preferences::default()))),
            shutdown: Arc::new(Notify::new()),
            event_rx,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Current lifecycle state
    pub fn state(&self) -> SyncState {
        self.shared
            .lock()
            .map(|shared| shared.state)
            .unwrap_or(SyncState::Stopped)
    }

    /// Snapshot of the session for diagnostics
    pub fn status(&self) -> CoreResult<SyncStatus> {
        let shared = self.lock_state()?;
        Ok(SyncStatus {
            session_id: self.session_id.clone(),
            state: shared.state,
            track_id: shared.track.as_ref().map(|track| track.id.clone()),
            cue_count: shared.index.as_ref().map(|index| index.len()).unwrap_or(0),
            started_at: shared.started_at.clone(),
            last_displayed: shared.last_displayed.clone(),
        })
    }

    /// Transform cache statistics
    pub fn cache_stats(&self) -> CacheStats {
        self.dispatcher.cache_stats()
    }

    /// Installs a track, replacing any previous one.
    ///
    /// Resets the change gates so the next tick re-resolves from scratch;
    /// allowed while running (live track switch), rejected once stopped.
    pub fn load_track(&self, track: SubtitleTrack) -> CoreResult<()> {
        let mut shared = self.lock_state()?;
        if shared.state == SyncState::Stopped {
            return Err(CoreError::SessionStopped);
        }

        tracing::info!(
            track = %track.id,
            language = %track.language,
            cues = track.len(),
            "track loaded"
        );

        shared.index = Some(CueIndex::new(track.cues.clone()));
        shared.track = Some(track);
        shared.generation += 1;
        shared.last_active = None;
        shared.expected = None;
        // a fresh track means the overlay state is unknown; republish even
        // identical text
        shared.last_displayed = None;

        if shared.state == SyncState::Idle {
            shared.state = SyncState::TrackLoaded;
        }
        Ok(())
    }

    /// Replaces the transform preferences.
    ///
    /// Takes effect on the next tick; the active cue is re-resolved under
    /// the new preferences.
    pub fn set_preferences(&self, preferences: Preferences) -> CoreResult<()> {
        let mut normalized = preferences;
        normalized.normalize();

        let mut shared = self.lock_state()?;
        shared.preferences = normalized;
        shared.last_active = None;
        shared.expected = None;
        Ok(())
    }

    /// Current preferences
    pub fn preferences(&self) -> CoreResult<Preferences> {
        Ok(self.lock_state()?.preferences.clone())
    }

    /// Starts the periodic loop. Fails unless a track is loaded and the
    /// session has never run.
    pub fn start(&self) -> CoreResult<tokio::task::JoinHandle<()>> {
        {
            let shared = self.lock_state()?;
            match shared.state {
                SyncState::TrackLoaded => {}
                SyncState::Idle => return Err(CoreError::NoTrackLoaded),
                SyncState::Running => return Err(CoreError::SessionAlreadyRunning),
                SyncState::Stopped => return Err(CoreError::SessionStopped),
            }
        }

        // the receiver is the arbiter when two starts race past the state
        // check; only one of them gets it
        let Some(event_rx) = self.event_rx.lock().ok().and_then(|mut rx| rx.take()) else {
            return Err(CoreError::SessionAlreadyRunning);
        };

        {
            let mut shared = self.lock_state()?;
            shared.state = SyncState::Running;
            shared.started_at = Some(chrono::Utc::now().to_rfc3339());
        }

        tracing::info!(session = %self.session_id, "sync session started");

        let runner = EngineLoop {
            tick_interval: Duration::from_millis(self.config.tick_interval_ms.max(1)),
            clock: Arc::clone(&self.clock),
            sink: Arc::clone(&self.sink),
            dispatcher: Arc::clone(&self.dispatcher),
            shared: Arc::clone(&self.shared),
            shutdown: Arc::clone(&self.shutdown),
        };
        Ok(tokio::spawn(runner.run(event_rx)))
    }

    /// Signals the loop to finish. Safe to call at any time, including
    /// before the loop first polls.
    pub fn stop(&self) {
        self.shutdown.notify_one();
    }

    fn lock_state(&self) -> CoreResult<MutexGuard<'_, SessionState>> {
        self.shared
            .lock()
            .map_err(|_| CoreError::Internal("session state lock poisoned".to_string()))
    }
}

// =============================================================================
// Engine Loop
// =============================================================================

/// The running half of the engine, owned by the spawned task
struct EngineLoop {
    tick_interval: Duration,
    clock: Arc<dyn PlaybackClock>,
    sink: Arc<dyn DisplaySink>,
    dispatcher: Arc<TransformDispatcher>,
    shared: Arc<Mutex<SessionState>>,
    shutdown: Arc<Notify>,
}

impl EngineLoop {
    async fn run(self, mut event_rx: mpsc::UnboundedReceiver<TransformEvent>) {
        loop {
            tokio::select! {
                _ = self.shutdown.notified() => {
                    self.finish();
                    break;
                }
                _ = tokio::time::sleep(self.tick_interval) => {
                    self.tick();
                }
                event = event_rx.recv() => {
                    match event {
                        Some(event) => self.handle_completion(event),
                        None => {
                            self.finish();
                            break;
                        }
                    }
                }
            }
        }
    }

    /// One pass: sample the clock, resolve the active cue, publish changes
    fn tick(&self) {
        // sample outside the lock; clock implementations may be slow
        let time = self.clock.current_time();

        let staged = {
            let Ok(mut shared) = self.shared.lock() else {
                return;
            };
            if shared.state != SyncState::Running {
                return;
            }

            let active = shared
                .index
                .as_mut()
                .and_then(|index| index.active_cue_at(time))
                .map(|(position, cue)| (position, cue.text.clone()));

            match active {
                None => {
                    shared.last_active = None;
                    shared.expected = None;
                    shared.stage(String::new())
                }
                Some((position, text)) => {
                    let gate = (shared.generation, position);
                    if shared.last_active == Some(gate) {
                        // same cue as last tick; nothing to do
                        None
                    } else {
                        shared.last_active = Some(gate);

                        let source = if shared.preferences.from_language.is_empty() {
                            shared
                                .track
                                .as_ref()
                                .map(|track| track.language.clone())
                                .unwrap_or_default()
                        } else {
                            shared.preferences.from_language.clone()
                        };
                        let request = TransformRequest::new(
                            &text,
                            shared.preferences.mode,
                            &source,
                            &shared.preferences.to_language,
                        );

                        match self.dispatcher.resolve(request.clone()) {
                            Resolution::Ready(resolved) => {
                                shared.expected = None;
                                shared.stage(resolved)
                            }
                            Resolution::Pending => {
                                shared.expected = Some(request);
                                // show the untransformed text until the
                                // completion lands
                                shared.stage(text)
                            }
                        }
                    }
                }
            }
        };

        if let Some(text) = staged {
            self.sink.display(&text);
        }
    }

    /// Applies a transform completion if it is still the one we want
    fn handle_completion(&self, event: TransformEvent) {
        let staged = {
            let Ok(mut shared) = self.shared.lock() else {
                return;
            };
            if shared.state != SyncState::Running {
                return;
            }
            if shared.expected.as_ref() != Some(&event.request) {
                tracing::debug!(text = %event.request.text, "discarding stale transform completion");
                return;
            }
            shared.expected = None;

            match event.outcome {
                Ok(text) => shared.stage(text),
                Err(err) => {
                    tracing::error!(%err, "transform failed, displaying original text");
                    shared.stage(event.request.text)
                }
            }
        };

        if let Some(text) = staged {
            self.sink.display(&text);
        }
    }

    /// Marks the session stopped and clears the overlay
    fn finish(&self) {
        let staged = {
            let Ok(mut shared) = self.shared.lock() else {
                return;
            };
            shared.state = SyncState::Stopped;
            shared.last_active = None;
            shared.expected = None;
            shared.stage(String::new())
        };

        if let Some(text) = staged {
            self.sink.display(&text);
        }
        tracing::info!("sync session stopped");
    }
}

// =============================================================================
// Tests
// =============================================================================
