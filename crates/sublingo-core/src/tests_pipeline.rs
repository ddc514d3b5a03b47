//! End-to-End Pipeline Tests
//!
//! These tests run the full stack: parsed tracks through the sync engine,
//! transform dispatcher, and display sink, with mock providers and a manual
//! playback clock. Time is paused tokio time, so provider delays and tick
//! cadence are deterministic.

use std::sync::Arc;
use std::time::Duration;

use crate::captions::{load_track, Cue, StaticTrackSource, SubtitleTrack, TrackInfo};
use crate::settings::Preferences;
use crate::sync::{
    DisplaySink, ManualClock, PlaybackClock, RecordingSink, SyncConfig, SyncEngine, SyncState,
};
use crate::transform::{
    MockTranslator, MockTransliterator, TransformMode, Translator, Transliterator,
};

const TICK_MS: u64 = 20;

// ----------------------------------------------------------------
// Harness
// ----------------------------------------------------------------

struct Harness {
    engine: SyncEngine,
    clock: Arc<ManualClock>,
    sink: Arc<RecordingSink>,
    translator: Arc<MockTranslator>,
    transliterator: Arc<MockTransliterator>,
}

impl Harness {
    fn new(translator: MockTranslator, transliterator: MockTransliterator) -> Self {
        let clock = Arc::new(ManualClock::new(0.0));
        let sink = Arc::new(RecordingSink::new());
        let translator = Arc::new(translator);
        let transliterator = Arc::new(transliterator);
        let engine = SyncEngine::new(
            SyncConfig {
                tick_interval_ms: TICK_MS,
                ..Default::default()
            },
            Arc::clone(&clock) as Arc<dyn PlaybackClock>,
            Arc::clone(&sink) as Arc<dyn DisplaySink>,
            Arc::clone(&translator) as Arc<dyn Translator>,
            Arc::clone(&transliterator) as Arc<dyn Transliterator>,
        );
        Self {
            engine,
            clock,
            sink,
            translator,
            transliterator,
        }
    }

    /// Waits roughly `n` tick intervals, offset off the tick grid so test
    /// wakeups never race a tick deadline
    async fn ticks(&self, n: u64) {
        tokio::time::sleep(Duration::from_millis(TICK_MS * n + 7)).await;
    }

    async fn shutdown(self, handle: tokio::task::JoinHandle<()>) {
        self.engine.stop();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("engine loop did not stop")
            .expect("engine loop panicked");
    }
}

fn translate_to(target: &str) -> Preferences {
    Preferences {
        mode: TransformMode::Translate,
        to_language: target.to_string(),
        ..Default::default()
    }
}

fn transliterate_to(target: &str) -> Preferences {
    Preferences {
        mode: TransformMode::Transliterate,
        to_language: target.to_string(),
        ..Default::default()
    }
}

fn single_cue_track(language: &str, text: &str) -> SubtitleTrack {
    SubtitleTrack::new("track-1", language, "Test").with_cues(vec![Cue::new(0.0, 2.0, text)])
}

// ----------------------------------------------------------------
// Translation path
// ----------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_translate_end_to_end() {
    let h = Harness::new(
        MockTranslator::new("mock").with_mapping("Hola", "Hello"),
        MockTransliterator::new("mock"),
    );
    h.engine.set_preferences(translate_to("en")).unwrap();
    h.engine.load_track(single_cue_track("es", "Hola")).unwrap();
    h.clock.set(1.0);

    let handle = h.engine.start().unwrap();
    h.ticks(4).await;

    // original text shows while the translation is in flight, then the
    // settled text replaces it; later ticks on the same cue stay quiet
    assert_eq!(
        h.sink.events(),
        vec!["Hola".to_string(), "Hello".to_string()]
    );
    assert_eq!(h.translator.calls(), 1);

    h.shutdown(handle).await;
}

#[tokio::test(start_paused = true)]
async fn test_repeated_text_hits_cache() {
    let h = Harness::new(
        MockTranslator::new("mock").with_mapping("X", "TX"),
        MockTransliterator::new("mock"),
    );
    let track = SubtitleTrack::new("track-1", "es", "Test")
        .with_cues(vec![Cue::new(0.0, 2.0, "X"), Cue::new(4.0, 6.0, "X")]);
    h.engine.set_preferences(translate_to("en")).unwrap();
    h.engine.load_track(track).unwrap();
    h.clock.set(1.0);

    let handle = h.engine.start().unwrap();
    h.ticks(4).await;

    h.clock.set(3.0); // gap between the cues
    h.ticks(3).await;

    h.clock.set(5.0); // second cue, same text
    h.ticks(3).await;

    assert_eq!(
        h.sink.events(),
        vec![
            "X".to_string(),
            "TX".to_string(),
            String::new(),
            "TX".to_string(),
        ]
    );
    // second occurrence came from the cache
    assert_eq!(h.translator.calls(), 1);
    assert!(h.engine.cache_stats().hits >= 1);

    h.shutdown(handle).await;
}

#[tokio::test(start_paused = true)]
async fn test_in_flight_request_coalesces_across_cues() {
    let h = Harness::new(
        MockTranslator::new("mock")
            .with_mapping("X", "TX")
            .with_delay(Duration::from_millis(150)),
        MockTransliterator::new("mock"),
    );
    let track = SubtitleTrack::new("track-1", "es", "Test")
        .with_cues(vec![Cue::new(0.0, 1.0, "X"), Cue::new(2.0, 3.0, "X")]);
    h.engine.set_preferences(translate_to("en")).unwrap();
    h.engine.load_track(track).unwrap();
    h.clock.set(0.5);

    let handle = h.engine.start().unwrap();
    h.ticks(2).await;

    // jump to the second cue while the first request is still in flight;
    // the identical request must not dispatch again
    h.clock.set(2.5);
    h.ticks(2).await;
    h.ticks(8).await;

    assert_eq!(h.sink.events(), vec!["X".to_string(), "TX".to_string()]);
    assert_eq!(h.translator.calls(), 1);

    h.shutdown(handle).await;
}

#[tokio::test(start_paused = true)]
async fn test_stale_completion_is_discarded() {
    let h = Harness::new(
        MockTranslator::new("mock")
            .with_mapping("A", "TA")
            .with_mapping("B", "TB")
            .with_delay(Duration::from_millis(150)),
        MockTransliterator::new("mock"),
    );
    let track = SubtitleTrack::new("track-1", "es", "Test")
        .with_cues(vec![Cue::new(0.0, 1.0, "A"), Cue::new(2.0, 3.0, "B")]);
    h.engine.set_preferences(translate_to("en")).unwrap();
    h.engine.load_track(track).unwrap();
    h.clock.set(0.5);

    let handle = h.engine.start().unwrap();
    h.ticks(2).await;

    // move on before A's translation lands; when it does land it is stale
    // and must never reach the display
    h.clock.set(2.5);
    h.ticks(12).await;

    assert_eq!(
        h.sink.events(),
        vec!["A".to_string(), "B".to_string(), "TB".to_string()]
    );
    assert_eq!(h.translator.calls(), 2);
    // the stale result was still cached for later reuse
    assert_eq!(h.engine.cache_stats().entries, 2);

    h.shutdown(handle).await;
}

// ----------------------------------------------------------------
// Transliteration path
// ----------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_transliterate_end_to_end() {
    let h = Harness::new(
        MockTranslator::new("mock"),
        MockTransliterator::new("mock").with_mapping("नमस्ते", "namaste"),
    );
    h.engine.set_preferences(transliterate_to("en")).unwrap();
    h.engine
        .load_track(single_cue_track("hi", "नमस्ते"))
        .unwrap();
    h.clock.set(1.0);

    let handle = h.engine.start().unwrap();
    h.ticks(4).await;

    assert_eq!(
        h.sink.events(),
        vec!["नमस्ते".to_string(), "namaste".to_string()]
    );
    assert_eq!(h.transliterator.calls(), 1);
    assert_eq!(h.translator.calls(), 0);

    h.shutdown(handle).await;
}

#[tokio::test(start_paused = true)]
async fn test_unsupported_language_displays_original() {
    let h = Harness::new(MockTranslator::new("mock"), MockTransliterator::new("mock"));
    // "es" has no script mapping; transliteration cannot work
    h.engine.set_preferences(transliterate_to("en")).unwrap();
    h.engine.load_track(single_cue_track("es", "Hola")).unwrap();
    h.clock.set(1.0);

    let handle = h.engine.start().unwrap();
    h.ticks(4).await;

    assert_eq!(h.sink.events(), vec!["Hola".to_string()]);
    assert_eq!(h.transliterator.calls(), 0);
    // the fallback is cached; this failure mode cannot change on retry
    assert_eq!(h.engine.cache_stats().entries, 1);

    h.shutdown(handle).await;
}

// ----------------------------------------------------------------
// Failure handling
// ----------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_provider_failure_shows_original_and_retries_later() {
    let h = Harness::new(
        MockTranslator::new("mock").with_failure("boom"),
        MockTransliterator::new("mock"),
    );
    h.engine.set_preferences(translate_to("en")).unwrap();
    h.engine.load_track(single_cue_track("es", "Hola")).unwrap();
    h.clock.set(1.0);

    let handle = h.engine.start().unwrap();
    h.ticks(4).await;

    // interim text was already the original; the failure changes nothing
    assert_eq!(h.sink.events(), vec!["Hola".to_string()]);
    assert_eq!(h.engine.cache_stats().entries, 0);

    // leave the cue and come back: failures are not cached, so the
    // provider is asked again
    h.clock.set(3.0);
    h.ticks(3).await;
    h.clock.set(1.0);
    h.ticks(3).await;

    assert_eq!(
        h.sink.events(),
        vec!["Hola".to_string(), String::new(), "Hola".to_string()]
    );
    assert_eq!(h.translator.calls(), 2);
    assert_eq!(h.engine.cache_stats().entries, 0);

    h.shutdown(handle).await;
}

// ----------------------------------------------------------------
// Reconfiguration
// ----------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_track_swap_republishes_current_text() {
    let h = Harness::new(
        MockTranslator::new("mock").with_mapping("X", "TX"),
        MockTransliterator::new("mock"),
    );
    h.engine.set_preferences(translate_to("en")).unwrap();
    h.engine.load_track(single_cue_track("es", "X")).unwrap();
    h.clock.set(1.0);

    let handle = h.engine.start().unwrap();
    h.ticks(4).await;
    assert_eq!(h.sink.events(), vec!["X".to_string(), "TX".to_string()]);

    // swapping tracks resets the display state; even identical text is
    // published again (served straight from the cache)
    let replacement =
        SubtitleTrack::new("track-2", "es", "Test").with_cues(vec![Cue::new(0.0, 2.0, "X")]);
    h.engine.load_track(replacement).unwrap();
    h.ticks(3).await;

    assert_eq!(
        h.sink.events(),
        vec!["X".to_string(), "TX".to_string(), "TX".to_string()]
    );
    assert_eq!(h.translator.calls(), 1);

    h.shutdown(handle).await;
}

#[tokio::test(start_paused = true)]
async fn test_preference_change_re_resolves_active_cue() {
    let h = Harness::new(
        MockTranslator::new("mock").with_mapping("Hola", "Hello"),
        MockTransliterator::new("mock"),
    );
    h.engine.set_preferences(translate_to("en")).unwrap();
    h.engine.load_track(single_cue_track("es", "Hola")).unwrap();
    h.clock.set(1.0);

    let handle = h.engine.start().unwrap();
    h.ticks(4).await;
    assert_eq!(h.translator.calls(), 1);

    // a new target language is a new request key; the active cue goes
    // through the interim-then-settled cycle again
    h.engine.set_preferences(translate_to("fr")).unwrap();
    h.ticks(3).await;

    assert_eq!(
        h.sink.events(),
        vec![
            "Hola".to_string(),
            "Hello".to_string(),
            "Hola".to_string(),
            "Hello".to_string(),
        ]
    );
    assert_eq!(h.translator.calls(), 2);
    assert_eq!(h.engine.cache_stats().entries, 2);

    h.shutdown(handle).await;
}

// ----------------------------------------------------------------
// Shutdown
// ----------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_stop_clears_display_and_drops_pending_result() {
    let h = Harness::new(
        MockTranslator::new("mock")
            .with_mapping("X", "TX")
            .with_delay(Duration::from_millis(150)),
        MockTransliterator::new("mock"),
    );
    h.engine.set_preferences(translate_to("en")).unwrap();
    h.engine.load_track(single_cue_track("es", "X")).unwrap();
    h.clock.set(1.0);

    let handle = h.engine.start().unwrap();
    h.ticks(2).await;

    // stop while the translation is still in flight
    h.engine.stop();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("engine loop did not stop")
        .expect("engine loop panicked");

    assert_eq!(h.engine.state(), SyncState::Stopped);
    assert_eq!(h.sink.events(), vec!["X".to_string(), String::new()]);

    // let the in-flight provider call finish; its result lands in the
    // cache but never on the display
    h.ticks(10).await;
    assert_eq!(h.sink.events(), vec!["X".to_string(), String::new()]);
    assert_eq!(h.engine.cache_stats().entries, 1);
}

// ----------------------------------------------------------------
// Source to display
// ----------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_fetched_track_flows_to_display() {
    let payload = r#"<?xml version="1.0" encoding="utf-8"?>
<transcript>
  <text start="0" dur="2">Qu&#233; tal</text>
  <text start="3" dur="2">A &amp; B</text>
</transcript>"#;

    let info = TrackInfo::new("cc.es", "es", "Spanish");
    let source = StaticTrackSource::new().with_track("vid-1", info.clone(), payload);
    let track = load_track(&source, &info, None).await.unwrap();

    // entities were decoded during parsing
    assert_eq!(track.cues[0].text, "Qué tal");
    assert_eq!(track.cues[1].text, "A & B");

    let h = Harness::new(
        MockTranslator::new("mock")
            .with_mapping("Qué tal", "How are you")
            .with_mapping("A & B", "A and B"),
        MockTransliterator::new("mock"),
    );
    h.engine.set_preferences(translate_to("en")).unwrap();
    h.engine.load_track(track).unwrap();
    h.clock.set(1.0);

    let handle = h.engine.start().unwrap();
    h.ticks(4).await;

    h.clock.set(4.0);
    h.ticks(4).await;

    assert_eq!(
        h.sink.events(),
        vec![
            "Qué tal".to_string(),
            "How are you".to_string(),
            "A & B".to_string(),
            "A and B".to_string(),
        ]
    );

    h.shutdown(handle).await;
}
