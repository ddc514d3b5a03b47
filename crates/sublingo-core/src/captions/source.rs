//! Track acquisition
//!
//! [`TrackSource`] abstracts where subtitle payloads come from (a captions
//! API, a local file, a test fixture). The engine never fetches anything
//! itself; callers list tracks, fetch one, and hand the parsed result to a
//! sync session.

use super::formats::{parse_track, PayloadFormat};
use super::models::{SubtitleTrack, TrackInfo};
use crate::{CoreError, CoreResult};
use async_trait::async_trait;
use std::collections::HashMap;

// ============================================================================
// Trait
// ============================================================================

/// A source of subtitle tracks.
#[async_trait]
pub trait TrackSource: Send + Sync {
    /// Source name for logging
    fn name(&self) -> &str;

    /// Lists the tracks available for a video.
    ///
    /// Fails with [`CoreError::TrackUnavailable`] when the video has no
    /// caption tracks at all.
    async fn list_tracks(&self, video_id: &str) -> CoreResult<Vec<TrackInfo>>;

    /// Fetches the raw payload for a track.
    ///
    /// Fails with [`CoreError::TrackNotFound`] for an unknown track id.
    async fn fetch_track(&self, track_id: &str) -> CoreResult<String>;
}

/// Fetches, parses, and assembles a full track from a source.
///
/// `format` of `None` auto-detects the payload format. Per-cue parse skips
/// are logged by the parser; the aggregate count is traced here.
pub async fn load_track(
    source: &dyn TrackSource,
    info: &TrackInfo,
    format: Option<PayloadFormat>,
) -> CoreResult<SubtitleTrack> {
    let raw = source.fetch_track(&info.id).await?;
    let outcome = parse_track(&raw, format)?;
    if !outcome.skipped.is_empty() {
        tracing::warn!(
            track_id = %info.id,
            skipped = outcome.skipped.len(),
            "track parsed with skipped cues"
        );
    }
    tracing::info!(
        track_id = %info.id,
        language = %info.language_code,
        cues = outcome.cues.len(),
        source = source.name(),
        "track loaded"
    );
    Ok(SubtitleTrack::from_info(info, outcome.cues))
}

// ============================================================================
// Static Source
// ============================================================================

/// In-memory track source for tests and demos.
#[derive(Debug, Clone, Default)]
pub struct StaticTrackSource {
    /// track id -> (listing metadata, raw payload)
    tracks: HashMap<String, (TrackInfo, String)>,
    /// video id -> track ids in registration order
    videos: HashMap<String, Vec<String>>,
}

impl StaticTrackSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a track payload under a video id.
    pub fn with_track(mut self, video_id: &str, info: TrackInfo, payload: &str) -> Self {
        self.videos
            .entry(video_id.to_string())
            .or_default()
            .push(info.id.clone());
        self.tracks
            .insert(info.id.clone(), (info, payload.to_string()));
        self
    }
}

#[async_trait]
impl TrackSource for StaticTrackSource {
    fn name(&self) -> &str {
        "static"
    }

    async fn list_tracks(&self, video_id: &str) -> CoreResult<Vec<TrackInfo>> {
        let ids = self
            .videos
            .get(video_id)
            .ok_or_else(|| CoreError::TrackUnavailable(video_id.to_string()))?;
        Ok(ids
            .iter()
            .filter_map(|id| self.tracks.get(id).map(|(info, _)| info.clone()))
            .collect())
    }

    async fn fetch_track(&self, track_id: &str) -> CoreResult<String> {
        self.tracks
            .get(track_id)
            .map(|(_, payload)| payload.clone())
            .ok_or_else(|| CoreError::TrackNotFound(track_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMED_TEXT: &str = r#"<transcript>
  <text start="1.0" dur="2.0">Primero</text>
  <text start="4.0" dur="2.0">Segundo</text>
</transcript>"#;

    fn source() -> StaticTrackSource {
        StaticTrackSource::new().with_track(
            "video-1",
            TrackInfo::new("track-es", "es", "Spanish"),
            TIMED_TEXT,
        )
    }

    #[tokio::test]
    async fn test_list_tracks() {
        let tracks = source().list_tracks("video-1").await.expect("list");
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].language_code, "es");
    }

    #[tokio::test]
    async fn test_list_tracks_unknown_video() {
        let err = source().list_tracks("nope").await.unwrap_err();
        assert!(matches!(err, CoreError::TrackUnavailable(_)));
    }

    #[tokio::test]
    async fn test_fetch_unknown_track() {
        let err = source().fetch_track("nope").await.unwrap_err();
        assert!(matches!(err, CoreError::TrackNotFound(_)));
    }

    #[tokio::test]
    async fn test_load_track_end_to_end() {
        let source = source();
        let infos = source.list_tracks("video-1").await.expect("list");
        let track = load_track(&source, &infos[0], None).await.expect("load");
        assert_eq!(track.id, "track-es");
        assert_eq!(track.language, "es");
        assert_eq!(track.len(), 2);
        assert_eq!(track.cues[0].text, "Primero");
        assert_eq!(track.cues[0].end_sec, 3.0);
    }
}
