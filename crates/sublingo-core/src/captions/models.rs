//! Cue and subtitle track data models
//!
//! Defines the data structures for timed subtitle text:
//! - [`Cue`]: a single time-bounded piece of subtitle text
//! - [`SubtitleTrack`]: an ordered cue sequence plus track metadata
//! - [`TrackInfo`]: listing metadata for a track offered by a source

use crate::{TimeSec, TrackId};
use serde::{Deserialize, Serialize};

// ============================================================================
// Cue
// ============================================================================

/// A single subtitle cue: text visible over a time interval.
///
/// Cues are immutable once parsed. `end_sec` is never below `start_sec`;
/// zero-duration cues are allowed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cue {
    /// Start time in seconds
    pub start_sec: TimeSec,
    /// End time in seconds (inclusive)
    pub end_sec: TimeSec,
    /// Cue text (may contain newlines)
    pub text: String,
}

impl Cue {
    /// Creates a new cue, clamping a negative duration to zero.
    pub fn new(start_sec: TimeSec, end_sec: TimeSec, text: impl Into<String>) -> Self {
        let end_sec = if end_sec < start_sec { start_sec } else { end_sec };
        Self {
            start_sec,
            end_sec,
            text: text.into(),
        }
    }

    /// Duration in seconds
    pub fn duration(&self) -> TimeSec {
        self.end_sec - self.start_sec
    }

    /// Returns true if the cue is active at the given time.
    ///
    /// Both interval ends are inclusive: a cue ending exactly at `time`
    /// still counts as active.
    pub fn is_active_at(&self, time: TimeSec) -> bool {
        self.start_sec <= time && time <= self.end_sec
    }
}

/// Sorts cues by start time (ascending, stable on ties).
pub fn sort_cues(cues: &mut [Cue]) {
    cues.sort_by(|a, b| {
        a.start_sec
            .partial_cmp(&b.start_sec)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

// ============================================================================
// SubtitleTrack
// ============================================================================

/// A subtitle track: ordered cues plus source metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtitleTrack {
    /// Track identifier, assigned by the source
    pub id: TrackId,
    /// BCP-47 language code of the cue text (e.g. "en", "hi")
    pub language: String,
    /// Human-readable track name
    pub name: String,
    /// Whether the source machine-generated this track
    pub is_auto_generated: bool,
    /// Cues ordered by start time
    pub cues: Vec<Cue>,
}

impl SubtitleTrack {
    /// Creates an empty track.
    pub fn new(id: impl Into<TrackId>, language: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            language: language.into(),
            name: name.into(),
            is_auto_generated: false,
            cues: Vec::new(),
        }
    }

    /// Builds a track from listing metadata plus parsed cues.
    pub fn from_info(info: &TrackInfo, mut cues: Vec<Cue>) -> Self {
        sort_cues(&mut cues);
        Self {
            id: info.id.clone(),
            language: info.language_code.clone(),
            name: info.name.clone(),
            is_auto_generated: info.is_auto_generated,
            cues,
        }
    }

    /// Replaces the cue sequence, keeping it sorted.
    pub fn with_cues(mut self, mut cues: Vec<Cue>) -> Self {
        sort_cues(&mut cues);
        self.cues = cues;
        self
    }

    /// Marks the track as machine-generated.
    pub fn with_auto_generated(mut self, is_auto_generated: bool) -> Self {
        self.is_auto_generated = is_auto_generated;
        self
    }

    /// Number of cues
    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    /// Track duration: the latest cue end, or zero for an empty track.
    pub fn duration(&self) -> TimeSec {
        self.cues.iter().map(|c| c.end_sec).fold(0.0, f64::max)
    }
}

impl Default for SubtitleTrack {
    fn default() -> Self {
        Self::new("", "en", "Subtitles")
    }
}

// ============================================================================
// TrackInfo
// ============================================================================

/// Listing metadata for a track offered by a source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
    pub id: TrackId,
    /// BCP-47 language code
    pub language_code: String,
    /// Human-readable name (often the localized language name)
    pub name: String,
    /// Whether the source machine-generated this track
    pub is_auto_generated: bool,
}

impl TrackInfo {
    pub fn new(
        id: impl Into<TrackId>,
        language_code: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            language_code: language_code.into(),
            name: name.into(),
            is_auto_generated: false,
        }
    }

    pub fn with_auto_generated(mut self, is_auto_generated: bool) -> Self {
        self.is_auto_generated = is_auto_generated;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ------------------------------------------------------------------
    // Cue
    // ------------------------------------------------------------------

    #[test]
    fn test_cue_new_clamps_negative_duration() {
        let cue = Cue::new(5.0, 3.0, "backwards");
        assert_eq!(cue.start_sec, 5.0);
        assert_eq!(cue.end_sec, 5.0);
        assert_eq!(cue.duration(), 0.0);
    }

    #[test]
    fn test_cue_is_active_at_inclusive_bounds() {
        let cue = Cue::new(1.0, 3.5, "hello");
        assert!(!cue.is_active_at(0.999));
        assert!(cue.is_active_at(1.0));
        assert!(cue.is_active_at(2.0));
        assert!(cue.is_active_at(3.5));
        assert!(!cue.is_active_at(3.501));
    }

    #[test]
    fn test_zero_duration_cue_active_at_instant() {
        let cue = Cue::new(2.0, 2.0, "flash");
        assert!(cue.is_active_at(2.0));
        assert!(!cue.is_active_at(1.999));
        assert!(!cue.is_active_at(2.001));
    }

    #[test]
    fn test_sort_cues_is_stable() {
        let mut cues = vec![
            Cue::new(2.0, 3.0, "b"),
            Cue::new(1.0, 2.0, "a"),
            Cue::new(2.0, 4.0, "c"),
        ];
        sort_cues(&mut cues);
        assert_eq!(cues[0].text, "a");
        // equal starts keep their original relative order
        assert_eq!(cues[1].text, "b");
        assert_eq!(cues[2].text, "c");
    }

    // ------------------------------------------------------------------
    // SubtitleTrack
    // ------------------------------------------------------------------

    #[test]
    fn test_track_with_cues_sorts() {
        let track = SubtitleTrack::new("t1", "en", "English").with_cues(vec![
            Cue::new(4.0, 5.0, "later"),
            Cue::new(1.0, 2.0, "earlier"),
        ]);
        assert_eq!(track.len(), 2);
        assert_eq!(track.cues[0].text, "earlier");
        assert_eq!(track.duration(), 5.0);
    }

    #[test]
    fn test_track_from_info() {
        let info = TrackInfo::new("t2", "hi", "Hindi").with_auto_generated(true);
        let track = SubtitleTrack::from_info(&info, vec![Cue::new(0.0, 1.0, "x")]);
        assert_eq!(track.id, "t2");
        assert_eq!(track.language, "hi");
        assert!(track.is_auto_generated);
        assert_eq!(track.len(), 1);
    }

    #[test]
    fn test_default_track() {
        let track = SubtitleTrack::default();
        assert_eq!(track.language, "en");
        assert_eq!(track.name, "Subtitles");
        assert!(track.is_empty());
        assert_eq!(track.duration(), 0.0);
    }

    #[test]
    fn test_track_serde_camel_case() {
        let track = SubtitleTrack::new("t3", "ja", "Japanese").with_auto_generated(true);
        let json = serde_json::to_string(&track).expect("serialize");
        assert!(json.contains("\"isAutoGenerated\":true"));
        assert!(json.contains("\"language\":\"ja\""));
    }
}
