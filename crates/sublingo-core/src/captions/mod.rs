//! Caption track acquisition, parsing, and rendering
//!
//! ```text
//! ┌─────────────┐  fetch   ┌────────────┐  cues   ┌──────────┐
//! │ TrackSource │ ───────> │ parse_track│ ──────> │ CueIndex │
//! └─────────────┘          └────────────┘         └──────────┘
//!                                 │
//!                                 └──────> render_cues (plain/SRT/VTT)
//! ```
//!
//! - [`models`]: [`Cue`], [`SubtitleTrack`], [`TrackInfo`]
//! - [`formats`]: payload parsing (timed-text XML, SRT, WebVTT) and
//!   rendering with floor-truncated timestamps
//! - [`index`]: playback-time to active-cue resolution
//! - [`source`]: the [`TrackSource`] trait plus a static in-memory impl

pub mod formats;
pub mod index;
pub mod models;
pub mod source;

pub use formats::{
    detect_format, format_timestamp, parse_track, render_cues, CueSkip, OutputFormat,
    ParseError, ParseOutcome, PayloadFormat, RenderOptions,
};
pub use index::CueIndex;
pub use models::{sort_cues, Cue, SubtitleTrack, TrackInfo};
pub use source::{load_track, StaticTrackSource, TrackSource};
