//! Sublingo Core Engine
//!
//! Live subtitle synchronization and transformation engine.
//! Parses subtitle tracks, resolves the active cue for a playback position,
//! transforms cue text between language forms (translation or
//! transliteration), and drives a periodic sync loop that publishes settled
//! text to a display sink.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sublingo_core::captions::{parse_track, SubtitleTrack, TrackInfo};
//! use sublingo_core::sync::{SyncConfig, SyncEngine, SystemClock};
//! use sublingo_core::transform::{create_translator, create_transliterator, ProviderConfig};
//!
//! let outcome = parse_track(&raw, None)?;
//! let track = SubtitleTrack::from_info(&info, outcome.cues);
//!
//! let engine = SyncEngine::new(
//!     SyncConfig::default(),
//!     Arc::new(SystemClock::new()),
//!     sink,
//!     create_translator(ProviderConfig::google(&google_key))?,
//!     create_transliterator(ProviderConfig::microsoft(&microsoft_key))?,
//! );
//! engine.load_track(track)?;
//! let handle = engine.start()?;
//! ```

pub mod captions;
pub mod settings;
pub mod sync;
pub mod transform;

// Re-export common types
mod types;
pub use types::*;

mod error;
pub use error::*;

#[cfg(test)]
mod tests_pipeline;
