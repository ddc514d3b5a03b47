//! Core type definitions shared across the engine.

// ============================================================================
// ID Types
// ============================================================================

/// Subtitle track identifier (source-assigned, opaque)
pub type TrackId = String;

/// Video identifier (source-assigned, opaque)
pub type VideoId = String;

/// Sync session identifier (ULID)
pub type SessionId = String;

// ============================================================================
// Time Types
// ============================================================================

/// Time in seconds (f64 for sub-millisecond positioning)
pub type TimeSec = f64;
