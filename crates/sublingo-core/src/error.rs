//! Error types shared across the engine.

use thiserror::Error;

/// Core error type for all sublingo operations
#[derive(Error, Debug)]
pub enum CoreError {
    // ========================================================================
    // Track errors
    // ========================================================================
    /// The video has no caption tracks at all
    #[error("No caption tracks available for video: {0}")]
    TrackUnavailable(String),

    /// A specific track could not be fetched
    #[error("Track not found: {0}")]
    TrackNotFound(String),

    /// A track payload could not be parsed at the payload level
    #[error("Track parse failed: {0}")]
    ParseFailed(String),

    // ========================================================================
    // Transform errors
    // ========================================================================
    #[error("Transform provider not available: {0}")]
    ProviderUnavailable(String),

    #[error("Transform request failed: {0}")]
    ProviderRequestFailed(String),

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    // ========================================================================
    // Session errors
    // ========================================================================
    #[error("No track loaded")]
    NoTrackLoaded,

    #[error("Sync session already running")]
    SessionAlreadyRunning,

    #[error("Sync session is stopped")]
    SessionStopped,

    // ========================================================================
    // IO errors
    // ========================================================================
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),

    // ========================================================================
    // General errors
    // ========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;
