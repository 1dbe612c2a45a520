//! Error handling for KeroMix
//!
//! Nothing here crosses the audio callback: the real-time path degrades to
//! "no-op for this block" instead of returning errors.

use thiserror::Error;

/// Result type alias for KeroMix operations
pub type Result<T> = std::result::Result<T, KeroError>;

/// Main error type for KeroMix operations
#[derive(Error, Debug)]
pub enum KeroError {
    // Audio setup
    #[error("Invalid sample rate: {sample_rate}")]
    InvalidSampleRate { sample_rate: f64 },

    // Suggestion service
    #[error("Suggestion service unreachable: {reason}")]
    TransportFailure { reason: String },

    #[error("Suggestion response could not be parsed: {reason}")]
    UnparseableResponse { reason: String, raw: String },

    #[error("A suggestion request is already in flight")]
    RequestAlreadyInFlight,

    #[error("No API key configured for the suggestion service")]
    MissingApiKey,

    // Presets / state
    #[error("Preset not found: {name}")]
    PresetNotFound { name: String },

    #[error("Invalid preset name: {name:?}")]
    InvalidPresetName { name: String },

    #[error("Preset '{name}' failed its integrity check")]
    PresetCorrupted { name: String },

    #[error("Invalid state blob: {reason}")]
    InvalidState { reason: String },

    // I/O Errors
    #[error("Audio file error: {0}")]
    AudioFile(#[from] hound::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl KeroError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            KeroError::InvalidSampleRate { .. } => "INVALID_SAMPLE_RATE",
            KeroError::TransportFailure { .. } => "TRANSPORT_FAILURE",
            KeroError::UnparseableResponse { .. } => "UNPARSEABLE_RESPONSE",
            KeroError::RequestAlreadyInFlight => "REQUEST_IN_FLIGHT",
            KeroError::MissingApiKey => "MISSING_API_KEY",
            KeroError::PresetNotFound { .. } => "PRESET_NOT_FOUND",
            KeroError::InvalidPresetName { .. } => "INVALID_PRESET_NAME",
            KeroError::PresetCorrupted { .. } => "PRESET_CORRUPTED",
            KeroError::InvalidState { .. } => "INVALID_STATE",
            KeroError::AudioFile(_) => "AUDIO_FILE_ERROR",
            KeroError::Io(_) => "IO_ERROR",
            KeroError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if this error is recoverable by simply trying again
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            KeroError::TransportFailure { .. }
                | KeroError::UnparseableResponse { .. }
                | KeroError::RequestAlreadyInFlight
        )
    }

    /// Raw service response retained for diagnostics, if any
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            KeroError::UnparseableResponse { raw, .. } => Some(raw),
            _ => None,
        }
    }

    /// Short status line suitable for an editor status label
    pub fn status_message(&self) -> String {
        match self {
            KeroError::TransportFailure { .. } => "Connection failed.".to_string(),
            KeroError::UnparseableResponse { .. } => "Parse failed.".to_string(),
            KeroError::MissingApiKey => "Enter an API key in settings.".to_string(),
            _ => self.to_string(),
        }
    }
}
