// Audio error types

use std::fmt;
use tracing::error;

/// Audio-related errors
///
/// These cover capture engine operations: device access, stream lifecycle
/// and session state transitions. Microphone permission failure is the one
/// condition that blocks the whole pipeline; it must surface to the caller
/// rather than being absorbed.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioError {
    /// Tempo value outside the supported range
    TempoInvalid { bpm: u32 },

    /// A listening session is already running
    AlreadyListening,

    /// No listening session is running
    NotListening,

    /// Session too short to stop-and-analyze
    SessionTooShort { elapsed_ms: u64, min_ms: u64 },

    /// Microphone access denied or no capture device available
    PermissionDenied,

    /// Failed to open an audio stream
    StreamOpenFailed { reason: String },

    /// Hardware error while streaming
    HardwareError { details: String },

    /// Analysis worker terminated abnormally
    WorkerFailure { reason: String },
}

impl AudioError {
    pub fn message(&self) -> String {
        match self {
            AudioError::TempoInvalid { bpm } => {
                format!("Tempo must be between 40 and 200 BPM (got {})", bpm)
            }
            AudioError::AlreadyListening => {
                "A session is already listening. Stop it first.".to_string()
            }
            AudioError::NotListening => "No session is listening.".to_string(),
            AudioError::SessionTooShort { elapsed_ms, min_ms } => format!(
                "Session too short to analyze: {} ms elapsed, {} ms required",
                elapsed_ms, min_ms
            ),
            AudioError::PermissionDenied => {
                "Microphone access denied. Please grant microphone access.".to_string()
            }
            AudioError::StreamOpenFailed { reason } => {
                format!("Failed to open audio stream: {}", reason)
            }
            AudioError::HardwareError { details } => format!("Hardware error: {}", details),
            AudioError::WorkerFailure { reason } => {
                format!("Analysis worker failed: {}", reason)
            }
        }
    }
}

impl fmt::Display for AudioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for AudioError {}

impl From<std::io::Error> for AudioError {
    fn from(err: std::io::Error) -> Self {
        AudioError::HardwareError {
            details: err.to_string(),
        }
    }
}

/// Log an audio error with structured context
pub fn log_audio_error(err: &AudioError, context: &str) {
    error!(
        "Audio error in {}: component=SessionEngine, message={}",
        context,
        err.message()
    );
}
