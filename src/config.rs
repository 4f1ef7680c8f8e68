//! Configuration management for dynamic parameter tuning
//!
//! Runtime configuration loading from JSON files, enabling parameter
//! experimentation without recompilation. Detection thresholds, debounce
//! windows, scoring blend weights and the assessment endpoint all live here
//! as named fields rather than scattered literals, because tests assert
//! exact boundary behavior at these values.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub pitch: PitchDetectionConfig,
    pub tracking: NoteTrackingConfig,
    pub scoring: ScoringConfig,
    pub assessment: AssessmentConfig,
    pub audio: AudioConfig,
    pub session: SessionConfig,
}

/// Pitch detector parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PitchDetectionConfig {
    /// Analysis window length in samples
    pub window_size: usize,
    /// Samples advanced between analysis windows
    pub hop_size: usize,
    /// RMS below which a window is treated as silence
    pub silence_rms: f32,
    /// Detector-internal confidence rejection floor. Deliberately separate
    /// from the stricter emission gate in [`NoteTrackingConfig`].
    pub confidence_floor: f32,
    /// Lowest frequency accepted as a guitar fundamental (Hz)
    pub min_frequency_hz: f32,
    /// Highest frequency accepted as a guitar fundamental (Hz)
    pub max_frequency_hz: f32,
}

impl Default for PitchDetectionConfig {
    fn default() -> Self {
        Self {
            window_size: 4096,
            hop_size: 1024,
            silence_rms: 0.01,
            confidence_floor: 0.1,
            // Low E (~82 Hz) down to detector slack, high E 24th fret (~1319 Hz) up
            min_frequency_hz: 70.0,
            max_frequency_hz: 1400.0,
        }
    }
}

/// Note event emission parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NoteTrackingConfig {
    /// Confidence a pitch estimate must exceed before a note may be emitted
    pub emission_confidence: f32,
    /// Same-note events closer together than this are suppressed (ms)
    pub debounce_ms: u64,
    /// Without a confident pitch for this long, the current-note indicator
    /// clears (event history is never touched)
    pub clear_after_ms: u64,
    /// Multiplier mapping raw RMS to the normalized [0,1] input level
    pub level_scale: f32,
}

impl Default for NoteTrackingConfig {
    fn default() -> Self {
        Self {
            emission_confidence: 0.15,
            debounce_ms: 100,
            clear_after_ms: 300,
            level_scale: 10.0,
        }
    }
}

/// Scoring blend weights and feedback rule thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Local weight for the objective metrics (scale, timing, pitch);
    /// the external assessment gets the remainder
    pub objective_local_weight: f64,
    /// Local weight for phrase consistency
    pub phrasing_local_weight: f64,
    /// Metric at or above this reads as a strength
    pub strength_threshold: u8,
    /// Metric below this reads as a weakness
    pub weakness_threshold: u8,
    /// Metric below this earns a concrete practice suggestion
    pub suggestion_threshold: u8,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            objective_local_weight: 0.7,
            phrasing_local_weight: 0.6,
            strength_threshold: 80,
            weakness_threshold: 60,
            suggestion_threshold: 70,
        }
    }
}

/// External assessment service parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssessmentConfig {
    /// Service endpoint, e.g. "http://localhost:8700/analyze-improv".
    /// None disables the external call entirely (local-only analysis).
    pub endpoint: Option<String>,
    /// Hard cap on the assessment round trip (ms); on expiry the session
    /// falls back to local metrics
    pub timeout_ms: u64,
}

impl AssessmentConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for AssessmentConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_ms: 8_000,
        }
    }
}

/// Audio engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Number of capture buffers pre-allocated for the lock-free pool
    pub buffer_pool_size: usize,
    /// Size of each capture buffer in samples
    pub buffer_size: usize,
    /// Engine sample rate in Hz
    pub sample_rate: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            buffer_pool_size: 16,
            buffer_size: 2048,
            sample_rate: 48_000,
        }
    }
}

/// Session lifecycle limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Shortest session that may be stopped-and-analyzed (ms)
    pub min_duration_ms: u64,
    /// Safety cap on session length (ms)
    pub max_duration_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            min_duration_ms: 10_000,
            max_duration_ms: 180_000,
        }
    }
}

impl AppConfig {
    /// Load configuration from a JSON file, falling back to defaults if the
    /// file is missing or malformed.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    tracing::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                tracing::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }
}
