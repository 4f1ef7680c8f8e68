//! Offline analysis over in-memory sample buffers
//!
//! Runs the identical detector/tracker pair the live worker runs, minus the
//! queues and threads. Used by the CLI for WAV analysis and by tests that
//! need bit-for-bit reproducible pipelines.

use crate::config::{NoteTrackingConfig, PitchDetectionConfig};

use super::pitch::{self, PitchDetector};
use super::tracker::{NoteEvent, NoteTracker};

/// Full pipeline output for an offline run.
#[derive(Debug, Clone)]
pub struct OfflineAnalysis {
    pub events: Vec<NoteEvent>,
    /// Number of analysis windows processed
    pub windows: usize,
    /// Peak normalized input level seen across the run
    pub peak_level: f32,
}

/// Analyze a complete sample buffer with the given configuration.
///
/// Windows are slid by the configured hop; a trailing partial window is
/// discarded, matching live behavior at stream end.
pub fn analyze_samples(
    samples: &[f32],
    sample_rate: u32,
    pitch_config: PitchDetectionConfig,
    tracking_config: NoteTrackingConfig,
) -> OfflineAnalysis {
    let window_size = pitch_config.window_size;
    let hop_size = pitch_config.hop_size;

    let mut detector = PitchDetector::new(pitch_config);
    let mut tracker = NoteTracker::new(tracking_config);

    let mut windows = 0;
    let mut peak_level = 0.0f32;

    let mut start = 0usize;
    while start + window_size <= samples.len() {
        let window = &samples[start..start + window_size];
        let window_rms = pitch::rms(window);
        let estimate = detector.detect(window, sample_rate);

        let end_sample = (start + window_size) as u64;
        let timestamp_ms = end_sample * 1000 / sample_rate as u64;

        let update = tracker.observe(window_rms, estimate, timestamp_ms);
        peak_level = peak_level.max(update.level);
        windows += 1;

        start += hop_size;
    }

    OfflineAnalysis {
        events: tracker.into_events(),
        windows,
        peak_level,
    }
}
