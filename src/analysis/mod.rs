//! Analysis thread: audio in, note events out
//!
//! - `PitchDetector`: autocorrelation pitch estimation per window
//! - `NoteTracker`: debounced note-event extraction
//! - `AnalysisWorker`: main loop consuming capture buffers from the lock-free
//!   data queue, recycling them to the pool, and sliding a fixed analysis
//!   window over the stream
//!
//! The worker runs on a dedicated OS thread (analysis must not stall the
//! async runtime, and the capture callback must never wait on it). Live
//! updates go out on a tokio broadcast channel; the authoritative event
//! sequence is returned from the thread's join handle, so a stopped session
//! always scores exactly the events the worker saw.

pub mod offline;
pub mod pitch;
pub mod tracker;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::audio::buffer_pool::AnalysisChannels;
use crate::config::{NoteTrackingConfig, PitchDetectionConfig};

pub use pitch::{PitchDetector, PitchEstimate};
pub use tracker::{FrameUpdate, NoteEvent, NoteTracker};

/// Live progress pushed to subscribers while a session runs.
///
/// Lossy: UI consumers may miss updates under backpressure. The
/// authoritative record is the returned event sequence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LiveUpdate {
    /// Normalized input level for the current analysis window
    Level(f32),
    /// A note event was just emitted
    Note(NoteEvent),
    /// The current-note indicator cleared after sustained silence
    NoteCleared,
}

/// Consumes capture buffers and drives the detector/tracker pair.
pub struct AnalysisWorker {
    channels: AnalysisChannels,
    detector: PitchDetector,
    tracker: NoteTracker,
    sample_rate: u32,
    accumulator: Vec<f32>,
    window_start_sample: u64,
    update_tx: broadcast::Sender<LiveUpdate>,
    shutdown: Arc<AtomicBool>,
}

impl AnalysisWorker {
    pub fn new(
        channels: AnalysisChannels,
        pitch_config: PitchDetectionConfig,
        tracking_config: NoteTrackingConfig,
        sample_rate: u32,
        update_tx: broadcast::Sender<LiveUpdate>,
        shutdown: Arc<AtomicBool>,
    ) -> Self {
        let window_size = pitch_config.window_size;
        Self {
            channels,
            detector: PitchDetector::new(pitch_config),
            tracker: NoteTracker::new(tracking_config),
            sample_rate,
            accumulator: Vec::with_capacity(window_size * 2),
            window_start_sample: 0,
            update_tx,
            shutdown,
        }
    }

    /// Main loop. Runs until the shutdown flag is set and the data queue has
    /// drained, then returns the complete event sequence.
    pub fn run(mut self) -> Vec<NoteEvent> {
        info!(
            "[AnalysisWorker] Starting (window={}, hop={}, sample_rate={})",
            self.detector.config().window_size,
            self.detector.config().hop_size,
            self.sample_rate
        );

        loop {
            let buffer = match self.channels.data_consumer.pop() {
                Ok(buffer) => buffer,
                Err(_) => {
                    // Queue empty: only now is shutdown honored, so every
                    // captured buffer gets analyzed before the thread exits
                    if self.shutdown.load(Ordering::SeqCst) {
                        break;
                    }
                    thread::sleep(Duration::from_millis(1));
                    continue;
                }
            };

            self.accumulator.extend_from_slice(&buffer);

            // Return the buffer before analysis so the capture side never
            // starves while we crunch a window
            if self.channels.pool_producer.push(buffer).is_err() {
                warn!("[AnalysisWorker] Pool queue full, dropping buffer");
            }

            self.drain_windows();
        }

        let events = self.tracker.into_events();
        info!("[AnalysisWorker] Exiting with {} note events", events.len());
        events
    }

    fn drain_windows(&mut self) {
        let window_size = self.detector.config().window_size;
        let hop_size = self.detector.config().hop_size;

        while self.accumulator.len() >= window_size {
            let window = &self.accumulator[..window_size];
            let window_rms = pitch::rms(window);
            let estimate = self.detector.detect(window, self.sample_rate);

            // Timestamp at the window's trailing edge, where detection
            // actually happens
            let end_sample = self.window_start_sample + window_size as u64;
            let timestamp_ms = end_sample * 1000 / self.sample_rate as u64;

            let update = self.tracker.observe(window_rms, estimate, timestamp_ms);

            let _ = self.update_tx.send(LiveUpdate::Level(update.level));
            if let Some(event) = update.event {
                debug!(
                    "[AnalysisWorker] {} at {} ms ({} cents, confidence {:.2})",
                    event.note, event.timestamp_ms, event.cents, event.confidence
                );
                let _ = self.update_tx.send(LiveUpdate::Note(event));
            }
            if update.cleared {
                let _ = self.update_tx.send(LiveUpdate::NoteCleared);
            }

            self.accumulator.drain(..hop_size);
            self.window_start_sample += hop_size as u64;
        }
    }
}

/// Spawn the analysis worker on its own thread.
///
/// Joining the handle after setting `shutdown` yields the frozen event
/// sequence for scoring.
pub fn spawn_analysis_worker(
    channels: AnalysisChannels,
    pitch_config: PitchDetectionConfig,
    tracking_config: NoteTrackingConfig,
    sample_rate: u32,
    update_tx: broadcast::Sender<LiveUpdate>,
    shutdown: Arc<AtomicBool>,
) -> JoinHandle<Vec<NoteEvent>> {
    thread::Builder::new()
        .name("analysis".to_string())
        .spawn(move || {
            let worker = AnalysisWorker::new(
                channels,
                pitch_config,
                tracking_config,
                sample_rate,
                update_tx,
                shutdown,
            );
            worker.run()
        })
        .expect("failed to spawn analysis thread")
}
