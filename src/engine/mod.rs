//! Session engine: lifecycle orchestration for one practice session
//!
//! Owns the capture backend, the analysis worker and the session clock.
//! State machine:
//!
//!   Idle --start--> Listening --stop_and_analyze--> Idle (+ SessionResult)
//!                      |  \--discard--> Idle (events dropped)
//!                      \--stop_and_analyze before min duration--> stays Listening
//!
//! Stopping tears the streams down first, lets the worker drain the data
//! queue, then joins it for the frozen event sequence. Scoring therefore
//! always sees every captured note, never a racing snapshot.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{info, warn};

use crate::analysis::{spawn_analysis_worker, LiveUpdate, NoteEvent};
use crate::audio::buffer_pool::{split_pool, CaptureChannels};
use crate::audio::AudioEngine;
use crate::config::AppConfig;
use crate::error::{log_audio_error, AudioError};
use crate::session::{SessionAnalyzer, SessionResult, SessionSettings};

/// Supported tempo range in BPM.
pub const MIN_TEMPO_BPM: u32 = 40;
pub const MAX_TEMPO_BPM: u32 = 200;

/// Source of capture audio. The production backend opens real streams; the
/// fixture backend feeds pre-rendered samples for deterministic runs.
pub trait CaptureBackend: Send {
    fn start(
        &mut self,
        capture: CaptureChannels,
        bpm: u32,
        metronome_enabled: bool,
    ) -> Result<(), AudioError>;

    fn stop(&mut self);

    fn set_bpm(&mut self, bpm: u32);

    fn set_metronome(&mut self, _enabled: bool) {}
}

/// cpal-backed capture and metronome playback.
pub struct CpalBackend {
    sample_rate: u32,
    engine: Option<AudioEngine>,
}

impl CpalBackend {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            engine: None,
        }
    }
}

impl CaptureBackend for CpalBackend {
    fn start(
        &mut self,
        capture: CaptureChannels,
        bpm: u32,
        metronome_enabled: bool,
    ) -> Result<(), AudioError> {
        let mut engine = AudioEngine::new(bpm, self.sample_rate, metronome_enabled);
        engine.start(capture)?;
        self.engine = Some(engine);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(mut engine) = self.engine.take() {
            engine.stop();
        }
    }

    fn set_bpm(&mut self, bpm: u32) {
        if let Some(engine) = &self.engine {
            engine.set_bpm(bpm);
        }
    }

    fn set_metronome(&mut self, enabled: bool) {
        if let Some(engine) = &self.engine {
            engine.set_metronome_enabled(enabled);
        }
    }
}

struct ListeningState {
    settings: SessionSettings,
    started_at: Instant,
    shutdown: Arc<AtomicBool>,
    worker: JoinHandle<Vec<NoteEvent>>,
}

/// Orchestrates capture, analysis and scoring for practice sessions.
pub struct SessionEngine {
    config: AppConfig,
    backend: Box<dyn CaptureBackend>,
    analyzer: SessionAnalyzer,
    update_tx: broadcast::Sender<LiveUpdate>,
    listening: Option<ListeningState>,
}

impl SessionEngine {
    /// Production engine: cpal capture, assessment backend from config.
    pub fn new(config: AppConfig) -> Self {
        let backend = Box::new(CpalBackend::new(config.audio.sample_rate));
        let analyzer = build_analyzer(&config);
        Self::with_backend(config, backend, analyzer)
    }

    pub fn with_backend(
        config: AppConfig,
        backend: Box<dyn CaptureBackend>,
        analyzer: SessionAnalyzer,
    ) -> Self {
        let (update_tx, _) = broadcast::channel(256);
        Self {
            config,
            backend,
            analyzer,
            update_tx,
            listening: None,
        }
    }

    /// Live updates for the running session. Safe to call at any time;
    /// streams across session boundaries.
    pub fn updates(&self) -> BroadcastStream<LiveUpdate> {
        BroadcastStream::new(self.update_tx.subscribe())
    }

    pub fn is_listening(&self) -> bool {
        self.listening.is_some()
    }

    /// Milliseconds since the current session started listening.
    pub fn elapsed_ms(&self) -> u64 {
        self.listening
            .as_ref()
            .map_or(0, |s| s.started_at.elapsed().as_millis() as u64)
    }

    /// True once the session has hit the safety cap and should be stopped.
    pub fn max_duration_reached(&self) -> bool {
        self.is_listening() && self.elapsed_ms() >= self.config.session.max_duration_ms
    }

    /// Begin listening with the given settings.
    pub fn start(&mut self, settings: SessionSettings) -> Result<(), AudioError> {
        if self.listening.is_some() {
            return Err(AudioError::AlreadyListening);
        }
        if !(MIN_TEMPO_BPM..=MAX_TEMPO_BPM).contains(&settings.tempo) {
            return Err(AudioError::TempoInvalid {
                bpm: settings.tempo,
            });
        }

        let (capture, analysis) = split_pool(
            self.config.audio.buffer_pool_size,
            self.config.audio.buffer_size,
        );

        let shutdown = Arc::new(AtomicBool::new(false));
        let worker = spawn_analysis_worker(
            analysis,
            self.config.pitch.clone(),
            self.config.tracking.clone(),
            self.config.audio.sample_rate,
            self.update_tx.clone(),
            Arc::clone(&shutdown),
        );

        if let Err(err) = self
            .backend
            .start(capture, settings.tempo, settings.metronome_enabled)
        {
            log_audio_error(&err, "start");
            // Unwind the worker so a failed start leaves no thread behind
            shutdown.store(true, Ordering::SeqCst);
            let _ = worker.join();
            return Err(err);
        }

        info!(
            "[SessionEngine] Listening: {} in {} at {} BPM",
            settings.style, settings.key, settings.tempo
        );

        self.listening = Some(ListeningState {
            settings,
            started_at: Instant::now(),
            shutdown,
            worker,
        });
        Ok(())
    }

    /// Change tempo mid-session.
    pub fn set_tempo(&mut self, bpm: u32) -> Result<(), AudioError> {
        if !(MIN_TEMPO_BPM..=MAX_TEMPO_BPM).contains(&bpm) {
            return Err(AudioError::TempoInvalid { bpm });
        }
        self.backend.set_bpm(bpm);
        if let Some(listening) = &mut self.listening {
            listening.settings.tempo = bpm;
        }
        Ok(())
    }

    /// Toggle the metronome mid-session.
    pub fn set_metronome(&mut self, enabled: bool) {
        self.backend.set_metronome(enabled);
        if let Some(listening) = &mut self.listening {
            listening.settings.metronome_enabled = enabled;
        }
    }

    /// Stop the session and produce its analysis.
    ///
    /// Refused while the session is younger than the configured minimum;
    /// the session keeps running in that case.
    pub async fn stop_and_analyze(&mut self) -> Result<SessionResult, AudioError> {
        let elapsed_ms = self.elapsed_ms();
        if self.listening.is_none() {
            return Err(AudioError::NotListening);
        }
        let min_ms = self.config.session.min_duration_ms;
        if elapsed_ms < min_ms {
            return Err(AudioError::SessionTooShort { elapsed_ms, min_ms });
        }

        let listening = self.listening.take().expect("checked above");
        let events = self
            .shut_down_worker(listening.shutdown, listening.worker)
            .await?;

        info!(
            "[SessionEngine] Session stopped after {} ms with {} notes",
            elapsed_ms,
            events.len()
        );

        Ok(self.analyzer.analyze(events, listening.settings).await)
    }

    /// Stop the session and throw its events away.
    pub fn discard(&mut self) -> Result<(), AudioError> {
        let listening = self.listening.take().ok_or(AudioError::NotListening)?;
        self.backend.stop();
        listening.shutdown.store(true, Ordering::SeqCst);
        if listening.worker.join().is_err() {
            warn!("[SessionEngine] Analysis worker panicked during discard");
        }
        Ok(())
    }

    async fn shut_down_worker(
        &mut self,
        shutdown: Arc<AtomicBool>,
        worker: JoinHandle<Vec<NoteEvent>>,
    ) -> Result<Vec<NoteEvent>, AudioError> {
        // Stream teardown first: no new buffers after this
        self.backend.stop();
        shutdown.store(true, Ordering::SeqCst);

        tokio::task::spawn_blocking(move || worker.join())
            .await
            .map_err(|err| AudioError::WorkerFailure {
                reason: format!("join task failed: {}", err),
            })?
            .map_err(|_| AudioError::WorkerFailure {
                reason: "analysis thread panicked".to_string(),
            })
    }
}

fn build_analyzer(config: &AppConfig) -> SessionAnalyzer {
    match config.assessment.endpoint.as_deref() {
        Some(endpoint) => match crate::assessment::HttpAssessmentClient::new(endpoint) {
            Ok(client) => SessionAnalyzer::with_backend(
                config.scoring.clone(),
                config.assessment.clone(),
                Arc::new(client),
            ),
            Err(err) => {
                warn!(
                    "[SessionEngine] Invalid assessment endpoint, running local-only: {}",
                    err
                );
                SessionAnalyzer::local_only(config.scoring.clone())
            }
        },
        None => SessionAnalyzer::local_only(config.scoring.clone()),
    }
}
