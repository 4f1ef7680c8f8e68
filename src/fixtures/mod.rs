//! Fixture utilities for the deterministic offline harness.
//!
//! Two kinds of input feed the analysis pipeline outside of live capture:
//! synthetic signals generated here (pure tones, noise, phrase sequences)
//! and mono WAV recordings discovered under the fixture root. Both produce
//! plain `Vec<f32>` sample buffers, so tests and the CLI run the exact
//! pipeline code the live engine runs.

use std::f32::consts::TAU;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::audio::buffer_pool::CaptureChannels;
use crate::engine::CaptureBackend;
use crate::error::AudioError;

/// Default location for fixture WAV assets.
pub const DEFAULT_FIXTURE_ROOT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/fixtures");

/// One window of a pure sine tone.
pub fn sine_window(frequency: f32, amplitude: f32, sample_rate: u32, len: usize) -> Vec<f32> {
    let step = TAU * frequency / sample_rate as f32;
    (0..len)
        .map(|i| amplitude * (step * i as f32).sin())
        .collect()
}

/// Seeded uniform noise in [-amplitude, amplitude]. Deterministic per seed.
pub fn noise_window(amplitude: f32, len: usize, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_range(-amplitude..amplitude)).collect()
}

/// All-zero samples for the given duration.
pub fn silence(sample_rate: u32, duration_ms: u64) -> Vec<f32> {
    vec![0.0; (sample_rate as u64 * duration_ms / 1000) as usize]
}

/// One step of a synthetic phrase: a tone held for a duration, followed by
/// a rest before the next step.
#[derive(Debug, Clone, Copy)]
pub struct PhraseStep {
    pub frequency: f32,
    pub duration_ms: u64,
    pub rest_ms: u64,
}

impl PhraseStep {
    pub fn new(frequency: f32, duration_ms: u64, rest_ms: u64) -> Self {
        Self {
            frequency,
            duration_ms,
            rest_ms,
        }
    }
}

/// Render a phrase of tones and rests into one continuous sample buffer.
///
/// A short linear fade at each tone boundary avoids discontinuity clicks
/// that would register as spurious energy.
pub fn render_phrase(steps: &[PhraseStep], amplitude: f32, sample_rate: u32) -> Vec<f32> {
    let fade_samples = (sample_rate / 1000) as usize; // 1 ms
    let mut samples = Vec::new();

    for step in steps {
        let tone_len = (sample_rate as u64 * step.duration_ms / 1000) as usize;
        let mut tone = sine_window(step.frequency, amplitude, sample_rate, tone_len);
        let fade = fade_samples.min(tone_len / 2);
        for i in 0..fade {
            let gain = i as f32 / fade as f32;
            tone[i] *= gain;
            tone[tone_len - 1 - i] *= gain;
        }
        samples.extend_from_slice(&tone);
        samples.extend(std::iter::repeat(0.0).take(
            (sample_rate as u64 * step.rest_ms / 1000) as usize,
        ));
    }

    samples
}

/// Capture backend that feeds pre-rendered samples instead of a microphone.
///
/// Chunks the sample buffer through the pool the way the live input
/// callback does, then idles. Used by tests and fixture-driven CLI sessions;
/// the rest of the pipeline cannot tell it apart from real capture.
pub struct FixtureBackend {
    samples: Arc<Vec<f32>>,
    chunk_size: usize,
    stop_flag: Arc<AtomicBool>,
    feeder: Option<JoinHandle<()>>,
}

impl FixtureBackend {
    pub fn new(samples: Vec<f32>) -> Self {
        Self {
            samples: Arc::new(samples),
            chunk_size: 2048,
            stop_flag: Arc::new(AtomicBool::new(false)),
            feeder: None,
        }
    }
}

impl CaptureBackend for FixtureBackend {
    fn start(
        &mut self,
        mut capture: CaptureChannels,
        _bpm: u32,
        _metronome_enabled: bool,
    ) -> Result<(), AudioError> {
        let samples = Arc::clone(&self.samples);
        let chunk_size = self.chunk_size;
        let stop_flag = Arc::new(AtomicBool::new(false));
        self.stop_flag = Arc::clone(&stop_flag);

        let feeder = thread::Builder::new()
            .name("fixture-capture".to_string())
            .spawn(move || {
                'feed: for chunk in samples.chunks(chunk_size) {
                    loop {
                        if stop_flag.load(Ordering::SeqCst) {
                            break 'feed;
                        }
                        match capture.pool_consumer.pop() {
                            Ok(mut buffer) => {
                                buffer.clear();
                                buffer.extend_from_slice(chunk);
                                let _ = capture.data_producer.push(buffer);
                                break;
                            }
                            Err(_) => thread::sleep(Duration::from_millis(1)),
                        }
                    }
                }
                // All samples delivered; park until stopped like a live
                // stream that has gone quiet
                while !stop_flag.load(Ordering::SeqCst) {
                    thread::sleep(Duration::from_millis(5));
                }
            })
            .map_err(|err| AudioError::WorkerFailure {
                reason: format!("failed to spawn fixture feeder: {}", err),
            })?;

        self.feeder = Some(feeder);
        Ok(())
    }

    fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        if let Some(feeder) = self.feeder.take() {
            let _ = feeder.join();
        }
    }

    fn set_bpm(&mut self, _bpm: u32) {}
}

/// Metadata describing an available fixture recording.
#[derive(Clone, Debug)]
pub struct FixtureMetadata {
    pub name: String,
    pub wav_path: PathBuf,
}

/// Loaded fixture with decoded PCM samples.
pub struct FixtureData {
    pub metadata: FixtureMetadata,
    pub sample_rate: u32,
    pub samples: Vec<f32>,
}

/// Catalog responsible for discovering fixture recordings on disk.
pub struct FixtureCatalog {
    root: PathBuf,
}

impl FixtureCatalog {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// List all fixtures by their metadata, sorted by name.
    pub fn discover(&self) -> Result<Vec<FixtureMetadata>> {
        let mut fixtures = Vec::new();
        if !self.root.exists() {
            return Ok(fixtures);
        }

        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                let path = entry.path();
                if path.extension().and_then(|ext| ext.to_str()) == Some("wav") {
                    fixtures.push(FixtureMetadata {
                        name: path
                            .file_stem()
                            .and_then(|s| s.to_str())
                            .unwrap_or_default()
                            .to_string(),
                        wav_path: path,
                    });
                }
            }
        }

        fixtures.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(fixtures)
    }

    /// Load fixture samples for a catalog name or an explicit WAV path.
    pub fn load(&self, fixture: &str) -> Result<FixtureData> {
        let wav_path = self.resolve_fixture_path(fixture)?;
        let name = wav_path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| anyhow!("Invalid fixture name for {}", wav_path.display()))?
            .to_string();
        let (samples, sample_rate) = read_wav(&wav_path)?;

        Ok(FixtureData {
            metadata: FixtureMetadata { name, wav_path },
            sample_rate,
            samples,
        })
    }

    fn resolve_fixture_path(&self, fixture: &str) -> Result<PathBuf> {
        let as_path = Path::new(fixture);
        if as_path.exists() {
            return Ok(as_path.to_path_buf());
        }

        let candidate = self.root.join(format!("{fixture}.wav"));
        if candidate.exists() {
            Ok(candidate)
        } else {
            Err(anyhow!(
                "Fixture '{fixture}' not found in {}",
                self.root.display()
            ))
        }
    }
}

impl Default for FixtureCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_FIXTURE_ROOT)
    }
}

fn read_wav(path: &Path) -> Result<(Vec<f32>, u32)> {
    let mut reader =
        hound::WavReader::open(path).with_context(|| format!("opening {}", path.display()))?;
    let spec = reader.spec();
    if spec.channels != 1 {
        return Err(anyhow!(
            "Fixture {} must be mono (found {} channels)",
            path.display(),
            spec.channels
        ));
    }

    let sample_rate = spec.sample_rate;

    let samples = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|sample| sample.map_err(|err| anyhow!(err)))
            .collect::<Result<Vec<f32>>>()?,
        hound::SampleFormat::Int => {
            let max = (1i64 << (spec.bits_per_sample - 1)) - 1;
            match spec.bits_per_sample {
                16 => reader
                    .samples::<i16>()
                    .map(|sample| {
                        sample
                            .map(|value| value as f32 / max as f32)
                            .map_err(|err| anyhow!(err))
                    })
                    .collect::<Result<Vec<f32>>>()?,
                24 | 32 => reader
                    .samples::<i32>()
                    .map(|sample| {
                        sample
                            .map(|value| value as f32 / max as f32)
                            .map_err(|err| anyhow!(err))
                    })
                    .collect::<Result<Vec<f32>>>()?,
                other => {
                    return Err(anyhow!(
                        "Unsupported bits per sample {} in {}",
                        other,
                        path.display()
                    ))
                }
            }
        }
    };

    Ok((samples, sample_rate))
}
