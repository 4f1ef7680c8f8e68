//! Metronome - sample-accurate tick generation
//!
//! Tick placement uses frame-counter arithmetic (zero jitter, zero
//! allocation in the hot path); tick audio is a pre-rendered decaying sine
//! burst, pitched and louder on the accented first beat of the bar.

use std::f32::consts::TAU;

/// Tick length in seconds.
const TICK_DURATION_S: f32 = 0.05;

/// Envelope decay rate; exp(-20t) fades the tick to near silence within its
/// 50 ms window.
const DECAY_RATE: f32 = 20.0;

const ACCENT_FREQ_HZ: f32 = 800.0;
const TICK_FREQ_HZ: f32 = 600.0;
const ACCENT_GAIN: f32 = 0.8;
const TICK_GAIN: f32 = 0.6;

/// Beats per bar; the first beat of each bar is accented.
pub const BEATS_PER_BAR: u64 = 4;

/// Render one metronome tick: a 50 ms decaying sine burst.
///
/// Accented ticks are higher-pitched and louder so the downbeat stands out.
/// Deterministic per (sample_rate, accent) pair; render once at stream
/// start, not per beat.
pub fn generate_tick(sample_rate: u32, accent: bool) -> Vec<f32> {
    let num_samples = (sample_rate as f32 * TICK_DURATION_S) as usize;
    let (frequency, gain) = if accent {
        (ACCENT_FREQ_HZ, ACCENT_GAIN)
    } else {
        (TICK_FREQ_HZ, TICK_GAIN)
    };

    (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            let envelope = (-t * DECAY_RATE).exp();
            (TAU * frequency * t).sin() * envelope * gain
        })
        .collect()
}

/// Exact number of samples between consecutive beats at a tempo.
#[inline]
pub fn samples_per_beat(bpm: u32, sample_rate: u32) -> u64 {
    (sample_rate as u64 * 60) / bpm as u64
}

/// Whether this frame falls exactly on a beat boundary.
#[inline]
pub fn is_on_beat(frame_counter: u64, bpm: u32, sample_rate: u32) -> bool {
    frame_counter % samples_per_beat(bpm, sample_rate) == 0
}

/// 1-based beat number within the bar for a beat-boundary frame.
#[inline]
pub fn beat_in_bar(frame_counter: u64, bpm: u32, sample_rate: u32) -> u64 {
    let beat_index = frame_counter / samples_per_beat(bpm, sample_rate);
    beat_index % BEATS_PER_BAR + 1
}

/// Mixes metronome ticks into an output stream by frame position.
///
/// Holds both pre-rendered tick buffers and tracks how far into the current
/// tick playback is. `next_sample` is called once per output frame from the
/// playback callback.
pub struct TickMixer {
    accent_tick: Vec<f32>,
    normal_tick: Vec<f32>,
    sample_rate: u32,
    /// Position within the currently sounding tick, if one is playing
    playing: Option<(bool, usize)>,
}

impl TickMixer {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            accent_tick: generate_tick(sample_rate, true),
            normal_tick: generate_tick(sample_rate, false),
            sample_rate,
            playing: None,
        }
    }

    /// Produce the metronome contribution for one output frame.
    pub fn next_sample(&mut self, frame_counter: u64, bpm: u32) -> f32 {
        if bpm > 0 && is_on_beat(frame_counter, bpm, self.sample_rate) {
            let accent = beat_in_bar(frame_counter, bpm, self.sample_rate) == 1;
            self.playing = Some((accent, 0));
        }

        match self.playing.take() {
            Some((accent, pos)) => {
                let tick = if accent {
                    &self.accent_tick
                } else {
                    &self.normal_tick
                };
                let sample = tick[pos];
                if pos + 1 < tick.len() {
                    self.playing = Some((accent, pos + 1));
                }
                sample
            }
            None => 0.0,
        }
    }
}
