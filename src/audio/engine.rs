// Duplex audio engine: microphone capture plus metronome playback
//
// Capture: the input callback pops a pre-allocated buffer from the pool,
// copies the first channel in, and hands it to the analysis thread. If the
// pool is empty the callback drops samples; it never blocks or allocates.
//
// Playback: the output callback renders metronome ticks by frame-counter
// arithmetic. Tempo and enablement are atomics so they can change while the
// stream runs.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{error, info};

use super::buffer_pool::CaptureChannels;
use super::metronome::TickMixer;
use crate::error::AudioError;

pub struct AudioEngine {
    input_stream: Option<cpal::Stream>,
    output_stream: Option<cpal::Stream>,

    /// Frames written to the output stream since start; drives tick timing
    frame_counter: Arc<AtomicU64>,
    bpm: Arc<AtomicU32>,
    metronome_enabled: Arc<AtomicBool>,
    sample_rate: u32,
}

// Safety: cpal::Stream is !Send only because some platform backends are
// thread-affine; the ALSA streams here are created, controlled and dropped
// through &mut AudioEngine, never concurrently.
unsafe impl Send for AudioEngine {}

impl AudioEngine {
    pub fn new(bpm: u32, sample_rate: u32, metronome_enabled: bool) -> Self {
        AudioEngine {
            input_stream: None,
            output_stream: None,
            frame_counter: Arc::new(AtomicU64::new(0)),
            bpm: Arc::new(AtomicU32::new(bpm)),
            metronome_enabled: Arc::new(AtomicBool::new(metronome_enabled)),
            sample_rate,
        }
    }

    pub fn set_metronome_enabled(&self, enabled: bool) {
        self.metronome_enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn set_bpm(&self, new_bpm: u32) {
        self.bpm.store(new_bpm, Ordering::Relaxed);
    }

    pub fn bpm(&self) -> u32 {
        self.bpm.load(Ordering::Relaxed)
    }

    pub fn frame_counter(&self) -> u64 {
        self.frame_counter.load(Ordering::Relaxed)
    }

    /// Open and start both streams. The capture half of the buffer pool
    /// moves into the input callback.
    pub fn start(&mut self, capture: CaptureChannels) -> Result<(), AudioError> {
        let input_stream = self.create_input_stream(capture)?;
        let output_stream = self.create_output_stream()?;

        input_stream.play().map_err(|e| AudioError::HardwareError {
            details: format!("Input start failed: {}", e),
        })?;
        output_stream
            .play()
            .map_err(|e| AudioError::HardwareError {
                details: format!("Output start failed: {}", e),
            })?;

        info!(
            "[AudioEngine] Streams running at {} Hz, {} BPM",
            self.sample_rate,
            self.bpm()
        );

        self.input_stream = Some(input_stream);
        self.output_stream = Some(output_stream);
        Ok(())
    }

    /// Stop both streams. After this returns no further buffers reach the
    /// data queue.
    pub fn stop(&mut self) {
        self.input_stream.take();
        self.output_stream.take();
        info!("[AudioEngine] Streams stopped");
    }

    fn create_input_stream(
        &self,
        mut capture: CaptureChannels,
    ) -> Result<cpal::Stream, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(AudioError::PermissionDenied)?;

        let config = device
            .default_input_config()
            .map_err(|e| AudioError::StreamOpenFailed {
                reason: format!("Failed to get default input config: {:?}", e),
            })?;

        let stream_config: cpal::StreamConfig = config.clone().into();
        let channel_count = stream_config.channels as usize;

        let err_fn = |err| error!("[AudioEngine] Input stream error: {}", err);

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => device.build_input_stream(
                &stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    // Pool empty means analysis is behind; dropping is the
                    // only real-time-safe choice
                    if let Ok(mut buffer) = capture.pool_consumer.pop() {
                        buffer.clear();
                        if channel_count == 1 {
                            let take = data.len().min(buffer.capacity());
                            buffer.extend_from_slice(&data[..take]);
                        } else {
                            // De-interleave: analysis wants mono, take the
                            // first channel
                            for frame in data.chunks(channel_count) {
                                if buffer.len() == buffer.capacity() {
                                    break;
                                }
                                buffer.push(frame[0]);
                            }
                        }
                        let _ = capture.data_producer.push(buffer);
                    }
                },
                err_fn,
                None,
            ),
            other => {
                return Err(AudioError::StreamOpenFailed {
                    reason: format!("Unsupported input sample format {:?}", other),
                })
            }
        }
        .map_err(|e| AudioError::StreamOpenFailed {
            reason: format!("{:?}", e),
        })?;

        Ok(stream)
    }

    fn create_output_stream(&self) -> Result<cpal::Stream, AudioError> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| AudioError::StreamOpenFailed {
                reason: "No default output device found".to_string(),
            })?;

        let config = device
            .default_output_config()
            .map_err(|e| AudioError::StreamOpenFailed {
                reason: format!("Failed to get default output config: {:?}", e),
            })?;

        let stream_config: cpal::StreamConfig = config.clone().into();
        let channel_count = stream_config.channels as usize;

        let frame_counter = Arc::clone(&self.frame_counter);
        let bpm = Arc::clone(&self.bpm);
        let metronome_enabled = Arc::clone(&self.metronome_enabled);
        let mut mixer = TickMixer::new(self.sample_rate);

        let err_fn = |err| error!("[AudioEngine] Output stream error: {}", err);

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => device.build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let current_bpm = bpm.load(Ordering::Relaxed);
                    let enabled = metronome_enabled.load(Ordering::Relaxed);
                    let frame_start = frame_counter.load(Ordering::Relaxed);
                    let frame_count = data.len() / channel_count;

                    for i in 0..frame_count {
                        let sample = if enabled {
                            mixer.next_sample(frame_start + i as u64, current_bpm)
                        } else {
                            0.0
                        };
                        for ch in 0..channel_count {
                            data[i * channel_count + ch] = sample;
                        }
                    }

                    frame_counter.fetch_add(frame_count as u64, Ordering::Relaxed);
                },
                err_fn,
                None,
            ),
            other => {
                return Err(AudioError::StreamOpenFailed {
                    reason: format!("Unsupported output sample format {:?}", other),
                })
            }
        }
        .map_err(|e| AudioError::StreamOpenFailed {
            reason: format!("{:?}", e),
        })?;

        Ok(stream)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Stream creation needs real devices; the full pipeline is covered by
    // the offline tests. These cover the control surface only.

    #[test]
    fn test_tempo_control() {
        let engine = AudioEngine::new(120, 48_000, true);
        assert_eq!(engine.bpm(), 120);
        engine.set_bpm(90);
        assert_eq!(engine.bpm(), 90);
    }

    #[test]
    fn test_frame_counter_starts_at_zero() {
        let engine = AudioEngine::new(120, 48_000, false);
        assert_eq!(engine.frame_counter(), 0);
    }
}
