// Audio module - low-latency capture, buffer pooling and metronome output

pub mod buffer_pool;
pub mod engine;
pub mod metronome;

pub use buffer_pool::{split_pool, AnalysisChannels, CaptureChannels, SampleBuffer};
pub use engine::AudioEngine;
