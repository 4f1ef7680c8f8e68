// Error types for the trainer core
//
// Audio capture and external assessment are the only fallible surfaces.
// Everything else in the pipeline is total over its inputs: a frame with no
// confident pitch is not an error, and degenerate note sequences score to
// defined defaults.

mod assessment;
mod audio;

pub use assessment::AssessmentError;
pub use audio::{log_audio_error, AudioError};
