// FretCoach Core - guitar improvisation trainer engine
// Real-time pitch tracking with a lock-free capture pipeline,
// deterministic scoring and optional external assessment.

pub mod analysis;
pub mod assessment;
pub mod audio;
pub mod config;
pub mod engine;
pub mod error;
pub mod fixtures;
pub mod scoring;
pub mod session;
pub mod theory;

pub use analysis::{LiveUpdate, NoteEvent};
pub use config::AppConfig;
pub use engine::SessionEngine;
pub use error::{AssessmentError, AudioError};
pub use scoring::ScoreMetrics;
pub use session::{SessionResult, SessionSettings};

/// Install the process-wide tracing subscriber. Call once from the binary
/// entry point; later calls are ignored.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .try_init();
}
