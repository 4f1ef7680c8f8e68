//! Session analysis orchestration
//!
//! Takes a frozen note-event sequence plus the session settings and produces
//! the final [`SessionResult`]. Local metrics are always computed first;
//! when an external assessment backend is configured its judgment is blended
//! in, weighted toward the local numbers for the objective dimensions.
//! Any backend failure, including timeout, degrades to local-only analysis
//! with rule-based feedback. Analysis itself never fails.

mod feedback;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::analysis::NoteEvent;
use crate::assessment::{AssessmentBackend, AssessmentNote, AssessmentRequest, AssessmentResponse};
use crate::config::{AssessmentConfig, ScoringConfig};
use crate::error::AssessmentError;
use crate::scoring::{self, ScoreMetrics};
use crate::theory::{MusicalKey, MusicalStyle};

/// Player-chosen parameters for one practice session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSettings {
    pub style: MusicalStyle,
    pub key: MusicalKey,
    pub tempo: u32,
    pub metronome_enabled: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            style: MusicalStyle::Rock,
            key: MusicalKey::A,
            tempo: 120,
            metronome_enabled: true,
        }
    }
}

/// Complete analysis of one finished session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionResult {
    pub overall_score: u8,
    pub metrics: ScoreMetrics,
    pub feedback: Vec<String>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub suggestions: Vec<String>,
    pub note_events: Vec<NoteEvent>,
    /// Span from first to last note onset, ms. Zero for fewer than two notes.
    pub duration_ms: u64,
}

/// Orchestrates local scoring and the optional external assessment.
pub struct SessionAnalyzer {
    scoring: ScoringConfig,
    assessment: AssessmentConfig,
    backend: Option<Arc<dyn AssessmentBackend>>,
}

impl SessionAnalyzer {
    /// Local-only analyzer; no external calls are ever attempted.
    pub fn local_only(scoring: ScoringConfig) -> Self {
        Self {
            scoring,
            assessment: AssessmentConfig::default(),
            backend: None,
        }
    }

    pub fn with_backend(
        scoring: ScoringConfig,
        assessment: AssessmentConfig,
        backend: Arc<dyn AssessmentBackend>,
    ) -> Self {
        Self {
            scoring,
            assessment,
            backend: Some(backend),
        }
    }

    /// Analyze a finished session. Infallible: external failures degrade to
    /// the local path.
    pub async fn analyze(&self, events: Vec<NoteEvent>, settings: SessionSettings) -> SessionResult {
        let duration_ms = session_duration_ms(&events);
        let local = scoring::local_metrics(&events, settings.style, settings.key, settings.tempo);

        match self.request_assessment(&events, &settings).await {
            Ok(external) => {
                info!(
                    "[Session] External assessment blended (styleMatch={})",
                    external.metrics.style_match
                );
                self.blended_result(events, local, external, duration_ms)
            }
            Err(err) => {
                if !matches!(err, AssessmentError::Disabled) {
                    warn!("[Session] Assessment unavailable, using local fallback: {}", err);
                }
                self.local_result(events, local, &settings, duration_ms)
            }
        }
    }

    async fn request_assessment(
        &self,
        events: &[NoteEvent],
        settings: &SessionSettings,
    ) -> Result<AssessmentResponse, AssessmentError> {
        let backend = self.backend.as_ref().ok_or(AssessmentError::Disabled)?;

        let request = AssessmentRequest {
            note_events: events.iter().map(AssessmentNote::from).collect(),
            style: settings.style,
            key: settings.key,
            tempo: settings.tempo,
        };

        let timeout = self.assessment.timeout();
        tokio::time::timeout(timeout, backend.assess(request))
            .await
            .map_err(|_| AssessmentError::Timeout {
                waited_ms: self.assessment.timeout_ms,
            })?
    }

    fn blended_result(
        &self,
        events: Vec<NoteEvent>,
        local: ScoreMetrics,
        external: AssessmentResponse,
        duration_ms: u64,
    ) -> SessionResult {
        let objective = self.scoring.objective_local_weight;
        let phrasing = self.scoring.phrasing_local_weight;

        let metrics = ScoreMetrics {
            scale_adherence: blend(local.scale_adherence, external.metrics.scale_adherence, objective),
            timing_accuracy: blend(local.timing_accuracy, external.metrics.timing_accuracy, objective),
            pitch_control: blend(local.pitch_control, external.metrics.pitch_control, objective),
            phrase_consistency: blend(
                local.phrase_consistency,
                external.metrics.phrase_consistency,
                phrasing,
            ),
            // Style is subjective; the external judgment stands alone
            style_match: external.metrics.style_match,
        };

        let overall_score = mean_score(&[
            metrics.scale_adherence,
            metrics.timing_accuracy,
            metrics.pitch_control,
            metrics.phrase_consistency,
            metrics.style_match,
        ]);

        SessionResult {
            overall_score,
            metrics,
            feedback: external.feedback,
            strengths: external.strengths,
            weaknesses: external.weaknesses,
            suggestions: external.suggestions,
            note_events: events,
            duration_ms,
        }
    }

    fn local_result(
        &self,
        events: Vec<NoteEvent>,
        local: ScoreMetrics,
        settings: &SessionSettings,
        duration_ms: u64,
    ) -> SessionResult {
        // styleMatch is excluded here: its local value is a placeholder, not
        // a measurement
        let overall_score = mean_score(&[
            local.scale_adherence,
            local.timing_accuracy,
            local.pitch_control,
            local.phrase_consistency,
        ]);

        SessionResult {
            overall_score,
            metrics: local,
            feedback: vec!["Analysis completed using local metrics.".to_string()],
            strengths: feedback::local_strengths(&local, &self.scoring),
            weaknesses: feedback::local_weaknesses(&local, &self.scoring),
            suggestions: feedback::local_suggestions(&local, settings, &self.scoring),
            note_events: events,
            duration_ms,
        }
    }
}

fn session_duration_ms(events: &[NoteEvent]) -> u64 {
    match (events.first(), events.last()) {
        (Some(first), Some(last)) if events.len() > 1 => {
            last.timestamp_ms - first.timestamp_ms
        }
        _ => 0,
    }
}

fn blend(local: u8, external: u8, local_weight: f64) -> u8 {
    let value = local as f64 * local_weight + external as f64 * (1.0 - local_weight);
    value.round().clamp(0.0, 100.0) as u8
}

fn mean_score(scores: &[u8]) -> u8 {
    let sum: f64 = scores.iter().map(|&s| s as f64).sum();
    (sum / scores.len() as f64).round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::DEFAULT_STYLE_MATCH;
    use crate::theory::Note;
    use futures::future::BoxFuture;
    use futures::FutureExt;

    fn event(note: &str, timestamp_ms: u64) -> NoteEvent {
        NoteEvent {
            note: note.parse::<Note>().unwrap(),
            frequency: 220.0,
            timestamp_ms,
            confidence: 0.9,
            cents: 0,
            velocity: 0.5,
        }
    }

    fn clean_blues_phrase() -> Vec<NoteEvent> {
        ["A3", "C4", "D4", "E4", "G4", "A4", "G4", "E4"]
            .iter()
            .enumerate()
            .map(|(i, n)| event(n, i as u64 * 500))
            .collect()
    }

    fn blues_settings() -> SessionSettings {
        SessionSettings {
            style: MusicalStyle::Blues,
            key: MusicalKey::A,
            tempo: 120,
            metronome_enabled: true,
        }
    }

    struct ScriptedBackend {
        response: Result<AssessmentResponse, AssessmentError>,
    }

    impl AssessmentBackend for ScriptedBackend {
        fn assess(
            &self,
            _request: AssessmentRequest,
        ) -> BoxFuture<'static, Result<AssessmentResponse, AssessmentError>> {
            let response = self.response.clone();
            async move { response }.boxed()
        }
    }

    struct HangingBackend;

    impl AssessmentBackend for HangingBackend {
        fn assess(
            &self,
            _request: AssessmentRequest,
        ) -> BoxFuture<'static, Result<AssessmentResponse, AssessmentError>> {
            async {
                futures::future::pending::<()>().await;
                unreachable!()
            }
            .boxed()
        }
    }

    fn external_response(metrics: ScoreMetrics) -> AssessmentResponse {
        AssessmentResponse {
            overall_score: 80,
            feedback: vec!["Solid blues vocabulary".to_string()],
            strengths: vec!["Expressive bends".to_string()],
            weaknesses: vec!["Rushing the turnaround".to_string()],
            suggestions: vec!["Lay back behind the beat".to_string()],
            metrics,
        }
    }

    #[tokio::test]
    async fn test_local_only_perfect_phrase() {
        let analyzer = SessionAnalyzer::local_only(ScoringConfig::default());
        let result = analyzer.analyze(clean_blues_phrase(), blues_settings()).await;

        // All four measurable metrics are perfect; styleMatch stays at its
        // placeholder and is excluded from the overall average.
        assert_eq!(result.overall_score, 100);
        assert_eq!(result.metrics.scale_adherence, 100);
        assert_eq!(result.metrics.style_match, DEFAULT_STYLE_MATCH);
        assert_eq!(result.duration_ms, 3500);
        assert_eq!(result.feedback, vec!["Analysis completed using local metrics."]);
        assert!(!result.strengths.is_empty());
        assert!(!result.weaknesses.is_empty());
        assert!(!result.suggestions.is_empty());
    }

    #[tokio::test]
    async fn test_empty_session_analyzes_cleanly() {
        let analyzer = SessionAnalyzer::local_only(ScoringConfig::default());
        let result = analyzer.analyze(Vec::new(), blues_settings()).await;
        assert_eq!(result.overall_score, 100);
        assert_eq!(result.duration_ms, 0);
        assert!(result.note_events.is_empty());
    }

    #[tokio::test]
    async fn test_blending_weights() {
        let external_metrics = ScoreMetrics {
            scale_adherence: 50,
            timing_accuracy: 50,
            pitch_control: 50,
            phrase_consistency: 50,
            style_match: 85,
        };
        let backend = Arc::new(ScriptedBackend {
            response: Ok(external_response(external_metrics)),
        });
        let analyzer = SessionAnalyzer::with_backend(
            ScoringConfig::default(),
            AssessmentConfig::default(),
            backend,
        );

        let result = analyzer.analyze(clean_blues_phrase(), blues_settings()).await;

        // Local is 100 across the board: 100*0.7 + 50*0.3 = 85,
        // phrasing 100*0.6 + 50*0.4 = 80, styleMatch passes through
        assert_eq!(result.metrics.scale_adherence, 85);
        assert_eq!(result.metrics.timing_accuracy, 85);
        assert_eq!(result.metrics.pitch_control, 85);
        assert_eq!(result.metrics.phrase_consistency, 80);
        assert_eq!(result.metrics.style_match, 85);

        // Overall is the mean of all five blended metrics
        assert_eq!(result.overall_score, 84);

        // Narrative sections come from the external assessment
        assert_eq!(result.feedback, vec!["Solid blues vocabulary"]);
        assert_eq!(result.strengths, vec!["Expressive bends"]);
    }

    #[tokio::test]
    async fn test_backend_error_falls_back_to_local() {
        let backend = Arc::new(ScriptedBackend {
            response: Err(AssessmentError::BadStatus { status: 503 }),
        });
        let analyzer = SessionAnalyzer::with_backend(
            ScoringConfig::default(),
            AssessmentConfig::default(),
            backend,
        );

        let result = analyzer.analyze(clean_blues_phrase(), blues_settings()).await;
        assert_eq!(result.metrics.style_match, DEFAULT_STYLE_MATCH);
        assert_eq!(result.feedback, vec!["Analysis completed using local metrics."]);
        assert_eq!(result.overall_score, 100);
    }

    #[tokio::test]
    async fn test_hanging_backend_times_out_to_local() {
        let assessment = AssessmentConfig {
            endpoint: Some("http://localhost:1/analyze".to_string()),
            timeout_ms: 20,
        };
        let analyzer = SessionAnalyzer::with_backend(
            ScoringConfig::default(),
            assessment,
            Arc::new(HangingBackend),
        );

        let result = analyzer.analyze(clean_blues_phrase(), blues_settings()).await;
        assert_eq!(result.feedback, vec!["Analysis completed using local metrics."]);
    }

    #[tokio::test]
    async fn test_single_note_duration_zero() {
        let analyzer = SessionAnalyzer::local_only(ScoringConfig::default());
        let result = analyzer
            .analyze(vec![event("A3", 42)], blues_settings())
            .await;
        assert_eq!(result.duration_ms, 0);
        assert_eq!(result.note_events.len(), 1);
    }

    #[test]
    fn test_result_serializes_camel_case() {
        let result = SessionResult {
            overall_score: 91,
            metrics: ScoreMetrics {
                scale_adherence: 100,
                timing_accuracy: 90,
                pitch_control: 95,
                phrase_consistency: 85,
                style_match: 85,
            },
            feedback: vec![],
            strengths: vec![],
            weaknesses: vec![],
            suggestions: vec![],
            note_events: vec![event("A3", 0)],
            duration_ms: 0,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["overallScore"], 91);
        assert_eq!(json["noteEvents"][0]["note"], "A3");
        assert_eq!(json["noteEvents"][0]["timestampMs"], 0);
    }
}
