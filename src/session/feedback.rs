//! Local fallback feedback generation
//!
//! When the external assessment is unavailable the player still gets
//! qualitative feedback, derived from the local metrics by fixed rule
//! tables. Each list is guaranteed non-empty: a generic line stands in when
//! no rule fires, so the result surface never degrades to blank sections.

use crate::config::ScoringConfig;
use crate::scoring::ScoreMetrics;

use super::SessionSettings;

pub fn local_strengths(metrics: &ScoreMetrics, config: &ScoringConfig) -> Vec<String> {
    let at_least = |score: u8| score >= config.strength_threshold;
    let mut strengths = Vec::new();

    if at_least(metrics.scale_adherence) {
        strengths.push("Excellent scale awareness - staying within the key".to_string());
    }
    if at_least(metrics.timing_accuracy) {
        strengths.push("Strong rhythmic sense with good timing".to_string());
    }
    if at_least(metrics.pitch_control) {
        strengths.push("Great intonation and pitch stability".to_string());
    }
    if at_least(metrics.phrase_consistency) {
        strengths.push("Consistent phrasing with musical flow".to_string());
    }

    if strengths.is_empty() {
        strengths.push("Keep practicing - improvement takes time".to_string());
    }

    strengths
}

pub fn local_weaknesses(metrics: &ScoreMetrics, config: &ScoringConfig) -> Vec<String> {
    let below = |score: u8| score < config.weakness_threshold;
    let mut weaknesses = Vec::new();

    if below(metrics.scale_adherence) {
        weaknesses.push("Many notes outside the scale/key".to_string());
    }
    if below(metrics.timing_accuracy) {
        weaknesses.push("Timing could be tighter".to_string());
    }
    if below(metrics.pitch_control) {
        weaknesses.push("Pitch accuracy needs work".to_string());
    }
    if below(metrics.phrase_consistency) {
        weaknesses.push("Phrasing feels inconsistent".to_string());
    }

    if weaknesses.is_empty() {
        weaknesses.push("Minor areas to refine for even better playing".to_string());
    }

    weaknesses
}

pub fn local_suggestions(
    metrics: &ScoreMetrics,
    settings: &SessionSettings,
    config: &ScoringConfig,
) -> Vec<String> {
    let below = |score: u8| score < config.suggestion_threshold;
    let mut suggestions = Vec::new();

    if below(metrics.scale_adherence) {
        suggestions.push(format!(
            "Practice the {} scale in {}",
            settings.style.practice_scale(),
            settings.key
        ));
    }
    if below(metrics.timing_accuracy) {
        suggestions.push(format!(
            "Use a metronome at {} BPM for timing practice",
            settings.tempo
        ));
    }
    if below(metrics.pitch_control) {
        suggestions.push("Focus on clean fretting and controlled bends".to_string());
    }
    if below(metrics.phrase_consistency) {
        suggestions.push("Try playing shorter, more deliberate phrases".to_string());
    }

    if suggestions.is_empty() {
        suggestions.push("Continue exploring and developing your unique voice".to_string());
    }

    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theory::{MusicalKey, MusicalStyle};

    fn settings() -> SessionSettings {
        SessionSettings {
            style: MusicalStyle::Blues,
            key: MusicalKey::A,
            tempo: 120,
            metronome_enabled: false,
        }
    }

    fn metrics(all: u8) -> ScoreMetrics {
        ScoreMetrics {
            scale_adherence: all,
            timing_accuracy: all,
            pitch_control: all,
            phrase_consistency: all,
            style_match: all,
        }
    }

    #[test]
    fn test_strong_performance_lists_all_strengths() {
        let config = ScoringConfig::default();
        let strengths = local_strengths(&metrics(95), &config);
        assert_eq!(strengths.len(), 4);

        let weaknesses = local_weaknesses(&metrics(95), &config);
        assert_eq!(weaknesses.len(), 1, "generic line when nothing is weak");

        let suggestions = local_suggestions(&metrics(95), &settings(), &config);
        assert_eq!(suggestions.len(), 1);
    }

    #[test]
    fn test_weak_performance_lists_are_never_empty() {
        let config = ScoringConfig::default();
        assert_eq!(local_strengths(&metrics(10), &config).len(), 1);
        assert_eq!(local_weaknesses(&metrics(10), &config).len(), 4);
        assert_eq!(local_suggestions(&metrics(10), &settings(), &config).len(), 4);
    }

    #[test]
    fn test_thresholds_are_exact() {
        let config = ScoringConfig::default();
        // 80 is a strength; 79 is not
        assert_eq!(local_strengths(&metrics(80), &config).len(), 4);
        assert_eq!(local_strengths(&metrics(79), &config).len(), 1);
        // 60 is not a weakness; 59 is
        assert_eq!(local_weaknesses(&metrics(60), &config).len(), 1);
        assert_eq!(local_weaknesses(&metrics(59), &config).len(), 4);
    }

    #[test]
    fn test_scale_suggestion_names_style_and_key() {
        let config = ScoringConfig::default();
        let mut m = metrics(90);
        m.scale_adherence = 50;

        let suggestions = local_suggestions(&m, &settings(), &config);
        assert!(suggestions[0].contains("blues"));
        assert!(suggestions[0].contains("in A"));

        let rock = SessionSettings {
            style: MusicalStyle::Rock,
            key: MusicalKey::E,
            ..settings()
        };
        let suggestions = local_suggestions(&m, &rock, &config);
        assert!(suggestions[0].contains("pentatonic minor"));
        assert!(suggestions[0].contains("in E"));
    }

    #[test]
    fn test_metronome_suggestion_names_tempo() {
        let config = ScoringConfig::default();
        let mut m = metrics(90);
        m.timing_accuracy = 55;
        let suggestions = local_suggestions(&m, &settings(), &config);
        assert!(suggestions[0].contains("120 BPM"));
    }
}
