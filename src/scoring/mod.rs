//! Deterministic performance metrics
//!
//! Four pure functions map a note-event sequence to 0-100 scores. All four
//! are total: degenerate input (empty or too short to measure) scores 100,
//! on the principle that absence of evidence is not penalized. The metrics
//! never look at audio, only at the extracted events, so identical event
//! sequences always produce identical scores.

use crate::analysis::NoteEvent;
use crate::theory::{style_pitch_classes, MusicalKey, MusicalStyle};

/// Cents deviation tolerated as intentional expression (vibrato, bends)
/// before pitch control starts penalizing.
pub const TOLERABLE_CENTS: i32 = 35;

/// Placeholder style-match score used until an external assessment supplies
/// a real one.
pub const DEFAULT_STYLE_MATCH: u8 = 70;

/// The five per-dimension scores, each 0-100.
///
/// `style_match` is subjective and cannot be computed locally; local
/// analysis carries [`DEFAULT_STYLE_MATCH`] in that slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreMetrics {
    pub scale_adherence: u8,
    pub timing_accuracy: u8,
    pub pitch_control: u8,
    pub phrase_consistency: u8,
    pub style_match: u8,
}

/// Compute all local metrics for one session.
pub fn local_metrics(
    events: &[NoteEvent],
    style: MusicalStyle,
    key: MusicalKey,
    tempo: u32,
) -> ScoreMetrics {
    ScoreMetrics {
        scale_adherence: scale_adherence(events, style, key),
        timing_accuracy: timing_accuracy(events, tempo),
        pitch_control: pitch_control(events),
        phrase_consistency: phrase_consistency(events),
        style_match: DEFAULT_STYLE_MATCH,
    }
}

/// Fraction of notes whose pitch class belongs to any scale of the style in
/// the given key, as a 0-100 score. Octave is ignored.
pub fn scale_adherence(events: &[NoteEvent], style: MusicalStyle, key: MusicalKey) -> u8 {
    if events.is_empty() {
        return 100;
    }

    let allowed = style_pitch_classes(style, key);
    let in_scale = events
        .iter()
        .filter(|e| allowed.contains(e.note.class()))
        .count();

    round_score(in_scale as f64 / events.len() as f64 * 100.0)
}

/// How closely inter-onset intervals land on tempo subdivisions.
///
/// Each interval is measured against the nearest of: the beat, half, quarter
/// and third of the beat (triplets). The normalized remainder deviation is
/// averaged and folded so that an average deviation of half a subdivision
/// scores zero.
pub fn timing_accuracy(events: &[NoteEvent], tempo: u32) -> u8 {
    if events.len() < 2 || tempo == 0 {
        return 100;
    }

    let beat_ms = 60_000.0 / tempo as f64;
    let subdivisions = [beat_ms, beat_ms / 2.0, beat_ms / 4.0, beat_ms / 3.0];

    let mut total_deviation = 0.0;
    for pair in events.windows(2) {
        let interval = (pair[1].timestamp_ms - pair[0].timestamp_ms) as f64;

        let mut min_deviation = f64::INFINITY;
        for sub in subdivisions {
            let remainder = interval % sub;
            let deviation = remainder.min(sub - remainder);
            min_deviation = min_deviation.min(deviation / sub);
        }

        total_deviation += min_deviation;
    }

    let avg_deviation = total_deviation / (events.len() - 1) as f64;
    round_score((1.0 - avg_deviation * 2.0).max(0.0) * 100.0)
}

/// Average per-note intonation score from cents deviation.
///
/// Up to [`TOLERABLE_CENTS`] is full credit, up to a half semitone is near
/// full, beyond that the score falls off linearly.
pub fn pitch_control(events: &[NoteEvent]) -> u8 {
    if events.is_empty() {
        return 100;
    }

    let total: f64 = events
        .iter()
        .map(|e| {
            let abs_cents = e.cents.abs();
            if abs_cents <= TOLERABLE_CENTS {
                100.0
            } else if abs_cents <= 50 {
                90.0
            } else {
                (100 - (abs_cents - TOLERABLE_CENTS) * 2).max(0) as f64
            }
        })
        .sum();

    round_score(total / events.len() as f64)
}

/// Regularity of note spacing, from the relative standard deviation of
/// inter-onset gaps. Some variation is musical; chaotic spacing is not.
pub fn phrase_consistency(events: &[NoteEvent]) -> u8 {
    if events.len() < 4 {
        return 100;
    }

    let gaps: Vec<f64> = events
        .windows(2)
        .map(|pair| (pair[1].timestamp_ms - pair[0].timestamp_ms) as f64)
        .collect();

    let mean = gaps.iter().sum::<f64>() / gaps.len() as f64;
    if mean == 0.0 {
        return 100;
    }
    let variance = gaps.iter().map(|g| (g - mean).powi(2)).sum::<f64>() / gaps.len() as f64;
    let relative_std_dev = variance.sqrt() / mean;

    if relative_std_dev < 0.3 {
        100
    } else if relative_std_dev < 0.5 {
        90
    } else if relative_std_dev < 0.8 {
        75
    } else if relative_std_dev < 1.2 {
        60
    } else {
        round_score((100.0 - relative_std_dev * 30.0).max(40.0))
    }
}

fn round_score(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}
