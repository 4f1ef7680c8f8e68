//! Fretboard position inference for standard-tuned 6-string guitar.
//!
//! Fret positions are inferred from pitch, not sensed: a single note usually
//! maps to several (string, fret) pairs, so disambiguation prefers the
//! position closest to where the hand already is.

use serde::{Deserialize, Serialize};

use super::Note;

/// Highest playable fret.
pub const FRET_COUNT: u8 = 24;

/// Open-string MIDI numbers, string 1 (high E) to string 6 (low E).
const STANDARD_TUNING_MIDI: [i32; 6] = [64, 59, 55, 50, 45, 40];

/// Fret around which the hand sits most comfortably; used as the tiebreaker
/// when there is no previous position to stay close to.
const ERGONOMIC_HOME_FRET: i32 = 7;

/// One playable location on the neck.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FretPosition {
    /// String number, 1 (high E) through 6 (low E).
    pub string: u8,
    /// Fret number, 0 (open) through [`FRET_COUNT`].
    pub fret: u8,
}

/// All valid positions producing exactly this pitch.
pub fn note_positions(note: Note) -> Vec<FretPosition> {
    let midi = note.to_midi();
    STANDARD_TUNING_MIDI
        .iter()
        .enumerate()
        .filter_map(|(idx, &open)| {
            let fret = midi - open;
            (0..=FRET_COUNT as i32).contains(&fret).then(|| FretPosition {
                string: idx as u8 + 1,
                fret: fret as u8,
            })
        })
        .collect()
}

fn manhattan(a: FretPosition, b: FretPosition) -> u32 {
    a.string.abs_diff(b.string) as u32 + a.fret.abs_diff(b.fret) as u32
}

/// Pick the most plausible position for a note.
///
/// With a previous position, prefer the candidate nearest to it in
/// string+fret space; otherwise prefer positions near the middle of the neck.
/// Returns `None` only for pitches outside the fretboard entirely.
pub fn most_likely_position(note: Note, previous: Option<FretPosition>) -> Option<FretPosition> {
    let positions = note_positions(note);
    match previous {
        Some(prev) => positions.into_iter().min_by_key(|&p| manhattan(p, prev)),
        None => positions
            .into_iter()
            .min_by_key(|p| (p.fret as i32 - ERGONOMIC_HOME_FRET).abs()),
    }
}
