//! Music theory engine - pure note, scale and fretboard math
//!
//! Everything in this module is deterministic and allocation-light: note/MIDI/
//! frequency conversion, scale membership tables per musical style, and
//! guitar fretboard position inference. No I/O, no shared state.

mod fretboard;
mod scales;

pub use fretboard::{most_likely_position, note_positions, FretPosition, FRET_COUNT};
pub use scales::{
    is_note_in_scale, scale_pitch_classes, style_pitch_classes, MusicalKey, MusicalStyle,
    PitchClassSet, ScalePattern,
};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pitch class names in chromatic order starting at C.
pub const NOTE_NAMES: [&str; 12] = [
    "C", "C#", "D", "D#", "E", "F", "F#", "G", "G#", "A", "A#", "B",
];

/// Reference tuning: A4 = 440 Hz = MIDI 69.
pub const A4_FREQ_HZ: f64 = 440.0;
pub const A4_MIDI: f64 = 69.0;

/// A concrete pitch: chromatic class (0 = C .. 11 = B) plus octave.
///
/// Octave numbering follows scientific pitch notation (MIDI 69 = A4),
/// so the open low E string of a guitar is E2 (MIDI 40).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Note {
    class: u8,
    octave: i8,
}

impl Note {
    pub fn new(class: u8, octave: i8) -> Self {
        debug_assert!(class < 12);
        Self { class, octave }
    }

    /// Build from an integer MIDI number (C-1 = 0).
    pub fn from_midi(midi: i32) -> Self {
        Self {
            class: midi.rem_euclid(12) as u8,
            octave: (midi.div_euclid(12) - 1) as i8,
        }
    }

    pub fn to_midi(self) -> i32 {
        (self.octave as i32 + 1) * 12 + self.class as i32
    }

    /// Chromatic pitch class, 0 = C through 11 = B.
    pub fn class(self) -> u8 {
        self.class
    }

    pub fn octave(self) -> i8 {
        self.octave
    }

    /// Equal-tempered fundamental frequency of this note.
    pub fn frequency_hz(self) -> f64 {
        A4_FREQ_HZ * 2f64.powf((self.to_midi() as f64 - A4_MIDI) / 12.0)
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", NOTE_NAMES[self.class as usize], self.octave)
    }
}

impl FromStr for Note {
    type Err = String;

    /// Parse names like "A3" or "C#4".
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let split = s
            .find(|c: char| c.is_ascii_digit() || c == '-')
            .ok_or_else(|| format!("note '{}' has no octave", s))?;
        let (name, octave) = s.split_at(split);
        let class = NOTE_NAMES
            .iter()
            .position(|&n| n == name)
            .ok_or_else(|| format!("unknown pitch class '{}'", name))? as u8;
        let octave: i8 = octave
            .parse()
            .map_err(|_| format!("bad octave in '{}'", s))?;
        Ok(Note::new(class, octave))
    }
}

impl Serialize for Note {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Note {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A note paired with its signed deviation from equal temperament.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PitchedNote {
    pub note: Note,
    /// Deviation from the nearest semitone in cents, always in [-50, 50].
    pub cents: i32,
}

/// Fractional MIDI number for an arbitrary frequency.
pub fn frequency_to_midi(frequency_hz: f64) -> f64 {
    12.0 * (frequency_hz / A4_FREQ_HZ).log2() + A4_MIDI
}

/// Convert a frequency to the nearest equal-tempered note plus cent deviation.
///
/// Total over all positive frequencies. `cents` is bounded to [-50, 50] by
/// nearest-semitone rounding.
pub fn frequency_to_note(frequency_hz: f64) -> PitchedNote {
    let midi = frequency_to_midi(frequency_hz);
    let rounded = midi.round();
    let cents = ((midi - rounded) * 100.0).round() as i32;
    PitchedNote {
        note: Note::from_midi(rounded as i32),
        cents,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_a440_is_a4_zero_cents() {
        let pitched = frequency_to_note(440.0);
        assert_eq!(pitched.note.to_string(), "A4");
        assert_eq!(pitched.cents, 0);
    }

    #[test]
    fn test_a_sharp_4() {
        // Exact A#4 per equal temperament
        let pitched = frequency_to_note(466.16);
        assert_eq!(pitched.note.to_string(), "A#4");
        assert!(pitched.cents.abs() <= 1, "cents was {}", pitched.cents);
    }

    #[test]
    fn test_cents_always_bounded() {
        let mut f = 60.0;
        while f < 1500.0 {
            let pitched = frequency_to_note(f);
            assert!(
                pitched.cents.abs() <= 50,
                "cents {} out of range at {} Hz",
                pitched.cents,
                f
            );
            f *= 1.013;
        }
    }

    #[test]
    fn test_midi_round_trip() {
        for midi in 28..=100 {
            let note = Note::from_midi(midi);
            assert_eq!(note.to_midi(), midi);
        }
    }

    #[test]
    fn test_frequency_round_trip_within_one_cent() {
        // Every note in the playable guitar range: E2 (40) to ~E6 (88)
        for midi in 40..=88 {
            let note = Note::from_midi(midi);
            let pitched = frequency_to_note(note.frequency_hz());
            assert_eq!(pitched.note, note, "note mismatch at MIDI {}", midi);
            assert!(
                pitched.cents.abs() <= 1,
                "cents {} at MIDI {}",
                pitched.cents,
                midi
            );
        }
    }

    #[test]
    fn test_note_display_and_parse() {
        let cases = [("E2", 40), ("A2", 45), ("C#4", 61), ("A4", 69), ("B3", 59)];
        for (name, midi) in cases {
            let note: Note = name.parse().unwrap();
            assert_eq!(note.to_midi(), midi);
            assert_eq!(note.to_string(), name);
        }
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!("H3".parse::<Note>().is_err());
        assert!("A".parse::<Note>().is_err());
        assert!("".parse::<Note>().is_err());
    }

    #[test]
    fn test_octave_boundaries() {
        assert_eq!(Note::from_midi(60).to_string(), "C4");
        assert_eq!(Note::from_midi(59).to_string(), "B3");
        assert_eq!(Note::from_midi(40).to_string(), "E2");
    }

    #[test]
    fn test_serde_as_string() {
        let note = Note::from_midi(57);
        let json = serde_json::to_string(&note).unwrap();
        assert_eq!(json, "\"A3\"");
        let back: Note = serde_json::from_str(&json).unwrap();
        assert_eq!(back, note);
    }
}
