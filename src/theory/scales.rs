//! Scale patterns, musical styles and key-relative pitch class sets.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Note, NOTE_NAMES};

/// Named scale patterns as semitone intervals from the root.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalePattern {
    Major,
    Minor,
    PentatonicMinor,
    PentatonicMajor,
    Blues,
    Dorian,
    Mixolydian,
    PhrygianDominant,
}

impl ScalePattern {
    pub const fn intervals(self) -> &'static [u8] {
        match self {
            ScalePattern::Major => &[0, 2, 4, 5, 7, 9, 11],
            ScalePattern::Minor => &[0, 2, 3, 5, 7, 8, 10],
            ScalePattern::PentatonicMinor => &[0, 3, 5, 7, 10],
            ScalePattern::PentatonicMajor => &[0, 2, 4, 7, 9],
            ScalePattern::Blues => &[0, 3, 5, 6, 7, 10],
            ScalePattern::Dorian => &[0, 2, 3, 5, 7, 9, 10],
            ScalePattern::Mixolydian => &[0, 2, 4, 5, 7, 9, 10],
            ScalePattern::PhrygianDominant => &[0, 1, 4, 5, 7, 8, 10],
        }
    }
}

/// Musical styles the trainer knows how to judge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MusicalStyle {
    Rock,
    Blues,
    Metal,
}

impl MusicalStyle {
    /// Scales considered idiomatic for the style, in preference order.
    pub const fn scales(self) -> &'static [ScalePattern] {
        match self {
            MusicalStyle::Rock => &[
                ScalePattern::PentatonicMinor,
                ScalePattern::Blues,
                ScalePattern::Dorian,
                ScalePattern::Mixolydian,
            ],
            MusicalStyle::Blues => &[
                ScalePattern::Blues,
                ScalePattern::PentatonicMinor,
                ScalePattern::Mixolydian,
            ],
            MusicalStyle::Metal => &[
                ScalePattern::PentatonicMinor,
                ScalePattern::PhrygianDominant,
                ScalePattern::Minor,
                ScalePattern::Blues,
            ],
        }
    }

    /// Scale name used in practice suggestions.
    pub const fn practice_scale(self) -> &'static str {
        match self {
            MusicalStyle::Blues => "blues",
            _ => "pentatonic minor",
        }
    }
}

impl fmt::Display for MusicalStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MusicalStyle::Rock => "rock",
            MusicalStyle::Blues => "blues",
            MusicalStyle::Metal => "metal",
        };
        f.write_str(name)
    }
}

/// The 12 musical keys, named by their root pitch class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MusicalKey {
    C,
    #[serde(rename = "C#")]
    CSharp,
    D,
    #[serde(rename = "D#")]
    DSharp,
    E,
    F,
    #[serde(rename = "F#")]
    FSharp,
    G,
    #[serde(rename = "G#")]
    GSharp,
    A,
    #[serde(rename = "A#")]
    ASharp,
    B,
}

impl MusicalKey {
    /// Chromatic index of the key root, 0 = C.
    pub const fn root_class(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for MusicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(NOTE_NAMES[self.root_class() as usize])
    }
}

impl std::str::FromStr for MusicalKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const KEYS: [MusicalKey; 12] = [
            MusicalKey::C,
            MusicalKey::CSharp,
            MusicalKey::D,
            MusicalKey::DSharp,
            MusicalKey::E,
            MusicalKey::F,
            MusicalKey::FSharp,
            MusicalKey::G,
            MusicalKey::GSharp,
            MusicalKey::A,
            MusicalKey::ASharp,
            MusicalKey::B,
        ];
        NOTE_NAMES
            .iter()
            .position(|&n| n.eq_ignore_ascii_case(s))
            .map(|i| KEYS[i])
            .ok_or_else(|| format!("unknown key '{}'", s))
    }
}

/// Compact set of chromatic pitch classes, one bit per class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PitchClassSet(u16);

impl PitchClassSet {
    pub const EMPTY: PitchClassSet = PitchClassSet(0);

    pub fn insert(&mut self, class: u8) {
        debug_assert!(class < 12);
        self.0 |= 1 << class;
    }

    pub fn contains(self, class: u8) -> bool {
        class < 12 && self.0 & (1 << class) != 0
    }

    pub fn union(self, other: PitchClassSet) -> PitchClassSet {
        PitchClassSet(self.0 | other.0)
    }

    pub fn len(self) -> u32 {
        self.0.count_ones()
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate classes in ascending chromatic order.
    pub fn iter(self) -> impl Iterator<Item = u8> {
        (0u8..12).filter(move |&c| self.contains(c))
    }
}

/// Pitch classes of one scale pattern transposed to the given key root.
pub fn scale_pitch_classes(key: MusicalKey, pattern: ScalePattern) -> PitchClassSet {
    let root = key.root_class();
    let mut set = PitchClassSet::EMPTY;
    for &interval in pattern.intervals() {
        set.insert((root + interval) % 12);
    }
    set
}

/// Union of all pitch classes acceptable for a style in a key.
pub fn style_pitch_classes(style: MusicalStyle, key: MusicalKey) -> PitchClassSet {
    style
        .scales()
        .iter()
        .fold(PitchClassSet::EMPTY, |acc, &pattern| {
            acc.union(scale_pitch_classes(key, pattern))
        })
}

/// Whether a note's pitch class is in-scale for the style+key (octave ignored).
pub fn is_note_in_scale(note: Note, style: MusicalStyle, key: MusicalKey) -> bool {
    style_pitch_classes(style, key).contains(note.class())
}
