//! NoteTracker - debounced note-event extraction from pitch estimates
//!
//! Turns the continuous per-frame stream of pitch estimates into discrete
//! [`NoteEvent`]s. The debounce state (last emitted note, last emission time)
//! is explicit struct state, not incidental variables, so the debounce
//! invariant is directly testable: for an unchanging pitch, emitted events
//! are always more than `debounce_ms` apart.
//!
//! The tracker never touches hardware or clocks; timestamps are supplied by
//! the caller, which keeps the whole state machine deterministic under
//! synthetic input.

use serde::{Deserialize, Serialize};

use super::pitch::PitchEstimate;
use crate::config::NoteTrackingConfig;
use crate::theory::{frequency_to_note, Note};

/// One detected, stabilized note onset.
///
/// Created exactly once by the tracker when a stable new pitch is confirmed;
/// immutable thereafter. The accumulated sequence is append-only for the
/// lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteEvent {
    /// Nearest equal-tempered note ("A3")
    pub note: Note,
    /// Estimated fundamental in Hz, always within the playable range
    pub frequency: f32,
    /// Milliseconds since the session's listening start
    pub timestamp_ms: u64,
    /// Periodicity strength in [0,1]
    pub confidence: f32,
    /// Signed deviation from the nearest semitone, in [-50, 50] cents
    pub cents: i32,
    /// Normalized input loudness in [0,1] at detection time
    pub velocity: f32,
}

/// What one frame of observation produced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameUpdate {
    /// Scaled input level in [0,1], reported every frame for UI feedback
    pub level: f32,
    /// Newly emitted event, if the debounce rule admitted one
    pub event: Option<NoteEvent>,
    /// True when the current-note indicator cleared this frame
    pub cleared: bool,
}

/// Debounced note-event stream builder.
pub struct NoteTracker {
    config: NoteTrackingConfig,
    events: Vec<NoteEvent>,
    current: Option<NoteEvent>,
    last_note: Option<Note>,
    last_emitted_at_ms: Option<u64>,
}

impl NoteTracker {
    pub fn new(config: NoteTrackingConfig) -> Self {
        Self {
            config,
            events: Vec::new(),
            current: None,
            last_note: None,
            last_emitted_at_ms: None,
        }
    }

    /// Feed one frame: window RMS, the detector's estimate (if any) and the
    /// frame timestamp relative to session start. Timestamps must be
    /// non-decreasing.
    pub fn observe(
        &mut self,
        window_rms: f32,
        estimate: Option<PitchEstimate>,
        timestamp_ms: u64,
    ) -> FrameUpdate {
        let level = (window_rms * self.config.level_scale).min(1.0);

        let confident = estimate.filter(|e| e.confidence > self.config.emission_confidence);

        if let Some(est) = confident {
            let pitched = frequency_to_note(est.frequency as f64);

            let changed = self.last_note != Some(pitched.note);
            let debounce_elapsed = self
                .last_emitted_at_ms
                .map_or(true, |t| timestamp_ms.saturating_sub(t) > self.config.debounce_ms);

            if changed || debounce_elapsed {
                let event = NoteEvent {
                    note: pitched.note,
                    frequency: est.frequency,
                    timestamp_ms,
                    confidence: est.confidence,
                    cents: pitched.cents,
                    velocity: level,
                };
                self.events.push(event);
                self.current = Some(event);
                self.last_note = Some(pitched.note);
                self.last_emitted_at_ms = Some(timestamp_ms);

                return FrameUpdate {
                    level,
                    event: Some(event),
                    cleared: false,
                };
            }
        } else {
            // No confident pitch: after the clear window the current-note
            // indicator drops, but accumulated history stays untouched.
            let stale = self
                .last_emitted_at_ms
                .is_some_and(|t| timestamp_ms.saturating_sub(t) > self.config.clear_after_ms);
            if stale && self.current.is_some() {
                self.current = None;
                return FrameUpdate {
                    level,
                    event: None,
                    cleared: true,
                };
            }
        }

        FrameUpdate {
            level,
            event: None,
            cleared: false,
        }
    }

    /// Accumulated events, in emission order.
    pub fn events(&self) -> &[NoteEvent] {
        &self.events
    }

    /// The note currently sounding, if any.
    pub fn current_note(&self) -> Option<NoteEvent> {
        self.current
    }

    /// Reset the sequence and all debounce state. Used between sessions,
    /// never during one.
    pub fn clear(&mut self) {
        self.events.clear();
        self.current = None;
        self.last_note = None;
        self.last_emitted_at_ms = None;
    }

    /// Consume the tracker, freezing the event sequence.
    pub fn into_events(self) -> Vec<NoteEvent> {
        self.events
    }
}
