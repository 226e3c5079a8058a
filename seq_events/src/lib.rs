//! # seq_events
//!
//! The MIDI-shaped event model used to author sequence-encoder fixtures,
//! plus the consistency checks every fixture must pass before it is
//! written anywhere.
//!
//! * [`Event`] — one channel event with its delta time (ticks since the
//!   previous event in the same track).
//! * [`Tempo`] — the tempo declaration heading every fixture.
//! * [`validate`] — rejects event lists that would make a malformed fixture
//!   (dangling Note Off, unterminated note, out-of-range data).
//! * [`timing`] — gate/delta extraction and classification against the
//!   encoder's opcode thresholds.
//!
//! Events are `const`-constructible so fixture tables can live in statics:
//!
//! ```rust
//! use seq_events::{validate, Event};
//!
//! const PHRASE: &[Event] = &[
//!     Event::note_on(60, 100),
//!     Event::note_off(60).after(120),
//!     Event::note_on(62, 100).after(480),
//!     Event::note_off(62).after(960),
//! ];
//!
//! validate(PHRASE).unwrap();
//! ```

pub mod timing;

use std::fmt;

use thiserror::Error;

pub use timing::{Boundary, Gate, TimingClass, TimingProfile};

/// Ticks per quarter note for every fixture in the corpus.
pub const TICKS_PER_BEAT: u16 = 480;

/// Largest delta a MIDI variable-length quantity can carry (28 bits).
pub const MAX_DELTA: u32 = 0x0FFF_FFFF;

/// Largest value of the 24-bit Set Tempo field.
pub const MAX_MICROS_PER_BEAT: u32 = 0x00FF_FFFF;

/// Signed pitch-bend range; the wire value is `offset + BEND_CENTER`.
pub const BEND_MIN: i16 = -8192;
pub const BEND_MAX: i16 = 8191;
pub const BEND_CENTER: u16 = 8192;

const MAX_CHANNEL: u8 = 15;
const MAX_DATA: u8 = 127;

// ════════════════════════════════════════════════════════════════════════════
// Errors
// ════════════════════════════════════════════════════════════════════════════

/// An event list that cannot be turned into a trustworthy fixture.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScenarioError {
    #[error("event {index}: note off for channel {channel} key {key} that is not sounding")]
    DanglingNoteOff { index: usize, channel: u8, key: u8 },

    #[error("channel {channel} key {key} is still sounding at the end of the track")]
    UnterminatedNote { channel: u8, key: u8 },

    #[error("event {index}: channel {channel} is outside 0-15")]
    ChannelOutOfRange { index: usize, channel: u8 },

    #[error("event {index}: {field} {value} is outside 0-127")]
    DataOutOfRange { index: usize, field: &'static str, value: u8 },

    #[error("event {index}: pitch bend {value} is outside -8192..=8191")]
    BendOutOfRange { index: usize, value: i16 },

    #[error("event {index}: delta {delta} does not fit a 28-bit variable-length quantity")]
    DeltaOutOfRange { index: usize, delta: u32 },

    #[error("tempo of {bpm} BPM cannot be expressed as a 24-bit microseconds-per-beat value")]
    InvalidTempo { bpm: u32 },

    #[error("events no longer exercise {boundary}")]
    MissedBoundary { boundary: Boundary },
}

// ════════════════════════════════════════════════════════════════════════════
// Tempo
// ════════════════════════════════════════════════════════════════════════════

/// The Set Tempo declaration that opens every fixture, at delta 0.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Tempo {
    bpm:             u32,
    micros_per_beat: u32,
}

impl Tempo {
    /// Convert beats per minute to microseconds per beat, rounded to the
    /// nearest microsecond.
    ///
    /// ```rust
    /// use seq_events::Tempo;
    /// assert_eq!(Tempo::from_bpm(120).unwrap().micros_per_beat(), 500_000);
    /// ```
    pub fn from_bpm(bpm: u32) -> Result<Self, ScenarioError> {
        if bpm == 0 {
            return Err(ScenarioError::InvalidTempo { bpm });
        }
        let micros = (60_000_000 + bpm / 2) / bpm;
        if micros > MAX_MICROS_PER_BEAT {
            return Err(ScenarioError::InvalidTempo { bpm });
        }
        Ok(Tempo { bpm, micros_per_beat: micros })
    }

    pub fn bpm(self) -> u32 { self.bpm }

    pub fn micros_per_beat(self) -> u32 { self.micros_per_beat }
}

// ════════════════════════════════════════════════════════════════════════════
// Event
// ════════════════════════════════════════════════════════════════════════════

/// Payload of a channel event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventKind {
    NoteOn        { key: u8, velocity: u8 },
    NoteOff       { key: u8, velocity: u8 },
    ProgramChange { program: u8 },
    ControlChange { controller: u8, value: u8 },
    /// Signed offset from the centre position.
    PitchBend     { value: i16 },
}

impl EventKind {
    pub fn class(&self) -> EventClass {
        match self {
            EventKind::NoteOn { .. }        => EventClass::NoteOn,
            EventKind::NoteOff { .. }       => EventClass::NoteOff,
            EventKind::ProgramChange { .. } => EventClass::ProgramChange,
            EventKind::ControlChange { .. } => EventClass::ControlChange,
            EventKind::PitchBend { .. }     => EventClass::PitchBend,
        }
    }

    pub fn name(&self) -> &'static str { self.class().name() }
}

/// [`EventKind`] without its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventClass {
    NoteOn,
    NoteOff,
    ProgramChange,
    ControlChange,
    PitchBend,
}

impl EventClass {
    pub fn name(self) -> &'static str {
        match self {
            EventClass::NoteOn        => "note on",
            EventClass::NoteOff       => "note off",
            EventClass::ProgramChange => "program change",
            EventClass::ControlChange => "control change",
            EventClass::PitchBend     => "pitch bend",
        }
    }
}

impl fmt::Display for EventClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A channel event preceded by `delta` ticks of silence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Event {
    pub delta:   u32,
    pub channel: u8,
    pub kind:    EventKind,
}

/// What an event does to the set of sounding keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoteAction {
    Press(u8),
    Release(u8),
}

impl Event {
    pub const fn note_on(key: u8, velocity: u8) -> Self {
        Event::new(EventKind::NoteOn { key, velocity })
    }

    /// Note Off with release velocity 0.
    pub const fn note_off(key: u8) -> Self {
        Event::new(EventKind::NoteOff { key, velocity: 0 })
    }

    pub const fn program(program: u8) -> Self {
        Event::new(EventKind::ProgramChange { program })
    }

    pub const fn control(controller: u8, value: u8) -> Self {
        Event::new(EventKind::ControlChange { controller, value })
    }

    pub const fn bend(value: i16) -> Self {
        Event::new(EventKind::PitchBend { value })
    }

    const fn new(kind: EventKind) -> Self {
        Event { delta: 0, channel: 0, kind }
    }

    /// Same event, `delta` ticks after the previous one.
    pub const fn after(mut self, delta: u32) -> Self {
        self.delta = delta;
        self
    }

    /// Same event, on `channel` instead of 0.
    pub const fn on_channel(mut self, channel: u8) -> Self {
        self.channel = channel;
        self
    }

    /// Note On with velocity 0 releases the key, as every MIDI reader
    /// (and the target encoder) treats it.
    pub fn note_action(&self) -> Option<NoteAction> {
        match self.kind {
            EventKind::NoteOn { key, velocity } if velocity > 0 => Some(NoteAction::Press(key)),
            EventKind::NoteOn { key, .. } | EventKind::NoteOff { key, .. } => {
                Some(NoteAction::Release(key))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "+{:<5} ch{:<2} ", self.delta, self.channel)?;
        match self.kind {
            EventKind::NoteOn { key, velocity }  => write!(f, "note on  {key} vel {velocity}"),
            EventKind::NoteOff { key, velocity } => write!(f, "note off {key} vel {velocity}"),
            EventKind::ProgramChange { program } => write!(f, "program  {program}"),
            EventKind::ControlChange { controller, value } => {
                write!(f, "cc       {controller} = {value}")
            }
            EventKind::PitchBend { value } => write!(f, "bend     {value:+}"),
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Validation
// ════════════════════════════════════════════════════════════════════════════

/// Check that `events` describe a well-formed fixture track.
///
/// A Note On for a key that is already sounding is an implicit retrigger and
/// is accepted; a Note Off for a silent key is not. Every key must be silent
/// again at the end of the list.
pub fn validate(events: &[Event]) -> Result<(), ScenarioError> {
    let mut sounding = [[false; 128]; 16];

    for (index, ev) in events.iter().enumerate() {
        check_ranges(index, ev)?;

        let held = &mut sounding[ev.channel as usize];
        match ev.note_action() {
            Some(NoteAction::Press(key)) => held[key as usize] = true,
            Some(NoteAction::Release(key)) => {
                if !held[key as usize] {
                    return Err(ScenarioError::DanglingNoteOff { index, channel: ev.channel, key });
                }
                held[key as usize] = false;
            }
            None => {}
        }
    }

    for (channel, keys) in sounding.iter().enumerate() {
        if let Some(key) = keys.iter().position(|&on| on) {
            return Err(ScenarioError::UnterminatedNote {
                channel: channel as u8,
                key:     key as u8,
            });
        }
    }
    Ok(())
}

fn check_ranges(index: usize, ev: &Event) -> Result<(), ScenarioError> {
    if ev.delta > MAX_DELTA {
        return Err(ScenarioError::DeltaOutOfRange { index, delta: ev.delta });
    }
    if ev.channel > MAX_CHANNEL {
        return Err(ScenarioError::ChannelOutOfRange { index, channel: ev.channel });
    }

    match ev.kind {
        EventKind::NoteOn { key, velocity } | EventKind::NoteOff { key, velocity } => {
            check_data(index, "key", key)?;
            check_data(index, "velocity", velocity)
        }
        EventKind::ProgramChange { program } => check_data(index, "program", program),
        EventKind::ControlChange { controller, value } => {
            check_data(index, "controller", controller)?;
            check_data(index, "value", value)
        }
        EventKind::PitchBend { value } if !(BEND_MIN..=BEND_MAX).contains(&value) => {
            Err(ScenarioError::BendOutOfRange { index, value })
        }
        EventKind::PitchBend { .. } => Ok(()),
    }
}

fn check_data(index: usize, field: &'static str, value: u8) -> Result<(), ScenarioError> {
    if value > MAX_DATA {
        return Err(ScenarioError::DataOutOfRange { index, field, value });
    }
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
