//! Gate/delta extraction and the encoder's threshold contract.
//!
//! The target encoder picks an opcode path from the size of each delta and
//! gate value. The thresholds below are the documented contract the fixtures
//! are built against; nothing here emits opcodes.
//!
//! | Class      | Ticks          | Encoder path                               |
//! |------------|----------------|--------------------------------------------|
//! | `Base`     | `< 256`        | single byte in the event                   |
//! | `Flagged`  | `256..512`     | gate flag `0x40` / delta flag `0x20`       |
//! | `Extended` | `512..=4096`   | extension opcodes (gate `0x88-0x8B`, delta `0x8D-0x8F`) |
//! | `Overflow` | `> 4096`       | more than one extension opcode is needed   |

use std::fmt;

use crate::{Event, EventClass, NoteAction};

pub const FLAG_THRESHOLD: u32 = 256;
pub const EXTEND_THRESHOLD: u32 = 512;
pub const SINGLE_OPCODE_RANGE: u32 = 4096;

// ════════════════════════════════════════════════════════════════════════════
// TimingClass
// ════════════════════════════════════════════════════════════════════════════

/// Which encoder path a gate or delta value of a given size selects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimingClass {
    Base,
    Flagged,
    Extended,
    Overflow,
}

impl TimingClass {
    /// ```rust
    /// use seq_events::TimingClass;
    /// assert_eq!(TimingClass::of(255),  TimingClass::Base);
    /// assert_eq!(TimingClass::of(256),  TimingClass::Flagged);
    /// assert_eq!(TimingClass::of(4096), TimingClass::Extended);
    /// assert_eq!(TimingClass::of(4097), TimingClass::Overflow);
    /// ```
    pub fn of(ticks: u32) -> Self {
        if ticks < FLAG_THRESHOLD {
            TimingClass::Base
        } else if ticks < EXTEND_THRESHOLD {
            TimingClass::Flagged
        } else if ticks <= SINGLE_OPCODE_RANGE {
            TimingClass::Extended
        } else {
            TimingClass::Overflow
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            TimingClass::Base     => "base",
            TimingClass::Flagged  => "flagged",
            TimingClass::Extended => "extended",
            TimingClass::Overflow => "overflow",
        }
    }
}

impl fmt::Display for TimingClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// TimingProfile
// ════════════════════════════════════════════════════════════════════════════

/// How long one note instance sounded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Gate {
    pub channel:     u8,
    pub key:         u8,
    /// Absolute tick of the Note On.
    pub start:       u64,
    pub ticks:       u32,
    /// Closed by a new Note On on the same key rather than a Note Off.
    pub retriggered: bool,
}

/// Timing facts about an event list, measured the way the encoder does.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TimingProfile {
    /// One entry per closed note instance, in Note On order.
    pub gates:           Vec<Gate>,
    /// Authored delta of every event, in order.
    pub deltas:          Vec<u32>,
    /// Absolute tick of the first channel event.
    pub leading_silence: Option<u64>,
    /// Absolute tick of the last event.
    pub length:          u64,
    /// Distinct channels used, ascending.
    pub channels:        Vec<u8>,
}

impl TimingProfile {
    /// Walk `events`, pairing each Note On with the Note Off (or retriggering
    /// Note On) that closes it on the same channel and key.
    ///
    /// Notes still open at the end are left out; [`crate::validate`] rejects
    /// such lists anyway.
    pub fn analyze(events: &[Event]) -> Self {
        let mut open: [[Option<usize>; 128]; 16] = [[None; 128]; 16];
        let mut slots: Vec<Option<Gate>> = Vec::new();
        let mut profile = TimingProfile::default();
        let mut now: u64 = 0;

        for ev in events {
            now += u64::from(ev.delta);
            profile.deltas.push(ev.delta);
            profile.leading_silence.get_or_insert(now);
            if !profile.channels.contains(&ev.channel) {
                profile.channels.push(ev.channel);
            }

            let Some(action) = ev.note_action() else { continue };
            let held = &mut open[usize::from(ev.channel & 0x0F)];
            match action {
                NoteAction::Press(key) => {
                    let key = usize::from(key & 0x7F);
                    if let Some(prev) = held[key].take() {
                        close(&mut slots[prev], now, true);
                    }
                    held[key] = Some(slots.len());
                    slots.push(Some(Gate {
                        channel:     ev.channel,
                        key:         key as u8,
                        start:       now,
                        ticks:       0,
                        retriggered: false,
                    }));
                }
                NoteAction::Release(key) => {
                    if let Some(prev) = held[usize::from(key & 0x7F)].take() {
                        close(&mut slots[prev], now, false);
                    }
                }
            }
        }

        // Open instances never got their length written; drop them.
        for held in open.iter() {
            for idx in held.iter().flatten() {
                slots[*idx] = None;
            }
        }

        profile.length = now;
        profile.channels.sort_unstable();
        profile.gates = slots.into_iter().flatten().collect();
        profile
    }

    pub fn gate_classes(&self) -> impl Iterator<Item = TimingClass> + '_ {
        self.gates.iter().map(|g| TimingClass::of(g.ticks))
    }

    pub fn delta_classes(&self) -> impl Iterator<Item = TimingClass> + '_ {
        self.deltas.iter().map(|&d| TimingClass::of(d))
    }

    pub fn max_gate(&self) -> u32 {
        self.gates.iter().map(|g| g.ticks).max().unwrap_or(0)
    }

    pub fn max_delta(&self) -> u32 {
        self.deltas.iter().copied().max().unwrap_or(0)
    }

    pub fn has_retrigger(&self) -> bool {
        self.gates.iter().any(|g| g.retriggered)
    }
}

fn close(slot: &mut Option<Gate>, now: u64, retriggered: bool) {
    if let Some(gate) = slot {
        gate.ticks = u32::try_from(now - gate.start).unwrap_or(u32::MAX);
        gate.retriggered = retriggered;
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Boundary — what a fixture is meant to exercise
// ════════════════════════════════════════════════════════════════════════════

/// An encoder boundary a fixture claims to hit. Checked against the
/// fixture's [`TimingProfile`] so a value edit that drifts off the boundary
/// is caught at build time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Boundary {
    /// Some gate falls in this class.
    Gate(TimingClass),
    /// Some authored delta falls in this class.
    Delta(TimingClass),
    /// A key is re-struck while still sounding.
    Retrigger,
    /// The first channel event sits exactly this many ticks into the track.
    LeadingSilence(u64),
    /// At least this many distinct channels carry events.
    Channels(usize),
    /// At least this many events of this class appear.
    Carries(EventClass, usize),
}

impl Boundary {
    pub fn is_hit(&self, events: &[Event], profile: &TimingProfile) -> bool {
        match *self {
            Boundary::Gate(class)       => profile.gate_classes().any(|c| c == class),
            Boundary::Delta(class)      => profile.delta_classes().any(|c| c == class),
            Boundary::Retrigger         => profile.has_retrigger(),
            Boundary::LeadingSilence(t) => profile.leading_silence == Some(t),
            Boundary::Channels(n)       => profile.channels.len() >= n,
            Boundary::Carries(kind, n)  => {
                events.iter().filter(|e| e.kind.class() == kind).count() >= n
            }
        }
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Boundary::Gate(c)           => write!(f, "{c} gate"),
            Boundary::Delta(c)          => write!(f, "{c} delta"),
            Boundary::Retrigger         => f.write_str("implicit retrigger"),
            Boundary::LeadingSilence(t) => write!(f, "leading silence of {t} ticks"),
            Boundary::Channels(n)       => write!(f, "{n} channels"),
            Boundary::Carries(kind, n)  => write!(f, "{n}x {kind}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // ── TimingClass edges ────────────────────────────────────────────────
    #[test]
    fn class_edges() {
        assert_eq!(TimingClass::of(0), TimingClass::Base);
        assert_eq!(TimingClass::of(255), TimingClass::Base);
        assert_eq!(TimingClass::of(256), TimingClass::Flagged);
        assert_eq!(TimingClass::of(511), TimingClass::Flagged);
        assert_eq!(TimingClass::of(512), TimingClass::Extended);
        assert_eq!(TimingClass::of(4096), TimingClass::Extended);
        assert_eq!(TimingClass::of(4097), TimingClass::Overflow);
    }

    // ── analyze ──────────────────────────────────────────────────────────
    #[test]
    fn gates_follow_note_on_order() {
        let events = [
            Event::note_on(60, 100),
            Event::note_on(64, 100).after(10),
            Event::note_off(64).after(20),
            Event::note_off(60).after(30),
        ];
        let p = TimingProfile::analyze(&events);
        assert_eq!(p.gates.len(), 2);
        assert_eq!((p.gates[0].key, p.gates[0].ticks), (60, 60));
        assert_eq!((p.gates[1].key, p.gates[1].ticks), (64, 20));
        assert_eq!(p.length, 60);
        assert_eq!(p.deltas, vec![0, 10, 20, 30]);
    }

    #[test]
    fn retrigger_closes_previous_instance() {
        let events = [
            Event::note_on(60, 100),
            Event::note_on(60, 100).after(480),
            Event::note_off(60).after(240),
        ];
        let p = TimingProfile::analyze(&events);
        assert_eq!(p.gates[0].ticks, 480);
        assert!(p.gates[0].retriggered);
        assert_eq!(p.gates[1].ticks, 240);
        assert!(!p.gates[1].retriggered);
        assert!(p.has_retrigger());
    }

    #[test]
    fn channels_are_tracked_independently() {
        let events = [
            Event::note_on(60, 100),
            Event::note_on(60, 100).on_channel(1),
            Event::note_off(60).after(100),
            Event::note_off(60).on_channel(1).after(50),
        ];
        let p = TimingProfile::analyze(&events);
        assert!(!p.has_retrigger());
        assert_eq!(p.gates[0].ticks, 100);
        assert_eq!(p.gates[1].ticks, 150);
        assert_eq!(p.channels, vec![0, 1]);
    }

    #[test]
    fn leading_silence_is_first_event_tick() {
        let p = TimingProfile::analyze(&[
            Event::note_on(60, 100).after(1920),
            Event::note_off(60).after(480),
        ]);
        assert_eq!(p.leading_silence, Some(1920));
        assert_eq!(TimingProfile::analyze(&[]).leading_silence, None);
    }

    #[test]
    fn open_notes_are_dropped() {
        let p = TimingProfile::analyze(&[Event::note_on(60, 100)]);
        assert!(p.gates.is_empty());
    }

    // ── Boundary ─────────────────────────────────────────────────────────
    #[test]
    fn boundary_checks() {
        let events = [
            Event::control(10, 0),
            Event::note_on(60, 100),
            Event::note_off(60).after(300),
        ];
        let p = TimingProfile::analyze(&events);
        assert!(Boundary::Gate(TimingClass::Flagged).is_hit(&events, &p));
        assert!(!Boundary::Gate(TimingClass::Base).is_hit(&events, &p));
        assert!(Boundary::Delta(TimingClass::Flagged).is_hit(&events, &p));
        assert!(Boundary::Carries(EventClass::ControlChange, 1).is_hit(&events, &p));
        assert!(!Boundary::Carries(EventClass::ControlChange, 2).is_hit(&events, &p));
        assert!(!Boundary::Retrigger.is_hit(&events, &p));
    }

    #[test]
    fn carries_counts_by_class_not_payload() {
        let events = [
            Event::program(0),
            Event::control(7, 80),
            Event::program(40),
        ];
        let p = TimingProfile::analyze(&events);
        assert!(Boundary::Carries(EventClass::ProgramChange, 2).is_hit(&events, &p));
        assert!(!Boundary::Carries(EventClass::ProgramChange, 3).is_hit(&events, &p));
        assert!(!Boundary::Carries(EventClass::PitchBend, 1).is_hit(&events, &p));
    }

    #[test]
    fn boundary_display() {
        assert_eq!(Boundary::Gate(TimingClass::Overflow).to_string(), "overflow gate");
        assert_eq!(Boundary::Carries(EventClass::PitchBend, 2).to_string(), "2x pitch bend");
    }
}
