//! The fixture table.
//!
//! Every value here is load-bearing: downstream encoder tests look files up
//! by `file_name` and assume the exact deltas below. All timings are in ticks
//! at [`TICKS_PER_BEAT`](seq_events::TICKS_PER_BEAT) = 480.

use seq_events::{Boundary, Event, EventClass, TimingClass};

use crate::ScenarioDef;

const BEAT: u32 = seq_events::TICKS_PER_BEAT as u32;
const VEL: u8 = 100;

/// Every scenario in the corpus, in generation order.
pub const SCENARIOS: &[ScenarioDef] = &[
    // ── Timing ───────────────────────────────────────────────────────────
    ScenarioDef {
        name:      "short_long",
        file_name: "test_short_long.mid",
        intent:    "staccato gate (120) followed by a sustained gate (960)",
        tempo_bpm: 120,
        events: &[
            Event::note_on(60, VEL),
            Event::note_off(60).after(BEAT / 4),
            Event::note_on(62, VEL).after(BEAT),
            Event::note_off(62).after(BEAT * 2),
        ],
        targets: &[
            Boundary::Gate(TimingClass::Base),
            Boundary::Gate(TimingClass::Extended),
        ],
    },
    ScenarioDef {
        name:      "overlapping",
        file_name: "test_overlapping.mid",
        intent:    "re-striking a sounding key must close the first instance without a Note Off",
        tempo_bpm: 120,
        events: &[
            Event::note_on(60, VEL),
            Event::note_on(60, VEL).after(BEAT),
            Event::note_off(60),
        ],
        targets: &[Boundary::Retrigger],
    },
    ScenarioDef {
        name:      "large_delta",
        file_name: "test_large_delta.mid",
        intent:    "4800-tick rest between notes needs delta extension opcodes (0x8D-0x8F)",
        tempo_bpm: 120,
        events: &[
            Event::note_on(60, VEL),
            Event::note_off(60).after(BEAT),
            Event::note_on(62, VEL).after(BEAT * 10),
            Event::note_off(62).after(BEAT),
        ],
        targets: &[Boundary::Delta(TimingClass::Overflow)],
    },
    ScenarioDef {
        name:      "large_gate",
        file_name: "test_large_gate.mid",
        intent:    "4800-tick note needs gate extension opcodes (0x88-0x8B)",
        tempo_bpm: 120,
        events: &[
            Event::note_on(60, VEL),
            Event::note_off(60).after(BEAT * 10),
        ],
        targets: &[Boundary::Gate(TimingClass::Overflow)],
    },
    ScenarioDef {
        name:      "mid_range_time",
        file_name: "test_mid_range_time.mid",
        intent:    "gate 300 selects the 0x40 gate flag, delta 400 selects the 0x20 delta flag",
        tempo_bpm: 120,
        events: &[
            Event::note_on(60, VEL),
            Event::note_off(60).after(300),
            Event::note_on(62, VEL).after(400),
            Event::note_off(62).after(BEAT),
        ],
        targets: &[
            Boundary::Gate(TimingClass::Flagged),
            Boundary::Delta(TimingClass::Flagged),
        ],
    },
    // ── Channel events ───────────────────────────────────────────────────
    ScenarioDef {
        name:      "program_change",
        file_name: "test_program_change.mid",
        intent:    "program changes 0 and 40 stay in place around the notes they select",
        tempo_bpm: 120,
        events: &[
            Event::program(0),
            Event::note_on(60, VEL),
            Event::note_off(60).after(BEAT),
            Event::program(40),
            Event::note_on(67, VEL).after(BEAT),
            Event::note_off(67).after(BEAT),
        ],
        targets: &[Boundary::Carries(EventClass::ProgramChange, 2)],
    },
    ScenarioDef {
        name:      "control_change",
        file_name: "test_control_change.mid",
        intent:    "pan and volume changes interleaved with one sustained note keep note timing intact",
        tempo_bpm: 120,
        events: &[
            Event::control(10, 0),
            Event::note_on(60, VEL),
            Event::control(7, 80).after(BEAT / 2),
            Event::control(10, 127).after(BEAT / 2),
            Event::note_off(60).after(BEAT),
        ],
        targets: &[Boundary::Carries(EventClass::ControlChange, 3)],
    },
    ScenarioDef {
        name:      "pitch_bend",
        file_name: "test_pitch_bend.mid",
        intent:    "bend to +4096 and back to centre survives the 14-bit encoding",
        tempo_bpm: 120,
        events: &[
            Event::note_on(60, VEL),
            Event::bend(4096).after(BEAT / 2),
            Event::bend(0).after(BEAT / 2),
            Event::note_off(60).after(BEAT),
        ],
        targets: &[Boundary::Carries(EventClass::PitchBend, 2)],
    },
    // ── Structure ────────────────────────────────────────────────────────
    ScenarioDef {
        name:      "multi_channel",
        file_name: "test_multi_channel.mid",
        intent:    "channels 0 and 1 keep separate programs and active notes",
        tempo_bpm: 120,
        events: &[
            Event::program(0).on_channel(0),
            Event::note_on(60, VEL).on_channel(0),
            Event::program(33).on_channel(1),
            Event::note_on(48, 110).on_channel(1),
            Event::note_off(60).on_channel(0).after(BEAT * 2),
            Event::note_off(48).on_channel(1),
        ],
        targets: &[Boundary::Channels(2)],
    },
    ScenarioDef {
        name:      "initial_silence",
        file_name: "test_initial_silence.mid",
        intent:    "four beats of leading rest force the two-part tempo preamble",
        tempo_bpm: 120,
        events: &[
            Event::note_on(60, VEL).after(BEAT * 4),
            Event::note_off(60).after(BEAT),
        ],
        targets: &[Boundary::LeadingSilence(BEAT as u64 * 4)],
    },
];
