//! # seq_corpus
//!
//! Builds the MIDI fixture corpus used to check a MIDI → sequence-opcode
//! encoder at each of its opcode-selection boundaries.
//!
//! Each fixture is a format-0, single-track Standard MIDI File at 480 ticks
//! per quarter note, opening with a Set Tempo event. The exact fixtures live
//! in [`SCENARIOS`]; each entry names the encoder boundary it targets, and
//! building the corpus fails that entry if its values no longer hit it.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use seq_corpus::{Corpus, OutputDir};
//!
//! let corpus = Corpus::build();
//! let dir    = OutputDir::prepare("midi_test_files").unwrap();
//!
//! let report = corpus.generate(&dir, &[]).unwrap();
//! assert!(report.is_success());
//!
//! let check = corpus.verify(dir.path());
//! assert!(check.is_success());
//! ```

mod scenarios;
pub mod verify;
pub mod writer;

use std::path::PathBuf;

use seq_events::{validate, Boundary, Event, ScenarioError, Tempo, TimingProfile};
use thiserror::Error;
use tracing::{debug, warn};

pub use scenarios::SCENARIOS;
pub use verify::{compare, decode, verify_file, DecodeError, Decoded, Difference};
pub use writer::{to_bytes, write_scenario, OutputDir};

// ════════════════════════════════════════════════════════════════════════════
// Errors
// ════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("scenario '{name}' is inconsistent: {source}")]
    Scenario {
        name:   &'static str,
        #[source]
        source: ScenarioError,
    },

    #[error("cannot create output directory {}: {source}", path.display())]
    CreateDir {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {}: {source}", path.display())]
    Write {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot serialise scenario '{name}': {source}")]
    Encode {
        name:   &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot read {}: {source}", path.display())]
    Read {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is not a valid fixture: {source}", path.display())]
    Parse {
        path:   PathBuf,
        #[source]
        source: DecodeError,
    },

    #[error("{} does not match its scenario: {source}", path.display())]
    Mismatch {
        path:   PathBuf,
        #[source]
        source: Difference,
    },

    #[error("no scenario named '{0}'")]
    UnknownScenario(String),
}

// ════════════════════════════════════════════════════════════════════════════
// ScenarioDef — static table entry
// ════════════════════════════════════════════════════════════════════════════

/// One row of the fixture table, as authored.
///
/// `events` excludes the tempo declaration; [`ScenarioDef::build`] puts it in
/// front.
#[derive(Clone, Copy, Debug)]
pub struct ScenarioDef {
    pub name:      &'static str,
    pub file_name: &'static str,
    pub intent:    &'static str,
    pub tempo_bpm: u32,
    pub events:    &'static [Event],
    pub targets:   &'static [Boundary],
}

impl ScenarioDef {
    /// Validate the row and freeze it into a [`Scenario`].
    pub fn build(&self) -> Result<Scenario, ScenarioError> {
        let tempo = Tempo::from_bpm(self.tempo_bpm)?;
        validate(self.events)?;

        let profile = TimingProfile::analyze(self.events);
        if let Some(missed) = self.targets.iter().find(|b| !b.is_hit(self.events, &profile)) {
            return Err(ScenarioError::MissedBoundary { boundary: *missed });
        }

        Ok(Scenario {
            name:      self.name,
            file_name: self.file_name,
            intent:    self.intent,
            tempo,
            events:    self.events,
            targets:   self.targets,
            profile,
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Scenario — validated, immutable
// ════════════════════════════════════════════════════════════════════════════

/// A fixture that passed validation and hits every boundary it claims.
#[derive(Clone, Debug)]
pub struct Scenario {
    name:      &'static str,
    file_name: &'static str,
    intent:    &'static str,
    tempo:     Tempo,
    events:    &'static [Event],
    targets:   &'static [Boundary],
    profile:   TimingProfile,
}

impl Scenario {
    pub fn name(&self) -> &'static str { self.name }

    pub fn file_name(&self) -> &'static str { self.file_name }

    pub fn intent(&self) -> &'static str { self.intent }

    pub fn tempo(&self) -> Tempo { self.tempo }

    /// Channel events after the tempo declaration.
    pub fn events(&self) -> &'static [Event] { self.events }

    pub fn targets(&self) -> &'static [Boundary] { self.targets }

    pub fn profile(&self) -> &TimingProfile { &self.profile }
}

// ════════════════════════════════════════════════════════════════════════════
// Corpus
// ════════════════════════════════════════════════════════════════════════════

/// Outcome of writing or verifying a set of scenarios.
///
/// One scenario failing never stops the others; the caller decides what to
/// do with `failures` once the run is over.
#[derive(Debug, Default)]
pub struct Report {
    pub done:     Vec<PathBuf>,
    pub failures: Vec<(&'static str, CorpusError)>,
}

impl Report {
    pub fn is_success(&self) -> bool { self.failures.is_empty() }
}

/// Every buildable scenario, plus the rows that failed to build.
#[derive(Debug)]
pub struct Corpus {
    scenarios: Vec<Scenario>,
    rejected:  Vec<(&'static str, ScenarioError)>,
}

impl Corpus {
    /// Build the full fixture table.
    pub fn build() -> Self {
        Corpus::from_defs(SCENARIOS)
    }

    pub fn from_defs(defs: &[ScenarioDef]) -> Self {
        let mut scenarios = Vec::with_capacity(defs.len());
        let mut rejected = Vec::new();

        for def in defs {
            match def.build() {
                Ok(s) => {
                    debug!(scenario = s.name, gates = s.profile.gates.len(), "built");
                    scenarios.push(s);
                }
                Err(e) => {
                    warn!(scenario = def.name, error = %e, "rejected");
                    rejected.push((def.name, e));
                }
            }
        }
        Corpus { scenarios, rejected }
    }

    pub fn scenarios(&self) -> &[Scenario] { &self.scenarios }

    pub fn rejected(&self) -> &[(&'static str, ScenarioError)] { &self.rejected }

    pub fn get(&self, name: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|s| s.name == name)
    }

    /// Scenarios named in `only`, or all of them when `only` is empty.
    ///
    /// Names of rejected rows are accepted so their construction error is
    /// reported by the run rather than as an unknown name.
    pub fn select(&self, only: &[String]) -> Result<Vec<&Scenario>, CorpusError> {
        if only.is_empty() {
            return Ok(self.scenarios.iter().collect());
        }
        let mut picked = Vec::new();
        for name in only {
            match self.get(name) {
                Some(s) => picked.push(s),
                None if self.rejected.iter().any(|(n, _)| *n == name.as_str()) => {}
                None => return Err(CorpusError::UnknownScenario(name.clone())),
            }
        }
        Ok(picked)
    }

    /// Write the selected scenarios (all when `only` is empty) into `dir`.
    ///
    /// Rejected rows are reported as failures alongside any write errors.
    pub fn generate(&self, dir: &OutputDir, only: &[String]) -> Result<Report, CorpusError> {
        let mut report = self.rejected_report(only);
        for scenario in self.select(only)? {
            match write_scenario(dir, scenario) {
                Ok(path) => report.done.push(path),
                Err(e) => {
                    warn!(scenario = scenario.name, error = %e, "write failed");
                    report.failures.push((scenario.name, e));
                }
            }
        }
        Ok(report)
    }

    /// Re-read every scenario's file in `dir` and compare it with the table.
    pub fn verify(&self, dir: &std::path::Path) -> Report {
        let mut report = self.rejected_report(&[]);
        for scenario in &self.scenarios {
            let path = dir.join(scenario.file_name);
            match verify_file(scenario, &path) {
                Ok(()) => report.done.push(path),
                Err(e) => {
                    warn!(scenario = scenario.name, error = %e, "verification failed");
                    report.failures.push((scenario.name, e));
                }
            }
        }
        report
    }

    fn rejected_report(&self, only: &[String]) -> Report {
        let mut report = Report::default();
        for &(name, ref e) in &self.rejected {
            if only.is_empty() || only.iter().any(|o| o == name) {
                report.failures.push((name, CorpusError::Scenario { name, source: e.clone() }));
            }
        }
        report
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use seq_events::{EventKind, TimingClass};

    fn corpus() -> Corpus {
        let c = Corpus::build();
        assert!(c.rejected().is_empty(), "rejected: {:?}", c.rejected());
        c
    }

    fn scenario(name: &str) -> Scenario {
        corpus().get(name).cloned().unwrap()
    }

    // ── table shape ──────────────────────────────────────────────────────
    #[test]
    fn every_row_builds() {
        assert_eq!(corpus().scenarios().len(), SCENARIOS.len());
        assert_eq!(SCENARIOS.len(), 10);
    }

    #[test]
    fn names_and_files_are_unique() {
        let mut names: Vec<_> = SCENARIOS.iter().map(|d| d.name).collect();
        let mut files: Vec<_> = SCENARIOS.iter().map(|d| d.file_name).collect();
        names.sort_unstable();
        names.dedup();
        files.sort_unstable();
        files.dedup();
        assert_eq!(names.len(), SCENARIOS.len());
        assert_eq!(files.len(), SCENARIOS.len());
    }

    #[test]
    fn file_names_are_stable() {
        let files: Vec<_> = SCENARIOS.iter().map(|d| d.file_name).collect();
        assert_eq!(files, [
            "test_short_long.mid",
            "test_overlapping.mid",
            "test_large_delta.mid",
            "test_large_gate.mid",
            "test_mid_range_time.mid",
            "test_program_change.mid",
            "test_control_change.mid",
            "test_pitch_bend.mid",
            "test_multi_channel.mid",
            "test_initial_silence.mid",
        ]);
    }

    #[test]
    fn every_scenario_is_120_bpm() {
        for s in corpus().scenarios() {
            assert_eq!(s.tempo().micros_per_beat(), 500_000, "{}", s.name());
        }
    }

    // ── boundary values ──────────────────────────────────────────────────
    #[test]
    fn short_long_gates() {
        let gates: Vec<u32> = scenario("short_long").profile().gates.iter().map(|g| g.ticks).collect();
        assert_eq!(gates, [120, 960]);
    }

    #[test]
    fn overlapping_has_no_note_off_between_note_ons() {
        let s = scenario("overlapping");
        let ons: Vec<usize> = s.events().iter().enumerate()
            .filter(|(_, e)| matches!(e.kind, EventKind::NoteOn { key: 60, .. }))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(ons.len(), 2);
        let between = &s.events()[ons[0] + 1..ons[1]];
        assert!(between.iter().all(|e| !matches!(e.kind, EventKind::NoteOff { .. })));
        assert_eq!(s.events()[ons[1]].delta, 480);
        assert_eq!(s.events()[ons[1] + 1].delta, 0);
    }

    #[test]
    fn large_delta_is_4800() {
        let s = scenario("large_delta");
        assert_eq!(s.profile().max_delta(), 4800);
        assert!(s.profile().max_delta() > seq_events::timing::SINGLE_OPCODE_RANGE);
    }

    #[test]
    fn large_gate_is_4800() {
        let s = scenario("large_gate");
        assert_eq!(s.profile().max_gate(), 4800);
        assert_eq!(TimingClass::of(s.profile().max_gate()), TimingClass::Overflow);
    }

    #[test]
    fn mid_range_values_sit_in_flag_window() {
        let s = scenario("mid_range_time");
        assert_eq!(s.profile().gates[0].ticks, 300);
        assert_eq!(s.events()[2].delta, 400);
        for v in [300u32, 400] {
            assert!((256..512).contains(&v));
        }
    }

    #[test]
    fn pitch_bend_values() {
        let bends: Vec<i16> = scenario("pitch_bend").events().iter()
            .filter_map(|e| match e.kind { EventKind::PitchBend { value } => Some(value), _ => None })
            .collect();
        assert_eq!(bends, [4096, 0]);
    }

    #[test]
    fn program_change_events() {
        assert_eq!(scenario("program_change").events(), [
            Event::program(0),
            Event::note_on(60, 100),
            Event::note_off(60).after(480),
            Event::program(40),
            Event::note_on(67, 100).after(480),
            Event::note_off(67).after(480),
        ]);
    }

    #[test]
    fn control_change_events() {
        assert_eq!(scenario("control_change").events(), [
            Event::control(10, 0),
            Event::note_on(60, 100),
            Event::control(7, 80).after(240),
            Event::control(10, 127).after(240),
            Event::note_off(60).after(480),
        ]);
    }

    #[test]
    fn multi_channel_pairs_per_channel() {
        let s = scenario("multi_channel");
        for ch in [0u8, 1] {
            let sub: Vec<Event> = s.events().iter().copied().filter(|e| e.channel == ch).collect();
            validate(&sub).unwrap();
        }
        let gates: Vec<(u8, u32)> = s.profile().gates.iter().map(|g| (g.channel, g.ticks)).collect();
        assert_eq!(gates, [(0, 960), (1, 960)]);
    }

    #[test]
    fn initial_silence_first_delta() {
        let s = scenario("initial_silence");
        assert_eq!(s.events()[0].delta, 1920);
        assert_eq!(s.profile().leading_silence, Some(1920));
    }

    // ── construction errors ──────────────────────────────────────────────
    const DANGLING: ScenarioDef = ScenarioDef {
        name:      "dangling",
        file_name: "dangling.mid",
        intent:    "note off with no note on",
        tempo_bpm: 120,
        events:    &[Event::note_off(60)],
        targets:   &[],
    };

    const DRIFTED: ScenarioDef = ScenarioDef {
        name:      "drifted",
        file_name: "drifted.mid",
        intent:    "claims an overflow gate but only has 4000 ticks",
        tempo_bpm: 120,
        events:    &[Event::note_on(60, 100), Event::note_off(60).after(4000)],
        targets:   &[Boundary::Gate(TimingClass::Overflow)],
    };

    #[test]
    fn dangling_note_off_is_rejected() {
        let err = DANGLING.build().unwrap_err();
        assert!(matches!(err, ScenarioError::DanglingNoteOff { key: 60, .. }));
    }

    #[test]
    fn drifted_boundary_is_rejected() {
        let err = DRIFTED.build().unwrap_err();
        assert_eq!(err, ScenarioError::MissedBoundary {
            boundary: Boundary::Gate(TimingClass::Overflow),
        });
    }

    #[test]
    fn rejected_rows_do_not_block_the_rest() {
        let c = Corpus::from_defs(&[DANGLING, SCENARIOS[0], DRIFTED]);
        assert_eq!(c.scenarios().len(), 1);
        assert_eq!(c.rejected().len(), 2);
    }

    // ── select ───────────────────────────────────────────────────────────
    #[test]
    fn select_by_name() {
        let c = corpus();
        let picked = c.select(&["pitch_bend".to_string()]).unwrap();
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].file_name(), "test_pitch_bend.mid");
        assert_eq!(c.select(&[]).unwrap().len(), SCENARIOS.len());
    }

    #[test]
    fn select_unknown_name() {
        let err = corpus().select(&["nope".to_string()]).unwrap_err();
        assert!(matches!(err, CorpusError::UnknownScenario(n) if n == "nope"));
    }
}
