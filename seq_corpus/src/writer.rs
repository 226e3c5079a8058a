//! Hands scenarios to the container writer (`midly`) and puts the bytes on
//! disk.
//!
//! The mapping is one-to-one: Set Tempo at delta 0, then every authored event
//! with its authored delta, then End of Track. Nothing is reordered, merged
//! or re-quantised.

use std::fs;
use std::path::{Path, PathBuf};

use midly::num::{u14, u15, u24, u28, u4, u7};
use midly::{
    Format, Header, MetaMessage, MidiMessage, PitchBend, Smf, Timing, TrackEvent, TrackEventKind,
};
use seq_events::{Event, EventKind, BEND_CENTER, TICKS_PER_BEAT};
use tracing::{debug, info};

use crate::{CorpusError, Scenario};

// ════════════════════════════════════════════════════════════════════════════
// OutputDir — created once before any write
// ════════════════════════════════════════════════════════════════════════════

/// The directory fixtures are written into.
///
/// Holding one means the directory exists; `prepare` is safe to call
/// repeatedly and concurrently since already-existing is not an error.
#[derive(Clone, Debug)]
pub struct OutputDir {
    path: PathBuf,
}

impl OutputDir {
    pub fn prepare(path: impl Into<PathBuf>) -> Result<Self, CorpusError> {
        let path = path.into();
        fs::create_dir_all(&path)
            .map_err(|source| CorpusError::CreateDir { path: path.clone(), source })?;
        debug!(dir = %path.display(), "output directory ready");
        Ok(OutputDir { path })
    }

    pub fn path(&self) -> &Path { &self.path }

    pub fn file_for(&self, scenario: &Scenario) -> PathBuf {
        self.path.join(scenario.file_name())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Scenario → midly
// ════════════════════════════════════════════════════════════════════════════

impl Scenario {
    /// The exact track handed to the container writer.
    pub fn track_events(&self) -> Vec<TrackEvent<'static>> {
        let mut track = Vec::with_capacity(self.events().len() + 2);
        track.push(TrackEvent {
            delta: u28::new(0),
            kind:  TrackEventKind::Meta(MetaMessage::Tempo(u24::new(self.tempo().micros_per_beat()))),
        });
        track.extend(self.events().iter().map(track_event));
        track.push(TrackEvent {
            delta: u28::new(0),
            kind:  TrackEventKind::Meta(MetaMessage::EndOfTrack),
        });
        track
    }

    /// Format 0, one track, metrical timing at [`TICKS_PER_BEAT`].
    pub fn to_smf(&self) -> Smf<'static> {
        let mut smf = Smf::new(Header::new(
            Format::SingleTrack,
            Timing::Metrical(u15::new(TICKS_PER_BEAT)),
        ));
        smf.tracks.push(self.track_events());
        smf
    }
}

/// Values were range-checked when the scenario was built, so the
/// constructors below never have to mask anything.
fn track_event(ev: &Event) -> TrackEvent<'static> {
    let message = match ev.kind {
        EventKind::NoteOn { key, velocity } => {
            MidiMessage::NoteOn { key: u7::new(key), vel: u7::new(velocity) }
        }
        EventKind::NoteOff { key, velocity } => {
            MidiMessage::NoteOff { key: u7::new(key), vel: u7::new(velocity) }
        }
        EventKind::ProgramChange { program } => {
            MidiMessage::ProgramChange { program: u7::new(program) }
        }
        EventKind::ControlChange { controller, value } => {
            MidiMessage::Controller { controller: u7::new(controller), value: u7::new(value) }
        }
        EventKind::PitchBend { value } => {
            let raw = (i32::from(value) + i32::from(BEND_CENTER)) as u16;
            MidiMessage::PitchBend { bend: PitchBend(u14::new(raw)) }
        }
    };
    TrackEvent {
        delta: u28::new(ev.delta),
        kind:  TrackEventKind::Midi { channel: u4::new(ev.channel), message },
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Serialisation
// ════════════════════════════════════════════════════════════════════════════

/// Serialise `scenario` to Standard MIDI File bytes.
///
/// Output depends only on the scenario, so repeated runs are byte-identical.
pub fn to_bytes(scenario: &Scenario) -> Result<Vec<u8>, CorpusError> {
    let mut bytes = Vec::new();
    scenario
        .to_smf()
        .write_std(&mut bytes)
        .map_err(|source| CorpusError::Encode { name: scenario.name(), source })?;
    Ok(bytes)
}

/// Write one fixture into `dir`, returning its path.
pub fn write_scenario(dir: &OutputDir, scenario: &Scenario) -> Result<PathBuf, CorpusError> {
    let bytes = to_bytes(scenario)?;
    let path = dir.file_for(scenario);
    fs::write(&path, &bytes).map_err(|source| CorpusError::Write { path: path.clone(), source })?;
    info!(scenario = scenario.name(), file = %path.display(), bytes = bytes.len(), "generated");
    Ok(path)
}
