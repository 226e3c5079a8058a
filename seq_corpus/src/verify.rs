//! Read a fixture back and check it against the table.

use std::fs;
use std::path::Path;

use midly::{Format, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use seq_events::{Event, EventKind, BEND_CENTER, TICKS_PER_BEAT};
use thiserror::Error;
use tracing::info;

use crate::{CorpusError, Scenario};

/// Bytes that are not a well-framed fixture.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("{0}")]
    Container(#[source] midly::Error),

    #[error("expected format 0, found {0:?}")]
    Format(Format),

    #[error("expected {TICKS_PER_BEAT} ticks per beat, found {0:?}")]
    Resolution(Timing),

    #[error("expected one track, found {0}")]
    TrackCount(usize),

    #[error("track does not open with a Set Tempo at delta 0")]
    MissingTempo,

    #[error("track does not close with End of Track")]
    MissingEndOfTrack,

    #[error("event {index}: unexpected {found}")]
    UnexpectedEvent { index: usize, found: String },
}

/// The first way a decoded fixture differs from its scenario.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Difference {
    #[error("tempo {found} µs/beat, expected {expected}")]
    Tempo { found: u32, expected: u32 },

    #[error("event {index}: found [{found}], expected [{expected}]")]
    Event { index: usize, found: Event, expected: Event },

    #[error("{found} channel events, expected {expected}")]
    EventCount { found: usize, expected: usize },
}

/// A fixture track translated back into the authoring model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Decoded {
    pub micros_per_beat: u32,
    pub events:          Vec<Event>,
}

/// Parse fixture bytes: format 0, one track at [`TICKS_PER_BEAT`], Set Tempo
/// at delta 0, channel events, End of Track.
pub fn decode(bytes: &[u8]) -> Result<Decoded, DecodeError> {
    let smf = Smf::parse(bytes).map_err(DecodeError::Container)?;

    if smf.header.format != Format::SingleTrack {
        return Err(DecodeError::Format(smf.header.format));
    }
    match smf.header.timing {
        Timing::Metrical(tpb) if tpb.as_int() == TICKS_PER_BEAT => {}
        other => return Err(DecodeError::Resolution(other)),
    }
    let [track] = smf.tracks.as_slice() else {
        return Err(DecodeError::TrackCount(smf.tracks.len()));
    };

    let micros_per_beat = match track.first() {
        Some(TrackEvent { delta, kind: TrackEventKind::Meta(MetaMessage::Tempo(t)) })
            if delta.as_int() == 0 => t.as_int(),
        _ => return Err(DecodeError::MissingTempo),
    };
    let body = match &track[1..] {
        [body @ .., last] if last.kind == TrackEventKind::Meta(MetaMessage::EndOfTrack) => body,
        _ => return Err(DecodeError::MissingEndOfTrack),
    };

    let events = body
        .iter()
        .enumerate()
        .map(|(i, ev)| {
            event(ev).ok_or_else(|| DecodeError::UnexpectedEvent {
                index: i + 1,
                found: format!("{:?}", ev.kind),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Decoded { micros_per_beat, events })
}

fn event(ev: &TrackEvent<'_>) -> Option<Event> {
    let TrackEventKind::Midi { channel, message } = ev.kind else { return None };
    let kind = match message {
        MidiMessage::NoteOn { key, vel } => {
            EventKind::NoteOn { key: key.as_int(), velocity: vel.as_int() }
        }
        MidiMessage::NoteOff { key, vel } => {
            EventKind::NoteOff { key: key.as_int(), velocity: vel.as_int() }
        }
        MidiMessage::ProgramChange { program } => {
            EventKind::ProgramChange { program: program.as_int() }
        }
        MidiMessage::Controller { controller, value } => {
            EventKind::ControlChange { controller: controller.as_int(), value: value.as_int() }
        }
        MidiMessage::PitchBend { bend } => {
            let value = i32::from(bend.0.as_int()) - i32::from(BEND_CENTER);
            EventKind::PitchBend { value: value as i16 }
        }
        _ => return None,
    };
    Some(Event { delta: ev.delta.as_int(), channel: channel.as_int(), kind })
}

/// Check that a decoded fixture holds exactly `scenario`: same tempo, same
/// events in the same order, same deltas.
pub fn compare(scenario: &Scenario, decoded: &Decoded) -> Result<(), Difference> {
    let expected = scenario.tempo().micros_per_beat();
    if decoded.micros_per_beat != expected {
        return Err(Difference::Tempo { found: decoded.micros_per_beat, expected });
    }

    let want = scenario.events();
    for (i, (got, exp)) in decoded.events.iter().zip(want).enumerate() {
        if got != exp {
            return Err(Difference::Event { index: i + 1, found: *got, expected: *exp });
        }
    }
    if decoded.events.len() != want.len() {
        return Err(Difference::EventCount { found: decoded.events.len(), expected: want.len() });
    }
    Ok(())
}

/// Read `path`, decode it and [`compare`] it with `scenario`.
pub fn verify_file(scenario: &Scenario, path: &Path) -> Result<(), CorpusError> {
    let bytes = fs::read(path).map_err(|source| CorpusError::Read { path: path.to_path_buf(), source })?;
    let decoded = decode(&bytes)
        .map_err(|source| CorpusError::Parse { path: path.to_path_buf(), source })?;
    compare(scenario, &decoded)
        .map_err(|source| CorpusError::Mismatch { path: path.to_path_buf(), source })?;
    info!(scenario = scenario.name(), file = %path.display(), "verified");
    Ok(())
}
