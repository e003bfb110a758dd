//! MIDI encoding and per-stem export

use crate::analysis::{EventKind, MidiEvent};
use crate::config::Config;
use crate::error::{Result as W2mResult, Wave2MidiError};
use crate::orchestrator::StemResults;
use midly::num::{u15, u24, u28, u4, u7};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, TrackEvent, TrackEventKind};
use std::path::{Path, PathBuf};

/// Encode one stem's scheduled event stream as single-track MIDI file bytes.
///
/// The events must already be tick-sorted, as the scheduler emits them.
pub fn encode(events: &[MidiEvent], stem_name: &str, config: &Config) -> W2mResult<Vec<u8>> {
    let tempo_uspq = (60_000_000.0 / config.export.output_bpm) as u32;
    let program = config
        .export
        .instrument_mapping
        .get(stem_name)
        .copied()
        .unwrap_or(0);
    let channel = events.first().map(|e| e.channel).unwrap_or(0);

    let mut track = Vec::with_capacity(events.len() + 3);

    track.push(TrackEvent {
        delta: u28::from(0),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(u24::from(tempo_uspq))),
    });
    track.push(TrackEvent {
        delta: u28::from(0),
        kind: TrackEventKind::Midi {
            channel: u4::from(channel),
            message: MidiMessage::ProgramChange {
                program: u7::from(program),
            },
        },
    });

    let mut current_tick = 0u32;
    for event in events {
        if event.tick < current_tick {
            return Err(Wave2MidiError::MidiExportError(format!(
                "event stream not tick-sorted at tick {}",
                event.tick
            )));
        }
        let delta = event.tick - current_tick;
        current_tick = event.tick;

        let message = match event.kind {
            EventKind::NoteOn => MidiMessage::NoteOn {
                key: u7::from(event.pitch),
                vel: u7::from(event.velocity),
            },
            EventKind::NoteOff => MidiMessage::NoteOff {
                key: u7::from(event.pitch),
                vel: u7::from(event.velocity),
            },
        };

        track.push(TrackEvent {
            delta: u28::from(delta),
            kind: TrackEventKind::Midi {
                channel: u4::from(event.channel),
                message,
            },
        });
    }

    track.push(TrackEvent {
        delta: u28::from(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    let header = Header {
        format: Format::SingleTrack,
        timing: Timing::Metrical(u15::from(config.export.ticks_per_beat)),
    };
    let smf = Smf {
        header,
        tracks: vec![track],
    };

    let mut bytes = Vec::new();
    smf.write(&mut bytes)
        .map_err(|e| Wave2MidiError::MidiExportError(format!("failed to write MIDI data: {:?}", e)))?;
    Ok(bytes)
}

/// Write one `<base>_<stem>.mid` file per stem that produced at least one
/// note. Failed stems are skipped here; the caller reports them.
pub fn export_midi(
    results: &StemResults,
    base_name: &str,
    output_dir: &Path,
    config: &Config,
) -> W2mResult<Vec<PathBuf>> {
    std::fs::create_dir_all(output_dir)?;
    let mut written = Vec::new();

    for (name, outcome) in results {
        let output = match outcome {
            Ok(output) => output,
            Err(_) => continue,
        };
        if output.events.is_empty() {
            println!("No notes detected in {} stem", name);
            continue;
        }

        let bytes = encode(&output.events, name, config)?;
        let path = output_dir.join(format!("{}_{}.mid", base_name, name));
        std::fs::write(&path, &bytes)
            .map_err(|e| Wave2MidiError::MidiExportError(e.to_string()))?;

        println!("Saved {} ({} notes)", path.display(), output.notes.len());
        written.push(path);
    }

    Ok(written)
}
