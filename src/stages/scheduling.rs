//! Stage 4: tick quantization and event scheduling

use crate::analysis::{EventKind, MidiEvent, Note};
use crate::audio::StemState;
use crate::config::Config;
use crate::error::Result as W2mResult;
use std::collections::HashMap;

pub fn run(state: &mut StemState, config: &Config) -> W2mResult<()> {
    state.events = schedule(
        &state.notes,
        config.export.ticks_per_beat,
        config.export.output_bpm,
        state.channel,
    );
    Ok(())
}

/// Convert seconds to MIDI ticks at the configured tempo and resolution
pub fn seconds_to_tick(time_sec: f32, ticks_per_beat: u16, bpm: f32) -> u32 {
    (time_sec * (bpm / 60.0) * ticks_per_beat as f32).round() as u32
}

/// Convert the finalized note list into a tick-sorted MIDI event stream.
///
/// Ties at the same tick are ordered note-off before note-on, then by
/// ascending pitch, so a same-pitch note ending exactly where the next one
/// starts never leaves the first stuck open. Same-pitch overlaps introduced
/// by tick rounding are resolved by closing the earlier note at the later
/// one's start tick.
pub fn schedule(notes: &[Note], ticks_per_beat: u16, bpm: f32, channel: u8) -> Vec<MidiEvent> {
    struct TickedNote {
        start: u32,
        end: u32,
        pitch: u8,
        velocity: u8,
    }

    let mut ticked: Vec<TickedNote> = notes
        .iter()
        .map(|note| {
            let start = seconds_to_tick(note.start_time, ticks_per_beat, bpm);
            // A note is never shorter than one tick after rounding
            let end = seconds_to_tick(note.end_time, ticks_per_beat, bpm).max(start + 1);
            TickedNote {
                start,
                end,
                pitch: note.pitch_midi,
                velocity: note.velocity,
            }
        })
        .collect();

    ticked.sort_by_key(|note| (note.start, note.pitch));

    let mut last_index_by_pitch: HashMap<u8, usize> = HashMap::new();
    for i in 0..ticked.len() {
        if let Some(&prev) = last_index_by_pitch.get(&ticked[i].pitch) {
            if ticked[prev].end > ticked[i].start {
                ticked[prev].end = ticked[i].start;
            }
        }
        last_index_by_pitch.insert(ticked[i].pitch, i);
    }
    // A note truncated to nothing cannot emit a well-formed on/off pair
    ticked.retain(|note| note.end > note.start);

    let mut events = Vec::with_capacity(ticked.len() * 2);
    for note in &ticked {
        events.push(MidiEvent {
            tick: note.start,
            kind: EventKind::NoteOn,
            channel,
            pitch: note.pitch,
            velocity: note.velocity,
        });
        events.push(MidiEvent {
            tick: note.end,
            kind: EventKind::NoteOff,
            channel,
            pitch: note.pitch,
            velocity: 0,
        });
    }

    events.sort_by_key(|event| (event.tick, event.kind, event.pitch));
    events
}
