//! Validation tests for the event scheduler

use std::collections::HashMap;
use wave2midi::analysis::{EventKind, MidiEvent, Note};
use wave2midi::stages::scheduling::{schedule, seconds_to_tick};

fn note(pitch_midi: u8, start_time: f32, end_time: f32) -> Note {
    Note {
        pitch_midi,
        start_time,
        end_time,
        velocity: 96,
    }
}

/// Every NoteOn must have exactly one later-or-equal NoteOff on the same
/// channel+pitch, with no two NoteOns open simultaneously
fn assert_pairing(events: &[MidiEvent]) {
    let mut open: HashMap<(u8, u8), u32> = HashMap::new();
    for event in events {
        let key = (event.channel, event.pitch);
        match event.kind {
            EventKind::NoteOn => {
                assert!(
                    !open.contains_key(&key),
                    "second NoteOn while pitch {} open",
                    event.pitch
                );
                open.insert(key, event.tick);
            }
            EventKind::NoteOff => {
                let on_tick = open
                    .remove(&key)
                    .unwrap_or_else(|| panic!("NoteOff without NoteOn for pitch {}", event.pitch));
                assert!(event.tick >= on_tick);
            }
        }
    }
    assert!(open.is_empty(), "unclosed notes: {:?}", open.keys());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seconds_to_tick_conversion() {
        assert_eq!(seconds_to_tick(0.0, 480, 120.0), 0);
        assert_eq!(seconds_to_tick(1.0, 480, 120.0), 960);
        assert_eq!(seconds_to_tick(0.5, 480, 120.0), 480);
        assert_eq!(seconds_to_tick(1.0, 480, 60.0), 480);
        assert_eq!(seconds_to_tick(1.0, 960, 120.0), 1920);
    }

    #[test]
    fn test_single_note_emits_matched_pair() {
        let events = schedule(&[note(69, 0.5, 1.5)], 480, 120.0, 0);

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, EventKind::NoteOn);
        assert_eq!(events[0].tick, 480);
        assert_eq!(events[0].velocity, 96);
        assert_eq!(events[1].kind, EventKind::NoteOff);
        assert_eq!(events[1].tick, 1440);
        assert_eq!(events[1].velocity, 0);
        assert_pairing(&events);
    }

    #[test]
    fn test_note_off_sorts_before_note_on_at_same_tick() {
        // Back-to-back same-pitch notes land on the same boundary tick
        let events = schedule(&[note(69, 0.0, 1.0), note(69, 1.0, 2.0)], 480, 120.0, 0);

        assert_eq!(events.len(), 4);
        assert_eq!(
            (events[1].kind, events[1].tick),
            (EventKind::NoteOff, 960)
        );
        assert_eq!((events[2].kind, events[2].tick), (EventKind::NoteOn, 960));
        assert_pairing(&events);
    }

    #[test]
    fn test_rounding_overlap_is_truncated() {
        // The first note's rounded end (tick 961) overruns the second's
        // start (tick 960); the earlier note must close at 960
        let events = schedule(&[note(69, 0.0, 1.001), note(69, 1.0, 2.0)], 480, 120.0, 0);

        assert_eq!(events.len(), 4);
        assert_eq!(events[1].kind, EventKind::NoteOff);
        assert_eq!(events[1].tick, 960);
        assert_pairing(&events);
    }

    #[test]
    fn test_zero_length_note_gets_one_tick() {
        let events = schedule(&[note(60, 0.5, 0.5)], 480, 120.0, 0);

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].tick, 480);
        assert_eq!(events[1].tick, 481);
        assert_pairing(&events);
    }

    #[test]
    fn test_same_kind_ties_sorted_by_pitch() {
        let events = schedule(&[note(64, 0.0, 1.0), note(60, 0.0, 1.0)], 480, 120.0, 0);

        assert_eq!(events[0].pitch, 60);
        assert_eq!(events[1].pitch, 64);
        assert_eq!(events[2].pitch, 60);
        assert_eq!(events[3].pitch, 64);
        assert_pairing(&events);
    }

    #[test]
    fn test_events_globally_tick_sorted() {
        let notes = vec![
            note(69, 1.2, 1.8),
            note(72, 0.1, 0.4),
            note(65, 0.3, 2.0),
        ];
        let events = schedule(&notes, 480, 120.0, 0);

        assert_eq!(events.len(), 6);
        for pair in events.windows(2) {
            assert!(pair[0].tick <= pair[1].tick);
        }
        assert_pairing(&events);
    }

    #[test]
    fn test_channel_assigned_per_stem() {
        let events = schedule(&[note(69, 0.0, 1.0)], 480, 120.0, 7);
        assert!(events.iter().all(|e| e.channel == 7));
    }

    #[test]
    fn test_empty_notes_yield_no_events() {
        assert!(schedule(&[], 480, 120.0, 0).is_empty());
    }

    #[test]
    fn test_deterministic_output() {
        let notes = vec![note(69, 0.0, 1.0), note(72, 0.5, 1.5), note(69, 1.0, 1.9)];
        let first = schedule(&notes, 480, 120.0, 0);
        let second = schedule(&notes, 480, 120.0, 0);
        assert_eq!(first, second);
    }
}
