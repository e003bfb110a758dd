//! Validation tests for the hysteresis note segmenter

use wave2midi::analysis::{midi_to_hz, Frame};
use wave2midi::config::SegmentationConfig;
use wave2midi::stages::segmentation::segment;

/// Frame spacing used by the synthetic sequences (hop 512 @ 22050 Hz)
const FRAME_PERIOD: f32 = 512.0 / 22050.0;

fn voiced(index: usize, pitch_midi: f32, prob: f32, energy: f32) -> Frame {
    Frame {
        index,
        time_sec: index as f32 * FRAME_PERIOD,
        f0_hz: Some(midi_to_hz(pitch_midi)),
        voicing_prob: prob,
        energy,
    }
}

fn unvoiced(index: usize) -> Frame {
    Frame {
        index,
        time_sec: index as f32 * FRAME_PERIOD,
        f0_hz: None,
        voicing_prob: 0.05,
        energy: 0.001,
    }
}

/// Build a frame sequence from (pitch, voiced) runs
fn sequence(runs: &[(Option<f32>, usize)]) -> Vec<Frame> {
    let mut frames = Vec::new();
    for &(pitch, count) in runs {
        for _ in 0..count {
            let index = frames.len();
            frames.push(match pitch {
                Some(midi) => voiced(index, midi, 0.9, 0.4),
                None => unvoiced(index),
            });
        }
    }
    frames
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sustained_tone_yields_single_candidate() {
        let frames = sequence(&[(Some(69.0), 50)]);
        let candidates = segment(&frames, &SegmentationConfig::default());

        assert_eq!(candidates.len(), 1);
        let candidate = &candidates[0];
        assert_eq!(candidate.pitch_midi, 69);
        assert_eq!(candidate.start_time, 0.0);
        assert!((candidate.end_time - 50.0 * FRAME_PERIOD).abs() < 1e-5);
        assert!(candidate.mean_confidence > 0.8);
    }

    #[test]
    fn test_below_threshold_never_opens() {
        let mut frames = sequence(&[(Some(69.0), 50)]);
        for frame in &mut frames {
            frame.voicing_prob = 0.3;
        }
        let candidates = segment(&frames, &SegmentationConfig::default());
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_short_blip_discarded() {
        // Three frames is well under the default 100 ms minimum
        let frames = sequence(&[(None, 10), (Some(69.0), 3), (None, 10)]);
        let candidates = segment(&frames, &SegmentationConfig::default());
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_gap_within_tolerance_is_bridged() {
        let frames = sequence(&[(Some(69.0), 20), (None, 2), (Some(69.0), 20)]);
        let candidates = segment(&frames, &SegmentationConfig::default());

        assert_eq!(candidates.len(), 1);
        assert!((candidates[0].end_time - 42.0 * FRAME_PERIOD).abs() < 1e-5);
    }

    #[test]
    fn test_gap_beyond_tolerance_closes() {
        let frames = sequence(&[(Some(69.0), 20), (None, 3), (Some(69.0), 20)]);
        let candidates = segment(&frames, &SegmentationConfig::default());

        assert_eq!(candidates.len(), 2);
        // First candidate ends at its last voiced frame, not inside the gap
        assert!((candidates[0].end_time - 20.0 * FRAME_PERIOD).abs() < 1e-5);
        assert!((candidates[1].start_time - 23.0 * FRAME_PERIOD).abs() < 1e-5);
    }

    #[test]
    fn test_low_confidence_counts_as_gap() {
        let mut frames = sequence(&[(Some(69.0), 20), (Some(69.0), 4), (Some(69.0), 20)]);
        for frame in &mut frames[20..24] {
            frame.voicing_prob = 0.2;
        }
        let candidates = segment(&frames, &SegmentationConfig::default());
        assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn test_pitch_jump_closes_and_reopens() {
        let frames = sequence(&[(Some(69.0), 30), (Some(81.0), 30)]);
        let candidates = segment(&frames, &SegmentationConfig::default());

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].pitch_midi, 69);
        assert_eq!(candidates[1].pitch_midi, 81);
        // Adjacent: the reopening frame starts exactly where the first ends
        assert!((candidates[1].start_time - candidates[0].end_time).abs() < 1e-5);
    }

    #[test]
    fn test_vibrato_within_semitone_stays_open() {
        let mut frames = Vec::new();
        for index in 0..60 {
            let midi = if index % 2 == 0 { 69.4 } else { 69.6 };
            frames.push(voiced(index, midi, 0.9, 0.4));
        }
        let candidates = segment(&frames, &SegmentationConfig::default());

        assert_eq!(candidates.len(), 1);
        assert!((69..=70).contains(&candidates[0].pitch_midi));
    }

    #[test]
    fn test_max_duration_split() {
        let frames = sequence(&[(Some(60.0), 300)]);
        let config = SegmentationConfig::default();
        let candidates = segment(&frames, &config);

        // 300 frames at ~6.97 s split into 2.0 s chunks plus the tail
        assert_eq!(candidates.len(), 4);
        let total: f32 = 300.0 * FRAME_PERIOD;
        for pair in candidates.windows(2) {
            assert!((pair[1].start_time - pair[0].end_time).abs() < 1e-5);
        }
        for candidate in &candidates {
            assert_eq!(candidate.pitch_midi, 60);
            assert!(candidate.duration() <= config.max_note_duration + 1e-5);
            assert!(candidate.duration() >= config.min_note_duration);
        }
        let covered: f32 = candidates.iter().map(|c| c.duration()).sum();
        assert!((covered - total).abs() < 1e-4);
    }

    #[test]
    fn test_end_of_input_flushes_active_candidate() {
        let frames = sequence(&[(None, 5), (Some(72.0), 20)]);
        let candidates = segment(&frames, &SegmentationConfig::default());

        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].pitch_midi, 72);
    }

    #[test]
    fn test_empty_and_all_unvoiced_input() {
        assert!(segment(&[], &SegmentationConfig::default()).is_empty());
        let frames = sequence(&[(None, 40)]);
        assert!(segment(&frames, &SegmentationConfig::default()).is_empty());
    }

    #[test]
    fn test_peak_and_mean_energy_recorded() {
        let mut frames = sequence(&[(Some(69.0), 20)]);
        frames[10].energy = 0.9;
        let candidates = segment(&frames, &SegmentationConfig::default());

        assert_eq!(candidates.len(), 1);
        assert!((candidates[0].peak_energy - 0.9).abs() < 1e-6);
        assert!(candidates[0].mean_energy < 0.9);
        assert!(candidates[0].mean_energy > 0.0);
    }
}
