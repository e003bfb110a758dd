//! Stage 2: hysteresis-based note segmentation
//!
//! An explicit two-state machine (Idle/Active) walks the frame sequence and
//! groups contiguous voiced frames into note candidates. The analyzer is
//! monophonic, so exactly one pitch track runs; simultaneous pitches are not
//! transcribed.

use crate::analysis::{hz_to_midi, Frame, NoteCandidate};
use crate::audio::StemState;
use crate::config::{Config, SegmentationConfig};
use crate::error::Result as W2mResult;

pub fn run(state: &mut StemState, config: &Config) -> W2mResult<()> {
    state.candidates = segment(&state.frames, &config.segmentation);
    Ok(())
}

enum TrackState {
    Idle,
    Active(OpenCandidate),
}

/// Accumulator for the candidate currently being grown
struct OpenCandidate {
    start_time: f32,
    last_voiced_time: f32,
    /// Quantized pitches of accumulated frames, kept sorted for the running median
    sorted_pitches: Vec<i32>,
    gap_run: usize,
    sum_confidence: f32,
    peak_energy: f32,
    sum_energy: f32,
    voiced_frames: usize,
}

impl OpenCandidate {
    fn open(frame: &Frame, pitch: i32) -> Self {
        OpenCandidate {
            start_time: frame.time_sec,
            last_voiced_time: frame.time_sec,
            sorted_pitches: vec![pitch],
            gap_run: 0,
            sum_confidence: frame.voicing_prob,
            peak_energy: frame.energy,
            sum_energy: frame.energy,
            voiced_frames: 1,
        }
    }

    fn push(&mut self, frame: &Frame, pitch: i32) {
        let at = self.sorted_pitches.partition_point(|&p| p < pitch);
        self.sorted_pitches.insert(at, pitch);
        self.last_voiced_time = frame.time_sec;
        self.gap_run = 0;
        self.sum_confidence += frame.voicing_prob;
        self.peak_energy = self.peak_energy.max(frame.energy);
        self.sum_energy += frame.energy;
        self.voiced_frames += 1;
    }

    fn median_pitch(&self) -> f32 {
        let n = self.sorted_pitches.len();
        if n % 2 == 0 {
            (self.sorted_pitches[n / 2 - 1] + self.sorted_pitches[n / 2]) as f32 / 2.0
        } else {
            self.sorted_pitches[n / 2] as f32
        }
    }
}

/// Group the frame sequence into note candidates with hysteresis: a frame
/// opens a candidate when its voicing confidence crosses the threshold with a
/// valid pitch; the candidate stays open across up to
/// `pitch_gap_tolerance_frames` null/low-confidence frames and closes on
/// longer gaps, pitch jumps of more than one semitone against the running
/// median, or end of input.
pub fn segment(frames: &[Frame], config: &SegmentationConfig) -> Vec<NoteCandidate> {
    let frame_period = frames
        .get(1)
        .map(|f| f.time_sec - frames[0].time_sec)
        .unwrap_or(0.0);

    let mut candidates = Vec::new();
    let mut state = TrackState::Idle;

    for frame in frames {
        let quantized = quantize_pitch(frame);
        let voiced = quantized.is_some() && frame.voicing_prob >= config.probability_threshold;

        state = match (state, quantized) {
            (TrackState::Idle, Some(pitch)) if voiced => {
                TrackState::Active(OpenCandidate::open(frame, pitch))
            }
            (TrackState::Idle, _) => TrackState::Idle,
            (TrackState::Active(mut open), Some(pitch)) if voiced => {
                if (pitch as f32 - open.median_pitch()).abs() <= 1.0 {
                    open.push(frame, pitch);
                    TrackState::Active(open)
                } else {
                    // Pitch jump: close and immediately reopen at the new pitch
                    close(&open, frame_period, config, &mut candidates);
                    TrackState::Active(OpenCandidate::open(frame, pitch))
                }
            }
            (TrackState::Active(mut open), _) => {
                open.gap_run += 1;
                if open.gap_run > config.pitch_gap_tolerance_frames {
                    close(&open, frame_period, config, &mut candidates);
                    TrackState::Idle
                } else {
                    TrackState::Active(open)
                }
            }
        };
    }

    // End of input force-closes a still-active candidate
    if let TrackState::Active(open) = state {
        close(&open, frame_period, config, &mut candidates);
    }

    candidates
}

/// Quantize a frame's pitch to the nearest MIDI semitone
fn quantize_pitch(frame: &Frame) -> Option<i32> {
    frame
        .f0_hz
        .map(|hz| hz_to_midi(hz).round() as i32)
        .filter(|&midi| (0..=127).contains(&midi))
}

/// Apply the duration policy and emit the closed candidate: discard when
/// shorter than the minimum, split at the maximum-duration boundary into
/// consecutive equal-pitch candidates otherwise. A split tail shorter than
/// the minimum is discarded with the rest of the run kept.
fn close(
    open: &OpenCandidate,
    frame_period: f32,
    config: &SegmentationConfig,
    out: &mut Vec<NoteCandidate>,
) {
    let end_time = open.last_voiced_time + frame_period;
    if end_time - open.start_time < config.min_note_duration {
        return;
    }

    let pitch_midi = open.median_pitch().round().clamp(0.0, 127.0) as u8;
    let mean_confidence = open.sum_confidence / open.voiced_frames as f32;
    let mean_energy = open.sum_energy / open.voiced_frames as f32;
    let frames_per_second = if frame_period > 0.0 {
        1.0 / frame_period
    } else {
        0.0
    };

    let mut chunk_start = open.start_time;
    while end_time - chunk_start >= config.min_note_duration {
        let chunk_end = (chunk_start + config.max_note_duration).min(end_time);
        let chunk_frames = ((chunk_end - chunk_start) * frames_per_second).round() as usize;
        out.push(NoteCandidate {
            pitch_midi,
            start_time: chunk_start,
            end_time: chunk_end,
            frame_count: chunk_frames.clamp(1, open.voiced_frames),
            mean_confidence,
            peak_energy: open.peak_energy,
            mean_energy,
        });
        chunk_start = chunk_end;
    }
}
