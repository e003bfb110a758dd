//! Stage 1: frame-level pitch, voicing and energy analysis

use crate::analysis::Frame;
use crate::audio::{rms, StemState};
use crate::config::{Config, PitchConfig};
use crate::error::{Result as W2mResult, Wave2MidiError};
use crate::pitch::YinDetector;

pub fn run(state: &mut StemState, config: &Config) -> W2mResult<()> {
    state.frames = analyze(&state.samples, state.sr, &config.pitch)?;
    Ok(())
}

/// Slice a stem into overlapping fixed-length windows and estimate pitch,
/// voicing confidence and RMS energy per window. The final partial window is
/// zero-padded rather than dropped, so the frame sequence covers the full
/// stem duration.
pub fn analyze(samples: &[f32], sr: u32, config: &PitchConfig) -> W2mResult<Vec<Frame>> {
    if samples.is_empty() {
        return Ok(Vec::new());
    }

    let frame_length = config.frame_length;
    let hop = config.hop_length;
    let n_frames = (samples.len() + hop - 1) / hop;

    let mut detector = YinDetector::new(sr, frame_length, config.fmin, config.fmax);
    let mut window = vec![0.0f32; frame_length];
    let mut frames = Vec::with_capacity(n_frames);

    for index in 0..n_frames {
        let start = index * hop;
        let available = (samples.len() - start).min(frame_length);
        window[..available].copy_from_slice(&samples[start..start + available]);
        window[available..].fill(0.0);

        let estimate = detector.estimate(&window);
        let energy = rms(&window);

        // Corrupt analysis output is classified, never silently defaulted
        let f0_finite = estimate.f0_hz.map_or(true, f32::is_finite);
        if !energy.is_finite() || !estimate.voicing_prob.is_finite() || !f0_finite {
            return Err(Wave2MidiError::PitchAnalysisError(format!(
                "non-finite analysis output at frame {}",
                index
            )));
        }

        frames.push(Frame {
            index,
            time_sec: start as f32 / sr as f32,
            f0_hz: estimate.f0_hz,
            voicing_prob: estimate.voicing_prob,
            energy,
        });
    }

    Ok(frames)
}
