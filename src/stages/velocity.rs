//! Stage 3: energy-to-velocity mapping

use crate::analysis::{Frame, Note, NoteCandidate};
use crate::audio::StemState;
use crate::config::{Config, VelocityConfig, VelocityCurve, VelocitySource};
use crate::error::Result as W2mResult;

/// Compression constant for the logarithmic response curve
const LOG_CURVE_K: f32 = 10.0;

pub fn run(state: &mut StemState, config: &Config) -> W2mResult<()> {
    let range = energy_range(&state.frames);
    state.notes = state
        .candidates
        .iter()
        .filter_map(|candidate| {
            map_velocity(candidate, range, &config.velocity).map(|velocity| Note {
                pitch_midi: candidate.pitch_midi,
                start_time: candidate.start_time,
                end_time: candidate.end_time,
                velocity,
            })
        })
        .collect();
    Ok(())
}

/// Observed frame-energy range of the stem, the normalization anchor for
/// velocity mapping
pub fn energy_range(frames: &[Frame]) -> (f32, f32) {
    let mut min = f32::INFINITY;
    let mut max = 0.0f32;
    for frame in frames {
        min = min.min(frame.energy);
        max = max.max(frame.energy);
    }
    if frames.is_empty() {
        (0.0, 0.0)
    } else {
        (min, max)
    }
}

/// Candidate energy scalar normalized to [0, 1] against the stem's observed
/// range. A degenerate flat range maps nonzero energy to 1.
pub fn normalized_energy(
    candidate: &NoteCandidate,
    range: (f32, f32),
    source: VelocitySource,
) -> f32 {
    let value = match source {
        VelocitySource::Peak => candidate.peak_energy,
        VelocitySource::Mean => candidate.mean_energy,
    };
    let (lo, hi) = range;
    if hi - lo <= f32::EPSILON {
        if value > 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        ((value - lo) / (hi - lo)).clamp(0.0, 1.0)
    }
}

/// Map a candidate's energy profile to a MIDI velocity in [1, 127].
/// Candidates whose normalized energy falls below the noise floor are
/// dropped entirely rather than mapped.
pub fn map_velocity(
    candidate: &NoteCandidate,
    range: (f32, f32),
    config: &VelocityConfig,
) -> Option<u8> {
    let x = normalized_energy(candidate, range, config.source);
    if x < config.noise_floor {
        return None;
    }

    let response = match config.curve {
        VelocityCurve::Linear => 1.0 + 126.0 * x,
        VelocityCurve::Logarithmic => {
            1.0 + 126.0 * (1.0 + LOG_CURVE_K * x).ln() / (1.0 + LOG_CURVE_K).ln()
        }
    };

    let velocity = (response * config.scaling).clamp(1.0, 127.0);
    Some(velocity.round() as u8)
}
