//! Stem separation seam
//!
//! The separation model is an external collaborator; the pipeline relies on
//! this narrow interface only. Stems come back at the requested sample rate
//! with stable names and ordering.

use crate::audio::{self, Stem};
use crate::error::{Result as W2mResult, Wave2MidiError};
use std::path::PathBuf;

pub const STEM_NAMES_2: &[&str] = &["vocals", "accompaniment"];
pub const STEM_NAMES_4: &[&str] = &["vocals", "drums", "bass", "other"];
pub const STEM_NAMES_5: &[&str] = &["vocals", "drums", "bass", "piano", "other"];

/// Stem name set for a separation model size
pub fn stem_names_for(stem_count: usize) -> W2mResult<&'static [&'static str]> {
    match stem_count {
        2 => Ok(STEM_NAMES_2),
        4 => Ok(STEM_NAMES_4),
        5 => Ok(STEM_NAMES_5),
        other => Err(Wave2MidiError::SeparationError(format!(
            "unsupported stem count: {}",
            other
        ))),
    }
}

/// Splits a mixed waveform into named stems at the same sample rate
pub trait Separator {
    fn separate(&self, samples: &[f32], sample_rate: u32) -> W2mResult<Vec<Stem>>;
}

/// Passes the whole mix through as one stem, for running the pipeline
/// without a separation model
pub struct PassthroughSeparator {
    pub stem_name: String,
}

impl Default for PassthroughSeparator {
    fn default() -> Self {
        Self {
            stem_name: "mix".to_string(),
        }
    }
}

impl Separator for PassthroughSeparator {
    fn separate(&self, samples: &[f32], sample_rate: u32) -> W2mResult<Vec<Stem>> {
        Ok(vec![Stem {
            name: self.stem_name.clone(),
            samples: samples.to_vec(),
            sample_rate,
        }])
    }
}

/// Separator backed by stems already rendered to disk, one WAV per stem
pub struct PreSeparated {
    stems: Vec<(String, PathBuf)>,
}

impl PreSeparated {
    pub fn new(stems: Vec<(String, PathBuf)>) -> W2mResult<Self> {
        if stems.is_empty() {
            return Err(Wave2MidiError::SeparationError(
                "no stem files given".to_string(),
            ));
        }
        // Duplicate names would collide in the per-stem output map
        for (i, (name, _)) in stems.iter().enumerate() {
            if stems[..i].iter().any(|(other, _)| other == name) {
                return Err(Wave2MidiError::SeparationError(format!(
                    "duplicate stem name: {}",
                    name
                )));
            }
        }
        Ok(Self { stems })
    }
}

impl Separator for PreSeparated {
    fn separate(&self, _samples: &[f32], sample_rate: u32) -> W2mResult<Vec<Stem>> {
        let mut out = Vec::with_capacity(self.stems.len());
        for (name, path) in &self.stems {
            let (samples, sr) = audio::load_wav_file(path)?;
            let samples = audio::resample(&samples, sr, sample_rate)?;
            out.push(Stem {
                name: name.clone(),
                samples,
                sample_rate,
            });
        }
        Ok(out)
    }
}
