//! Wave-to-MIDI Conversion System
//!
//! Converts a WAV recording into per-stem MIDI files: an external
//! separation model splits the mix into stems, and each stem runs through
//! frame-level pitch analysis, hysteresis note segmentation, velocity
//! mapping and tick scheduling to produce a MIDI event stream.

pub mod analysis;
pub mod audio;
pub mod config;
pub mod error;
pub mod midi;
pub mod orchestrator;
pub mod pitch;
pub mod separation;
pub mod stages;

pub use audio::{Stem, StemState};
pub use config::Config;
pub use error::{Result as Wave2MidiResult, Wave2MidiError};

use separation::{PassthroughSeparator, Separator};
use std::path::{Path, PathBuf};

/// Main conversion front-end
pub struct WaveToMidi {
    config: Config,
    separator: Box<dyn Separator>,
}

impl WaveToMidi {
    /// Create a converter using the passthrough separator, which treats the
    /// whole mix as a single stem
    pub fn new(config: Config) -> Self {
        Self {
            config,
            separator: Box::new(PassthroughSeparator::default()),
        }
    }

    /// Create a converter with a specific separation backend
    pub fn with_separator(config: Config, separator: Box<dyn Separator>) -> Self {
        Self { config, separator }
    }

    /// Convert a WAV file into one MIDI file per stem plus an analysis
    /// summary; returns the written MIDI paths
    pub fn convert<P: AsRef<Path>>(
        &self,
        input_path: P,
        output_dir: P,
    ) -> Wave2MidiResult<Vec<PathBuf>> {
        let input_path = input_path.as_ref();
        let output_dir = output_dir.as_ref();

        let (samples, sr) = audio::load_wav_file(input_path)?;
        let target_sr = self.config.audio.sample_rate;
        let samples = audio::resample(&samples, sr, target_sr)?;

        let stems = self.separator.separate(&samples, target_sr)?;
        let results = orchestrator::run(stems, &self.config);

        let base_name = input_path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("output");

        let written = midi::export_midi(&results, base_name, output_dir, &self.config)?;
        analysis::export_analysis(&results, base_name, target_sr, output_dir)?;

        for (name, outcome) in &results {
            if let Err(err) = outcome {
                eprintln!("Warning: stem '{}' failed: {}", name, err);
            }
        }

        Ok(written)
    }
}

/// Execute the per-stem pipeline stages in order
pub fn run_pipeline(state: &mut StemState, config: &Config) -> Wave2MidiResult<()> {
    // Stage 1: Frame analysis
    stages::frame_analysis::run(state, config)?;

    // Stage 2: Note segmentation
    stages::segmentation::run(state, config)?;

    // Stage 3: Velocity mapping
    stages::velocity::run(state, config)?;

    // Stage 4: Event scheduling
    stages::scheduling::run(state, config)?;

    Ok(())
}

/// Validate configuration and input file
pub fn validate_input<P: AsRef<Path>>(input_path: P, config: &Config) -> Wave2MidiResult<()> {
    audio::validate_audio_file(input_path)?;

    config::validate_config(config)
        .map_err(|e| Wave2MidiError::ConfigValidationFailed(e.to_string()))?;

    Ok(())
}
