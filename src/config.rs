//! Configuration system for the wave-to-MIDI converter

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub version: String,
    pub audio: AudioConfig,
    pub separation: SeparationConfig,
    pub pitch: PitchConfig,
    pub segmentation: SegmentationConfig,
    pub velocity: VelocityConfig,
    pub export: ExportConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            audio: AudioConfig::default(),
            separation: SeparationConfig::default(),
            pitch: PitchConfig::default(),
            segmentation: SegmentationConfig::default(),
            velocity: VelocityConfig::default(),
            export: ExportConfig::default(),
        }
    }
}

/// Audio input configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Target analysis sample rate; input is resampled to this before separation
    pub sample_rate: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self { sample_rate: 22050 }
    }
}

/// Stem separation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeparationConfig {
    /// Number of stems the separation model produces (2, 4 or 5)
    pub stem_count: usize,
}

impl Default for SeparationConfig {
    fn default() -> Self {
        Self { stem_count: 5 }
    }
}

/// Frame-level pitch analysis configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PitchConfig {
    /// f0 estimation algorithm variant
    pub method: String,
    /// Analysis window length in samples
    pub frame_length: usize,
    /// Window stride in samples
    pub hop_length: usize,
    /// Lower bound of the pitch search band in Hz (A0)
    pub fmin: f32,
    /// Upper bound of the pitch search band in Hz (C8)
    pub fmax: f32,
}

impl Default for PitchConfig {
    fn default() -> Self {
        Self {
            method: "yin".to_string(),
            frame_length: 2048,
            hop_length: 512,
            fmin: 27.5,
            fmax: 4186.01,
        }
    }
}

/// Note segmentation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Voicing confidence a frame must reach to open or sustain a note
    pub probability_threshold: f32,
    /// Candidates shorter than this are discarded as spurious (seconds)
    pub min_note_duration: f32,
    /// Candidates longer than this are split at the boundary (seconds)
    pub max_note_duration: f32,
    /// Null/low-confidence frame runs up to this length are bridged
    pub pitch_gap_tolerance_frames: usize,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            probability_threshold: 0.5,
            min_note_duration: 0.1,
            max_note_duration: 2.0,
            pitch_gap_tolerance_frames: 2,
        }
    }
}

/// Velocity response curve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VelocityCurve {
    Linear,
    Logarithmic,
}

/// Which energy statistic of a candidate drives its velocity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VelocitySource {
    Peak,
    Mean,
}

/// Velocity mapping configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VelocityConfig {
    /// User multiplier applied before the final clamp to [1, 127]
    pub scaling: f32,
    pub curve: VelocityCurve,
    pub source: VelocitySource,
    /// Candidates below this normalized energy are dropped entirely
    pub noise_floor: f32,
}

impl Default for VelocityConfig {
    fn default() -> Self {
        Self {
            scaling: 1.0,
            curve: VelocityCurve::Linear,
            source: VelocitySource::Peak,
            noise_floor: 0.01,
        }
    }
}

/// MIDI export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Output tempo used for tick conversion
    pub output_bpm: f32,
    /// MIDI timing resolution in ticks per quarter note
    pub ticks_per_beat: u16,
    /// General MIDI program number per stem name
    pub instrument_mapping: HashMap<String, u8>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_bpm: 120.0,
            ticks_per_beat: 480,
            instrument_mapping: default_instrument_mapping(),
        }
    }
}

fn default_instrument_mapping() -> HashMap<String, u8> {
    let mut mapping = HashMap::new();
    mapping.insert("vocals".to_string(), 5); // Voice
    mapping.insert("drums".to_string(), 0); // Acoustic Grand Piano (for percussion)
    mapping.insert("bass".to_string(), 33); // Electric Bass (finger)
    mapping.insert("piano".to_string(), 1); // Bright Acoustic Piano
    mapping.insert("guitar".to_string(), 25); // Acoustic Guitar (steel)
    mapping.insert("other".to_string(), 40); // String Ensemble 1
    mapping.insert("accompaniment".to_string(), 40);
    mapping
}

/// Validate configuration parameters
pub fn validate_config(config: &Config) -> anyhow::Result<()> {
    if config.audio.sample_rate == 0 {
        anyhow::bail!("audio.sample_rate must be positive");
    }

    if !matches!(config.separation.stem_count, 2 | 4 | 5) {
        anyhow::bail!(
            "separation.stem_count must be 2, 4 or 5, got {}",
            config.separation.stem_count
        );
    }

    let pitch = &config.pitch;
    if pitch.frame_length == 0 || pitch.hop_length == 0 {
        anyhow::bail!("pitch.frame_length and pitch.hop_length must be positive");
    }
    if pitch.hop_length > pitch.frame_length {
        anyhow::bail!("pitch.hop_length must not exceed pitch.frame_length");
    }
    if pitch.fmin <= 0.0 || pitch.fmin >= pitch.fmax {
        anyhow::bail!("pitch band must satisfy 0 < fmin < fmax");
    }
    let nyquist = config.audio.sample_rate as f32 / 2.0;
    if pitch.fmax >= nyquist {
        anyhow::bail!(
            "pitch.fmax ({} Hz) must be below the Nyquist frequency ({} Hz)",
            pitch.fmax,
            nyquist
        );
    }

    let seg = &config.segmentation;
    if !(0.0..=1.0).contains(&seg.probability_threshold) {
        anyhow::bail!("segmentation.probability_threshold must be within [0, 1]");
    }
    if seg.min_note_duration <= 0.0 {
        anyhow::bail!("segmentation.min_note_duration must be positive");
    }
    if seg.min_note_duration > seg.max_note_duration {
        anyhow::bail!("segmentation.min_note_duration must not exceed max_note_duration");
    }

    let vel = &config.velocity;
    if vel.scaling <= 0.0 {
        anyhow::bail!("velocity.scaling must be positive");
    }
    if !(0.0..1.0).contains(&vel.noise_floor) {
        anyhow::bail!("velocity.noise_floor must be within [0, 1)");
    }

    let export = &config.export;
    if export.output_bpm <= 0.0 {
        anyhow::bail!("export.output_bpm must be positive");
    }
    if export.ticks_per_beat == 0 {
        anyhow::bail!("export.ticks_per_beat must be positive");
    }

    Ok(())
}

/// Load configuration from JSON file
pub fn load_config<P: AsRef<std::path::Path>>(path: P) -> anyhow::Result<Config> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Save configuration to JSON file
pub fn save_config<P: AsRef<std::path::Path>>(config: &Config, path: P) -> anyhow::Result<()> {
    let content = serde_json::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    Ok(())
}
