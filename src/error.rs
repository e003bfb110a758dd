//! Error types for the wave-to-MIDI system

use std::fmt;

/// Custom error type for wave-to-MIDI processing
#[derive(Debug, Clone)]
pub enum Wave2MidiError {
    /// E001: Invalid audio format (e.g., non-PCM WAV)
    InvalidAudioFormat(String),
    /// E002: Unsupported or mismatched sample rate
    UnsupportedSampleRate(u32),
    /// E003: Configuration validation failed
    ConfigValidationFailed(String),
    /// E004: Empty or zero-length stem
    EmptyStem(String),
    /// E005: Audio file I/O error
    AudioFileError(String),
    /// E006: Stem separation error
    SeparationError(String),
    /// E007: Pitch analysis error
    PitchAnalysisError(String),
    /// E008: Note segmentation error
    SegmentationError(String),
    /// E009: Event scheduling error
    SchedulingError(String),
    /// E010: MIDI export error
    MidiExportError(String),
    /// E011: Analysis export error
    AnalysisExportError(String),
    /// E012: Input validation error
    InputValidationError(String),
    /// E013: Stem pipeline panicked
    StemPanicked(String),
}

impl fmt::Display for Wave2MidiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Wave2MidiError::InvalidAudioFormat(msg) => {
                write!(f, "E001: Invalid audio format - {}", msg)
            }
            Wave2MidiError::UnsupportedSampleRate(sr) => {
                write!(f, "E002: Unsupported sample rate {} Hz", sr)
            }
            Wave2MidiError::ConfigValidationFailed(msg) => {
                write!(f, "E003: Configuration validation failed - {}", msg)
            }
            Wave2MidiError::EmptyStem(name) => {
                write!(f, "E004: Stem '{}' contains no samples", name)
            }
            Wave2MidiError::AudioFileError(msg) => {
                write!(f, "E005: Audio file I/O error - {}", msg)
            }
            Wave2MidiError::SeparationError(msg) => {
                write!(f, "E006: Stem separation error - {}", msg)
            }
            Wave2MidiError::PitchAnalysisError(msg) => {
                write!(f, "E007: Pitch analysis error - {}", msg)
            }
            Wave2MidiError::SegmentationError(msg) => {
                write!(f, "E008: Note segmentation error - {}", msg)
            }
            Wave2MidiError::SchedulingError(msg) => {
                write!(f, "E009: Event scheduling error - {}", msg)
            }
            Wave2MidiError::MidiExportError(msg) => {
                write!(f, "E010: MIDI export error - {}", msg)
            }
            Wave2MidiError::AnalysisExportError(msg) => {
                write!(f, "E011: Analysis export error - {}", msg)
            }
            Wave2MidiError::InputValidationError(msg) => {
                write!(f, "E012: Input validation error - {}", msg)
            }
            Wave2MidiError::StemPanicked(msg) => {
                write!(f, "E013: Stem pipeline panicked - {}", msg)
            }
        }
    }
}

impl std::error::Error for Wave2MidiError {}

// From implementations for common error types
impl From<std::io::Error> for Wave2MidiError {
    fn from(err: std::io::Error) -> Self {
        Wave2MidiError::AudioFileError(format!("File I/O error: {}", err))
    }
}

impl From<serde_json::Error> for Wave2MidiError {
    fn from(err: serde_json::Error) -> Self {
        Wave2MidiError::AnalysisExportError(format!("JSON serialization error: {}", err))
    }
}

impl From<anyhow::Error> for Wave2MidiError {
    fn from(err: anyhow::Error) -> Self {
        Wave2MidiError::InputValidationError(format!("Generic error: {}", err))
    }
}

/// Result type alias for wave-to-MIDI operations
pub type Result<T> = std::result::Result<T, Wave2MidiError>;
