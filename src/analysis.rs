//! Core pipeline data types and analysis export

use crate::error::Result as W2mResult;
use crate::orchestrator::StemResults;
use serde::{Deserialize, Serialize};

/// One fixed-length analysis window of a stem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Position in the frame sequence
    pub index: usize,
    /// Window start time in seconds
    pub time_sec: f32,
    /// Estimated fundamental frequency; `None` for unvoiced/silent frames
    pub f0_hz: Option<f32>,
    /// Voicing confidence in [0, 1]
    pub voicing_prob: f32,
    /// RMS energy of the window
    pub energy: f32,
}

/// A contiguous voiced run grouped by the segmenter, before velocity mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteCandidate {
    pub pitch_midi: u8,
    pub start_time: f32,
    pub end_time: f32,
    /// Number of voiced frames backing the candidate
    pub frame_count: usize,
    pub mean_confidence: f32,
    pub peak_energy: f32,
    pub mean_energy: f32,
}

impl NoteCandidate {
    pub fn duration(&self) -> f32 {
        self.end_time - self.start_time
    }
}

/// Finalized, velocity-assigned note ready for scheduling
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub pitch_midi: u8,
    pub start_time: f32,
    pub end_time: f32,
    /// MIDI velocity in [1, 127]; 0 is reserved for "note absent"
    pub velocity: u8,
}

/// MIDI event kind. `NoteOff` is declared first so the derived ordering
/// places note-offs before note-ons at the same tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EventKind {
    NoteOff,
    NoteOn,
}

/// Tick-quantized MIDI event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MidiEvent {
    pub tick: u32,
    pub kind: EventKind,
    pub channel: u8,
    pub pitch: u8,
    pub velocity: u8,
}

/// Convert a frequency in Hz to a fractional MIDI pitch (A4 = 440 Hz = 69)
pub fn hz_to_midi(hz: f32) -> f32 {
    69.0 + 12.0 * (hz / 440.0).log2()
}

/// Convert a MIDI pitch to its frequency in Hz
pub fn midi_to_hz(midi: f32) -> f32 {
    440.0 * 2.0_f32.powf((midi - 69.0) / 12.0)
}

/// Per-conversion analysis artifact, one entry per stem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResults {
    pub version: String,
    pub source: String,
    pub sample_rate: u32,
    pub stems: Vec<StemSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StemSummary {
    pub name: String,
    /// "ok", "empty" or "failed"
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_sec: f32,
    pub note_count: usize,
    pub event_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_pitch: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_pitch: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_velocity: Option<f32>,
}

/// Export per-stem analysis results as JSON
pub fn export_analysis(
    results: &StemResults,
    source: &str,
    sample_rate: u32,
    output_dir: &std::path::Path,
) -> W2mResult<std::path::PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let analysis_path = output_dir.join("analysis.json");

    let analysis = build_analysis_results(results, source, sample_rate);

    let json = serde_json::to_string_pretty(&analysis)?;
    std::fs::write(&analysis_path, json)?;

    Ok(analysis_path)
}

fn build_analysis_results(
    results: &StemResults,
    source: &str,
    sample_rate: u32,
) -> AnalysisResults {
    let stems = results
        .iter()
        .map(|(name, outcome)| match outcome {
            Ok(output) => {
                let notes = &output.notes;
                let status = if notes.is_empty() { "empty" } else { "ok" };
                let mean_velocity = if notes.is_empty() {
                    None
                } else {
                    Some(
                        notes.iter().map(|n| n.velocity as f32).sum::<f32>() / notes.len() as f32,
                    )
                };
                StemSummary {
                    name: name.clone(),
                    status: status.to_string(),
                    error: None,
                    duration_sec: output.duration_sec,
                    note_count: notes.len(),
                    event_count: output.events.len(),
                    min_pitch: notes.iter().map(|n| n.pitch_midi).min(),
                    max_pitch: notes.iter().map(|n| n.pitch_midi).max(),
                    mean_velocity,
                }
            }
            Err(err) => StemSummary {
                name: name.clone(),
                status: "failed".to_string(),
                error: Some(err.to_string()),
                duration_sec: 0.0,
                note_count: 0,
                event_count: 0,
                min_pitch: None,
                max_pitch: None,
                mean_velocity: None,
            },
        })
        .collect();

    AnalysisResults {
        version: env!("CARGO_PKG_VERSION").to_string(),
        source: source.to_string(),
        sample_rate,
        stems,
    }
}
