//! Audio I/O and per-stem pipeline state

use crate::analysis::{Frame, MidiEvent, Note, NoteCandidate};
use crate::config::Config;
use crate::error::{Result as W2mResult, Wave2MidiError};
use hound::WavReader;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use std::path::Path;

/// One isolated instrumental/vocal signal, as produced by the separator
#[derive(Debug, Clone)]
pub struct Stem {
    pub name: String,
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Per-stem state threaded through the pipeline stages
#[derive(Debug, Clone)]
pub struct StemState {
    pub name: String,
    /// Mono samples, normalized to [-1, 1]
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sr: u32,
    /// Output MIDI channel assigned to this stem
    pub channel: u8,

    // Stage 1: frame analysis
    pub frames: Vec<Frame>,
    // Stage 2: note segmentation
    pub candidates: Vec<NoteCandidate>,
    // Stage 3: velocity mapping
    pub notes: Vec<Note>,
    // Stage 4: event scheduling
    pub events: Vec<MidiEvent>,
}

impl StemState {
    pub fn new(stem: Stem, channel: u8) -> Self {
        StemState {
            name: stem.name,
            samples: stem.samples,
            sr: stem.sample_rate,
            channel,
            frames: Vec::new(),
            candidates: Vec::new(),
            notes: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Create a test StemState from synthetic audio data
    pub fn from_test_samples(samples: Vec<f32>, sr: u32) -> Self {
        StemState::new(
            Stem {
                name: "test".to_string(),
                samples,
                sample_rate: sr,
            },
            0,
        )
    }

    /// Get stem duration in seconds
    pub fn duration_sec(&self) -> f32 {
        self.samples.len() as f32 / self.sr as f32
    }

    /// Get number of samples
    pub fn n_samples(&self) -> usize {
        self.samples.len()
    }
}

/// Validate a stem before dispatching its pipeline run
pub fn validate_stem(stem: &Stem, config: &Config) -> W2mResult<()> {
    if stem.samples.is_empty() {
        return Err(Wave2MidiError::EmptyStem(stem.name.clone()));
    }
    if stem.sample_rate != config.audio.sample_rate {
        return Err(Wave2MidiError::UnsupportedSampleRate(stem.sample_rate));
    }
    Ok(())
}

/// Load a WAV file as mono samples with its sample rate
pub fn load_wav_file<P: AsRef<Path>>(path: P) -> W2mResult<(Vec<f32>, u32)> {
    let mut reader =
        WavReader::open(path).map_err(|e| Wave2MidiError::AudioFileError(e.to_string()))?;
    let spec = reader.spec();

    if spec.channels == 0 || spec.channels > 2 {
        return Err(Wave2MidiError::InvalidAudioFormat(format!(
            "unsupported channel count: {}",
            spec.channels
        )));
    }

    if !matches!(
        spec.sample_format,
        hound::SampleFormat::Int | hound::SampleFormat::Float
    ) {
        return Err(Wave2MidiError::InvalidAudioFormat(
            "unsupported sample format".to_string(),
        ));
    }

    if spec.bits_per_sample > 32 {
        return Err(Wave2MidiError::InvalidAudioFormat(format!(
            "unsupported bit depth: {}",
            spec.bits_per_sample
        )));
    }

    let sr = spec.sample_rate;
    let mut samples: Vec<f32> = Vec::with_capacity(reader.len() as usize);

    match spec.sample_format {
        hound::SampleFormat::Int => {
            let max_value = (1i64 << (spec.bits_per_sample - 1)) as f32;
            for sample in reader.samples::<i32>() {
                let sample = sample.map_err(|e| Wave2MidiError::AudioFileError(e.to_string()))?
                    as f32
                    / max_value;
                samples.push(sample);
            }
        }
        hound::SampleFormat::Float => {
            for sample in reader.samples::<f32>() {
                samples.push(sample.map_err(|e| Wave2MidiError::AudioFileError(e.to_string()))?);
            }
        }
    }

    // Downmix stereo by averaging channels
    let samples = if spec.channels == 2 {
        downmix_stereo(&samples)
    } else {
        samples
    };

    Ok((samples, sr))
}

/// Average interleaved stereo samples into mono
pub fn downmix_stereo(interleaved: &[f32]) -> Vec<f32> {
    interleaved
        .chunks_exact(2)
        .map(|pair| (pair[0] + pair[1]) / 2.0)
        .collect()
}

/// Resample a mono signal to the target rate with a windowed-sinc resampler
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> W2mResult<Vec<f32>> {
    if from_rate == to_rate {
        return Ok(samples.to_vec());
    }
    if samples.is_empty() {
        return Ok(Vec::new());
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = to_rate as f64 / from_rate as f64;
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, samples.len(), 1)
        .map_err(|e| Wave2MidiError::AudioFileError(format!("resampler setup failed: {}", e)))?;

    let channels = vec![samples.to_vec()];
    let mut output = resampler
        .process(&channels, None)
        .map_err(|e| Wave2MidiError::AudioFileError(format!("resampling failed: {}", e)))?;

    Ok(output.swap_remove(0))
}

/// Validate an input audio file without keeping its contents
pub fn validate_audio_file<P: AsRef<Path>>(path: P) -> W2mResult<()> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(Wave2MidiError::InputValidationError(format!(
            "audio file does not exist: {}",
            path.display()
        )));
    }

    let (samples, sr) = load_wav_file(path)?;

    if samples.is_empty() {
        return Err(Wave2MidiError::InputValidationError(
            "audio file contains no samples".to_string(),
        ));
    }

    if !(8000..=192000).contains(&sr) {
        return Err(Wave2MidiError::UnsupportedSampleRate(sr));
    }

    Ok(())
}

/// RMS energy of a sample window
pub fn rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|&x| x * x).sum::<f32>() / samples.len() as f32).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rms_of_constant_signal() {
        let samples = vec![0.5; 1000];
        assert!((rms(&samples) - 0.5).abs() < 1e-6);
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn test_rms_of_sine() {
        let sr = 22050;
        let samples: Vec<f32> = (0..sr)
            .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / sr as f32).sin())
            .collect();
        // Full-scale sine has RMS 1/sqrt(2)
        assert!((rms(&samples) - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-3);
    }

    #[test]
    fn test_downmix_stereo_averages_channels() {
        let interleaved = vec![1.0, 0.0, 0.5, -0.5, -1.0, 1.0];
        assert_eq!(downmix_stereo(&interleaved), vec![0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_validate_stem_rejects_empty_and_mismatched() {
        let config = Config::default();
        let empty = Stem {
            name: "vocals".to_string(),
            samples: Vec::new(),
            sample_rate: 22050,
        };
        assert!(matches!(
            validate_stem(&empty, &config),
            Err(Wave2MidiError::EmptyStem(_))
        ));

        let mismatched = Stem {
            name: "bass".to_string(),
            samples: vec![0.0; 100],
            sample_rate: 44100,
        };
        assert!(matches!(
            validate_stem(&mismatched, &config),
            Err(Wave2MidiError::UnsupportedSampleRate(44100))
        ));
    }

    #[test]
    fn test_resample_identity_and_length() {
        let samples = vec![0.1f32; 4410];
        let same = resample(&samples, 44100, 44100).unwrap();
        assert_eq!(same.len(), samples.len());

        let halved = resample(&samples, 44100, 22050).unwrap();
        // Windowed-sinc output length is approximate at the edges
        let expected = samples.len() / 2;
        assert!((halved.len() as i64 - expected as i64).abs() < 64);
    }
}
