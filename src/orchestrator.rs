//! Per-stem dispatch, isolation and result collection

use crate::analysis::{MidiEvent, Note};
use crate::audio::{self, Stem, StemState};
use crate::config::Config;
use crate::error::{Result as W2mResult, Wave2MidiError};
use crossbeam_channel::unbounded;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread;

/// Successful output of one stem's pipeline run
#[derive(Debug, Clone)]
pub struct StemOutput {
    pub duration_sec: f32,
    pub notes: Vec<Note>,
    pub events: Vec<MidiEvent>,
}

/// Outcome per stem, keyed by stem name. A stem with zero notes is a
/// successful empty output, distinct from a failure.
pub type StemResults = BTreeMap<String, W2mResult<StemOutput>>;

/// Run the pipeline for every stem on a bounded worker pool.
///
/// Stems are independent: a failing or panicking stem is recorded against
/// its own name and never aborts the siblings.
pub fn run(stems: Vec<Stem>, config: &Config) -> StemResults {
    let worker_count = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(stems.len())
        .max(1);

    let (job_tx, job_rx) = unbounded::<(usize, Stem)>();
    let (result_tx, result_rx) = unbounded::<(String, W2mResult<StemOutput>)>();

    for job in stems.into_iter().enumerate() {
        // The receiver is alive until the workers drain the queue
        let _ = job_tx.send(job);
    }
    drop(job_tx);

    thread::scope(|scope| {
        for _ in 0..worker_count {
            let job_rx = job_rx.clone();
            let result_tx = result_tx.clone();
            scope.spawn(move || {
                while let Ok((index, stem)) = job_rx.recv() {
                    let name = stem.name.clone();
                    let outcome = run_stem(index, stem, config);
                    let _ = result_tx.send((name, outcome));
                }
            });
        }
    });
    drop(result_tx);

    result_rx.into_iter().collect()
}

/// One stem's isolated pipeline run. Panics inside a stage are converted
/// into a recorded failure instead of tearing down the batch.
fn run_stem(index: usize, stem: Stem, config: &Config) -> W2mResult<StemOutput> {
    audio::validate_stem(&stem, config)?;
    let channel = (index % 16) as u8;

    let result = catch_unwind(AssertUnwindSafe(|| -> W2mResult<StemOutput> {
        let mut state = StemState::new(stem, channel);
        crate::run_pipeline(&mut state, config)?;
        Ok(StemOutput {
            duration_sec: state.duration_sec(),
            notes: state.notes,
            events: state.events,
        })
    }));

    match result {
        Ok(outcome) => outcome,
        Err(panic) => Err(Wave2MidiError::StemPanicked(panic_message(panic.as_ref()))),
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tone(freq: f32, duration_sec: f32, sr: u32) -> Vec<f32> {
        (0..(duration_sec * sr as f32) as usize)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sr as f32).sin() * 0.5)
            .collect()
    }

    #[test]
    fn test_failed_stem_does_not_abort_siblings() {
        let config = Config::default();
        let stems = vec![
            Stem {
                name: "bad".to_string(),
                samples: Vec::new(),
                sample_rate: 22050,
            },
            Stem {
                name: "good".to_string(),
                samples: tone(440.0, 1.0, 22050),
                sample_rate: 22050,
            },
        ];

        let results = run(stems, &config);
        assert_eq!(results.len(), 2);
        assert!(results["bad"].is_err());
        let good = results["good"].as_ref().expect("sibling must complete");
        assert!(!good.notes.is_empty());
    }

    #[test]
    fn test_silent_stem_is_successful_empty_result() {
        let config = Config::default();
        let stems = vec![Stem {
            name: "silence".to_string(),
            samples: vec![0.0; 22050],
            sample_rate: 22050,
        }];

        let results = run(stems, &config);
        let output = results["silence"].as_ref().expect("silence is not an error");
        assert!(output.notes.is_empty());
        assert!(output.events.is_empty());
    }

    #[test]
    fn test_results_keyed_by_stem_name() {
        let config = Config::default();
        let stems = vec![
            Stem {
                name: "vocals".to_string(),
                samples: tone(440.0, 0.5, 22050),
                sample_rate: 22050,
            },
            Stem {
                name: "bass".to_string(),
                samples: tone(110.0, 0.5, 22050),
                sample_rate: 22050,
            },
        ];

        let results = run(stems, &config);
        assert!(results.contains_key("vocals"));
        assert!(results.contains_key("bass"));
    }
}
