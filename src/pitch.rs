//! YIN fundamental-frequency estimation
//!
//! Difference function, cumulative mean normalized difference (CMNDF),
//! absolute-threshold minimum pick and parabolic interpolation. The
//! difference function is computed through an FFT cross-correlation so
//! large analysis windows stay cheap.

use rustfft::{num_complex::Complex32, Fft, FftPlanner};
use std::sync::Arc;

/// First CMNDF dip below this is taken as the period
const YIN_THRESHOLD: f32 = 0.15;
/// Frames whose best CMNDF stays above this are treated as unvoiced
const UNVOICED_CMNDF: f32 = 0.5;

/// Per-frame estimate: pitch (if voiced) and a smooth voicing confidence
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameEstimate {
    pub f0_hz: Option<f32>,
    pub voicing_prob: f32,
}

/// YIN pitch detector with reusable FFT plans and scratch buffers
pub struct YinDetector {
    sample_rate: f32,
    frame_length: usize,
    fmin: f32,
    fmax: f32,
    tau_min: usize,
    tau_max: usize,
    fft_len: usize,
    fft: Arc<dyn Fft<f32>>,
    ifft: Arc<dyn Fft<f32>>,
    spec_a: Vec<Complex32>,
    spec_b: Vec<Complex32>,
    prefix_energy: Vec<f32>,
    diff: Vec<f32>,
    cmndf: Vec<f32>,
}

impl YinDetector {
    pub fn new(sample_rate: u32, frame_length: usize, fmin: f32, fmax: f32) -> Self {
        let sr = sample_rate as f32;
        let half = frame_length / 2;
        // Lag bounds follow the pitch search band; lag 0/1 are degenerate
        let tau_min = ((sr / fmax).floor() as usize).max(2);
        let tau_max = ((sr / fmin).ceil() as usize).min(half.saturating_sub(2));
        let fft_len = (frame_length + half).next_power_of_two();

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_len);
        let ifft = planner.plan_fft_inverse(fft_len);

        YinDetector {
            sample_rate: sr,
            frame_length,
            fmin,
            fmax,
            tau_min,
            tau_max,
            fft_len,
            fft,
            ifft,
            spec_a: vec![Complex32::new(0.0, 0.0); fft_len],
            spec_b: vec![Complex32::new(0.0, 0.0); fft_len],
            prefix_energy: vec![0.0; frame_length + 1],
            diff: vec![0.0; half],
            cmndf: vec![0.0; half],
        }
    }

    /// Estimate pitch and voicing for one analysis window.
    ///
    /// The window must be exactly `frame_length` samples (zero-padded by the
    /// caller when the signal runs out).
    pub fn estimate(&mut self, frame: &[f32]) -> FrameEstimate {
        debug_assert_eq!(frame.len(), self.frame_length);
        let half = self.frame_length / 2;

        if self.tau_min >= self.tau_max {
            return FrameEstimate {
                f0_hz: None,
                voicing_prob: 0.0,
            };
        }

        self.calculate_difference(frame, half);
        self.calculate_cmndf(half);

        let (tau, best_cmndf) = self.find_best_tau();
        let voicing_prob = (1.0 - best_cmndf).clamp(0.0, 1.0);

        let f0_hz = tau.and_then(|tau| {
            let tau_refined = self.parabolic_interpolation(tau);
            let frequency = self.sample_rate / tau_refined;
            // Out-of-band frequencies are a voicing failure for the frame
            if frequency >= self.fmin && frequency <= self.fmax {
                Some(frequency)
            } else {
                None
            }
        });

        FrameEstimate { f0_hz, voicing_prob }
    }

    /// Difference function d(tau) = E0 + E(tau) - 2*r(tau), with the
    /// correlation r computed by FFT and the window energies by prefix sums
    fn calculate_difference(&mut self, frame: &[f32], half: usize) {
        self.prefix_energy[0] = 0.0;
        for (i, &x) in frame.iter().enumerate() {
            self.prefix_energy[i + 1] = self.prefix_energy[i] + x * x;
        }

        for (i, slot) in self.spec_a.iter_mut().enumerate() {
            *slot = if i < frame.len() {
                Complex32::new(frame[i], 0.0)
            } else {
                Complex32::new(0.0, 0.0)
            };
        }
        for (i, slot) in self.spec_b.iter_mut().enumerate() {
            *slot = if i < half {
                Complex32::new(frame[i], 0.0)
            } else {
                Complex32::new(0.0, 0.0)
            };
        }

        self.fft.process(&mut self.spec_a);
        self.fft.process(&mut self.spec_b);
        for (a, b) in self.spec_a.iter_mut().zip(&self.spec_b) {
            *a *= b.conj();
        }
        self.ifft.process(&mut self.spec_a);

        let scale = 1.0 / self.fft_len as f32;
        let e0 = self.prefix_energy[half];
        for tau in 0..half {
            let lag_energy = self.prefix_energy[tau + half] - self.prefix_energy[tau];
            let correlation = self.spec_a[tau].re * scale;
            self.diff[tau] = (e0 + lag_energy - 2.0 * correlation).max(0.0);
        }
    }

    /// Cumulative mean normalized difference
    fn calculate_cmndf(&mut self, half: usize) {
        self.cmndf[0] = 1.0;
        let mut running_sum = 0.0;

        for tau in 1..half {
            running_sum += self.diff[tau];
            if running_sum > 0.0 {
                self.cmndf[tau] = self.diff[tau] * tau as f32 / running_sum;
            } else {
                self.cmndf[tau] = 1.0;
            }
        }
    }

    /// First local minimum below the absolute threshold, else the global
    /// minimum when it is plausible enough; `None` marks an unvoiced frame
    fn find_best_tau(&self) -> (Option<usize>, f32) {
        for tau in self.tau_min..self.tau_max {
            if self.cmndf[tau] < YIN_THRESHOLD && self.cmndf[tau] < self.cmndf[tau + 1] {
                return (Some(tau), self.cmndf[tau]);
            }
        }

        let mut min_tau = self.tau_min;
        let mut min_val = self.cmndf[self.tau_min];
        for tau in self.tau_min..self.tau_max {
            if self.cmndf[tau] < min_val {
                min_val = self.cmndf[tau];
                min_tau = tau;
            }
        }

        if min_val < UNVOICED_CMNDF {
            (Some(min_tau), min_val)
        } else {
            (None, min_val)
        }
    }

    /// Parabolic interpolation around the picked lag for sub-sample precision
    fn parabolic_interpolation(&self, tau: usize) -> f32 {
        if tau == 0 || tau >= self.cmndf.len() - 1 {
            return tau as f32;
        }

        let s0 = self.cmndf[tau - 1];
        let s1 = self.cmndf[tau];
        let s2 = self.cmndf[tau + 1];

        let denom = 2.0 * (s0 - 2.0 * s1 + s2);
        if denom.abs() < f32::EPSILON {
            return tau as f32;
        }

        let adjustment = (s0 - s2) / denom;
        if adjustment.is_finite() && adjustment.abs() < 1.0 {
            tau as f32 + adjustment
        } else {
            tau as f32
        }
    }
}
