//! Digital filters for glove signal conditioning
//!
//! The bandpass is a Butterworth design realised as cascaded biquad sections
//! and applied forward and backward, so it introduces no phase shift. The
//! initial states of both passes are chosen by least squares so the forward
//! and backward orderings agree (Gustafsson's method). No edge padding is
//! needed and the end transients stay small, which matters downstream where
//! the filtered signal is integrated twice.

use crate::config::FilterSettings;
use glove_core::stats::remove_mean;
use glove_core::{AnalysisReporter, GloveError, GloveResult};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Single biquad section (2nd order)
///
/// `y[n] = b0*x[n] + b1*x[n-1] + b2*x[n-2] - a1*y[n-1] - a2*y[n-2]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiquadSection {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadSection {
    /// Response magnitude at normalized angular frequency `omega` (rad/sample)
    pub fn magnitude_at(&self, omega: f64) -> f64 {
        let z1 = Complex64::from_polar(1.0, -omega);
        let z2 = z1 * z1;
        let num = self.b0 + z1 * self.b1 + z2 * self.b2;
        let den = 1.0 + z1 * self.a1 + z2 * self.a2;
        (num / den).norm()
    }

    fn run(&self, data: &mut [f64], mut state: [f64; 2]) {
        for x in data.iter_mut() {
            let input = *x;
            let output = self.b0 * input + state[0];
            state[0] = self.b1 * input - self.a1 * output + state[1];
            state[1] = self.b2 * input - self.a2 * output;
            *x = output;
        }
    }
}

/// Butterworth bandpass as a cascade of biquad sections
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ButterworthBandpass {
    sections: Vec<BiquadSection>,
}

impl ButterworthBandpass {
    /// Design the bandpass for a sampling rate
    ///
    /// Corners are normalized by Nyquist and the upper one is clamped to
    /// `max_normalized_high`. Returns `Ok(None)` when the clamped band is
    /// empty (for example a sampling rate too low for the lower corner).
    pub fn design(settings: &FilterSettings, sampling_rate: f64) -> GloveResult<Option<Self>> {
        if !(sampling_rate > 0.0 && sampling_rate.is_finite()) {
            return Err(GloveError::degenerate(
                "bandpass design",
                format!("invalid sampling rate {}", sampling_rate),
            ));
        }
        if settings.order == 0 || settings.order % 2 != 0 {
            return Err(GloveError::degenerate(
                "bandpass design",
                format!("prototype order {} is not even", settings.order),
            ));
        }

        let nyquist = sampling_rate / 2.0;
        let low = settings.low_cutoff_hz / nyquist;
        let high = (settings.high_cutoff_hz / nyquist).min(settings.max_normalized_high);
        if low <= 0.0 || low >= high {
            return Ok(None);
        }

        // Pre-warped analog corners for a bilinear transform with fs = 2
        let warped_low = 4.0 * (PI * low / 2.0).tan();
        let warped_high = 4.0 * (PI * high / 2.0).tan();
        let bandwidth = warped_high - warped_low;
        let center = (warped_low * warped_high).sqrt();
        let center_omega = 2.0 * (center / 4.0).atan();

        let n = settings.order as i32;
        let mut sections = Vec::with_capacity(settings.order);
        for m in (-n + 1..n).step_by(2) {
            let prototype = -Complex64::from_polar(1.0, PI * m as f64 / (2.0 * n as f64));
            let half = prototype * (bandwidth / 2.0);
            let spread = (half * half - center * center).sqrt();

            for pole in [half + spread, half - spread] {
                if pole.im <= 0.0 {
                    continue;
                }
                let z = (4.0 + pole) / (4.0 - pole);
                let mut section = BiquadSection {
                    b0: 1.0,
                    b1: 0.0,
                    b2: -1.0,
                    a1: -2.0 * z.re,
                    a2: z.norm_sqr(),
                };

                let gain = section.magnitude_at(center_omega);
                if !(gain.is_finite() && gain > 0.0) || z.norm() >= 1.0 {
                    return Err(GloveError::degenerate(
                        "bandpass design",
                        format!("unstable section for band {:.4}-{:.4}", low, high),
                    ));
                }
                section.b0 /= gain;
                section.b2 /= gain;
                sections.push(section);
            }
        }

        Ok(Some(ButterworthBandpass { sections }))
    }

    pub fn sections(&self) -> &[BiquadSection] {
        &self.sections
    }

    /// Number of filter states, two per section
    fn order(&self) -> usize {
        2 * self.sections.len()
    }

    /// Shortest signal `filtfilt` accepts
    pub fn min_len(&self) -> usize {
        3 * (self.order() + 1)
    }

    /// Magnitude response of the cascade at a frequency in Hz
    pub fn magnitude_at(&self, freq_hz: f64, sampling_rate: f64) -> f64 {
        let omega = 2.0 * PI * freq_hz / sampling_rate;
        self.sections.iter().map(|s| s.magnitude_at(omega)).product()
    }

    /// Zero-phase forward-backward filtering
    pub fn filtfilt(&self, signal: &[f64]) -> GloveResult<Vec<f64>> {
        let n = signal.len();
        let min_len = self.min_len();
        if n < min_len {
            return Err(GloveError::degenerate(
                "bandpass",
                format!("signal of {} samples is shorter than the {} sample minimum", n, min_len),
            ));
        }

        let initial = self.initial_states(signal);
        let (forward, backward) = initial.split_at(self.order());

        let mut filtered = signal.to_vec();
        self.run_cascade(&mut filtered, forward);
        filtered.reverse();
        self.run_cascade(&mut filtered, backward);
        filtered.reverse();

        if filtered.iter().any(|v| !v.is_finite()) {
            return Err(GloveError::degenerate("bandpass", "non-finite filter output"));
        }
        Ok(filtered)
    }

    /// Forward then backward initial states, concatenated
    ///
    /// Minimises the difference between forward-backward and
    /// backward-forward filtering over the whole signal.
    fn initial_states(&self, signal: &[f64]) -> Vec<f64> {
        let n = signal.len();
        let order = self.order();

        // Zero-input response of the cascade to each unit state, and that
        // response passed backward through the cascade
        let mut forward_columns = Vec::with_capacity(order);
        let mut backward_columns = Vec::with_capacity(order);
        for j in 0..order {
            let mut state = vec![0.0; order];
            state[j] = 1.0;
            let mut response = vec![0.0; n];
            self.run_cascade(&mut response, &state);

            let mut refiltered: Vec<f64> = response.iter().rev().copied().collect();
            self.run_cascade(&mut refiltered, &[]);

            forward_columns.push((0..n).map(|i| refiltered[n - 1 - i] - response[i]).collect::<Vec<f64>>());
            backward_columns.push((0..n).map(|i| response[n - 1 - i] - refiltered[i]).collect::<Vec<f64>>());
        }
        forward_columns.extend(backward_columns);

        let mut forward_backward = signal.to_vec();
        self.run_cascade(&mut forward_backward, &[]);
        forward_backward.reverse();
        self.run_cascade(&mut forward_backward, &[]);
        forward_backward.reverse();

        let mut backward_forward: Vec<f64> = signal.iter().rev().copied().collect();
        self.run_cascade(&mut backward_forward, &[]);
        backward_forward.reverse();
        self.run_cascade(&mut backward_forward, &[]);

        let mismatch: Vec<f64> = backward_forward
            .iter()
            .zip(&forward_backward)
            .map(|(bf, fb)| bf - fb)
            .collect();
        least_squares(&forward_columns, &mismatch)
    }

    /// One pass through all sections, two state values per section
    ///
    /// Missing state values start at zero.
    fn run_cascade(&self, data: &mut [f64], state: &[f64]) {
        for (k, section) in self.sections.iter().enumerate() {
            let z1 = state.get(2 * k).copied().unwrap_or(0.0);
            let z2 = state.get(2 * k + 1).copied().unwrap_or(0.0);
            section.run(data, [z1, z2]);
        }
    }
}

/// Least-squares solution of `columns * x = rhs`
///
/// Gram-Schmidt QR with one reorthogonalisation pass. Columns that are
/// numerically dependent on earlier ones get a zero coefficient.
fn least_squares(columns: &[Vec<f64>], rhs: &[f64]) -> Vec<f64> {
    let m = columns.len();
    let dot = |a: &[f64], b: &[f64]| a.iter().zip(b).map(|(x, y)| x * y).sum::<f64>();

    let mut q: Vec<Vec<f64>> = Vec::with_capacity(m);
    let mut r = vec![vec![0.0; m]; m];
    for (j, column) in columns.iter().enumerate() {
        let mut v = column.clone();
        for _ in 0..2 {
            for (i, basis) in q.iter().enumerate() {
                let projection = dot(basis, &v);
                r[i][j] += projection;
                v.iter_mut().zip(basis).for_each(|(x, b)| *x -= projection * b);
            }
        }
        let norm = dot(&v, &v).sqrt();
        r[j][j] = norm;
        if norm > 0.0 {
            v.iter_mut().for_each(|x| *x /= norm);
        }
        q.push(v);
    }

    let projected: Vec<f64> = q.iter().map(|basis| dot(basis, rhs)).collect();
    let scale = r.first().map_or(0.0, |row| row[0].abs());
    let mut x = vec![0.0; m];
    for j in (0..m).rev() {
        if r[j][j].abs() <= 1e-14 * scale {
            continue;
        }
        let tail: f64 = (j + 1..m).map(|k| r[j][k] * x[k]).sum();
        x[j] = (projected[j] - tail) / r[j][j];
    }
    x
}

/// Subtract the mean (DC removal)
pub fn remove_dc(signal: &[f64]) -> Vec<f64> {
    remove_mean(signal)
}

/// DC removal followed by zero-phase bandpass filtering
///
/// Fails with `NumericDegeneracy` when the filter cannot be designed or
/// applied. An empty pass band is not an error: the DC-removed signal is
/// returned unfiltered.
pub fn try_bandpass(signal: &[f64], sampling_rate: f64, settings: &FilterSettings) -> GloveResult<Vec<f64>> {
    let centered = remove_dc(signal);
    match ButterworthBandpass::design(settings, sampling_rate)? {
        Some(filter) => filter.filtfilt(&centered),
        None => {
            tracing::debug!(
                sampling_rate,
                low = settings.low_cutoff_hz,
                high = settings.high_cutoff_hz,
                "pass band empty after normalization, skipping bandpass"
            );
            Ok(centered)
        }
    }
}

/// Bandpass that never fails: degeneracies are reported and the DC-removed
/// signal is returned instead
pub fn bandpass(
    signal: &[f64],
    sampling_rate: f64,
    settings: &FilterSettings,
    reporter: &dyn AnalysisReporter,
) -> Vec<f64> {
    match try_bandpass(signal, sampling_rate, settings) {
        Ok(filtered) => filtered,
        Err(err) => {
            reporter.degraded(&err);
            remove_dc(signal)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glove_core::{CollectingReporter, ReportLevel};

    fn sine(freq: f64, fs: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| (2.0 * PI * freq * i as f64 / fs).sin()).collect()
    }

    #[test]
    fn test_design_has_one_section_per_pole_pair() {
        let filter = ButterworthBandpass::design(&FilterSettings::default(), 100.0)
            .unwrap()
            .unwrap();
        assert_eq!(filter.sections().len(), 4);
        assert_eq!(filter.min_len(), 27);
        for s in filter.sections() {
            // poles inside the unit circle
            assert!(s.a2 < 1.0 && s.a2 > 0.0);
        }
    }

    #[test]
    fn test_bandpass_response() {
        let settings = FilterSettings::default();
        let fs = 100.0;
        let filter = ButterworthBandpass::design(&settings, fs).unwrap().unwrap();

        // -3 dB at both corners
        assert!((filter.magnitude_at(1.0, fs) - 0.5f64.sqrt()).abs() < 1e-6);
        assert!((filter.magnitude_at(20.0, fs) - 0.5f64.sqrt()).abs() < 1e-6);
        assert!(filter.magnitude_at(5.0, fs) > 0.99);
        assert!(filter.magnitude_at(0.1, fs) < 1e-3);
        assert!(filter.magnitude_at(45.0, fs) < 0.05);
    }

    #[test]
    fn test_high_corner_clamped_to_nyquist() {
        // 20 Hz is above the 15 Hz Nyquist of a 30 Hz capture
        let filter = ButterworthBandpass::design(&FilterSettings::default(), 30.0).unwrap();
        assert!(filter.is_some());
    }

    #[test]
    fn test_empty_band_skips_filtering() {
        // Nyquist of 1.5 Hz puts the lower corner above the clamped upper one
        let settings = FilterSettings::default();
        assert!(ButterworthBandpass::design(&settings, 1.5).unwrap().is_none());

        let signal: Vec<f64> = (0..50).map(|i| 3.0 + i as f64 * 0.1).collect();
        let out = try_bandpass(&signal, 1.5, &settings).unwrap();
        assert_eq!(out, remove_dc(&signal));
    }

    #[test]
    fn test_dc_removal_constant_offset() {
        let out = remove_dc(&[42.0; 64]);
        assert!(out.iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn test_filtfilt_is_zero_phase() {
        let fs = 100.0;
        let signal = sine(5.0, fs, 400);
        let out = try_bandpass(&signal, fs, &FilterSettings::default()).unwrap();

        // compare peak positions over one period away from the edges
        let peak = |data: &[f64]| {
            (100..120)
                .max_by(|&a, &b| data[a].total_cmp(&data[b]))
                .unwrap_or(0)
        };
        let shift = peak(&signal) as i64 - peak(&out) as i64;
        assert!(shift.abs() <= 1, "peak moved by {} samples", shift);
        assert!((out[200] - signal[200]).abs() < 0.02);
    }

    #[test]
    fn test_filtfilt_edges_follow_in_band_signal() {
        // 26.5 cycles: neither end sits at a zero crossing
        let fs = 100.0;
        let signal: Vec<f64> = (0..530).map(|i| (2.0 * PI * 5.0 * i as f64 / fs + 1.0).sin()).collect();
        let filter = ButterworthBandpass::design(&FilterSettings::default(), fs).unwrap().unwrap();
        let out = filter.filtfilt(&signal).unwrap();

        let worst = signal.iter().zip(&out).map(|(a, b)| (a - b).abs()).fold(0.0, f64::max);
        assert!(worst < 0.03, "largest deviation {}", worst);
    }

    #[test]
    fn test_least_squares_recovers_exact_solution() {
        let columns = vec![vec![1.0, 0.0, 1.0, 2.0], vec![0.0, 1.0, 1.0, -1.0]];
        let rhs: Vec<f64> = (0..4).map(|i| 2.0 * columns[0][i] - 3.0 * columns[1][i]).collect();
        let x = least_squares(&columns, &rhs);
        assert!((x[0] - 2.0).abs() < 1e-12);
        assert!((x[1] + 3.0).abs() < 1e-12);

        // a repeated column is ignored
        let x = least_squares(&[columns[0].clone(), columns[0].clone()], &columns[0]);
        assert!((x[0] - 1.0).abs() < 1e-12);
        assert_eq!(x[1], 0.0);
    }

    #[test]
    fn test_filtfilt_removes_out_of_band() {
        let fs = 100.0;
        let slow = sine(0.05, fs, 1000);
        let out = try_bandpass(&slow, fs, &FilterSettings::default()).unwrap();
        let peak = out[200..800].iter().fold(0.0f64, |m, v| m.max(v.abs()));
        assert!(peak < 0.05);
    }

    #[test]
    fn test_short_signal_falls_back() {
        let reporter = CollectingReporter::new();
        let signal: Vec<f64> = (0..20).map(|i| 1.0 + i as f64).collect();
        let out = bandpass(&signal, 100.0, &FilterSettings::default(), &reporter);

        assert_eq!(out, remove_dc(&signal));
        assert_eq!(reporter.messages(ReportLevel::Degraded).len(), 1);
    }
}
