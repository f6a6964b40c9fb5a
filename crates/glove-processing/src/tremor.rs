//! Tremor comparison between the analog position sensor and the accelerometer
//!
//! `value1` carries the analog angle sensor (raw ADC), `value2` the
//! accelerometer Y axis (g). Both are bandpassed, analysed spectrally and
//! turned into displacement traces that are then compared sample by sample.

use crate::config::AnalysisConfig;
use crate::extrema::{find_extrema, ExtremaSet};
use crate::filters::bandpass;
use crate::kinematics::{
    analog_amplitude_mm, analog_amplitude_over_time, analog_displacement, integrated_amplitude_over_time,
    try_integrate_band_limited, AmplitudeSeries, DisplacementTrace,
};
use crate::spectrum::{analyze_frequency, classify_tremor, FrequencySpectrum, TremorClass};
use glove_core::stats::{mean, pearson, rms, std_dev};
use glove_core::{AnalysisReporter, Capture, Channel, Correlation, GloveError, GloveResult, MeasurementMode};
use serde::{Deserialize, Serialize};

/// How well the two displacement traces agree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgreementLevel {
    Excellent,
    Good,
    Moderate,
    Poor,
}

impl AgreementLevel {
    pub fn from_correlation(r: f64) -> Self {
        if r > 0.8 {
            AgreementLevel::Excellent
        } else if r > 0.6 {
            AgreementLevel::Good
        } else if r > 0.4 {
            AgreementLevel::Moderate
        } else {
            AgreementLevel::Poor
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AgreementLevel::Excellent => "Excellent displacement agreement",
            AgreementLevel::Good => "Good displacement agreement",
            AgreementLevel::Moderate => "Moderate displacement agreement",
            AgreementLevel::Poor => "Poor displacement agreement",
        }
    }
}

/// Statistics of analog minus accelerometer displacement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplacementAgreement {
    pub correlation: Option<Correlation>,
    pub agreement: Option<AgreementLevel>,
    /// Mean difference (mm)
    pub mean_difference: f64,
    /// Standard deviation of the difference (mm)
    pub std_difference: f64,
    /// RMS difference (mm)
    pub rms_difference: f64,
    /// Accelerometer average peak-to-trough distance (mm)
    pub accel_peak_to_trough: Option<f64>,
    /// Absolute difference of the two peak-to-trough distances (mm)
    pub peak_to_trough_difference: Option<f64>,
    /// Larger over smaller peak-to-trough distance
    pub peak_to_trough_ratio: Option<f64>,
}

/// Full result of a tremor comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TremorComparison {
    pub sampling_rate: f64,
    pub sample_count: usize,
    pub analog_spectrum: FrequencySpectrum,
    pub accel_spectrum: FrequencySpectrum,
    /// Classification from the accelerometer's dominant frequency
    pub classification: TremorClass,
    pub analog_amplitude_mm: f64,
    pub accel_amplitude_mm: Option<f64>,
    /// Analog displacement aligned to start at zero (mm)
    pub analog_displacement: DisplacementTrace,
    /// Accelerometer displacement aligned to start at zero (mm)
    pub accel_displacement: Option<DisplacementTrace>,
    pub analog_extrema: ExtremaSet,
    pub accel_extrema: Option<ExtremaSet>,
    pub analog_peak_to_trough: Option<f64>,
    /// Absent when only the analog displacement could be computed
    pub agreement: Option<DisplacementAgreement>,
    pub analog_amplitude_over_time: AmplitudeSeries,
    pub accel_amplitude_over_time: AmplitudeSeries,
}

/// Analog vs accelerometer tremor comparison for tremor captures
pub struct TremorComparator<'a> {
    config: &'a AnalysisConfig,
    reporter: &'a dyn AnalysisReporter,
}

impl<'a> TremorComparator<'a> {
    pub fn new(config: &'a AnalysisConfig, reporter: &'a dyn AnalysisReporter) -> Self {
        Self { config, reporter }
    }

    pub fn compare(&self, capture: &Capture) -> GloveResult<TremorComparison> {
        capture.require_mode("Tremor comparison", MeasurementMode::Tremor)?;
        let paired = capture.paired_channels(Channel::Value1, Channel::Value2)?;
        self.compare_series(&paired.time, &paired.first, &paired.second)
    }

    /// Compare cleaned analog (ADC) and accelerometer (g) series
    pub fn compare_series(&self, time: &[f64], analog: &[f64], accel: &[f64]) -> GloveResult<TremorComparison> {
        let min_samples = self.config.comparison.min_samples;
        let n = time.len().min(analog.len()).min(accel.len());
        if n < min_samples {
            return Err(GloveError::InsufficientData {
                operation: "Tremor comparison",
                required: min_samples,
                available: n,
            });
        }
        let (time, analog, accel) = (&time[..n], &analog[..n], &accel[..n]);

        let fs = glove_core::capture::sampling_rate_from_times(time);
        self.reporter.info(&format!("Tremor comparison at {:.1} Hz over {} samples", fs, n));

        let analog_filtered = bandpass(analog, fs, &self.config.filter, self.reporter);

        let analog_spectrum = analyze_frequency(analog, fs, &self.config.spectral)?;
        let accel_spectrum = analyze_frequency(accel, fs, &self.config.spectral)?;
        let classification = classify_tremor(accel_spectrum.dominant_freq);

        let kinematics = &self.config.kinematics;
        let analog_trace = analog_displacement(&analog_filtered, time, kinematics);
        let analog_amplitude = analog_amplitude_mm(&analog_filtered, kinematics);

        // The accelerometer axis points against the analog sensor's positive direction
        let negated: Vec<f64> = accel.iter().map(|a| -a).collect();
        let accel_trace = match try_integrate_band_limited(&negated, time, kinematics, &self.config.filter) {
            Ok(trace) => Some(trace),
            Err(err) => {
                self.reporter.degraded(&err);
                None
            }
        };

        let extrema_settings = &self.config.extrema;
        let (analog_displacement, accel_displacement, agreement, accel_extrema) = match &accel_trace {
            Some(accel_trace) => {
                let len = analog_trace.len().min(accel_trace.len());
                let analog_aligned = analog_trace.truncated(len).aligned_to_start();
                let accel_aligned = accel_trace.truncated(len).aligned_to_start();

                let accel_extrema = find_extrema(&accel_aligned.displacement, None, None, extrema_settings);
                let agreement = self.agreement(&analog_aligned, &accel_aligned, &accel_extrema);
                (analog_aligned, Some(accel_aligned), Some(agreement), Some(accel_extrema))
            }
            None => (analog_trace.aligned_to_start(), None, None, None),
        };

        let analog_extrema = find_extrema(&analog_displacement.displacement, None, None, extrema_settings);
        let analog_peak_to_trough = analog_extrema.peak_to_trough();

        // Peak-to-trough comparison needs both channels
        let agreement = agreement.map(|mut a| {
            if let (Some(analog_pt), Some(accel_pt)) = (analog_peak_to_trough, a.accel_peak_to_trough) {
                a.peak_to_trough_difference = Some((analog_pt - accel_pt).abs());
                let (lo, hi) = (analog_pt.min(accel_pt), analog_pt.max(accel_pt));
                a.peak_to_trough_ratio = (lo > 0.0).then(|| hi / lo);
            }
            a
        });

        let accel_amplitude_mm = accel_trace.as_ref().map(|t| t.amplitude_mm());
        self.reporter.info(&format!(
            "Tremor comparison completed: analog {:.2} Hz ({:.2} mm), accelerometer {:.2} Hz ({}), {}",
            analog_spectrum.dominant_freq,
            analog_amplitude,
            accel_spectrum.dominant_freq,
            accel_amplitude_mm.map_or_else(|| "n/a".to_string(), |a| format!("{:.2} mm", a)),
            classification
        ));

        Ok(TremorComparison {
            sampling_rate: fs,
            sample_count: n,
            analog_spectrum,
            accel_spectrum,
            classification,
            analog_amplitude_mm: analog_amplitude,
            accel_amplitude_mm,
            analog_displacement,
            accel_displacement,
            analog_extrema,
            accel_extrema,
            analog_peak_to_trough,
            agreement,
            analog_amplitude_over_time: analog_amplitude_over_time(&analog_filtered, time, kinematics),
            accel_amplitude_over_time: integrated_amplitude_over_time(accel, time, kinematics, &self.config.filter),
        })
    }

    fn agreement(
        &self,
        analog: &DisplacementTrace,
        accel: &DisplacementTrace,
        accel_extrema: &ExtremaSet,
    ) -> DisplacementAgreement {
        let difference: Vec<f64> = analog
            .displacement
            .iter()
            .zip(&accel.displacement)
            .map(|(a, b)| a - b)
            .collect();

        let correlation = pearson(&analog.displacement, &accel.displacement);
        if correlation.is_none() {
            self.reporter.degraded(&GloveError::degenerate(
                "displacement correlation",
                "a displacement trace is constant",
            ));
        }

        DisplacementAgreement {
            agreement: correlation.map(|c| AgreementLevel::from_correlation(c.r)),
            correlation,
            mean_difference: mean(&difference),
            std_difference: std_dev(&difference),
            rms_difference: rms(&difference),
            accel_peak_to_trough: accel_extrema.peak_to_trough(),
            peak_to_trough_difference: None,
            peak_to_trough_ratio: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glove_core::{CollectingReporter, Sample};
    use std::f64::consts::PI;

    fn tremor_capture(n: usize, freq: f64) -> Capture {
        let samples = (0..n)
            .map(|i| {
                let t = i as f64 / 100.0;
                let phase = 2.0 * PI * freq * t;
                let accel = 0.5 * phase.sin();
                // analog angle follows the displacement, which is in phase with -accel
                let analog = 2048.0 + 40.0 * phase.sin();
                Sample::new(i as i64, (i * 10) as i64, MeasurementMode::Tremor, [analog, accel, 0.0, 0.0, 0.0])
            })
            .collect();
        Capture::new(samples).unwrap()
    }

    #[test]
    fn test_parkinsonian_scenario() {
        let config = AnalysisConfig::default();
        let reporter = CollectingReporter::new();
        let result = TremorComparator::new(&config, &reporter)
            .compare(&tremor_capture(100, 6.0))
            .unwrap();

        assert!((result.accel_spectrum.dominant_freq - 6.0).abs() <= result.accel_spectrum.bin_width());
        assert_eq!(result.classification, TremorClass::Parkinsonian);
        assert!(result.accel_amplitude_mm.unwrap() > 0.0);
        assert!(result.analog_amplitude_mm > 0.0);
    }

    #[test]
    fn test_traces_aligned_and_compared() {
        let config = AnalysisConfig::default();
        let reporter = CollectingReporter::new();
        let result = TremorComparator::new(&config, &reporter)
            .compare(&tremor_capture(500, 5.0))
            .unwrap();

        let accel = result.accel_displacement.as_ref().unwrap();
        assert_eq!(accel.len(), result.analog_displacement.len());
        assert_eq!(accel.displacement[0], 0.0);
        assert_eq!(result.analog_displacement.displacement[0], 0.0);

        let agreement = result.agreement.unwrap();
        let r = agreement.correlation.unwrap().r;
        assert!(r > 0.8, "correlation {}", r);
        assert_eq!(agreement.agreement, Some(AgreementLevel::Excellent));
        assert!(agreement.peak_to_trough_ratio.unwrap() >= 1.0);
        assert!(agreement.rms_difference >= agreement.std_difference);
        assert!(!result.analog_amplitude_over_time.time.is_empty());

        // 0.5 g at 5 Hz moves 4.97 mm
        let expected_mm = 0.5 * config.kinematics.gravity / (2.0 * PI * 5.0).powi(2) * 1000.0;
        let amplitude = result.accel_amplitude_mm.unwrap();
        assert!((amplitude - expected_mm).abs() <= 0.05 * expected_mm, "amplitude {}", amplitude);
    }

    #[test]
    fn test_partial_cycle_capture_keeps_agreement() {
        // 26.5 cycles, ending mid-swing
        let config = AnalysisConfig::default();
        let reporter = CollectingReporter::new();
        let result = TremorComparator::new(&config, &reporter)
            .compare(&tremor_capture(530, 5.0))
            .unwrap();

        let expected_mm = 0.5 * config.kinematics.gravity / (2.0 * PI * 5.0).powi(2) * 1000.0;
        let amplitude = result.accel_amplitude_mm.unwrap();
        assert!((amplitude - expected_mm).abs() <= 0.1 * expected_mm, "amplitude {}", amplitude);
        let r = result.agreement.unwrap().correlation.unwrap().r;
        assert!(r > 0.9, "correlation {}", r);
        for windowed in &result.accel_amplitude_over_time.amplitude_mm {
            assert!(*windowed > 3.0 && *windowed < 7.0);
        }
    }

    #[test]
    fn test_requires_fifty_samples() {
        let config = AnalysisConfig::default();
        let reporter = CollectingReporter::new();
        let err = TremorComparator::new(&config, &reporter)
            .compare(&tremor_capture(40, 6.0))
            .unwrap_err();
        assert!(err.is_declined());
    }

    #[test]
    fn test_agreement_levels() {
        assert_eq!(AgreementLevel::from_correlation(0.85), AgreementLevel::Excellent);
        assert_eq!(AgreementLevel::from_correlation(0.7), AgreementLevel::Good);
        assert_eq!(AgreementLevel::from_correlation(0.5), AgreementLevel::Moderate);
        assert_eq!(AgreementLevel::from_correlation(-0.9), AgreementLevel::Poor);
    }
}
