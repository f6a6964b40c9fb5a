//! Finger-tapping movement analysis for bradykinesia captures
//!
//! Works on the `value2` angle channel: centre, smooth, then count the
//! alternations between peaks and troughs.

use crate::config::{AnalysisConfig, MovementSettings};
use crate::extrema::{ExtremaSet, PeakCriteria, TimedSeries};
use crate::smoothing::{fit_smoothing, movement_window, savgol_filter};
use glove_core::stats::{peak_to_peak, remove_mean};
use glove_core::{AnalysisReporter, Capture, Channel, GloveError, GloveResult};
use serde::{Deserialize, Serialize};

/// Scale the angle channel is reported in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AngleScale {
    /// Calibrated angle or normalised values
    Degrees,
    /// Raw 12-bit ADC codes
    Units,
}

impl AngleScale {
    pub fn label(&self) -> &'static str {
        match self {
            AngleScale::Degrees => "degrees",
            AngleScale::Units => "units",
        }
    }
}

/// Peak thresholds derived from the signal range and its scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementThresholds {
    pub scale: AngleScale,
    pub height: f64,
    pub distance: usize,
    pub prominence: f64,
}

impl MovementThresholds {
    /// Pick floors by scale: small magnitudes are degrees, large ones ADC codes
    pub fn for_signal(signal: &[f64], settings: &MovementSettings) -> Self {
        let range = peak_to_peak(signal);
        let magnitude = signal.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        let (scale, height_floor, prominence_floor) = if magnitude < settings.degree_regime_limit {
            (AngleScale::Degrees, settings.degree_height_floor, settings.degree_prominence_floor)
        } else {
            (AngleScale::Units, settings.adc_height_floor, settings.adc_prominence_floor)
        };

        MovementThresholds {
            scale,
            height: height_floor.max(range * settings.height_fraction),
            distance: settings.min_distance,
            prominence: prominence_floor.max(range * settings.prominence_fraction),
        }
    }

    pub fn criteria(&self) -> PeakCriteria {
        PeakCriteria {
            height: Some(self.height),
            distance: Some(self.distance),
            prominence: Some(self.prominence),
        }
    }
}

/// Movement metrics of a tapping capture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementReport {
    pub total_samples: usize,
    pub valid_samples: usize,
    pub thresholds: MovementThresholds,
    pub smoothing_window: usize,
    pub time: Vec<f64>,
    /// Centred and smoothed angle
    pub smoothed: Vec<f64>,
    pub extrema: ExtremaSet,
    pub movement_count: usize,
    /// Mean range between consecutive extrema, 0 without movements
    pub average_range: f64,
    /// Movements per second
    pub movement_frequency: f64,
    pub periods: TimedSeries,
    pub mean_period: f64,
    pub period_std: f64,
    pub amplitudes: TimedSeries,
    pub mean_amplitude: f64,
    pub amplitude_std: f64,
}

pub struct MovementAnalyzer<'a> {
    config: &'a AnalysisConfig,
    reporter: &'a dyn AnalysisReporter,
}

impl<'a> MovementAnalyzer<'a> {
    pub fn new(config: &'a AnalysisConfig, reporter: &'a dyn AnalysisReporter) -> Self {
        Self { config, reporter }
    }

    pub fn analyze(&self, capture: &Capture) -> GloveResult<MovementReport> {
        let settings = &self.config.movement;
        if capture.len() < settings.min_samples {
            return Err(GloveError::InsufficientData {
                operation: "movement analysis",
                required: settings.min_samples,
                available: capture.len(),
            });
        }

        let (time, angle): (Vec<f64>, Vec<f64>) = capture
            .time_seconds()
            .into_iter()
            .zip(capture.channel(Channel::Value2)?)
            .filter(|(_, v)| !v.is_nan())
            .unzip();
        self.reporter.info(&format!(
            "Movement analysis on {}: {} of {} samples valid",
            Channel::Value2,
            angle.len(),
            capture.len()
        ));

        let mut report = self.analyze_series(&time, &angle)?;
        report.total_samples = capture.len();
        Ok(report)
    }

    /// Movement metrics for an already cleaned angle series
    pub fn analyze_series(&self, time: &[f64], angle: &[f64]) -> GloveResult<MovementReport> {
        let settings = &self.config.movement;
        let n = time.len().min(angle.len());
        if n < settings.min_samples {
            return Err(GloveError::InsufficientData {
                operation: "movement analysis",
                required: settings.min_samples,
                available: n,
            });
        }
        let (time, angle) = (&time[..n], &angle[..n]);

        let thresholds = MovementThresholds::for_signal(angle, settings);
        let window = movement_window(settings.smoothing_window, n);
        tracing::debug!(
            window,
            height = thresholds.height,
            distance = thresholds.distance,
            prominence = thresholds.prominence,
            "movement detection parameters"
        );

        let centred = remove_mean(angle);
        let (smoothed, window) = match fit_smoothing(window, settings.smoothing_order, n) {
            Some((window, order)) => (savgol_filter(&centred, window, order)?, window),
            None => {
                tracing::debug!(samples = n, "series too short to smooth");
                (centred, 1)
            }
        };
        let extrema = ExtremaSet::detect(&smoothed, &thresholds.criteria());
        self.reporter.info(&format!(
            "Peaks found: {}, troughs found: {}",
            extrema.peaks().count(),
            extrema.troughs().count()
        ));

        let duration = time[n - 1] - time[0];
        let amplitudes = extrema.amplitudes(time);
        let periods = extrema.peak_periods(time);
        let average_range = if amplitudes.values.is_empty() { 0.0 } else { amplitudes.mean() };

        Ok(MovementReport {
            total_samples: n,
            valid_samples: n,
            thresholds,
            smoothing_window: window,
            time: time.to_vec(),
            movement_count: extrema.movement_count(),
            movement_frequency: extrema.movement_frequency(duration),
            average_range,
            mean_period: periods.mean(),
            period_std: periods.std_dev(),
            mean_amplitude: amplitudes.mean(),
            amplitude_std: amplitudes.std_dev(),
            periods,
            amplitudes,
            extrema,
            smoothed,
        })
    }
}
