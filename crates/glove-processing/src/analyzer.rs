//! Session analyzer: capture preparation and mode dispatch

use crate::bradykinesia::{AngleComparator, AngleComparison};
use crate::config::AnalysisConfig;
use crate::extrema::{find_extrema, ExtremaSet};
use crate::filters::bandpass;
use crate::force::{ForceAnalyzer, ForceReport};
use crate::kinematics::{try_integrate_band_limited, try_integrate_to_displacement, DisplacementTrace};
use crate::movement::{MovementAnalyzer, MovementReport};
use crate::spectrum::{analyze_frequency, classify_tremor, FrequencySpectrum, TremorClass};
use crate::tremor::{TremorComparator, TremorComparison};
use glove_core::capture::sampling_rate_from_times;
use glove_core::stats::remove_mean;
use glove_core::{AnalysisReporter, Capture, Channel, GloveError, GloveResult, MeasurementMode};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Analysis to run on a capture
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisRequest {
    /// Default analysis for the capture's mode
    #[default]
    Auto,
    TremorComparison,
    AngleComparison,
    Movement,
    Force,
    /// Single-channel spectrum
    Frequency { channel: Channel, apply_filter: bool },
}

/// Bradykinesia result; either part may be declined on its own
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BradykinesiaReport {
    pub angle_comparison: Option<AngleComparison>,
    pub movement: Option<MovementReport>,
}

/// Single-channel frequency analysis result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencyReport {
    pub channel: Channel,
    pub filtered: bool,
    pub sampling_rate: f64,
    pub time: Vec<f64>,
    /// DC-removed (and optionally bandpassed) signal
    pub signal: Vec<f64>,
    pub spectrum: FrequencySpectrum,
    /// Only for tremor captures
    pub classification: Option<TremorClass>,
    /// Displacement by double integration, tremor captures only (mm)
    pub displacement: Option<DisplacementTrace>,
    pub displacement_amplitude_mm: Option<f64>,
    pub displacement_extrema: Option<ExtremaSet>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "analysis", rename_all = "snake_case")]
pub enum SessionReport {
    Tremor(Box<TremorComparison>),
    Bradykinesia(Box<BradykinesiaReport>),
    Movement(Box<MovementReport>),
    Stiffness(Box<ForceReport>),
    Frequency(Box<FrequencyReport>),
}

/// Timing and sample bookkeeping for one analysis run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetrics {
    /// Wall-clock analysis time in microseconds
    pub processing_time_us: u64,
    /// Samples in the capture as received
    pub input_samples: usize,
    /// Samples left after warm-up truncation
    pub analyzed_samples: usize,
    pub sampling_rate: f64,
}

impl AnalysisMetrics {
    pub fn start_timing(input_samples: usize) -> AnalysisTimer {
        AnalysisTimer {
            start_time: Instant::now(),
            metrics: AnalysisMetrics {
                input_samples,
                ..AnalysisMetrics::default()
            },
        }
    }
}

/// Helper for timing an analysis run
pub struct AnalysisTimer {
    start_time: Instant,
    metrics: AnalysisMetrics,
}

impl AnalysisTimer {
    pub fn set_prepared(&mut self, capture: &Capture) {
        self.metrics.analyzed_samples = capture.len();
        self.metrics.sampling_rate = capture.sampling_rate();
    }

    pub fn finish(mut self) -> AnalysisMetrics {
        self.metrics.processing_time_us = self.start_time.elapsed().as_micros() as u64;
        self.metrics
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisOutcome {
    pub mode: MeasurementMode,
    pub report: SessionReport,
    pub metrics: AnalysisMetrics,
}

/// Runs analyses on captures with one configuration and reporter
pub struct SessionAnalyzer<'a> {
    config: &'a AnalysisConfig,
    reporter: &'a dyn AnalysisReporter,
}

impl<'a> SessionAnalyzer<'a> {
    pub fn new(config: &'a AnalysisConfig, reporter: &'a dyn AnalysisReporter) -> Self {
        Self { config, reporter }
    }

    pub fn config(&self) -> &AnalysisConfig {
        self.config
    }

    /// Drop the warm-up period when configured to
    pub fn prepare(&self, capture: &Capture) -> GloveResult<Capture> {
        if !self.config.truncate_warmup {
            return Ok(capture.clone());
        }
        let prepared = capture.truncate_warmup(self.config.warmup_ms)?;
        self.reporter.info(&format!(
            "Dropped {} warm-up samples (first {} ms)",
            capture.len() - prepared.len(),
            self.config.warmup_ms
        ));
        Ok(prepared)
    }

    /// Default analysis for the capture's mode
    pub fn analyze(&self, capture: &Capture) -> GloveResult<SessionReport> {
        self.run(capture, AnalysisRequest::Auto).map(|outcome| outcome.report)
    }

    pub fn run(&self, capture: &Capture, request: AnalysisRequest) -> GloveResult<AnalysisOutcome> {
        let mut timer = AnalysisMetrics::start_timing(capture.len());
        let prepared = self.prepare(capture)?;
        timer.set_prepared(&prepared);

        let mode = prepared.mode();
        tracing::debug!(?request, %mode, samples = prepared.len(), "running analysis");

        let report = match request {
            AnalysisRequest::Auto => self.dispatch(&prepared)?,
            AnalysisRequest::TremorComparison => {
                SessionReport::Tremor(Box::new(TremorComparator::new(self.config, self.reporter).compare(&prepared)?))
            }
            AnalysisRequest::AngleComparison => SessionReport::Bradykinesia(Box::new(BradykinesiaReport {
                angle_comparison: Some(AngleComparator::new(self.config, self.reporter).compare(&prepared)?),
                movement: None,
            })),
            AnalysisRequest::Movement => {
                SessionReport::Movement(Box::new(MovementAnalyzer::new(self.config, self.reporter).analyze(&prepared)?))
            }
            AnalysisRequest::Force => {
                SessionReport::Stiffness(Box::new(ForceAnalyzer::new(self.config, self.reporter).analyze(&prepared)?))
            }
            AnalysisRequest::Frequency { channel, apply_filter } => {
                SessionReport::Frequency(Box::new(self.analyze_frequency(&prepared, channel, apply_filter)?))
            }
        };

        let metrics = timer.finish();
        tracing::info!(
            %mode,
            time_us = metrics.processing_time_us,
            samples = metrics.analyzed_samples,
            "analysis finished"
        );
        Ok(AnalysisOutcome { mode, report, metrics })
    }

    fn dispatch(&self, capture: &Capture) -> GloveResult<SessionReport> {
        match capture.mode() {
            MeasurementMode::Tremor => Ok(SessionReport::Tremor(Box::new(
                TremorComparator::new(self.config, self.reporter).compare(capture)?,
            ))),
            MeasurementMode::Bradykinesia => self.bradykinesia(capture),
            MeasurementMode::Stiffness => Ok(SessionReport::Stiffness(Box::new(
                ForceAnalyzer::new(self.config, self.reporter).analyze(capture)?,
            ))),
        }
    }

    /// Angle comparison and movement analysis; fails only if both fail
    fn bradykinesia(&self, capture: &Capture) -> GloveResult<SessionReport> {
        let angle = AngleComparator::new(self.config, self.reporter).compare(capture);
        let movement = MovementAnalyzer::new(self.config, self.reporter).analyze(capture);

        let (angle_comparison, movement) = match (angle, movement) {
            (Err(angle_err), Err(movement_err)) => {
                return Err(if angle_err.is_declined() { movement_err } else { angle_err });
            }
            (angle, movement) => (self.keep(angle), self.keep(movement)),
        };
        Ok(SessionReport::Bradykinesia(Box::new(BradykinesiaReport {
            angle_comparison,
            movement,
        })))
    }

    /// A failed part becomes `None`: declines are warned about, anything
    /// else is reported as degraded
    fn keep<T>(&self, result: GloveResult<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(err) if err.is_declined() => {
                self.reporter.warn(&err.to_string());
                None
            }
            Err(err) => {
                self.reporter.degraded(&err);
                None
            }
        }
    }

    /// Spectrum of one channel, with displacement for tremor captures
    pub fn analyze_frequency(
        &self,
        capture: &Capture,
        channel: Channel,
        apply_filter: bool,
    ) -> GloveResult<FrequencyReport> {
        let min_samples = self.config.spectral.min_samples;
        if capture.len() < min_samples {
            return Err(GloveError::InsufficientData {
                operation: "frequency analysis",
                required: min_samples,
                available: capture.len(),
            });
        }

        let (time, raw): (Vec<f64>, Vec<f64>) = capture
            .time_seconds()
            .into_iter()
            .zip(capture.channel(channel)?)
            .filter(|(_, v)| !v.is_nan())
            .unzip();
        if raw.len() < min_samples {
            return Err(GloveError::InsufficientData {
                operation: "frequency analysis",
                required: min_samples,
                available: raw.len(),
            });
        }

        let fs = sampling_rate_from_times(&time);
        let centred = remove_mean(&raw);
        let signal = if apply_filter {
            bandpass(&centred, fs, &self.config.filter, self.reporter)
        } else {
            centred
        };

        let spectrum = analyze_frequency(&signal, fs, &self.config.spectral)?;
        let tremor = capture.mode() == MeasurementMode::Tremor;
        let classification = tremor.then(|| classify_tremor(spectrum.dominant_freq));
        match classification {
            Some(class) => self.reporter.info(&format!(
                "{}: dominant frequency {:.2} Hz - {}",
                channel, spectrum.dominant_freq, class
            )),
            None => self.reporter.info(&format!(
                "{}: dominant frequency {:.2} Hz",
                channel, spectrum.dominant_freq
            )),
        }

        let displacement = if tremor {
            let integrated = if apply_filter {
                try_integrate_band_limited(&raw, &time, &self.config.kinematics, &self.config.filter)
            } else {
                try_integrate_to_displacement(&signal, &time, &self.config.kinematics)
            };
            match integrated {
                Ok(trace) => Some(trace),
                Err(err) => {
                    self.reporter.degraded(&err);
                    None
                }
            }
        } else {
            None
        };
        let displacement_amplitude_mm = displacement.as_ref().map(|d| d.amplitude_mm());
        let displacement_extrema = displacement
            .as_ref()
            .map(|d| find_extrema(&d.displacement, None, None, &self.config.extrema));
        if let Some(amplitude) = displacement_amplitude_mm {
            self.reporter.info(&format!("Displacement amplitude {:.2} mm from {}", amplitude, channel));
        }

        Ok(FrequencyReport {
            channel,
            filtered: apply_filter,
            sampling_rate: fs,
            time,
            signal,
            spectrum,
            classification,
            displacement,
            displacement_amplitude_mm,
            displacement_extrema,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glove_core::{CollectingReporter, ReportLevel, Sample};
    use std::f64::consts::PI;

    fn capture(mode: MeasurementMode, n: usize, value: impl Fn(f64) -> [f64; 5]) -> Capture {
        let samples = (0..n)
            .map(|i| Sample::new(i as i64, (i * 10) as i64, mode, value(i as f64 / 100.0)))
            .collect();
        Capture::new(samples).unwrap()
    }

    fn tremor(t: f64) -> [f64; 5] {
        let s = (2.0 * PI * 6.0 * t).sin();
        [2048.0 + 30.0 * s, 0.5 * s, 0.0, 0.0, 0.0]
    }

    #[test]
    fn test_dispatches_on_mode() {
        let config = AnalysisConfig::default();
        let reporter = CollectingReporter::new();
        let analyzer = SessionAnalyzer::new(&config, &reporter);

        let report = analyzer.analyze(&capture(MeasurementMode::Tremor, 400, tremor)).unwrap();
        let SessionReport::Tremor(comparison) = report else {
            panic!("expected tremor report");
        };
        assert_eq!(comparison.classification, TremorClass::Parkinsonian);

        let stiffness = capture(MeasurementMode::Stiffness, 100, |t| [1500.0 + 1000.0 * t, 1200.0, 10.0 * t, 0.0, 0.0]);
        assert!(matches!(analyzer.analyze(&stiffness).unwrap(), SessionReport::Stiffness(_)));
    }

    #[test]
    fn test_warmup_truncation_recorded() {
        let config = AnalysisConfig::default();
        let reporter = CollectingReporter::new();
        let outcome = SessionAnalyzer::new(&config, &reporter)
            .run(&capture(MeasurementMode::Tremor, 400, tremor), AnalysisRequest::Auto)
            .unwrap();
        assert_eq!(outcome.metrics.input_samples, 400);
        assert_eq!(outcome.metrics.analyzed_samples, 350);
        assert_eq!(outcome.mode, MeasurementMode::Tremor);
    }

    #[test]
    fn test_truncation_can_be_disabled() {
        let config = AnalysisConfig {
            truncate_warmup: false,
            ..AnalysisConfig::default()
        };
        let reporter = CollectingReporter::new();
        let source = capture(MeasurementMode::Tremor, 100, tremor);
        let prepared = SessionAnalyzer::new(&config, &reporter).prepare(&source).unwrap();
        assert_eq!(prepared.len(), 100);
    }

    #[test]
    fn test_short_bradykinesia_keeps_movement_only() {
        // 30 samples after truncation: enough for movement, too few for comparison
        let config = AnalysisConfig::default();
        let reporter = CollectingReporter::new();
        let source = capture(MeasurementMode::Bradykinesia, 80, |t| {
            let angle = 40.0 * (2.0 * PI * t).sin();
            [2000.0, angle, 0.0, 0.0, 0.0]
        });

        let SessionReport::Bradykinesia(report) = SessionAnalyzer::new(&config, &reporter).analyze(&source).unwrap() else {
            panic!("expected bradykinesia report");
        };
        assert!(report.angle_comparison.is_none());
        assert!(report.movement.is_some());
        assert!(!reporter.messages(ReportLevel::Warning).is_empty());
    }

    #[test]
    fn test_failed_part_does_not_discard_the_other() {
        let config = AnalysisConfig::default();
        let reporter = CollectingReporter::new();
        let analyzer = SessionAnalyzer::new(&config, &reporter);

        let failed: GloveResult<f64> = Err(GloveError::degenerate("smoothing", "singular least-squares system"));
        assert_eq!(analyzer.keep(failed), None);
        assert_eq!(analyzer.keep(Ok(2.0)), Some(2.0));
        assert_eq!(reporter.messages(ReportLevel::Degraded).len(), 1);
    }

    #[test]
    fn test_frequency_analysis_on_accelerometer() {
        let config = AnalysisConfig::default();
        let reporter = CollectingReporter::new();
        let report = SessionAnalyzer::new(&config, &reporter)
            .analyze_frequency(&capture(MeasurementMode::Tremor, 300, tremor), Channel::Value2, true)
            .unwrap();

        assert!((report.spectrum.dominant_freq - 6.0).abs() <= report.spectrum.bin_width());
        assert_eq!(report.classification, Some(TremorClass::Parkinsonian));
        assert!(report.displacement_amplitude_mm.unwrap() > 0.0);
        assert!(!report.displacement_extrema.unwrap().is_empty());
    }

    #[test]
    fn test_frequency_analysis_outside_tremor_mode() {
        let config = AnalysisConfig::default();
        let reporter = CollectingReporter::new();
        let source = capture(MeasurementMode::Stiffness, 200, |t| [(2.0 * PI * 3.0 * t).sin(), 0.0, 0.0, 0.0, 0.0]);
        let report = SessionAnalyzer::new(&config, &reporter)
            .analyze_frequency(&source, Channel::Value1, false)
            .unwrap();
        assert!(report.classification.is_none());
        assert!(report.displacement.is_none());
        assert!((report.spectrum.dominant_freq - 3.0).abs() <= report.spectrum.bin_width());
    }

    #[test]
    fn test_missing_channel_on_legacy_capture() {
        let samples = (0..20)
            .map(|i| Sample::legacy(i, i * 10, MeasurementMode::Tremor, [0.0, 1.0, 2.0]))
            .collect();
        let legacy = Capture::new(samples).unwrap();
        let config = AnalysisConfig::default();
        let reporter = CollectingReporter::new();

        let err = SessionAnalyzer::new(&config, &reporter)
            .analyze_frequency(&legacy, Channel::Value4, false)
            .unwrap_err();
        assert!(matches!(err, GloveError::MissingChannel { channel: 4, available: 3 }));
    }
}
