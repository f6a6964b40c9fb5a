//! Displacement reconstruction
//!
//! Two independent paths produce a displacement in millimetres:
//! double integration of an accelerometer axis, with mean removal after each
//! integration to cancel drift, and a purely geometric mapping of an analog
//! angle sensor through a fixed lever arm.
//!
//! When a bandpass is available the velocity and displacement are filtered
//! again after each integration. Mean removal alone leaves a ramp whenever
//! the capture does not span a whole number of cycles.

use crate::config::{FilterSettings, KinematicSettings};
use crate::filters::ButterworthBandpass;
use glove_core::capture::sampling_rate_from_times;
use glove_core::stats::{mean_diff, peak_to_peak, remove_mean};
use glove_core::{AnalysisReporter, GloveError, GloveResult};
use serde::{Deserialize, Serialize};

/// Displacement over time, in millimetres
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisplacementTrace {
    pub time: Vec<f64>,
    pub displacement: Vec<f64>,
}

impl DisplacementTrace {
    pub fn len(&self) -> usize {
        self.displacement.len()
    }

    pub fn is_empty(&self) -> bool {
        self.displacement.is_empty()
    }

    /// Half the peak-to-peak displacement (mm)
    pub fn amplitude_mm(&self) -> f64 {
        peak_to_peak(&self.displacement) / 2.0
    }

    /// Copy shifted so the first sample is zero
    pub fn aligned_to_start(&self) -> DisplacementTrace {
        let origin = self.displacement.first().copied().unwrap_or(0.0);
        DisplacementTrace {
            time: self.time.clone(),
            displacement: self.displacement.iter().map(|d| d - origin).collect(),
        }
    }

    /// Copy limited to the first `len` samples
    pub fn truncated(&self, len: usize) -> DisplacementTrace {
        DisplacementTrace {
            time: self.time.iter().take(len).copied().collect(),
            displacement: self.displacement.iter().take(len).copied().collect(),
        }
    }
}

/// Amplitude (mm) sampled along a sliding window
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AmplitudeSeries {
    /// Time at the end of each window (s)
    pub time: Vec<f64>,
    pub amplitude_mm: Vec<f64>,
}

/// Cumulative trapezoidal integral of `y` over `x`, starting at 0
pub fn cumulative_trapezoid(y: &[f64], x: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(y.len());
    let mut total = 0.0;
    for i in 0..y.len().min(x.len()) {
        if i > 0 {
            total += (x[i] - x[i - 1]) * (y[i] + y[i - 1]) / 2.0;
        }
        out.push(total);
    }
    out
}

/// Acceleration in g to displacement in metres
///
/// Without a filter the acceleration is centred and each integral has its
/// mean removed. With one, the acceleration is bandpassed and each integral
/// is bandpassed again.
fn double_integrate(
    acceleration: &[f64],
    time: &[f64],
    gravity: f64,
    filter: Option<&ButterworthBandpass>,
) -> GloveResult<Vec<f64>> {
    let stage = |signal: &[f64]| -> GloveResult<Vec<f64>> {
        let centred = remove_mean(signal);
        match filter {
            Some(filter) => filter.filtfilt(&centred),
            None => Ok(centred),
        }
    };

    let accel_ms2: Vec<f64> = stage(acceleration)?.iter().map(|a| a * gravity).collect();
    let velocity = stage(&cumulative_trapezoid(&accel_ms2, time))?;
    let displacement = stage(&cumulative_trapezoid(&velocity, time))?;
    Ok(remove_mean(&displacement))
}

fn check_integration_input(acceleration: &[f64], time: &[f64]) -> GloveResult<()> {
    if acceleration.len() != time.len() {
        return Err(GloveError::degenerate(
            "double integration",
            format!("{} readings but {} timestamps", acceleration.len(), time.len()),
        ));
    }
    if acceleration.len() < 2 {
        return Err(GloveError::InsufficientData {
            operation: "double integration",
            required: 2,
            available: acceleration.len(),
        });
    }
    Ok(())
}

fn to_trace(displacement_m: Vec<f64>, time: &[f64]) -> GloveResult<DisplacementTrace> {
    let displacement: Vec<f64> = displacement_m.into_iter().map(|d| d * 1000.0).collect();
    if displacement.iter().any(|d| !d.is_finite()) {
        return Err(GloveError::degenerate("double integration", "non-finite displacement"));
    }
    Ok(DisplacementTrace {
        time: time.to_vec(),
        displacement,
    })
}

/// Double integration that reports failures to the caller
pub fn try_integrate_to_displacement(
    acceleration: &[f64],
    time: &[f64],
    settings: &KinematicSettings,
) -> GloveResult<DisplacementTrace> {
    check_integration_input(acceleration, time)?;
    to_trace(double_integrate(acceleration, time, settings.gravity, None)?, time)
}

/// Band-limited double integration of a raw acceleration axis (g)
///
/// The bandpass from `filter` is applied to the acceleration and again to
/// the velocity and displacement. An empty pass band falls back to mean
/// removal only.
pub fn try_integrate_band_limited(
    acceleration: &[f64],
    time: &[f64],
    settings: &KinematicSettings,
    filter: &FilterSettings,
) -> GloveResult<DisplacementTrace> {
    check_integration_input(acceleration, time)?;
    let bandpass = ButterworthBandpass::design(filter, sampling_rate_from_times(time))?;
    to_trace(
        double_integrate(acceleration, time, settings.gravity, bandpass.as_ref())?,
        time,
    )
}

/// Acceleration (g) to drift-corrected displacement (mm)
///
/// Never fails: on error the cause is reported and a zero-filled trace of
/// the input length is returned.
pub fn integrate_to_displacement(
    acceleration: &[f64],
    time: &[f64],
    settings: &KinematicSettings,
    reporter: &dyn AnalysisReporter,
) -> DisplacementTrace {
    match try_integrate_to_displacement(acceleration, time, settings) {
        Ok(trace) => trace,
        Err(err) => {
            reporter.degraded(&err);
            let len = acceleration.len();
            DisplacementTrace {
                time: time.iter().take(len).copied().collect(),
                displacement: vec![0.0; len],
            }
        }
    }
}

/// Tremor amplitude (mm) from double integration
pub fn displacement_amplitude_mm(
    acceleration: &[f64],
    time: &[f64],
    settings: &KinematicSettings,
    reporter: &dyn AnalysisReporter,
) -> f64 {
    integrate_to_displacement(acceleration, time, settings, reporter).amplitude_mm()
}

/// Analog ADC reading to degrees, full scale mapping to 360°
pub fn analog_to_degrees(reading: f64, full_scale: f64) -> f64 {
    reading / full_scale * 360.0
}

/// Arc length (mm) swept by a lever of `radius_m` turning through `reading_span` ADC counts
fn arc_length_mm(reading_span: f64, radius_m: f64, full_scale: f64) -> f64 {
    analog_to_degrees(reading_span, full_scale).to_radians() * radius_m * 1000.0
}

/// Analog angle readings to linear displacement (mm) around their mean
pub fn analog_displacement_mm(signal: &[f64], settings: &KinematicSettings) -> Vec<f64> {
    remove_mean(signal)
        .into_iter()
        .map(|v| arc_length_mm(v, settings.analog_radius_m, settings.analog_full_scale))
        .collect()
}

/// Analog displacement paired with its timestamps
pub fn analog_displacement(signal: &[f64], time: &[f64], settings: &KinematicSettings) -> DisplacementTrace {
    DisplacementTrace {
        time: time.to_vec(),
        displacement: analog_displacement_mm(signal, settings),
    }
}

/// Tremor amplitude (mm) from the analog sensor's peak-to-peak excursion
pub fn analog_amplitude_mm(signal: &[f64], settings: &KinematicSettings) -> f64 {
    arc_length_mm(peak_to_peak(signal), settings.analog_radius_m, settings.analog_full_scale) / 2.0
}

/// Window length in samples for the amplitude series, `None` if the sampling
/// interval cannot be inferred
fn window_samples(time: &[f64], window_s: f64, minimum: usize) -> Option<usize> {
    let dt = mean_diff(time)?;
    if !(dt > 0.0 && dt.is_finite()) {
        return None;
    }
    Some(((window_s / dt) as usize).max(minimum))
}

/// Sliding-window ends: `window, window + step, ...` below `len`
fn window_ends(window: usize, len: usize) -> impl Iterator<Item = usize> {
    (window..len).step_by((window / 4).max(1))
}

/// Analog amplitude over time, 2 s windows stepped by a quarter window
pub fn analog_amplitude_over_time(signal: &[f64], time: &[f64], settings: &KinematicSettings) -> AmplitudeSeries {
    let mut series = AmplitudeSeries::default();
    let len = signal.len().min(time.len());
    let Some(window) = window_samples(&time[..len], settings.amplitude_window_s, settings.analog_min_window) else {
        return series;
    };

    for end in window_ends(window, len) {
        let span = peak_to_peak(&signal[end - window..end]);
        series.time.push(time[end]);
        series.amplitude_mm.push(
            arc_length_mm(span, settings.windowed_analog_radius_m, settings.analog_full_scale) / 2.0,
        );
    }
    series
}

/// Integrated accelerometer amplitude over time, each window integrated on its own
///
/// Windows are band-limited like [`try_integrate_band_limited`]. A window
/// that cannot be filtered or integrated is left out of the series.
pub fn integrated_amplitude_over_time(
    acceleration: &[f64],
    time: &[f64],
    settings: &KinematicSettings,
    filter: &FilterSettings,
) -> AmplitudeSeries {
    let mut series = AmplitudeSeries::default();
    let len = acceleration.len().min(time.len());
    let Some(window) = window_samples(&time[..len], settings.amplitude_window_s, settings.integration_min_window)
    else {
        return series;
    };
    let bandpass = match ButterworthBandpass::design(filter, sampling_rate_from_times(&time[..len])) {
        Ok(bandpass) => bandpass.filter(|b| window >= b.min_len()),
        Err(err) => {
            tracing::debug!(error = %err, "windowed integration without bandpass");
            None
        }
    };

    for end in window_ends(window, len) {
        let start = end - window;
        let window_time: Vec<f64> = time[start..end].iter().map(|t| t - time[start]).collect();
        let amplitude = double_integrate(&acceleration[start..end], &window_time, settings.gravity, bandpass.as_ref())
            .map(|displacement| peak_to_peak(&displacement) / 2.0 * 1000.0);
        match amplitude {
            Ok(amplitude) if amplitude.is_finite() => {
                series.time.push(time[end]);
                series.amplitude_mm.push(amplitude);
            }
            Ok(_) => {}
            Err(err) => tracing::debug!(end, error = %err, "skipping integration window"),
        }
    }
    series
}

#[cfg(test)]
mod tests {
    use super::*;
    use glove_core::{CollectingReporter, ReportLevel, TracingReporter};
    use std::f64::consts::PI;

    fn time_axis(n: usize, fs: f64) -> Vec<f64> {
        (0..n).map(|i| i as f64 / fs).collect()
    }

    #[test]
    fn test_cumulative_trapezoid() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [0.0, 1.0, 2.0, 3.0];
        assert_eq!(cumulative_trapezoid(&y, &x), vec![0.0, 0.5, 2.0, 4.5]);
    }

    #[test]
    fn test_zero_acceleration_gives_zero_displacement() {
        let time = time_axis(200, 100.0);
        let trace = try_integrate_to_displacement(&[0.0; 200], &time, &KinematicSettings::default()).unwrap();
        assert!(trace.displacement.iter().all(|d| d.abs() < 1e-12));
        assert_eq!(trace.amplitude_mm(), 0.0);
    }

    #[test]
    fn test_constant_offset_is_removed_before_integration() {
        let time = time_axis(200, 100.0);
        let trace = try_integrate_to_displacement(&[1.0; 200], &time, &KinematicSettings::default()).unwrap();
        assert!(trace.displacement.iter().all(|d| d.abs() < 1e-9));
    }

    #[test]
    fn test_sinusoid_amplitude() {
        // a = A sin(wt) g has displacement amplitude A g / w^2
        let fs = 100.0;
        let f = 5.0;
        let amplitude_g = 0.5;
        let time = time_axis(400, fs);
        let accel: Vec<f64> = time.iter().map(|t| amplitude_g * (2.0 * PI * f * t).sin()).collect();

        let settings = KinematicSettings::default();
        let expected_mm = amplitude_g * settings.gravity / (2.0 * PI * f).powi(2) * 1000.0;
        let measured = displacement_amplitude_mm(&accel, &time, &settings, &TracingReporter);
        assert!((measured - expected_mm).abs() <= 0.05 * expected_mm.abs());
    }

    #[test]
    fn test_band_limited_integration_off_cycle() {
        // 26.5 cycles of 0.5 g at 5 Hz: a whole-capture mean no longer
        // cancels the integration constant
        let fs = 100.0;
        let time = time_axis(530, fs);
        let accel: Vec<f64> = time.iter().map(|t| 0.5 * (2.0 * PI * 5.0 * t + 1.0).sin()).collect();
        let settings = KinematicSettings::default();
        let expected_mm = 0.5 * settings.gravity / (2.0 * PI * 5.0).powi(2) * 1000.0;

        let plain = try_integrate_to_displacement(&accel, &time, &settings).unwrap();
        assert!(plain.amplitude_mm() > 2.0 * expected_mm);

        let limited = try_integrate_band_limited(&accel, &time, &settings, &FilterSettings::default()).unwrap();
        let ideal: Vec<f64> = time
            .iter()
            .map(|t| -expected_mm * (2.0 * PI * 5.0 * t + 1.0).sin())
            .collect();
        assert!((limited.amplitude_mm() - expected_mm).abs() <= 0.05 * expected_mm);
        assert!(glove_core::stats::pearson(&limited.displacement, &ideal).unwrap().r > 0.99);
    }

    #[test]
    fn test_band_limited_integration_too_short() {
        let time = time_axis(10, 100.0);
        let result = try_integrate_band_limited(&[0.1; 10], &time, &KinematicSettings::default(), &FilterSettings::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_integration_failure_is_zero_filled() {
        let reporter = CollectingReporter::new();
        let trace = integrate_to_displacement(&[1.0, 2.0, 3.0], &[0.0, 0.01], &KinematicSettings::default(), &reporter);
        assert_eq!(trace.displacement, vec![0.0; 3]);
        assert_eq!(reporter.messages(ReportLevel::Degraded).len(), 1);
    }

    #[test]
    fn test_analog_geometry() {
        let settings = KinematicSettings::default();
        assert!((analog_to_degrees(4095.0, settings.analog_full_scale) - 360.0).abs() < 1e-12);

        let signal: Vec<f64> = (0..40).map(|i| if i % 2 == 0 { 2000.0 } else { 2100.0 }).collect();
        // 100 counts = 8.79° = 0.1534 rad; times 75 mm = 11.51 mm peak-to-peak
        let expected = (100.0 / 4095.0 * 360.0f64).to_radians() * 75.0 / 2.0;
        assert!((analog_amplitude_mm(&signal, &settings) - expected).abs() < 1e-9);

        let displacement = analog_displacement_mm(&signal, &settings);
        assert!((displacement[0] - -expected).abs() < 1e-9);
        assert!((displacement[1] - expected).abs() < 1e-9);
    }

    #[test]
    fn test_trace_alignment() {
        let trace = DisplacementTrace {
            time: vec![0.0, 0.1, 0.2],
            displacement: vec![2.0, 3.0, 1.0],
        };
        let aligned = trace.aligned_to_start().truncated(2);
        assert_eq!(aligned.displacement, vec![0.0, 1.0]);
        assert_eq!(aligned.time, vec![0.0, 0.1]);
    }

    #[test]
    fn test_amplitude_over_time_windows() {
        let fs = 100.0;
        let time = time_axis(1000, fs);
        let analog: Vec<f64> = time.iter().map(|t| 2000.0 + 50.0 * (2.0 * PI * 5.0 * t).sin()).collect();
        let settings = KinematicSettings::default();

        let series = analog_amplitude_over_time(&analog, &time, &settings);
        // window 200 samples, step 50: ends at 200, 250, ..., 950
        assert_eq!(series.time.len(), 16);
        assert!((series.time[0] - 2.0).abs() < 1e-9);
        let expected = (100.0 / 4095.0 * 360.0f64).to_radians() * 80.0 / 2.0;
        for amp in &series.amplitude_mm {
            assert!((*amp - expected).abs() <= 0.01 * expected.abs());
        }

        let accel: Vec<f64> = time.iter().map(|t| 0.5 * (2.0 * PI * 5.0 * t).sin()).collect();
        let integrated = integrated_amplitude_over_time(&accel, &time, &settings, &FilterSettings::default());
        assert_eq!(integrated.time.len(), 16);
        assert!(integrated.amplitude_mm.iter().all(|a| *a > 3.0 && *a < 7.0));
    }

    #[test]
    fn test_amplitude_series_needs_timing() {
        let series = analog_amplitude_over_time(&[1.0], &[0.0], &KinematicSettings::default());
        assert!(series.time.is_empty());
    }
}
