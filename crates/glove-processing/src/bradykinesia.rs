//! Bradykinesia angle comparison
//!
//! Compares the analog angle sensor (`value1`, raw ADC) with the IMU angle
//! (`value2`, degrees) recorded during finger tapping. The analog reading is
//! mapped to degrees, flipped if the sensors turn in opposite directions,
//! offset to the IMU starting angle, unwrapped and smoothed before the two
//! are compared.

use crate::config::AnalysisConfig;
use crate::kinematics::analog_to_degrees;
use crate::smoothing::{comparison_window, fit_smoothing, savgol_filter};
use glove_core::stats::{linear_fit, mean, median, pearson, peak_to_peak, remove_mean, std_dev};
use glove_core::{
    AnalysisReporter, Capture, Channel, Correlation, GloveError, GloveResult, LinearFit, MeasurementMode,
};
use serde::{Deserialize, Serialize};

/// Fold angles into [-180, 180); if the folded range still spans 180° or
/// more, fold around the median of the input instead
pub fn normalize_angle(angles: &[f64]) -> Vec<f64> {
    let fold = |a: f64| (a + 180.0).rem_euclid(360.0) - 180.0;

    let folded: Vec<f64> = angles.iter().map(|&a| fold(a)).collect();
    if peak_to_peak(&folded) < 180.0 {
        return folded;
    }

    let centre = median(angles);
    angles.iter().map(|&a| fold(a - centre) + centre).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CorrelationStrength {
    Excellent,
    VeryGood,
    Good,
    Moderate,
    Poor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Significance {
    /// p < 0.001
    High,
    /// p < 0.01
    Strong,
    /// p < 0.05
    Significant,
    NotSignificant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bias {
    Minimal,
    Small,
    Significant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Precision {
    Excellent,
    Good,
    Moderate,
    Poor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    Interchangeable,
    ConsiderOffset,
    CalibrationNeeded,
}

/// Qualitative reading of an angle comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AngleInterpretation {
    pub correlation: CorrelationStrength,
    pub significance: Significance,
    pub bias: Bias,
    pub precision: Precision,
    pub recommendation: Recommendation,
    /// Human readable summary
    pub summary: String,
}

impl AngleInterpretation {
    pub fn new(r: f64, p_value: f64, mean_difference: f64, std_difference: f64) -> Self {
        let strength = match r.abs() {
            a if a > 0.9 => CorrelationStrength::Excellent,
            a if a > 0.8 => CorrelationStrength::VeryGood,
            a if a > 0.7 => CorrelationStrength::Good,
            a if a > 0.5 => CorrelationStrength::Moderate,
            _ => CorrelationStrength::Poor,
        };
        let significance = if p_value < 0.001 {
            Significance::High
        } else if p_value < 0.01 {
            Significance::Strong
        } else if p_value < 0.05 {
            Significance::Significant
        } else {
            Significance::NotSignificant
        };
        let bias = match mean_difference.abs() {
            b if b < 2.0 => Bias::Minimal,
            b if b < 5.0 => Bias::Small,
            _ => Bias::Significant,
        };
        let precision = match std_difference {
            s if s < 2.0 => Precision::Excellent,
            s if s < 5.0 => Precision::Good,
            s if s < 10.0 => Precision::Moderate,
            _ => Precision::Poor,
        };
        let recommendation = if r.abs() > 0.8 && std_difference < 5.0 {
            Recommendation::Interchangeable
        } else if r.abs() > 0.7 {
            Recommendation::ConsiderOffset
        } else {
            Recommendation::CalibrationNeeded
        };

        let mut summary = String::new();
        summary.push_str(match strength {
            CorrelationStrength::Excellent => "Excellent correlation between sensors. ",
            CorrelationStrength::VeryGood => "Very good correlation between sensors. ",
            CorrelationStrength::Good => "Good correlation between sensors. ",
            CorrelationStrength::Moderate => "Moderate correlation between sensors. ",
            CorrelationStrength::Poor => "Poor correlation between sensors. ",
        });
        summary.push_str(match significance {
            Significance::High => "The correlation is highly statistically significant (p < 0.001). ",
            Significance::Strong => "The correlation is statistically significant (p < 0.01). ",
            Significance::Significant => "The correlation is statistically significant (p < 0.05). ",
            Significance::NotSignificant => "The correlation is not statistically significant. ",
        });
        match bias {
            Bias::Minimal => summary.push_str("Minimal systematic bias between sensors. "),
            Bias::Small => summary.push_str("Small systematic bias between sensors. "),
            Bias::Significant => summary.push_str(&format!(
                "Significant systematic bias of {:.1}° between sensors. ",
                mean_difference
            )),
        }
        summary.push_str(match precision {
            Precision::Excellent => "Excellent agreement in measurement precision. ",
            Precision::Good => "Good agreement in measurement precision. ",
            Precision::Moderate => "Moderate agreement in measurement precision. ",
            Precision::Poor => "Poor agreement in measurement precision. ",
        });
        summary.push_str("For bradykinesia assessment: ");
        summary.push_str(match recommendation {
            Recommendation::Interchangeable => {
                "Both sensors provide consistent measurements and can be used interchangeably."
            }
            Recommendation::ConsiderOffset => {
                "Sensors show good agreement. Consider the systematic offset when comparing measurements."
            }
            Recommendation::CalibrationNeeded => {
                "Significant differences between sensors. Calibration or sensor investigation may be needed."
            }
        });

        AngleInterpretation {
            correlation: strength,
            significance,
            bias,
            precision,
            recommendation,
            summary,
        }
    }
}

/// Result of comparing the analog and IMU angle sensors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AngleComparison {
    pub time: Vec<f64>,
    /// Aligned, unwrapped and smoothed analog angle (degrees)
    pub analog_angle: Vec<f64>,
    /// Smoothed IMU angle (degrees)
    pub imu_angle: Vec<f64>,
    /// Correlation of the detrended raw angles, before any inversion
    pub initial_correlation: Option<f64>,
    /// Analog mapping was flipped to `360 - angle`
    pub inverted: bool,
    /// Offset added to the analog angle so both start together (degrees)
    pub offset_deg: f64,
    pub correlation: Option<Correlation>,
    /// Mean of IMU minus analog (degrees)
    pub mean_difference: f64,
    /// Standard deviation of IMU minus analog (degrees)
    pub std_difference: f64,
    pub analog_range_of_motion: f64,
    pub imu_range_of_motion: f64,
    /// IMU angle regressed on analog angle
    pub regression: Option<LinearFit>,
    pub interpretation: Option<AngleInterpretation>,
}

/// Analog vs IMU angle comparison for bradykinesia captures
pub struct AngleComparator<'a> {
    config: &'a AnalysisConfig,
    reporter: &'a dyn AnalysisReporter,
}

impl<'a> AngleComparator<'a> {
    pub fn new(config: &'a AnalysisConfig, reporter: &'a dyn AnalysisReporter) -> Self {
        Self { config, reporter }
    }

    /// Compare `value1` (analog ADC) with `value2` (IMU degrees)
    pub fn compare(&self, capture: &Capture) -> GloveResult<AngleComparison> {
        capture.require_mode("Bradykinesia comparison", MeasurementMode::Bradykinesia)?;
        let paired = capture.paired_channels(Channel::Value1, Channel::Value2)?;
        self.compare_series(&paired.time, &paired.first, &paired.second)
    }

    /// Compare already cleaned series of equal length
    pub fn compare_series(&self, time: &[f64], analog_raw: &[f64], imu: &[f64]) -> GloveResult<AngleComparison> {
        let settings = &self.config.comparison;
        let n = time.len().min(analog_raw.len()).min(imu.len());
        if n < settings.min_samples {
            return Err(GloveError::InsufficientData {
                operation: "Bradykinesia comparison",
                required: settings.min_samples,
                available: n,
            });
        }
        let (time, analog_raw, imu) = (&time[..n], &analog_raw[..n], &imu[..n]);

        let full_scale = self.config.kinematics.analog_full_scale;
        let mut analog: Vec<f64> = analog_raw.iter().map(|&v| analog_to_degrees(v, full_scale)).collect();

        let initial_correlation = pearson(&remove_mean(&analog), &remove_mean(imu)).map(|c| c.r);
        let inverted = matches!(initial_correlation, Some(r) if r < settings.inversion_threshold);
        if inverted {
            self.reporter.warn(&format!(
                "Detected inverse correlation ({:.3}). Inverting analog sensor direction.",
                initial_correlation.unwrap_or_default()
            ));
            analog.iter_mut().for_each(|a| *a = 360.0 - *a);
        }

        let offset_deg = imu[0] - analog[0];
        let aligned: Vec<f64> = analog.iter().map(|a| a + offset_deg).collect();
        let aligned = normalize_angle(&aligned);

        let fitted = comparison_window(settings.smoothing_window, n)
            .and_then(|window| fit_smoothing(window, settings.smoothing_order, n));
        let (analog_angle, imu_angle) = match fitted {
            Some((window, order)) => (
                savgol_filter(&aligned, window, order)?,
                savgol_filter(imu, window, order)?,
            ),
            None => (aligned, imu.to_vec()),
        };

        let difference: Vec<f64> = imu_angle.iter().zip(&analog_angle).map(|(i, a)| i - a).collect();
        let mean_difference = mean(&difference);
        let std_difference = std_dev(&difference);

        let correlation = pearson(&analog_angle, &imu_angle);
        let interpretation = match correlation {
            Some(c) => Some(AngleInterpretation::new(c.r, c.p_value, mean_difference, std_difference)),
            None => {
                self.reporter.degraded(&GloveError::degenerate(
                    "angle correlation",
                    "one of the angle series is constant",
                ));
                None
            }
        };

        if let Some(c) = correlation {
            self.reporter.info(&format!(
                "Angle comparison: r = {:.3} (p = {:.2e}), difference {:.2} ± {:.2}°",
                c.r, c.p_value, mean_difference, std_difference
            ));
        }

        Ok(AngleComparison {
            time: time.to_vec(),
            regression: linear_fit(&analog_angle, &imu_angle),
            analog_range_of_motion: peak_to_peak(&analog_angle),
            imu_range_of_motion: peak_to_peak(&imu_angle),
            analog_angle,
            imu_angle,
            initial_correlation,
            inverted,
            offset_deg,
            correlation,
            mean_difference,
            std_difference,
            interpretation,
        })
    }
}
