//! Configuration management for glove capture analysis
//!
//! Every empirical constant used by the analyzers lives here with its
//! calibrated default. A configuration file only needs to name the values it
//! overrides; missing fields fall back to the defaults.

use crate::force::ForceUnit;
use glove_core::{config_error, GloveError, GloveResult};
use serde::{Deserialize, Serialize};

/// Complete analysis configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Discard the warm-up period before analysing
    pub truncate_warmup: bool,
    /// Length of the warm-up period (ms)
    pub warmup_ms: i64,
    pub filter: FilterSettings,
    pub spectral: SpectralSettings,
    pub kinematics: KinematicSettings,
    pub extrema: ExtremaSettings,
    pub movement: MovementSettings,
    pub comparison: ComparisonSettings,
    pub force: ForceCalibration,
}

/// Bandpass filter design
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    /// Lower corner frequency (Hz)
    pub low_cutoff_hz: f64,
    /// Upper corner frequency (Hz)
    pub high_cutoff_hz: f64,
    /// Butterworth prototype order (even)
    pub order: usize,
    /// Upper corner is clamped to this fraction of Nyquist
    pub max_normalized_high: f64,
}

/// Spectral analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectralSettings {
    /// Lower edge of the dominant-frequency search band (Hz)
    pub search_low_hz: f64,
    /// Upper edge of the dominant-frequency search band (Hz)
    pub search_high_hz: f64,
    /// Minimum samples for single-channel frequency analysis
    pub min_samples: usize,
}

/// Displacement reconstruction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KinematicSettings {
    /// Standard gravity used to convert g to m/s²
    pub gravity: f64,
    /// ADC code mapped to a full 360° turn by the analog angle sensor
    pub analog_full_scale: f64,
    /// Lever arm of the analog position sensor (m)
    pub analog_radius_m: f64,
    /// Lever arm assumed by the windowed analog amplitude series (m)
    pub windowed_analog_radius_m: f64,
    /// Window length of the amplitude-over-time series (s)
    pub amplitude_window_s: f64,
    /// Smallest window for the analog amplitude series (samples)
    pub analog_min_window: usize,
    /// Smallest window for the integrated amplitude series (samples)
    pub integration_min_window: usize,
}

/// Peak/trough detection defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtremaSettings {
    /// Default prominence as a fraction of the signal range
    pub prominence_fraction: f64,
    /// Lower bound of the default peak distance (samples)
    pub min_distance: usize,
    /// Default distance is at least `len / distance_divisor`
    pub distance_divisor: usize,
}

/// Finger-tapping movement analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementSettings {
    pub smoothing_window: usize,
    pub smoothing_order: usize,
    /// Minimum distance between movements (samples)
    pub min_distance: usize,
    /// Signals whose peak magnitude stays below this are treated as degrees
    pub degree_regime_limit: f64,
    /// Height threshold as a fraction of the signal range
    pub height_fraction: f64,
    /// Prominence threshold as a fraction of the signal range
    pub prominence_fraction: f64,
    pub degree_height_floor: f64,
    pub degree_prominence_floor: f64,
    pub adc_height_floor: f64,
    pub adc_prominence_floor: f64,
    pub min_samples: usize,
}

/// Cross-sensor comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComparisonSettings {
    /// Correlation below which the analog sensor is assumed mounted inverted
    pub inversion_threshold: f64,
    pub smoothing_window: usize,
    pub smoothing_order: usize,
    /// Minimum paired samples after NaN removal
    pub min_samples: usize,
}

/// Force sensing resistor calibration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForceCalibration {
    /// Supply voltage (V)
    pub vcc: f64,
    /// Fixed divider resistor (Ω)
    pub fixed_resistor_ohms: f64,
    /// Largest ADC code
    pub adc_full_scale: f64,
    /// Voltage is kept this far from 0 and Vcc (V)
    pub voltage_margin: f64,
    /// Power law coefficient: kgf = coefficient · R^exponent
    pub coefficient: f64,
    pub exponent: f64,
    /// Lever arm for work from angular displacement (m)
    pub lever_arm_m: f64,
    /// Velocity proxy scale when no angle data exists
    pub velocity_scale: f64,
    /// Unit of reported forces
    pub output_unit: ForceUnit,
    pub min_samples: usize,
}

impl AnalysisConfig {
    /// Validate configuration consistency
    pub fn validate(&self) -> GloveResult<()> {
        if self.warmup_ms < 0 {
            return Err(config_error!("warm-up must be non-negative, got {} ms", self.warmup_ms));
        }
        self.filter.validate()?;
        self.spectral.validate()?;
        self.kinematics.validate()?;
        self.extrema.validate()?;
        self.movement.validate()?;
        self.comparison.validate()?;
        self.force.validate()?;
        Ok(())
    }

    /// Export configuration to JSON
    pub fn to_json(&self) -> GloveResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| GloveError::InvalidConfig {
            reason: format!("Failed to serialize configuration: {}", e),
        })
    }

    /// Import and validate configuration from JSON
    pub fn from_json(json: &str) -> GloveResult<Self> {
        let config: AnalysisConfig = serde_json::from_str(json).map_err(|e| GloveError::InvalidConfig {
            reason: format!("Failed to deserialize configuration: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }
}

impl FilterSettings {
    fn validate(&self) -> GloveResult<()> {
        if self.low_cutoff_hz <= 0.0 || self.high_cutoff_hz <= self.low_cutoff_hz {
            return Err(config_error!(
                "bandpass corners must satisfy 0 < low < high, got {} / {} Hz",
                self.low_cutoff_hz, self.high_cutoff_hz
            ));
        }
        if self.order == 0 || self.order % 2 != 0 {
            return Err(config_error!("filter order must be even and positive, got {}", self.order));
        }
        if !(self.max_normalized_high > 0.0 && self.max_normalized_high < 1.0) {
            return Err(config_error!(
                "normalized upper corner limit must lie in (0, 1), got {}",
                self.max_normalized_high
            ));
        }
        Ok(())
    }
}

impl SpectralSettings {
    fn validate(&self) -> GloveResult<()> {
        if self.search_low_hz < 0.0 || self.search_high_hz <= self.search_low_hz {
            return Err(config_error!(
                "dominant frequency band is empty: {} - {} Hz",
                self.search_low_hz, self.search_high_hz
            ));
        }
        if self.min_samples < 2 {
            return Err(config_error!("spectral analysis needs at least 2 samples"));
        }
        Ok(())
    }
}

impl KinematicSettings {
    fn validate(&self) -> GloveResult<()> {
        let positive = [
            ("gravity", self.gravity),
            ("analog_full_scale", self.analog_full_scale),
            ("analog_radius_m", self.analog_radius_m),
            ("windowed_analog_radius_m", self.windowed_analog_radius_m),
            ("amplitude_window_s", self.amplitude_window_s),
        ];
        for (name, value) in positive {
            if value <= 0.0 {
                return Err(config_error!("{} must be positive, got {}", name, value));
            }
        }
        if self.analog_min_window < 2 || self.integration_min_window < 2 {
            return Err(config_error!("amplitude windows need at least 2 samples"));
        }
        Ok(())
    }
}

impl ExtremaSettings {
    fn validate(&self) -> GloveResult<()> {
        if !(0.0..=1.0).contains(&self.prominence_fraction) {
            return Err(config_error!(
                "prominence fraction must lie in [0, 1], got {}",
                self.prominence_fraction
            ));
        }
        if self.min_distance == 0 || self.distance_divisor == 0 {
            return Err(config_error!("peak distance parameters must be positive"));
        }
        Ok(())
    }
}

impl MovementSettings {
    fn validate(&self) -> GloveResult<()> {
        validate_smoothing(self.smoothing_window, self.smoothing_order)?;
        if self.min_distance == 0 {
            return Err(config_error!("movement distance must be positive"));
        }
        if self.degree_regime_limit <= 0.0 {
            return Err(config_error!("degree regime limit must be positive"));
        }
        if self.min_samples < 2 {
            return Err(config_error!("movement analysis needs at least 2 samples"));
        }
        Ok(())
    }
}

impl ComparisonSettings {
    fn validate(&self) -> GloveResult<()> {
        validate_smoothing(self.smoothing_window, self.smoothing_order)?;
        if !(-1.0..=1.0).contains(&self.inversion_threshold) {
            return Err(config_error!(
                "inversion threshold must be a correlation in [-1, 1], got {}",
                self.inversion_threshold
            ));
        }
        if self.min_samples < 3 {
            return Err(config_error!("comparisons need at least 3 samples"));
        }
        Ok(())
    }
}

impl ForceCalibration {
    fn validate(&self) -> GloveResult<()> {
        if self.vcc <= 0.0 || self.fixed_resistor_ohms <= 0.0 || self.adc_full_scale <= 0.0 {
            return Err(config_error!("supply voltage, divider resistor and ADC span must be positive"));
        }
        if self.voltage_margin <= 0.0 || self.voltage_margin * 2.0 >= self.vcc {
            return Err(config_error!(
                "voltage margin {} V must be positive and below half of Vcc",
                self.voltage_margin
            ));
        }
        if self.coefficient <= 0.0 {
            return Err(config_error!("power law coefficient must be positive"));
        }
        if self.lever_arm_m <= 0.0 || self.velocity_scale < 0.0 {
            return Err(config_error!("lever arm must be positive and velocity scale non-negative"));
        }
        if self.min_samples < 2 {
            return Err(config_error!("force analysis needs at least 2 samples"));
        }
        Ok(())
    }
}

fn validate_smoothing(window: usize, order: usize) -> GloveResult<()> {
    if order == 0 {
        return Err(config_error!("smoothing polynomial order must be positive"));
    }
    if window < order + 2 {
        return Err(config_error!(
            "smoothing window {} too short for polynomial order {}",
            window, order
        ));
    }
    Ok(())
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            truncate_warmup: true,
            warmup_ms: 500,
            filter: FilterSettings::default(),
            spectral: SpectralSettings::default(),
            kinematics: KinematicSettings::default(),
            extrema: ExtremaSettings::default(),
            movement: MovementSettings::default(),
            comparison: ComparisonSettings::default(),
            force: ForceCalibration::default(),
        }
    }
}

impl Default for FilterSettings {
    fn default() -> Self {
        FilterSettings {
            low_cutoff_hz: 1.0,
            high_cutoff_hz: 20.0,
            order: 4,
            max_normalized_high: 0.95,
        }
    }
}

impl Default for SpectralSettings {
    fn default() -> Self {
        SpectralSettings {
            search_low_hz: 1.0,
            search_high_hz: 20.0,
            min_samples: 10,
        }
    }
}

impl Default for KinematicSettings {
    fn default() -> Self {
        KinematicSettings {
            gravity: 9.81,
            analog_full_scale: 4095.0,
            analog_radius_m: 0.075,
            windowed_analog_radius_m: 0.08,
            amplitude_window_s: 2.0,
            analog_min_window: 10,
            integration_min_window: 20,
        }
    }
}

impl Default for ExtremaSettings {
    fn default() -> Self {
        ExtremaSettings {
            prominence_fraction: 0.1,
            min_distance: 10,
            distance_divisor: 20,
        }
    }
}

impl Default for MovementSettings {
    fn default() -> Self {
        MovementSettings {
            smoothing_window: 21,
            smoothing_order: 3,
            min_distance: 30,
            degree_regime_limit: 500.0,
            height_fraction: 0.1,
            prominence_fraction: 0.05,
            degree_height_floor: 5.0,
            degree_prominence_floor: 3.0,
            adc_height_floor: 100.0,
            adc_prominence_floor: 50.0,
            min_samples: 10,
        }
    }
}

impl Default for ComparisonSettings {
    fn default() -> Self {
        ComparisonSettings {
            inversion_threshold: -0.3,
            smoothing_window: 21,
            smoothing_order: 3,
            min_samples: 50,
        }
    }
}

impl Default for ForceCalibration {
    fn default() -> Self {
        ForceCalibration {
            vcc: 3.3,
            fixed_resistor_ohms: 4700.0,
            adc_full_scale: 4095.0,
            voltage_margin: 0.01,
            coefficient: 153.18,
            exponent: -0.699,
            lever_arm_m: 0.05,
            velocity_scale: 0.001,
            output_unit: ForceUnit::Newton,
            min_samples: 10,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.comparison.inversion_threshold, -0.3);
        assert_eq!(config.force.coefficient, 153.18);
        assert_eq!(config.force.exponent, -0.699);
    }

    #[test]
    fn test_config_validation() {
        let mut config = AnalysisConfig::default();

        config.filter.order = 3;
        assert!(config.validate().is_err());

        config.filter.order = 4;
        config.filter.high_cutoff_hz = 0.5;
        assert!(config.validate().is_err());

        config.filter.high_cutoff_hz = 20.0;
        config.movement.smoothing_window = 4;
        assert!(config.validate().is_err());

        config.movement.smoothing_window = 21;
        config.force.voltage_margin = 2.0;
        assert!(matches!(config.validate(), Err(GloveError::InvalidConfig { .. })));
    }

    #[test]
    fn test_json_serialization() {
        let config = AnalysisConfig::default();
        let json = config.to_json().unwrap();
        let parsed = AnalysisConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let parsed = AnalysisConfig::from_json(
            r#"{ "truncate_warmup": false, "force": { "coefficient": 150.0 } }"#,
        )
        .unwrap();
        assert!(!parsed.truncate_warmup);
        assert_eq!(parsed.force.coefficient, 150.0);
        assert_eq!(parsed.force.exponent, -0.699);
        assert_eq!(parsed.filter, FilterSettings::default());
    }

    #[test]
    fn test_invalid_json_is_rejected() {
        assert!(AnalysisConfig::from_json("{ not json").is_err());
        assert!(AnalysisConfig::from_json(r#"{ "filter": { "order": 5 } }"#).is_err());
    }
}
