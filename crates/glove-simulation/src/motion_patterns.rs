//! Pre-defined hand motion patterns for capture simulation

use glove_core::MeasurementMode;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Standard gravity (m/s²)
const GRAVITY: f64 = 9.81;
/// 12-bit ADC span
const ADC_FULL_SCALE: f64 = 4095.0;
/// ADC code of the analog angle sensor at rest
const ADC_MID_SCALE: f64 = 2048.0;

/// Noise-free sensor readings at one instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub values: [f64; 5],
}

/// Motion the simulated hand performs during a capture
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "pattern", rename_all = "snake_case")]
pub enum MotionPattern {
    /// Rest tremor: sinusoidal hand oscillation
    Tremor {
        frequency_hz: f64,
        /// Peak accelerometer Y reading (g)
        accel_amplitude_g: f64,
        /// Lever arm of the analog position sensor (m)
        sensor_radius_m: f64,
    },
    /// Finger tapping with optional amplitude decrement
    Tapping {
        frequency_hz: f64,
        /// Full opening angle of one tap (degrees)
        range_deg: f64,
        /// Resting angle (degrees)
        baseline_deg: f64,
        /// Exponential amplitude decay rate (1/s)
        fatigue_rate: f64,
        /// Angle the analog sensor reads above the IMU (degrees)
        mount_offset_deg: f64,
        /// Analog sensor mounted reversed
        analog_inverted: bool,
    },
    /// Passive joint extension against increasing resistance
    Stiffness {
        /// Time to reach the peak (s)
        ramp_s: f64,
        /// ADC code of sensor 1 at the peak
        peak_adc: f64,
        /// Extension angle at the peak (degrees)
        range_deg: f64,
        /// Sensor 1 force at the peak for legacy captures (N)
        peak_force_n: f64,
    },
}

impl MotionPattern {
    /// Measurement mode the device would be in
    pub fn mode(&self) -> MeasurementMode {
        match self {
            MotionPattern::Tremor { .. } => MeasurementMode::Tremor,
            MotionPattern::Tapping { .. } => MeasurementMode::Bradykinesia,
            MotionPattern::Stiffness { .. } => MeasurementMode::Stiffness,
        }
    }

    /// Current-format readings at `time` seconds
    pub fn reading_at(&self, time: f64) -> SensorReading {
        match *self {
            MotionPattern::Tremor { frequency_hz, accel_amplitude_g, sensor_radius_m } => {
                let omega = 2.0 * PI * frequency_hz;
                let phase = (omega * time).sin();
                let accel_y = accel_amplitude_g * phase;
                // The accelerometer reads against the direction of travel
                let displacement_m = accel_amplitude_g * GRAVITY / (omega * omega) * phase;
                let angle_deg = (displacement_m / sensor_radius_m).to_degrees();
                SensorReading {
                    values: [degrees_to_adc(angle_deg) + ADC_MID_SCALE, accel_y, 1.0, 0.0, 0.0],
                }
            }
            MotionPattern::Tapping {
                frequency_hz,
                range_deg,
                baseline_deg,
                fatigue_rate,
                mount_offset_deg,
                analog_inverted,
            } => {
                let opening = 0.5 * (1.0 - (2.0 * PI * frequency_hz * time).cos());
                let angle = baseline_deg + range_deg * opening * (-fatigue_rate * time).exp();
                let analog_deg = angle + mount_offset_deg;
                let analog_deg = if analog_inverted { 360.0 - analog_deg } else { analog_deg };
                let gyro = 2.0 * PI * frequency_hz * range_deg * 0.5 * (2.0 * PI * frequency_hz * time).sin();
                SensorReading {
                    values: [degrees_to_adc(analog_deg.rem_euclid(360.0)), angle, gyro, 0.0, 0.0],
                }
            }
            MotionPattern::Stiffness { ramp_s, peak_adc, range_deg, .. } => {
                let fraction = (time / ramp_s).clamp(0.0, 1.0);
                SensorReading {
                    values: [peak_adc * fraction, 0.8 * peak_adc * fraction, range_deg * fraction, 0.0, 0.0],
                }
            }
        }
    }

    /// Legacy-format (three value) readings at `time` seconds
    pub fn legacy_reading_at(&self, time: f64) -> [f64; 3] {
        match *self {
            MotionPattern::Stiffness { ramp_s, peak_force_n, .. } => {
                let fraction = (time / ramp_s).clamp(0.0, 1.0);
                [peak_force_n * fraction, 0.8 * peak_force_n * fraction, 0.0]
            }
            _ => {
                let values = self.reading_at(time).values;
                [values[0], values[1], values[2]]
            }
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            MotionPattern::Tremor { .. } => "Rest tremor",
            MotionPattern::Tapping { .. } => "Finger tapping",
            MotionPattern::Stiffness { .. } => "Passive stiffness",
        }
    }

    /// Common preset patterns
    pub fn presets() -> Vec<(&'static str, MotionPattern)> {
        vec![
            ("Parkinsonian Tremor", MotionPattern::parkinsonian_tremor()),
            ("Essential Tremor", MotionPattern::Tremor {
                frequency_hz: 9.0,
                accel_amplitude_g: 0.3,
                sensor_radius_m: 0.075,
            }),
            ("Physiological Tremor", MotionPattern::Tremor {
                frequency_hz: 14.0,
                accel_amplitude_g: 0.05,
                sensor_radius_m: 0.075,
            }),
            ("Normal Tapping", MotionPattern::tapping()),
            ("Bradykinetic Tapping", MotionPattern::Tapping {
                frequency_hz: 1.0,
                range_deg: 40.0,
                baseline_deg: 20.0,
                fatigue_rate: 0.15,
                mount_offset_deg: 5.0,
                analog_inverted: false,
            }),
            ("Rigid Joint", MotionPattern::stiffness()),
        ]
    }

    /// Preset by name, ignoring case, spaces, hyphens and underscores
    pub fn preset(name: &str) -> Option<MotionPattern> {
        let wanted = preset_key(name);
        Self::presets()
            .into_iter()
            .find(|(label, _)| preset_key(label) == wanted)
            .map(|(_, pattern)| pattern)
    }

    pub fn parkinsonian_tremor() -> Self {
        MotionPattern::Tremor {
            frequency_hz: 5.0,
            accel_amplitude_g: 0.5,
            sensor_radius_m: 0.075,
        }
    }

    pub fn tapping() -> Self {
        MotionPattern::Tapping {
            frequency_hz: 2.0,
            range_deg: 60.0,
            baseline_deg: 20.0,
            fatigue_rate: 0.0,
            mount_offset_deg: 5.0,
            analog_inverted: false,
        }
    }

    pub fn stiffness() -> Self {
        MotionPattern::Stiffness {
            ramp_s: 3.0,
            peak_adc: 3000.0,
            range_deg: 60.0,
            peak_force_n: 25.0,
        }
    }
}

fn preset_key(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

/// Angle in degrees to analog sensor ADC counts
fn degrees_to_adc(angle_deg: f64) -> f64 {
    angle_deg / 360.0 * ADC_FULL_SCALE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modes() {
        assert_eq!(MotionPattern::parkinsonian_tremor().mode(), MeasurementMode::Tremor);
        assert_eq!(MotionPattern::tapping().mode(), MeasurementMode::Bradykinesia);
        assert_eq!(MotionPattern::stiffness().mode(), MeasurementMode::Stiffness);
    }

    #[test]
    fn test_tremor_analog_follows_displacement() {
        let pattern = MotionPattern::parkinsonian_tremor();
        // quarter period: accel at its positive peak
        let reading = pattern.reading_at(0.05);
        assert!((reading.values[1] - 0.5).abs() < 1e-9);
        assert!(reading.values[0] > ADC_MID_SCALE);
        assert!((pattern.reading_at(0.0).values[0] - ADC_MID_SCALE).abs() < 1e-9);
    }

    #[test]
    fn test_tapping_starts_at_rest() {
        let reading = MotionPattern::tapping().reading_at(0.0);
        assert!((reading.values[1] - 20.0).abs() < 1e-9);
        assert!((reading.values[0] - degrees_to_adc(25.0)).abs() < 1e-9);

        let peak = MotionPattern::tapping().reading_at(0.25);
        assert!((peak.values[1] - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_stiffness_ramp_holds() {
        let pattern = MotionPattern::stiffness();
        assert_eq!(pattern.reading_at(1.5).values[0], 1500.0);
        assert_eq!(pattern.reading_at(10.0).values[0], 3000.0);
        assert_eq!(pattern.legacy_reading_at(3.0), [25.0, 20.0, 0.0]);
    }

    #[test]
    fn test_presets_available() {
        let presets = MotionPattern::presets();
        assert!(presets.len() >= 6);
        assert!(presets.iter().any(|(_, p)| p.mode() == MeasurementMode::Stiffness));
    }

    #[test]
    fn test_preset_lookup() {
        let Some(MotionPattern::Tremor { frequency_hz, .. }) = MotionPattern::preset("essential-tremor") else {
            panic!("essential tremor preset missing");
        };
        assert_eq!(frequency_hz, 9.0);
        assert_eq!(MotionPattern::preset("RIGID_JOINT").map(|p| p.mode()), Some(MeasurementMode::Stiffness));
        assert_eq!(MotionPattern::preset("Parkinsonian Tremor"), Some(MotionPattern::parkinsonian_tremor()));
        assert!(MotionPattern::preset("gait").is_none());
    }
}
