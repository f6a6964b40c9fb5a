//! Force sensing resistor conversion and stiffness analysis
//!
//! Stiffness captures carry two force sensing resistors on `value1` and
//! `value2` (raw ADC) and the joint angle on `value3` (degrees). Each FSR
//! sits in a voltage divider with a fixed resistor; its resistance maps to
//! force through an empirical power law.

use crate::config::{AnalysisConfig, ForceCalibration};
use glove_core::stats::{mean, mean_diff};
use glove_core::{AnalysisReporter, Capture, Channel, GloveError, GloveResult, MeasurementMode};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Newtons per kilogram-force
const NEWTONS_PER_KGF: f64 = 9.81;

/// Output unit for force readings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForceUnit {
    #[serde(rename = "kgf")]
    Kgf,
    #[serde(rename = "gf")]
    Gf,
    #[serde(rename = "N")]
    Newton,
}

impl ForceUnit {
    pub fn symbol(&self) -> &'static str {
        match self {
            ForceUnit::Kgf => "kgf",
            ForceUnit::Gf => "gf",
            ForceUnit::Newton => "N",
        }
    }

    /// Value of one kilogram-force in this unit
    pub fn per_kgf(&self) -> f64 {
        match self {
            ForceUnit::Kgf => 1.0,
            ForceUnit::Gf => 1000.0,
            ForceUnit::Newton => NEWTONS_PER_KGF,
        }
    }

    /// Newtons in one unit of this force
    pub fn to_newtons(&self) -> f64 {
        NEWTONS_PER_KGF / self.per_kgf()
    }
}

impl FromStr for ForceUnit {
    type Err = GloveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kgf" | "kilograms-force" => Ok(ForceUnit::Kgf),
            "gf" | "grams-force" => Ok(ForceUnit::Gf),
            "n" | "newton" | "newtons" => Ok(ForceUnit::Newton),
            _ => Err(GloveError::UnknownUnit { unit: s.to_string() }),
        }
    }
}

impl std::fmt::Display for ForceUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// ADC code to force conversion for one calibrated FSR channel
#[derive(Debug, Clone, PartialEq)]
pub struct ForceTransducer {
    calibration: ForceCalibration,
}

impl ForceTransducer {
    pub fn new(calibration: ForceCalibration) -> Self {
        Self { calibration }
    }

    pub fn calibration(&self) -> &ForceCalibration {
        &self.calibration
    }

    /// Divider output voltage, kept `voltage_margin` away from both rails
    pub fn voltage(&self, adc: f64) -> f64 {
        let c = &self.calibration;
        let voltage = adc / c.adc_full_scale * c.vcc;
        voltage.clamp(c.voltage_margin, c.vcc - c.voltage_margin)
    }

    /// Sensor resistance (Ω) from the divider relation
    pub fn resistance(&self, adc: f64) -> f64 {
        let c = &self.calibration;
        let voltage = self.voltage(adc);
        c.fixed_resistor_ohms * (c.vcc - voltage) / voltage
    }

    /// Force in `unit` for a raw ADC code
    pub fn adc_to_force(&self, adc: f64, unit: ForceUnit) -> f64 {
        let resistance = self.resistance(adc);
        if !(resistance > 0.0) {
            return 0.0;
        }
        let kgf = (self.calibration.coefficient * resistance.powf(self.calibration.exponent)).max(0.0);
        kgf * unit.per_kgf()
    }

    pub fn adc_to_kgf(&self, adc: f64) -> f64 {
        self.adc_to_force(adc, ForceUnit::Kgf)
    }

    pub fn adc_to_gf(&self, adc: f64) -> f64 {
        self.adc_to_force(adc, ForceUnit::Gf)
    }

    pub fn adc_to_newtons(&self, adc: f64) -> f64 {
        self.adc_to_force(adc, ForceUnit::Newton)
    }
}

impl Default for ForceTransducer {
    fn default() -> Self {
        Self::new(ForceCalibration::default())
    }
}

/// Largest step-to-step force change per second
pub fn peak_force_rate(force: &[f64], time: &[f64]) -> f64 {
    let Some(dt) = mean_diff(time) else {
        return 0.0;
    };
    if !(dt > 0.0) {
        return 0.0;
    }
    let max_step = force
        .windows(2)
        .map(|w| (w[1] - w[0]).abs())
        .fold(0.0, f64::max);
    max_step / dt
}

/// Work (J) done against the combined force
///
/// With angle data the lever displacement of every step is weighted by the
/// average force over that step. Without it (all-zero angle) a rough proxy
/// is used: velocity proportional to the change in force. Never negative.
pub fn work_done(
    combined_force: &[f64],
    angle_deg: &[f64],
    time: &[f64],
    unit: ForceUnit,
    calibration: &ForceCalibration,
) -> f64 {
    let work = if angle_deg.iter().any(|a| *a != 0.0) {
        let lever_work: f64 = combined_force
            .windows(2)
            .zip(angle_deg.windows(2))
            .map(|(f, a)| {
                let displacement = (a[1] - a[0]).to_radians() * calibration.lever_arm_m;
                (f[0] + f[1]) / 2.0 * displacement.abs()
            })
            .sum();
        lever_work * unit.to_newtons()
    } else {
        let dt = mean_diff(time).unwrap_or(0.0);
        combined_force
            .windows(2)
            .map(|f| {
                let velocity = (f[1] - f[0]).abs() * calibration.velocity_scale;
                f[0] * unit.to_newtons() * velocity * dt
            })
            .sum()
    };
    work.max(0.0)
}

/// Summary of one force sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorForce {
    pub max: f64,
    pub mean: f64,
    /// Largest force change per second
    pub peak_rate: f64,
}

impl SensorForce {
    fn calculate(force: &[f64], time: &[f64]) -> Self {
        Self {
            max: force.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            mean: mean(force),
            peak_rate: peak_force_rate(force, time),
        }
    }
}

/// Stiffness test result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForceReport {
    pub unit: ForceUnit,
    /// Legacy captures carry force values directly and no angle
    pub legacy_format: bool,
    pub angle_available: bool,
    pub time: Vec<f64>,
    pub sensor1: SensorForce,
    pub sensor2: SensorForce,
    /// Sum of both sensors over time
    pub combined: Vec<f64>,
    pub combined_max: f64,
    /// Total work (J)
    pub work_joules: f64,
}

/// Force analysis for stiffness captures
pub struct ForceAnalyzer<'a> {
    config: &'a AnalysisConfig,
    reporter: &'a dyn AnalysisReporter,
}

impl<'a> ForceAnalyzer<'a> {
    pub fn new(config: &'a AnalysisConfig, reporter: &'a dyn AnalysisReporter) -> Self {
        Self { config, reporter }
    }

    pub fn analyze(&self, capture: &Capture) -> GloveResult<ForceReport> {
        let calibration = &self.config.force;
        if capture.len() < calibration.min_samples {
            return Err(GloveError::InsufficientData {
                operation: "force analysis",
                required: calibration.min_samples,
                available: capture.len(),
            });
        }
        capture.require_mode("Force analysis", MeasurementMode::Stiffness)?;

        let unit = calibration.output_unit;
        let time = capture.time_seconds();
        let raw1 = capture.channel(Channel::Value1)?;
        let raw2 = capture.channel(Channel::Value2)?;

        let legacy = capture.is_legacy();
        let (force1, force2, angle) = if legacy {
            self.reporter.info("Legacy capture: values are already in force units, no angle data");
            (raw1, raw2, vec![0.0; capture.len()])
        } else {
            let transducer = ForceTransducer::new(calibration.clone());
            let convert =
                |raw: &[f64]| -> Vec<f64> { raw.iter().map(|&adc| transducer.adc_to_force(adc, unit)).collect() };
            self.reporter.info(&format!("Converting FSR readings to force ({})", unit));
            (convert(&raw1), convert(&raw2), capture.channel(Channel::Value3)?)
        };

        let combined: Vec<f64> = force1.iter().zip(&force2).map(|(a, b)| a + b).collect();
        let angle_available = angle.iter().any(|a| *a != 0.0);
        if !angle_available {
            self.reporter.warn("No angle data, work estimated from force rate");
        }

        let mut work_joules = work_done(&combined, &angle, &time, unit, calibration);
        if !work_joules.is_finite() {
            self.reporter.degraded(&GloveError::degenerate("work integration", "non-finite work"));
            work_joules = 0.0;
        }

        let sensor1 = SensorForce::calculate(&force1, &time);
        let sensor2 = SensorForce::calculate(&force2, &time);
        let combined_max = combined.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        self.reporter.info(&format!(
            "Force analysis completed: max force {:.2} {}, work done {:.3} J",
            combined_max, unit, work_joules
        ));
        self.reporter.info(&format!(
            "Force range: sensor 1 = {:.2} {unit}, sensor 2 = {:.2} {unit}",
            sensor1.max,
            sensor2.max,
            unit = unit
        ));

        Ok(ForceReport {
            unit,
            legacy_format: legacy,
            angle_available,
            time,
            sensor1,
            sensor2,
            combined,
            combined_max,
            work_joules,
        })
    }
}
