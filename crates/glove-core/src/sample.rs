//! Glove sample records and measurement modes

use serde::{Deserialize, Serialize};
use crate::error::{GloveError, GloveResult};

/// Measurement protocol selected on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum MeasurementMode {
    /// Resting/postural tremor (accelerometer + analog position sensor)
    Tremor,
    /// Finger tapping speed and amplitude (analog angle + IMU angle)
    Bradykinesia,
    /// Passive joint stiffness (two force sensors + angle)
    Stiffness,
}

impl MeasurementMode {
    /// All modes, in tag order
    pub const ALL: [MeasurementMode; 3] = [
        MeasurementMode::Tremor,
        MeasurementMode::Bradykinesia,
        MeasurementMode::Stiffness,
    ];

    /// Numeric tag carried in every sample record
    pub fn tag(&self) -> u8 {
        match self {
            MeasurementMode::Tremor => 1,
            MeasurementMode::Bradykinesia => 2,
            MeasurementMode::Stiffness => 3,
        }
    }

    /// Look a mode up by its numeric tag
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            1 => Some(MeasurementMode::Tremor),
            2 => Some(MeasurementMode::Bradykinesia),
            3 => Some(MeasurementMode::Stiffness),
            _ => None,
        }
    }

    /// Command word that starts this measurement on the device
    pub fn command(&self) -> &'static str {
        match self {
            MeasurementMode::Tremor => "TREM",
            MeasurementMode::Bradykinesia => "BRAD",
            MeasurementMode::Stiffness => "STIF",
        }
    }

    /// Human readable name
    pub fn name(&self) -> &'static str {
        match self {
            MeasurementMode::Tremor => "Tremor",
            MeasurementMode::Bradykinesia => "Bradykinesia",
            MeasurementMode::Stiffness => "Stiffness",
        }
    }
}

impl TryFrom<u8> for MeasurementMode {
    type Error = GloveError;

    fn try_from(tag: u8) -> GloveResult<Self> {
        Self::from_tag(tag).ok_or_else(|| GloveError::InvalidCapture {
            reason: format!("unknown measurement mode tag {}", tag),
        })
    }
}

impl From<MeasurementMode> for u8 {
    fn from(mode: MeasurementMode) -> u8 {
        mode.tag()
    }
}

impl std::str::FromStr for MeasurementMode {
    type Err = GloveError;

    fn from_str(s: &str) -> GloveResult<Self> {
        let trimmed = s.trim();
        if let Ok(tag) = trimmed.parse::<u8>() {
            return Self::try_from(tag);
        }
        Self::ALL
            .iter()
            .copied()
            .find(|mode| {
                mode.name().eq_ignore_ascii_case(trimmed)
                    || mode.command().eq_ignore_ascii_case(trimmed)
            })
            .ok_or_else(|| GloveError::InvalidCapture {
                reason: format!("unknown measurement mode '{}'", trimmed),
            })
    }
}

impl std::fmt::Display for MeasurementMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Sensor value slot within a sample record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    Value1,
    Value2,
    Value3,
    Value4,
    Value5,
}

impl Channel {
    /// 1-based channel number as labelled on the device
    pub fn number(&self) -> usize {
        match self {
            Channel::Value1 => 1,
            Channel::Value2 => 2,
            Channel::Value3 => 3,
            Channel::Value4 => 4,
            Channel::Value5 => 5,
        }
    }

    /// Channel for a 1-based number
    pub fn from_number(number: usize) -> Option<Self> {
        match number {
            1 => Some(Channel::Value1),
            2 => Some(Channel::Value2),
            3 => Some(Channel::Value3),
            4 => Some(Channel::Value4),
            5 => Some(Channel::Value5),
            _ => None,
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Sensor {}", self.number())
    }
}

/// One record received from the glove
///
/// Legacy firmware sends three values; `value4` and `value5` are then `None`
/// rather than zero so analyses can tell "absent" from "reading of 0".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub index: i64,
    pub time_ms: i64,
    pub mode: MeasurementMode,
    #[serde(deserialize_with = "reading")]
    pub value1: f64,
    #[serde(deserialize_with = "reading")]
    pub value2: f64,
    #[serde(deserialize_with = "reading")]
    pub value3: f64,
    #[serde(default, deserialize_with = "present_reading", skip_serializing_if = "Option::is_none")]
    pub value4: Option<f64>,
    #[serde(default, deserialize_with = "present_reading", skip_serializing_if = "Option::is_none")]
    pub value5: Option<f64>,
}

/// A missing reading is written as `null` and read back as NaN
fn reading<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

/// Channel slot that is present in the record, possibly holding `null`
///
/// Only an absent key means the channel is not carried.
fn present_reading<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    reading(deserializer).map(Some)
}

impl Sample {
    /// Create a current-format (five value) sample
    pub fn new(index: i64, time_ms: i64, mode: MeasurementMode, values: [f64; 5]) -> Self {
        Self {
            index,
            time_ms,
            mode,
            value1: values[0],
            value2: values[1],
            value3: values[2],
            value4: Some(values[3]),
            value5: Some(values[4]),
        }
    }

    /// Create a legacy (three value) sample
    pub fn legacy(index: i64, time_ms: i64, mode: MeasurementMode, values: [f64; 3]) -> Self {
        Self {
            index,
            time_ms,
            mode,
            value1: values[0],
            value2: values[1],
            value3: values[2],
            value4: None,
            value5: None,
        }
    }

    /// Reading on `channel`, `None` when the record does not carry it
    pub fn value(&self, channel: Channel) -> Option<f64> {
        match channel {
            Channel::Value1 => Some(self.value1),
            Channel::Value2 => Some(self.value2),
            Channel::Value3 => Some(self.value3),
            Channel::Value4 => self.value4,
            Channel::Value5 => self.value5,
        }
    }

    /// Number of channels this record carries (3 or 5)
    pub fn channel_count(&self) -> usize {
        if self.value4.is_some() && self.value5.is_some() {
            5
        } else {
            3
        }
    }

    /// True for three-value records
    pub fn is_legacy(&self) -> bool {
        self.channel_count() == 3
    }

    /// Sample time in seconds
    pub fn time_seconds(&self) -> f64 {
        self.time_ms as f64 / 1000.0
    }
}
