//! Capture: an ordered, single-mode sequence of glove samples

use crate::error::{GloveError, GloveResult};
use crate::sample::{Channel, MeasurementMode, Sample};
use serde::{Deserialize, Serialize};

/// Sampling rate assumed when it cannot be inferred from the timestamps
pub const DEFAULT_SAMPLING_RATE: f64 = 100.0;

/// A complete, frozen capture session
///
/// The mode of the session is the mode of its first sample. Timestamps are
/// non-decreasing; the sampling interval is inferred from them rather than
/// assumed constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Sample>", into = "Vec<Sample>")]
pub struct Capture {
    samples: Vec<Sample>,
}

impl Capture {
    /// Create a capture, validating that it is non-empty and time-ordered
    pub fn new(samples: Vec<Sample>) -> GloveResult<Self> {
        if samples.is_empty() {
            return Err(GloveError::InvalidCapture {
                reason: "capture contains no samples".to_string(),
            });
        }

        if let Some(pos) = samples.windows(2).position(|w| w[1].time_ms < w[0].time_ms) {
            return Err(GloveError::InvalidCapture {
                reason: format!(
                    "time_ms decreases at sample {} ({} -> {})",
                    pos + 1,
                    samples[pos].time_ms,
                    samples[pos + 1].time_ms
                ),
            });
        }

        Ok(Capture { samples })
    }

    /// Samples in capture order
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Measurement mode of the session
    pub fn mode(&self) -> MeasurementMode {
        self.samples[0].mode
    }

    /// True when the session was recorded by three-channel firmware
    ///
    /// Decided for the capture as a whole: most records carry three values.
    pub fn is_legacy(&self) -> bool {
        let legacy = self.samples.iter().filter(|s| s.is_legacy()).count();
        2 * legacy > self.samples.len()
    }

    /// Channels carried by every sample (3 or 5)
    pub fn channel_count(&self) -> usize {
        self.samples
            .iter()
            .map(Sample::channel_count)
            .min()
            .unwrap_or(0)
    }

    /// Sample times in seconds
    pub fn time_seconds(&self) -> Vec<f64> {
        self.samples.iter().map(Sample::time_seconds).collect()
    }

    /// Readings of one channel, in capture order
    pub fn channel(&self, channel: Channel) -> GloveResult<Vec<f64>> {
        self.samples
            .iter()
            .map(|s| {
                s.value(channel).ok_or(GloveError::MissingChannel {
                    channel: channel.number(),
                    available: s.channel_count(),
                })
            })
            .collect()
    }

    /// Two channels with their times, dropping any row where either is NaN
    pub fn paired_channels(&self, a: Channel, b: Channel) -> GloveResult<PairedChannels> {
        let first = self.channel(a)?;
        let second = self.channel(b)?;
        let time = self.time_seconds();

        let mut paired = PairedChannels::default();
        for ((t, x), y) in time.into_iter().zip(first).zip(second) {
            if x.is_nan() || y.is_nan() {
                continue;
            }
            paired.time.push(t);
            paired.first.push(x);
            paired.second.push(y);
        }
        Ok(paired)
    }

    /// Sampling rate in Hz from the mean interval between samples
    pub fn sampling_rate(&self) -> f64 {
        sampling_rate_from_times(&self.time_seconds())
    }

    /// Time span from the first to the last sample, in seconds
    pub fn duration_seconds(&self) -> f64 {
        let first = self.samples[0].time_ms;
        let last = self.samples[self.samples.len() - 1].time_ms;
        (last - first) as f64 / 1000.0
    }

    /// Drop samples recorded before `warmup_ms` and rebase time to zero
    ///
    /// The first kept sample gets `time_ms = 0`. The source capture is left
    /// untouched.
    pub fn truncate_warmup(&self, warmup_ms: i64) -> GloveResult<Capture> {
        let kept: Vec<Sample> = self
            .samples
            .iter()
            .filter(|s| s.time_ms >= warmup_ms)
            .cloned()
            .collect();

        let Some(origin) = kept.first().map(|s| s.time_ms) else {
            return Err(GloveError::InsufficientData {
                operation: "warm-up truncation",
                required: 1,
                available: 0,
            });
        };

        let rebased = kept
            .into_iter()
            .map(|mut s| {
                s.time_ms -= origin;
                s
            })
            .collect();

        Capture::new(rebased)
    }

    /// Fail with `WrongMode` unless the capture was recorded in `expected`
    pub fn require_mode(&self, operation: &'static str, expected: MeasurementMode) -> GloveResult<()> {
        if self.mode() != expected {
            return Err(GloveError::WrongMode {
                operation,
                expected: expected.name(),
                actual: self.mode().name(),
            });
        }
        Ok(())
    }
}

impl TryFrom<Vec<Sample>> for Capture {
    type Error = GloveError;

    fn try_from(samples: Vec<Sample>) -> GloveResult<Self> {
        Capture::new(samples)
    }
}

impl From<Capture> for Vec<Sample> {
    fn from(capture: Capture) -> Self {
        capture.samples
    }
}

/// Two channels sampled at the same instants, NaN rows removed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PairedChannels {
    pub time: Vec<f64>,
    pub first: Vec<f64>,
    pub second: Vec<f64>,
}

impl PairedChannels {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Sampling rate of the cleaned rows
    pub fn sampling_rate(&self) -> f64 {
        sampling_rate_from_times(&self.time)
    }
}

/// 1 / mean(Δt), falling back to [`DEFAULT_SAMPLING_RATE`]
pub fn sampling_rate_from_times(time_s: &[f64]) -> f64 {
    match crate::stats::mean_diff(time_s) {
        Some(dt) if dt > 0.0 && dt.is_finite() => 1.0 / dt,
        _ => DEFAULT_SAMPLING_RATE,
    }
}
