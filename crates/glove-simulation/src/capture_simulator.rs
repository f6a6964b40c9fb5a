//! Glove capture simulator with sensor noise

use crate::motion_patterns::MotionPattern;
use glove_core::{config_error, Capture, GloveError, GloveResult, Sample};
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

/// Configuration for capture simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    pub pattern: MotionPattern,
    /// Sampling rate in Hz
    pub sampling_rate: f64,
    /// Capture length in seconds
    pub duration_s: f64,
    pub noise: NoiseConfig,
    /// Emit three-value records like the old firmware
    pub legacy: bool,
    /// Random seed for reproducibility
    pub seed: Option<u64>,
}

/// Gaussian noise per sensor type (standard deviations)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoiseConfig {
    /// Analog sensors (ADC counts)
    pub adc_std: f64,
    /// Accelerometer (g)
    pub accel_std: f64,
    /// IMU angle and gyro (degrees, degrees/s)
    pub angle_std: f64,
}

impl NoiseConfig {
    pub fn none() -> Self {
        Self {
            adc_std: 0.0,
            accel_std: 0.0,
            angle_std: 0.0,
        }
    }
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            adc_std: 4.0,
            accel_std: 0.02,
            angle_std: 0.5,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            pattern: MotionPattern::parkinsonian_tremor(),
            sampling_rate: 100.0,
            duration_s: 10.0,
            noise: NoiseConfig::default(),
            legacy: false,
            seed: None,
        }
    }
}

impl CaptureConfig {
    pub fn with_pattern(pattern: MotionPattern) -> Self {
        Self {
            pattern,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> GloveResult<()> {
        if !(self.sampling_rate > 0.0 && self.sampling_rate <= 1000.0) {
            return Err(config_error!(
                "sampling rate {} Hz outside (0, 1000]: timestamps are whole milliseconds",
                self.sampling_rate
            ));
        }
        if !(self.duration_s > 0.0) {
            return Err(config_error!("capture duration must be positive"));
        }
        if self.noise.adc_std < 0.0 || self.noise.accel_std < 0.0 || self.noise.angle_std < 0.0 {
            return Err(config_error!("noise levels must be non-negative"));
        }
        Ok(())
    }
}

/// Generates synthetic captures
pub struct CaptureSimulator {
    config: CaptureConfig,
    rng: rand::rngs::StdRng,
    adc_noise: Normal<f64>,
    accel_noise: Normal<f64>,
    angle_noise: Normal<f64>,
}

impl CaptureSimulator {
    pub fn new(config: CaptureConfig) -> GloveResult<Self> {
        config.validate()?;

        let seed = config.seed.unwrap_or_else(|| {
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default()
        });

        let normal = |std: f64| {
            Normal::new(0.0, std).map_err(|e| GloveError::InvalidConfig {
                reason: format!("Failed to create normal distribution: {}", e),
            })
        };

        Ok(CaptureSimulator {
            rng: rand::rngs::StdRng::seed_from_u64(seed),
            adc_noise: normal(config.noise.adc_std)?,
            accel_noise: normal(config.noise.accel_std)?,
            angle_noise: normal(config.noise.angle_std)?,
            config,
        })
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Generate one complete capture
    pub fn generate(&mut self) -> GloveResult<Capture> {
        let count = (self.config.duration_s * self.config.sampling_rate) as usize;
        let mode = self.config.pattern.mode();
        let dt_ms = 1000.0 / self.config.sampling_rate;

        let samples = (0..count)
            .map(|i| {
                let time_ms = (i as f64 * dt_ms).round() as i64;
                let time = time_ms as f64 / 1000.0;
                if self.config.legacy {
                    let values = self.config.pattern.legacy_reading_at(time);
                    Sample::legacy(i as i64, time_ms, mode, self.add_noise(values))
                } else {
                    let values = self.config.pattern.reading_at(time).values;
                    Sample::new(i as i64, time_ms, mode, self.add_noise(values))
                }
            })
            .collect();

        Capture::new(samples)
    }

    /// Noise by the sensor each slot holds in the current pattern
    fn add_noise<const N: usize>(&mut self, mut values: [f64; N]) -> [f64; N] {
        for (slot, value) in values.iter_mut().enumerate() {
            let dist = match (self.config.pattern, slot) {
                (MotionPattern::Tremor { .. }, 0) => self.adc_noise,
                (MotionPattern::Tremor { .. }, _) => self.accel_noise,
                (MotionPattern::Tapping { .. }, 0) => self.adc_noise,
                (MotionPattern::Tapping { .. }, _) => self.angle_noise,
                (MotionPattern::Stiffness { .. }, 0 | 1) if !self.config.legacy => self.adc_noise,
                (MotionPattern::Stiffness { .. }, _) => continue,
            };
            *value += dist.sample(&mut self.rng);
        }
        values
    }
}

/// Generate a capture from a pattern with the given seed and no noise
pub fn clean_capture(pattern: MotionPattern, duration_s: f64, seed: u64) -> GloveResult<Capture> {
    let config = CaptureConfig {
        pattern,
        duration_s,
        noise: NoiseConfig::none(),
        seed: Some(seed),
        ..CaptureConfig::default()
    };
    CaptureSimulator::new(config)?.generate()
}

#[cfg(test)]
mod tests {
    use super::*;
    use glove_core::{ChannelStats, MeasurementMode};

    #[test]
    fn test_capture_simulator_basic() {
        let mut simulator = CaptureSimulator::new(CaptureConfig {
            seed: Some(7),
            ..CaptureConfig::default()
        })
        .unwrap();
        let capture = simulator.generate().unwrap();

        assert_eq!(capture.len(), 1000);
        assert_eq!(capture.mode(), MeasurementMode::Tremor);
        assert!(!capture.is_legacy());
        assert!((capture.sampling_rate() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_seed_reproducible() {
        let config = CaptureConfig {
            seed: Some(42),
            duration_s: 1.0,
            ..CaptureConfig::default()
        };
        let a = CaptureSimulator::new(config.clone()).unwrap().generate().unwrap();
        let b = CaptureSimulator::new(config).unwrap().generate().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_noise_added() {
        let config = CaptureConfig {
            pattern: MotionPattern::stiffness(),
            seed: Some(3),
            duration_s: 2.0,
            ..CaptureConfig::default()
        };
        let noisy = CaptureSimulator::new(config).unwrap().generate().unwrap();
        let clean = clean_capture(MotionPattern::stiffness(), 2.0, 3).unwrap();

        let noisy_v1 = noisy.channel(glove_core::Channel::Value1).unwrap();
        let clean_v1 = clean.channel(glove_core::Channel::Value1).unwrap();
        let residual: Vec<f64> = noisy_v1.iter().zip(&clean_v1).map(|(n, c)| n - c).collect();
        let stats = ChannelStats::calculate(&residual);
        assert!(stats.std_dev > 2.0 && stats.std_dev < 6.0);

        // angle channel carries no noise for stiffness
        assert_eq!(
            noisy.channel(glove_core::Channel::Value3).unwrap(),
            clean.channel(glove_core::Channel::Value3).unwrap()
        );
    }

    #[test]
    fn test_legacy_capture() {
        let config = CaptureConfig {
            pattern: MotionPattern::stiffness(),
            legacy: true,
            seed: Some(1),
            duration_s: 1.0,
            ..CaptureConfig::default()
        };
        let capture = CaptureSimulator::new(config).unwrap().generate().unwrap();
        assert!(capture.is_legacy());
        assert_eq!(capture.channel_count(), 3);
    }

    #[test]
    fn test_invalid_config() {
        let config = CaptureConfig {
            sampling_rate: 0.0,
            ..CaptureConfig::default()
        };
        assert!(matches!(CaptureSimulator::new(config), Err(GloveError::InvalidConfig { .. })));
    }
}
