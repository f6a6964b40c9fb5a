//! Spectral analysis and tremor classification

use crate::config::SpectralSettings;
use glove_core::stats::remove_mean;
use glove_core::{GloveError, GloveResult};
use realfft::RealFftPlanner;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// One-sided amplitude spectrum of a real signal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrequencySpectrum {
    /// Bin centre frequencies (Hz), `k * fs / n`
    pub freqs: Vec<f64>,
    /// Single-sided amplitude, `|X| * 2 / n`
    pub magnitude: Vec<f64>,
    /// Strongest bin inside the search band, 0 when the band holds no bin
    pub dominant_freq: f64,
}

impl FrequencySpectrum {
    /// Frequency resolution (Hz per bin)
    pub fn bin_width(&self) -> f64 {
        self.freqs.get(1).copied().unwrap_or(0.0)
    }

    /// Bins with `low <= f <= high`, for reporting
    pub fn band(&self, low: f64, high: f64) -> (Vec<f64>, Vec<f64>) {
        self.freqs
            .iter()
            .zip(&self.magnitude)
            .filter(|(f, _)| **f >= low && **f <= high)
            .map(|(f, m)| (*f, *m))
            .unzip()
    }
}

/// Symmetric Hann window of length `n`
pub fn hann_window(n: usize) -> Vec<f64> {
    if n == 1 {
        return vec![1.0];
    }
    let denom = (n - 1) as f64;
    (0..n)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / denom).cos())
        .collect()
}

/// DC-removed, Hann-windowed one-sided spectrum with its dominant frequency
pub fn analyze_frequency(
    signal: &[f64],
    sampling_rate: f64,
    settings: &SpectralSettings,
) -> GloveResult<FrequencySpectrum> {
    let n = signal.len();
    if n < 2 {
        return Err(GloveError::InsufficientData {
            operation: "spectral analysis",
            required: 2,
            available: n,
        });
    }
    if !(sampling_rate > 0.0 && sampling_rate.is_finite()) {
        return Err(GloveError::degenerate(
            "spectral analysis",
            format!("invalid sampling rate {}", sampling_rate),
        ));
    }

    let window = hann_window(n);
    let mut planner = RealFftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n);
    let mut input: Vec<f64> = remove_mean(signal)
        .iter()
        .zip(&window)
        .map(|(x, w)| x * w)
        .collect();
    let mut output = fft.make_output_vec();
    fft.process(&mut input, &mut output)
        .map_err(|e| GloveError::degenerate("spectral analysis", e.to_string()))?;

    let scale = 2.0 / n as f64;
    let magnitude: Vec<f64> = output.iter().map(|c| c.norm() * scale).collect();
    let freqs: Vec<f64> = (0..magnitude.len())
        .map(|k| k as f64 * sampling_rate / n as f64)
        .collect();

    let dominant_freq = freqs
        .iter()
        .zip(&magnitude)
        .filter(|(f, _)| **f >= settings.search_low_hz && **f <= settings.search_high_hz)
        .fold(None::<(f64, f64)>, |best, (&f, &m)| match best {
            Some((_, best_m)) if best_m >= m => best,
            _ => Some((f, m)),
        })
        .map(|(f, _)| f)
        .unwrap_or(0.0);

    Ok(FrequencySpectrum {
        freqs,
        magnitude,
        dominant_freq,
    })
}

/// Clinical tremor category derived from the dominant frequency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TremorClass {
    #[serde(rename = "No tremor detected")]
    NoTremor,
    #[serde(rename = "Parkinsonian tremor")]
    Parkinsonian,
    #[serde(rename = "Essential tremor")]
    Essential,
    #[serde(rename = "Physiological tremor")]
    Physiological,
    #[serde(rename = "Atypical frequency")]
    Atypical,
}

impl TremorClass {
    pub fn label(&self) -> &'static str {
        match self {
            TremorClass::NoTremor => "No tremor detected",
            TremorClass::Parkinsonian => "Parkinsonian tremor",
            TremorClass::Essential => "Essential tremor",
            TremorClass::Physiological => "Physiological tremor",
            TremorClass::Atypical => "Atypical frequency",
        }
    }
}

impl std::fmt::Display for TremorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Frequency condition of a classification rule (bounds inclusive)
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrequencyBand {
    Exactly(f64),
    Between(f64, f64),
    Above(f64),
    Any,
}

impl FrequencyBand {
    pub fn contains(&self, freq: f64) -> bool {
        match *self {
            FrequencyBand::Exactly(v) => freq == v,
            FrequencyBand::Between(lo, hi) => freq >= lo && freq <= hi,
            FrequencyBand::Above(v) => freq > v,
            FrequencyBand::Any => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TremorRule {
    pub band: FrequencyBand,
    pub class: TremorClass,
}

/// Classification rules in priority order; the first match wins.
///
/// The Parkinsonian and essential bands overlap between 4 and 7 Hz, where
/// the Parkinsonian rule takes precedence.
pub const TREMOR_RULES: [TremorRule; 5] = [
    TremorRule { band: FrequencyBand::Exactly(0.0), class: TremorClass::NoTremor },
    TremorRule { band: FrequencyBand::Between(3.0, 7.0), class: TremorClass::Parkinsonian },
    TremorRule { band: FrequencyBand::Between(4.0, 12.0), class: TremorClass::Essential },
    TremorRule { band: FrequencyBand::Above(12.0), class: TremorClass::Physiological },
    TremorRule { band: FrequencyBand::Any, class: TremorClass::Atypical },
];

/// Map a dominant frequency to its tremor class
pub fn classify_tremor(freq: f64) -> TremorClass {
    TREMOR_RULES
        .iter()
        .find(|rule| rule.band.contains(freq))
        .map(|rule| rule.class)
        .unwrap_or(TremorClass::Atypical)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f64, amplitude: f64, fs: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| amplitude * (2.0 * PI * freq * i as f64 / fs).sin())
            .collect()
    }

    #[test]
    fn test_dominant_frequency_recovered() {
        let spectrum = analyze_frequency(&sine(5.0, 1.0, 100.0, 500), 100.0, &SpectralSettings::default()).unwrap();
        assert!((spectrum.dominant_freq - 5.0).abs() <= spectrum.bin_width());
        assert_eq!(spectrum.freqs.len(), 251);
        assert!((spectrum.bin_width() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_amplitude_scaling() {
        // Hann coherent gain is 0.5, so a unit sine peaks near 0.5
        let spectrum = analyze_frequency(&sine(10.0, 1.0, 100.0, 1000), 100.0, &SpectralSettings::default()).unwrap();
        let peak = spectrum.magnitude.iter().cloned().fold(0.0, f64::max);
        assert!((peak - 0.5).abs() < 0.01);
    }

    #[test]
    fn test_out_of_band_signal_has_no_dominant_frequency() {
        // Nyquist of 0.75 Hz puts every bin below the search band
        let spectrum = analyze_frequency(&sine(0.2, 1.0, 1.5, 10), 1.5, &SpectralSettings {
            search_low_hz: 1.0,
            search_high_hz: 20.0,
            min_samples: 10,
        })
        .unwrap();
        assert!(spectrum.freqs.iter().all(|f| *f < 1.0));
        assert_eq!(spectrum.dominant_freq, 0.0);
    }

    #[test]
    fn test_band_extraction() {
        let spectrum = analyze_frequency(&sine(6.0, 1.0, 100.0, 200), 100.0, &SpectralSettings::default()).unwrap();
        let (freqs, mags) = spectrum.band(1.0, 20.0);
        assert_eq!(freqs.len(), mags.len());
        assert!(freqs.iter().all(|f| (1.0..=20.0).contains(f)));
    }

    #[test]
    fn test_classification_first_match_wins() {
        assert_eq!(classify_tremor(0.0), TremorClass::NoTremor);
        assert_eq!(classify_tremor(3.0), TremorClass::Parkinsonian);
        assert_eq!(classify_tremor(5.0), TremorClass::Parkinsonian);
        assert_eq!(classify_tremor(7.0), TremorClass::Parkinsonian);
        assert_eq!(classify_tremor(7.2), TremorClass::Essential);
        assert_eq!(classify_tremor(12.0), TremorClass::Essential);
        assert_eq!(classify_tremor(12.4), TremorClass::Physiological);
        assert_eq!(classify_tremor(2.0), TremorClass::Atypical);
        assert_eq!(classify_tremor(1.0), TremorClass::Atypical);
    }

    #[test]
    fn test_class_labels_serialize() {
        let json = serde_json::to_string(&TremorClass::Parkinsonian).unwrap();
        assert_eq!(json, "\"Parkinsonian tremor\"");
        assert_eq!(TremorClass::Essential.to_string(), "Essential tremor");
    }

    #[test]
    fn test_rejects_tiny_input() {
        assert!(analyze_frequency(&[1.0], 100.0, &SpectralSettings::default()).is_err());
    }
}
