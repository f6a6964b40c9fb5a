//! Peak and trough detection
//!
//! Peaks are local maxima filtered, in order, by height, minimum distance
//! (taller peaks win) and prominence. Troughs are peaks of the negated
//! signal under the same criteria.

use crate::config::ExtremaSettings;
use glove_core::stats::{mean, peak_to_peak, std_dev};
use serde::{Deserialize, Serialize};

/// Thresholds for accepting a local maximum as a peak
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PeakCriteria {
    /// Minimum peak value
    pub height: Option<f64>,
    /// Minimum spacing between peaks (samples)
    pub distance: Option<usize>,
    /// Minimum prominence
    pub prominence: Option<f64>,
}

impl PeakCriteria {
    /// Defaults derived from the signal: prominence as a fraction of its
    /// range and distance `max(min_distance, len / divisor)`
    pub fn auto(
        signal: &[f64],
        min_prominence: Option<f64>,
        min_distance: Option<usize>,
        settings: &ExtremaSettings,
    ) -> Self {
        PeakCriteria {
            height: None,
            distance: Some(min_distance.unwrap_or_else(|| {
                settings.min_distance.max(signal.len() / settings.distance_divisor)
            })),
            prominence: Some(
                min_prominence.unwrap_or_else(|| peak_to_peak(signal) * settings.prominence_fraction),
            ),
        }
    }
}

/// Indices of peaks in `signal` satisfying `criteria`, ascending
pub fn find_peaks(signal: &[f64], criteria: &PeakCriteria) -> Vec<usize> {
    let mut peaks = local_maxima(signal);

    if let Some(height) = criteria.height {
        peaks.retain(|&p| signal[p] >= height);
    }
    if let Some(distance) = criteria.distance {
        peaks = select_by_distance(signal, &peaks, distance);
    }
    if let Some(min_prominence) = criteria.prominence {
        peaks.retain(|&p| prominence(signal, p) >= min_prominence);
    }
    peaks
}

/// Local maxima; a flat top resolves to its middle sample (rounded down)
fn local_maxima(x: &[f64]) -> Vec<usize> {
    let mut maxima = Vec::new();
    if x.len() < 3 {
        return maxima;
    }
    let last = x.len() - 1;
    let mut i = 1;
    while i < last {
        if x[i - 1] < x[i] {
            let mut ahead = i + 1;
            while ahead < last && x[ahead] == x[i] {
                ahead += 1;
            }
            if x[ahead] < x[i] {
                maxima.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    maxima
}

/// Drop peaks closer than `distance` to a taller kept peak
fn select_by_distance(x: &[f64], peaks: &[usize], distance: usize) -> Vec<usize> {
    if distance <= 1 || peaks.len() < 2 {
        return peaks.to_vec();
    }

    let mut keep = vec![true; peaks.len()];
    let mut order: Vec<usize> = (0..peaks.len()).collect();
    order.sort_by(|&a, &b| x[peaks[a]].total_cmp(&x[peaks[b]]));

    for &j in order.iter().rev() {
        if !keep[j] {
            continue;
        }
        let mut k = j;
        while k > 0 && peaks[j] - peaks[k - 1] < distance {
            k -= 1;
            keep[k] = false;
        }
        let mut k = j + 1;
        while k < peaks.len() && peaks[k] - peaks[j] < distance {
            keep[k] = false;
            k += 1;
        }
    }

    peaks
        .iter()
        .zip(keep)
        .filter_map(|(&p, k)| k.then_some(p))
        .collect()
}

/// Height of a peak above the higher of its two bounding minima
pub fn prominence(x: &[f64], peak: usize) -> f64 {
    let value = x[peak];

    let mut left_min = value;
    for &v in x[..=peak].iter().rev() {
        if v > value {
            break;
        }
        left_min = left_min.min(v);
    }

    let mut right_min = value;
    for &v in &x[peak..] {
        if v > value {
            break;
        }
        right_min = right_min.min(v);
    }

    value - left_min.max(right_min)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtremumKind {
    Peak,
    Trough,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extremum {
    pub index: usize,
    pub value: f64,
    pub kind: ExtremumKind,
}

/// Values sampled at irregular times
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimedSeries {
    pub time: Vec<f64>,
    pub values: Vec<f64>,
}

impl TimedSeries {
    pub fn mean(&self) -> f64 {
        mean(&self.values)
    }

    pub fn std_dev(&self) -> f64 {
        std_dev(&self.values)
    }
}

/// Peaks and troughs merged in time order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtremaSet {
    pub extrema: Vec<Extremum>,
}

impl ExtremaSet {
    /// Detect peaks and troughs with the same criteria
    pub fn detect(signal: &[f64], criteria: &PeakCriteria) -> Self {
        let negated: Vec<f64> = signal.iter().map(|v| -v).collect();

        let mut extrema: Vec<Extremum> = find_peaks(signal, criteria)
            .into_iter()
            .map(|index| Extremum { index, value: signal[index], kind: ExtremumKind::Peak })
            .chain(find_peaks(&negated, criteria).into_iter().map(|index| Extremum {
                index,
                value: signal[index],
                kind: ExtremumKind::Trough,
            }))
            .collect();
        extrema.sort_by_key(|e| e.index);

        ExtremaSet { extrema }
    }

    pub fn len(&self) -> usize {
        self.extrema.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extrema.is_empty()
    }

    pub fn peaks(&self) -> impl Iterator<Item = &Extremum> {
        self.extrema.iter().filter(|e| e.kind == ExtremumKind::Peak)
    }

    pub fn troughs(&self) -> impl Iterator<Item = &Extremum> {
        self.extrema.iter().filter(|e| e.kind == ExtremumKind::Trough)
    }

    /// Mean absolute difference between time-adjacent extrema
    pub fn peak_to_trough(&self) -> Option<f64> {
        if self.extrema.len() < 2 {
            return None;
        }
        let ranges: Vec<f64> = self
            .extrema
            .windows(2)
            .map(|w| (w[0].value - w[1].value).abs())
            .collect();
        Some(mean(&ranges))
    }

    /// One movement per consecutive pair of extrema
    pub fn movement_count(&self) -> usize {
        self.extrema.len().saturating_sub(1)
    }

    /// Movements per second over a capture of `duration_s`
    pub fn movement_frequency(&self, duration_s: f64) -> f64 {
        let count = self.movement_count();
        if count == 0 || duration_s <= 0.0 {
            return 0.0;
        }
        count as f64 / duration_s
    }

    /// Time between consecutive peaks, stamped at their midpoint
    pub fn peak_periods(&self, time: &[f64]) -> TimedSeries {
        let peaks: Vec<usize> = self.peaks().map(|e| e.index).collect();
        let mut series = TimedSeries::default();
        for pair in peaks.windows(2) {
            let (t1, t2) = (time[pair[0]], time[pair[1]]);
            series.time.push((t1 + t2) / 2.0);
            series.values.push(t2 - t1);
        }
        series
    }

    /// Range between consecutive extrema, stamped at their midpoint
    pub fn amplitudes(&self, time: &[f64]) -> TimedSeries {
        let mut series = TimedSeries::default();
        for pair in self.extrema.windows(2) {
            series.time.push((time[pair[0].index] + time[pair[1].index]) / 2.0);
            series.values.push((pair[0].value - pair[1].value).abs());
        }
        series
    }
}

/// Extrema with automatic prominence/distance defaults
pub fn find_extrema(
    signal: &[f64],
    min_prominence: Option<f64>,
    min_distance: Option<usize>,
    settings: &ExtremaSettings,
) -> ExtremaSet {
    ExtremaSet::detect(signal, &PeakCriteria::auto(signal, min_prominence, min_distance, settings))
}

/// Average peak-to-trough distance with automatic thresholds
pub fn peak_to_trough_distance(signal: &[f64], settings: &ExtremaSettings) -> Option<f64> {
    let extrema = find_extrema(signal, None, None, settings);
    tracing::debug!(
        peaks = extrema.peaks().count(),
        troughs = extrema.troughs().count(),
        "peak-to-trough analysis"
    );
    extrema.peak_to_trough()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sine(freq: f64, amplitude: f64, fs: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| amplitude * (2.0 * PI * freq * i as f64 / fs).sin())
            .collect()
    }

    #[test]
    fn test_local_maxima_plateaus() {
        let x = [0.0, 1.0, 1.0, 1.0, 0.0, 2.0, 2.0, 0.0, 3.0];
        // plateau 1..=3 -> 2, plateau 5..=6 -> 5, rising edge at the end ignored
        assert_eq!(local_maxima(&x), vec![2, 5]);
        assert!(local_maxima(&[1.0, 2.0]).is_empty());
    }

    #[test]
    fn test_distance_keeps_taller_peak() {
        let x = [0.0, 5.0, 0.0, 3.0, 0.0, 0.0, 0.0, 4.0, 0.0];
        let criteria = PeakCriteria { distance: Some(3), ..Default::default() };
        assert_eq!(find_peaks(&x, &criteria), vec![1, 7]);
    }

    #[test]
    fn test_prominence() {
        let x = [0.0, 4.0, 3.0, 3.5, 1.0, 5.0, 0.0];
        assert!((prominence(&x, 1) - 3.0).abs() < 1e-12);
        assert!((prominence(&x, 3) - 0.5).abs() < 1e-12);
        assert!((prominence(&x, 5) - 5.0).abs() < 1e-12);

        let criteria = PeakCriteria { prominence: Some(1.0), ..Default::default() };
        assert_eq!(find_peaks(&x, &criteria), vec![1, 5]);
    }

    #[test]
    fn test_height_filter() {
        let x = [0.0, 1.0, 0.0, 3.0, 0.0];
        let criteria = PeakCriteria { height: Some(2.0), ..Default::default() };
        assert_eq!(find_peaks(&x, &criteria), vec![3]);
    }

    #[test]
    fn test_sine_extrema_and_movements() {
        // 2.5 Hz for 2 s at 100 Hz: 5 peaks and 5 troughs landing on samples
        let signal = sine(2.5, 1.0, 100.0, 200);
        let extrema = find_extrema(&signal, None, None, &ExtremaSettings::default());
        assert_eq!(extrema.peaks().count(), 5);
        assert_eq!(extrema.troughs().count(), 5);
        assert_eq!(extrema.movement_count(), 9);
        assert!((extrema.peak_to_trough().unwrap() - 2.0).abs() < 1e-9);
        assert!((extrema.movement_frequency(2.0) - 4.5).abs() < 1e-12);

        let time: Vec<f64> = (0..200).map(|i| i as f64 / 100.0).collect();
        let periods = extrema.peak_periods(&time);
        assert_eq!(periods.values.len(), 4);
        assert!((periods.mean() - 0.4).abs() < 1e-9);
        assert_eq!(extrema.amplitudes(&time).values.len(), 9);
    }

    #[test]
    fn test_count_invariant_under_scaling() {
        let signal: Vec<f64> = sine(3.0, 1.0, 100.0, 300)
            .iter()
            .zip(sine(11.0, 0.2, 100.0, 300))
            .map(|(a, b)| a + b)
            .collect();
        let scaled: Vec<f64> = signal.iter().map(|v| v * 7.5).collect();
        let settings = ExtremaSettings::default();

        let base = find_extrema(&signal, None, None, &settings);
        let big = find_extrema(&scaled, None, None, &settings);
        assert_eq!(base.len(), big.len());
        let expected = 7.5 * base.peak_to_trough().unwrap();
        assert!((big.peak_to_trough().unwrap() - expected).abs() <= 1e-9 * expected);
    }

    #[test]
    fn test_mirror_gives_same_peak_to_trough() {
        let signal: Vec<f64> = sine(4.0, 2.0, 100.0, 250)
            .iter()
            .enumerate()
            .map(|(i, v)| v + 0.3 * (i as f64 * 0.21).cos())
            .collect();
        let mirrored: Vec<f64> = signal.iter().map(|v| -v).collect();
        let settings = ExtremaSettings::default();
        let upright = peak_to_trough_distance(&signal, &settings).unwrap();
        let flipped = peak_to_trough_distance(&mirrored, &settings).unwrap();
        assert!((upright - flipped).abs() < 1e-12);
    }

    #[test]
    fn test_undefined_with_fewer_than_two_extrema() {
        let ramp: Vec<f64> = (0..100).map(|i| i as f64).collect();
        assert_eq!(peak_to_trough_distance(&ramp, &ExtremaSettings::default()), None);
        assert_eq!(ExtremaSet::default().movement_count(), 0);
    }
}
