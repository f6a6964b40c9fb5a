//! Savitzky-Golay smoothing
//!
//! A sliding least-squares polynomial fit that keeps waveform shape (peak
//! height and position) better than a moving average. Edges are handled by
//! evaluating the polynomial fitted to the first and last full windows.

use glove_core::{GloveError, GloveResult};

/// Smooth `signal` with an odd `window` and polynomial `order`
pub fn savgol_filter(signal: &[f64], window: usize, order: usize) -> GloveResult<Vec<f64>> {
    if window % 2 == 0 || window <= order {
        return Err(GloveError::degenerate(
            "smoothing",
            format!("window {} must be odd and longer than the order {}", window, order),
        ));
    }
    if window > signal.len() {
        return Err(GloveError::degenerate(
            "smoothing",
            format!("window {} exceeds signal length {}", window, signal.len()),
        ));
    }

    let half = (window / 2) as i64;
    let offsets: Vec<f64> = (-half..=half).map(|t| t as f64).collect();
    let normal = normal_matrix(&offsets, order);

    // Weight of each window sample in the fitted value at the centre
    let mut unit = vec![0.0; order + 1];
    unit[0] = 1.0;
    let v = solve(normal.clone(), unit)?;
    let weights: Vec<f64> = offsets.iter().map(|&t| evaluate(&v, t)).collect();

    let n = signal.len();
    let half = half as usize;
    let mut smoothed = vec![0.0; n];
    for i in half..n - half {
        smoothed[i] = weights
            .iter()
            .zip(&signal[i - half..=i + half])
            .map(|(w, x)| w * x)
            .sum();
    }

    let head = fit_window(&normal, &offsets, &signal[..window], order)?;
    for (i, value) in smoothed.iter_mut().take(half).enumerate() {
        *value = evaluate(&head, offsets[i]);
    }
    let tail = fit_window(&normal, &offsets, &signal[n - window..], order)?;
    for i in 0..half {
        smoothed[n - half + i] = evaluate(&tail, offsets[window - half + i]);
    }

    Ok(smoothed)
}

/// Window for movement smoothing: forced odd, at most `len - 3`, at least 5
pub fn movement_window(requested: usize, len: usize) -> usize {
    let mut window = requested;
    if window % 2 == 0 {
        window += 1;
    }
    window = window.min(len.saturating_sub(3));
    if window < 5 {
        window = 5;
    }
    if window % 2 == 0 {
        window -= 1;
    }
    window
}

/// Window for angle comparison smoothing, `None` when the series is too short
pub fn comparison_window(requested: usize, len: usize) -> Option<usize> {
    if len <= 10 {
        return None;
    }
    let mut window = requested.min(len);
    if window % 2 == 0 {
        window -= 1;
    }
    (window >= 5).then_some(window)
}

/// Window and order that fit a series of `len` samples, or `None` when it
/// is too short to smooth
///
/// The window shrinks to the longest odd length available and the order
/// drops below it.
pub fn fit_smoothing(window: usize, order: usize, len: usize) -> Option<(usize, usize)> {
    let mut window = window.min(len);
    if window % 2 == 0 {
        window = window.saturating_sub(1);
    }
    if window < 3 {
        return None;
    }
    Some((window, order.min(window - 1)))
}

/// AᵀA for the polynomial design matrix A[i][j] = t_i^j
fn normal_matrix(offsets: &[f64], order: usize) -> Vec<Vec<f64>> {
    let mut m = vec![vec![0.0; order + 1]; order + 1];
    for &t in offsets {
        for (r, row) in m.iter_mut().enumerate() {
            for (c, cell) in row.iter_mut().enumerate() {
                *cell += t.powi((r + c) as i32);
            }
        }
    }
    m
}

fn fit_window(
    normal: &[Vec<f64>],
    offsets: &[f64],
    values: &[f64],
    order: usize,
) -> GloveResult<Vec<f64>> {
    let mut rhs = vec![0.0; order + 1];
    for (&t, &y) in offsets.iter().zip(values) {
        for (j, r) in rhs.iter_mut().enumerate() {
            *r += t.powi(j as i32) * y;
        }
    }
    solve(normal.to_vec(), rhs)
}

fn evaluate(coefficients: &[f64], t: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * t + c)
}

/// Gaussian elimination with partial pivoting
fn solve(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> GloveResult<Vec<f64>> {
    let n = b.len();
    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        if a[pivot][col].abs() < 1e-12 {
            return Err(GloveError::degenerate("smoothing", "singular least-squares system"));
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in col + 1..n {
            let factor = a[row][col] / a[col][col];
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cubic_is_preserved_exactly() {
        let signal: Vec<f64> = (0..40)
            .map(|i| {
                let t = i as f64 * 0.1;
                0.5 * t * t * t - 2.0 * t * t + t - 3.0
            })
            .collect();
        let smoothed = savgol_filter(&signal, 11, 3).unwrap();
        for (a, b) in signal.iter().zip(&smoothed) {
            assert!((a - b).abs() < 1e-8);
        }
    }

    #[test]
    fn test_known_five_point_weights() {
        // classic 5-point quadratic/cubic weights: (-3, 12, 17, 12, -3) / 35
        let mut impulse = vec![0.0; 9];
        impulse[4] = 35.0;
        let out = savgol_filter(&impulse, 5, 3).unwrap();
        assert!((out[4] - 17.0).abs() < 1e-9);
        assert!((out[3] - 12.0).abs() < 1e-9);
        assert!((out[2] - -3.0).abs() < 1e-9);
    }

    #[test]
    fn test_smoothing_reduces_noise() {
        let signal: Vec<f64> = (0..200)
            .map(|i| (i as f64 * 0.05).sin() + if i % 2 == 0 { 0.2 } else { -0.2 })
            .collect();
        let smoothed = savgol_filter(&signal, 21, 3).unwrap();
        let err: f64 = (20..180)
            .map(|i| (smoothed[i] - (i as f64 * 0.05).sin()).abs())
            .fold(0.0, f64::max);
        assert!(err < 0.05);
    }

    #[test]
    fn test_invalid_windows() {
        assert!(savgol_filter(&[1.0; 10], 4, 3).is_err());
        assert!(savgol_filter(&[1.0; 10], 3, 3).is_err());
        assert!(savgol_filter(&[1.0; 4], 5, 3).is_err());
    }

    #[test]
    fn test_window_adjustment() {
        assert_eq!(movement_window(21, 200), 21);
        assert_eq!(movement_window(20, 200), 21);
        assert_eq!(movement_window(21, 15), 11);
        assert_eq!(movement_window(21, 10), 7);
        assert_eq!(movement_window(21, 6), 5);

        assert_eq!(comparison_window(21, 100), Some(21));
        assert_eq!(comparison_window(21, 16), Some(15));
        assert_eq!(comparison_window(21, 10), None);
    }

    #[test]
    fn test_smoothing_fitted_to_short_series() {
        assert_eq!(fit_smoothing(21, 3, 100), Some((21, 3)));
        assert_eq!(fit_smoothing(5, 3, 4), Some((3, 2)));
        assert_eq!(fit_smoothing(5, 5, 100), Some((5, 4)));
        assert_eq!(fit_smoothing(5, 3, 2), None);

        // every fitted pair is accepted by the filter
        let (window, order) = fit_smoothing(7, 7, 6).unwrap();
        assert!(savgol_filter(&[1.0, 2.0, 4.0, 3.0, 5.0, 6.0], window, order).is_ok());
    }
}
