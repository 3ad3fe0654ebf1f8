//! Moments, normalization, and distance helpers for feature matrices.

/// Arithmetic mean. Returns 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Mean and population variance in one pass.
pub fn mean_variance(values: &[f64]) -> (f64, f64) {
    let n = values.len();
    if n == 0 {
        return (0.0, 0.0);
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / n as f64;
    (m, var)
}

/// Squared Euclidean distance between two vectors of equal length.
pub fn euclidean_sq(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Euclidean distance between two vectors of equal length.
pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    euclidean_sq(a, b).sqrt()
}

/// Z-score standardize each column of a row-major matrix in place.
///
/// Columns with zero variance are left centered at 0 so a constant feature
/// cannot dominate (or NaN-poison) distance computations.
pub fn standardize_columns(rows: &mut [Vec<f64>]) {
    let Some(first) = rows.first() else {
        return;
    };
    let dim = first.len();

    for j in 0..dim {
        let column: Vec<f64> = rows.iter().map(|r| r[j]).collect();
        let (m, var) = mean_variance(&column);
        let sd = var.sqrt();
        for row in rows.iter_mut() {
            row[j] = if sd > 1e-12 { (row[j] - m) / sd } else { 0.0 };
        }
    }
}

/// Min-max normalize a value given the observed range of its source field.
///
/// Degenerate ranges map to 0.5 (the midpoint) rather than dividing by zero.
pub fn minmax(value: f64, min: f64, max: f64) -> f64 {
    if (max - min).abs() < 1e-12 {
        return 0.5;
    }
    ((value - min) / (max - min)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn mean_variance_matches_hand_computation() {
        let (m, var) = mean_variance(&[1.0, 2.0, 3.0, 4.0]);
        assert_relative_eq!(m, 2.5);
        assert_relative_eq!(var, 1.25);
    }

    #[test]
    fn standardize_handles_constant_columns() {
        let mut rows = vec![vec![1.0, 5.0], vec![3.0, 5.0], vec![5.0, 5.0]];
        standardize_columns(&mut rows);
        // Varying column has zero mean and unit variance.
        let col0: Vec<f64> = rows.iter().map(|r| r[0]).collect();
        let (m, var) = mean_variance(&col0);
        assert_abs_diff_eq!(m, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(var, 1.0, epsilon = 1e-9);
        // Constant column collapses to zero instead of NaN.
        assert!(rows.iter().all(|r| r[1] == 0.0));
    }

    #[test]
    fn minmax_clamps_and_handles_degenerate_range() {
        assert_relative_eq!(minmax(2.0, 0.0, 4.0), 0.5);
        assert_eq!(minmax(9.0, 0.0, 4.0), 1.0);
        assert_eq!(minmax(3.0, 3.0, 3.0), 0.5);
    }
}
