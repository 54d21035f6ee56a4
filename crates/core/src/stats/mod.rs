//! Numeric helpers shared by the scanner and the plausibility checks.
//!
//! The correlation kernel is deliberately scalar: the acceptance threshold
//! downstream is 0.85 on |corr|, so 1e-3 accuracy is plenty and double
//! precision covers it without any vectorization.

/// Arithmetic mean of a slice; 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Minimum and maximum of a slice; `None` for an empty slice.
pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    let first = *values.first()?;
    let mut min = first;
    let mut max = first;
    for &value in &values[1..] {
        if value < min {
            min = value;
        }
        if value > max {
            max = value;
        }
    }
    Some((min, max))
}

/// Pearson correlation coefficient between two equal-length vectors.
///
/// Returns 0.0 when there are fewer than two samples or either vector is
/// constant (zero denominator); otherwise the standard coefficient in
/// [-1, 1].
pub fn pearson(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len().min(b.len());
    if n < 2 {
        return 0.0;
    }

    let mean_a = mean(&a[..n]);
    let mean_b = mean(&b[..n]);

    let mut covariance = 0.0;
    let mut variance_a = 0.0;
    let mut variance_b = 0.0;
    for i in 0..n {
        let da = a[i] - mean_a;
        let db = b[i] - mean_b;
        covariance += da * db;
        variance_a += da * da;
        variance_b += db * db;
    }

    let denominator = (variance_a * variance_b).sqrt();
    if denominator == 0.0 {
        return 0.0;
    }
    covariance / denominator
}
