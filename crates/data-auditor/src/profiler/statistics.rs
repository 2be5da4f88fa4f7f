//! Descriptive statistics over plain `f64` slices.
//!
//! Every numeric check works on the column's non-null typed values, already
//! collected into a `Vec<f64>`; these helpers keep the formulas in one place.

use std::cmp::Ordering;

/// Sort a copy of the values ascending. NaN never reaches here (typed views
/// drop non-finite values), but comparison falls back to `Equal` regardless.
pub fn sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    sorted
}

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Variance with `ddof` degrees of freedom removed (0 = population, 1 = sample).
pub fn variance(values: &[f64], ddof: usize) -> f64 {
    let n = values.len();
    if n <= ddof {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (n - ddof) as f64
}

pub fn population_std(values: &[f64]) -> f64 {
    variance(values, 0).sqrt()
}

pub fn sample_std(values: &[f64]) -> f64 {
    variance(values, 1).sqrt()
}

/// Positional quantile: the element at `floor(n * q)` of a sorted slice.
///
/// Used for IQR fences so that `[1..9, 1000]` yields Q1 = 3 and Q3 = 8.
pub fn positional_quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((sorted.len() as f64 * q.clamp(0.0, 1.0)) as usize).min(sorted.len() - 1);
    sorted[idx]
}

/// Linearly interpolated quantile of a sorted slice.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() as f64 - 1.0);
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let weight = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

pub fn median_sorted(sorted: &[f64]) -> f64 {
    quantile_sorted(sorted, 0.5)
}

/// Median absolute deviation around `median`.
pub fn median_absolute_deviation(values: &[f64], median: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let deviations: Vec<f64> = values.iter().map(|v| (v - median).abs()).collect();
    median_sorted(&sorted(&deviations))
}

/// Tukey fences from positional quartiles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IqrFences {
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub lower: f64,
    pub upper: f64,
}

impl IqrFences {
    pub fn from_sorted(sorted: &[f64], multiplier: f64) -> Self {
        let q1 = positional_quantile(sorted, 0.25);
        let q3 = positional_quantile(sorted, 0.75);
        let iqr = q3 - q1;
        Self {
            q1,
            q3,
            iqr,
            lower: q1 - multiplier * iqr,
            upper: q3 + multiplier * iqr,
        }
    }

    pub fn is_outside(&self, value: f64) -> bool {
        value < self.lower || value > self.upper
    }
}

/// Moment-based skewness: `m3 / s^3` with the sample standard deviation.
pub fn skewness(values: &[f64]) -> f64 {
    let std = sample_std(values);
    if values.len() < 3 || std == 0.0 {
        return 0.0;
    }
    let m = mean(values);
    let n = values.len() as f64;
    values.iter().map(|v| ((v - m) / std).powi(3)).sum::<f64>() / n
}

/// Excess kurtosis: `m4 / s^4 - 3` with the sample standard deviation.
pub fn excess_kurtosis(values: &[f64]) -> f64 {
    let std = sample_std(values);
    if values.len() < 4 || std == 0.0 {
        return 0.0;
    }
    let m = mean(values);
    let n = values.len() as f64;
    values.iter().map(|v| ((v - m) / std).powi(4)).sum::<f64>() / n - 3.0
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== std tests ====================

    #[test]
    fn test_sample_std_basic() {
        // Values: 1..5, mean 3, sample variance 10/4 = 2.5
        let std = sample_std(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!((std - 2.5f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_population_std_basic() {
        // population variance 10/5 = 2
        let std = population_std(&[1.0, 2.0, 3.0, 4.0, 5.0]);
        assert!((std - 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_std_degenerate_inputs() {
        assert_eq!(sample_std(&[5.0]), 0.0);
        assert_eq!(sample_std(&[]), 0.0);
        assert_eq!(population_std(&[5.0, 5.0, 5.0]), 0.0);
    }

    // ==================== quantile tests ====================

    #[test]
    fn test_positional_quartiles() {
        let data = sorted(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 1000.0]);
        assert_eq!(positional_quantile(&data, 0.25), 3.0);
        assert_eq!(positional_quantile(&data, 0.75), 8.0);
        assert_eq!(positional_quantile(&data, 1.0), 1000.0);
    }

    #[test]
    fn test_quantile_sorted_interpolates() {
        let data = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile_sorted(&data, 0.5), 2.5);
        assert_eq!(quantile_sorted(&data, 0.0), 1.0);
        assert_eq!(quantile_sorted(&[], 0.5), 0.0);
    }

    #[test]
    fn test_iqr_fences() {
        let data = sorted(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 1000.0]);
        let fences = IqrFences::from_sorted(&data, 1.5);
        assert_eq!(fences.iqr, 5.0);
        assert_eq!(fences.upper, 15.5);
        assert_eq!(fences.lower, -4.5);
        assert!(fences.is_outside(1000.0));
        assert!(!fences.is_outside(9.0));
    }

    #[test]
    fn test_mad_zero_for_repeated_values() {
        let data = [10.0, 10.0, 10.0, 10.0, 100.0];
        let median = median_sorted(&sorted(&data));
        assert_eq!(median, 10.0);
        assert_eq!(median_absolute_deviation(&data, median), 0.0);
    }

    // ==================== shape tests ====================

    #[test]
    fn test_skewness_symmetric_and_positive() {
        assert!(skewness(&[1.0, 2.0, 3.0, 4.0, 5.0]).abs() < 1e-12);
        assert!(skewness(&[1.0, 1.0, 1.0, 1.0, 10.0]) > 0.0);
        assert_eq!(skewness(&[5.0, 5.0, 5.0, 5.0]), 0.0);
    }

    #[test]
    fn test_kurtosis_heavy_tail() {
        let mut data = vec![0.0; 50];
        data.push(100.0);
        assert!(excess_kurtosis(&data) > 10.0);
    }
}
