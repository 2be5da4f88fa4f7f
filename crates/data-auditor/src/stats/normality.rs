//! Normality gate and goodness-of-fit wrappers.
//!
//! The gate decides, once per numeric column, whether parametric tests
//! (Welch, Bartlett) or their rank-based counterparts are used downstream.

use normality::{anderson_darling, dagostino_k_squared, lilliefors, shapiro_wilk};
use serde::Serialize;

use super::TestOutcome;
use crate::pipeline::sampling::seeded_sample_indices;

/// Values needed before any normality test is attempted.
pub const MIN_NORMALITY_N: usize = 8;

/// Above this size Shapiro-Wilk is replaced by D'Agostino on a sample.
pub const SHAPIRO_MAX_N: usize = 5000;

/// Significance level of the gate.
pub const NORMALITY_ALPHA: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalityMethod {
    ShapiroWilk,
    DagostinoK2,
}

impl NormalityMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            NormalityMethod::ShapiroWilk => "shapiro_wilk",
            NormalityMethod::DagostinoK2 => "dagostino_k2",
        }
    }
}

/// Result of the per-column normality gate.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalityGate {
    pub method: NormalityMethod,
    pub statistic: f64,
    pub p_value: f64,
    pub is_normal: bool,
    /// Number of values the test actually saw.
    pub sample_size: usize,
}

/// Run the gate: Shapiro-Wilk below 5000 values, otherwise D'Agostino K²
/// on a seeded sample of 5000. Returns `None` when the column is too short
/// or the test rejects the input (e.g. zero range).
pub fn evaluate_gate(values: &[f64], seed: u64) -> Option<NormalityGate> {
    if values.len() < MIN_NORMALITY_N {
        return None;
    }

    let (method, outcome, sample_size) = if values.len() < SHAPIRO_MAX_N {
        let result = shapiro_wilk(values.to_vec()).ok()?;
        (
            NormalityMethod::ShapiroWilk,
            TestOutcome::new(result.statistic, result.p_value)?,
            values.len(),
        )
    } else {
        let sample: Vec<f64> = seeded_sample_indices(values.len(), SHAPIRO_MAX_N, seed)
            .into_iter()
            .map(|i| values[i])
            .collect();
        let size = sample.len();
        let result = dagostino_k_squared(sample).ok()?;
        (
            NormalityMethod::DagostinoK2,
            TestOutcome::new(result.statistic, result.p_value)?,
            size,
        )
    };

    Some(NormalityGate {
        method,
        statistic: outcome.statistic,
        p_value: outcome.p_value,
        is_normal: outcome.p_value >= NORMALITY_ALPHA,
        sample_size,
    })
}

/// Anderson-Darling test against a fitted normal.
pub fn anderson(values: &[f64]) -> Option<TestOutcome> {
    if values.len() < MIN_NORMALITY_N {
        return None;
    }
    let result = anderson_darling(values.to_vec()).ok()?;
    TestOutcome::new(result.statistic, result.p_value)
}

/// Lilliefors (KS with estimated parameters) test.
pub fn lilliefors_test(values: &[f64]) -> Option<TestOutcome> {
    if values.len() < MIN_NORMALITY_N {
        return None;
    }
    let result = lilliefors(values.to_vec()).ok()?;
    TestOutcome::new(result.statistic, result.p_value)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic near-normal sample via the inverse CDF of evenly spaced
    /// probabilities.
    fn normal_like(n: usize) -> Vec<f64> {
        use statrs::distribution::{ContinuousCDF, Normal};
        let dist = Normal::new(50.0, 5.0).unwrap();
        (1..=n)
            .map(|i| dist.inverse_cdf(i as f64 / (n as f64 + 1.0)))
            .collect()
    }

    fn skewed(n: usize) -> Vec<f64> {
        (1..=n).map(|i| (i as f64 / 10.0).exp()).collect()
    }

    #[test]
    fn test_gate_too_short() {
        assert!(evaluate_gate(&[1.0, 2.0, 3.0], 42).is_none());
    }

    #[test]
    fn test_gate_shapiro_on_normal_data() {
        let gate = evaluate_gate(&normal_like(200), 42).unwrap();
        assert_eq!(gate.method, NormalityMethod::ShapiroWilk);
        assert!(gate.is_normal);
        assert_eq!(gate.sample_size, 200);
    }

    #[test]
    fn test_gate_rejects_skewed_data() {
        let gate = evaluate_gate(&skewed(100), 42).unwrap();
        assert!(!gate.is_normal);
    }

    #[test]
    fn test_gate_large_input_uses_dagostino_sample() {
        let gate = evaluate_gate(&normal_like(6000), 42).unwrap();
        assert_eq!(gate.method, NormalityMethod::DagostinoK2);
        assert_eq!(gate.sample_size, SHAPIRO_MAX_N);
    }

    #[test]
    fn test_anderson_and_lilliefors_flag_skew() {
        let data = skewed(100);
        assert!(anderson(&data).unwrap().p_value < 0.05);
        assert!(lilliefors_test(&data).unwrap().p_value < 0.05);
    }
}
