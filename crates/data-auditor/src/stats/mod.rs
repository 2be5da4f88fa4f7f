//! Statistical test math shared by the check library.
//!
//! All functions take plain slices and return `None` when the test is not
//! defined for the input (too few values, zero variance, singular matrix).
//! Distribution tails come from `statrs`; normality tests from `normality`.

pub mod association;
pub mod hypothesis;
pub mod normality;
pub mod series;

use serde::Serialize;
use statrs::distribution::{ChiSquared, ContinuousCDF, Normal, StudentsT};

/// Statistic and two-sided p-value of a test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TestOutcome {
    pub statistic: f64,
    pub p_value: f64,
}

impl TestOutcome {
    pub fn new(statistic: f64, p_value: f64) -> Option<Self> {
        if statistic.is_finite() && p_value.is_finite() {
            Some(Self {
                statistic,
                p_value: p_value.clamp(0.0, 1.0),
            })
        } else {
            None
        }
    }

    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value < alpha
    }
}

/// Upper tail of the standard normal.
pub fn normal_sf(z: f64) -> f64 {
    match Normal::new(0.0, 1.0) {
        Ok(dist) => dist.sf(z),
        Err(_) => f64::NAN,
    }
}

pub fn normal_cdf(z: f64) -> f64 {
    match Normal::new(0.0, 1.0) {
        Ok(dist) => dist.cdf(z),
        Err(_) => f64::NAN,
    }
}

/// Two-sided p-value of a standard normal statistic.
pub fn two_sided_normal_p(z: f64) -> f64 {
    (2.0 * normal_sf(z.abs())).min(1.0)
}

/// Two-sided p-value of a Student t statistic.
pub fn two_sided_t_p(t: f64, df: f64) -> Option<f64> {
    let dist = StudentsT::new(0.0, 1.0, df).ok()?;
    Some((2.0 * dist.sf(t.abs())).min(1.0))
}

/// Upper tail of the chi-square distribution.
pub fn chi2_sf(statistic: f64, df: f64) -> Option<f64> {
    if df <= 0.0 {
        return None;
    }
    let dist = ChiSquared::new(df).ok()?;
    Some(dist.sf(statistic.max(0.0)))
}

/// Kolmogorov distribution tail `P(K > z)`, asymptotic alternating series.
pub fn kolmogorov_sf(z: f64) -> f64 {
    if z <= 0.0 {
        return 1.0;
    }
    if z > 3.0 {
        return 0.0;
    }
    let z_sq = z * z;
    let mut p = 0.0;
    for k in 1..=100 {
        let k_f = f64::from(k);
        let term = (-1.0_f64).powi(k - 1) * (-2.0 * k_f * k_f * z_sq).exp();
        p += term;
        if term.abs() < 1e-12 {
            break;
        }
    }
    (2.0 * p).clamp(0.0, 1.0)
}

/// Average ranks (1-based) with ties sharing their mean rank.
///
/// Also returns the tie term `sum(t^3 - t)` over tie groups, used by the
/// variance corrections of rank tests.
pub fn average_ranks(values: &[f64]) -> (Vec<f64>, f64) {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        values[a]
            .partial_cmp(&values[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut ranks = vec![0.0; n];
    let mut tie_term = 0.0;
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        let avg_rank = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg_rank;
        }
        let t = (j - i + 1) as f64;
        tie_term += t * t * t - t;
        i = j + 1;
    }
    (ranks, tie_term)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_tails() {
        assert!((normal_cdf(0.0) - 0.5).abs() < 1e-12);
        assert!((two_sided_normal_p(1.959964) - 0.05).abs() < 1e-4);
    }

    #[test]
    fn test_t_and_chi2_tails() {
        let p = two_sided_t_p(2.228, 10.0).unwrap();
        assert!((p - 0.05).abs() < 1e-3);
        let p = chi2_sf(3.841, 1.0).unwrap();
        assert!((p - 0.05).abs() < 1e-3);
        assert!(chi2_sf(1.0, 0.0).is_none());
    }

    #[test]
    fn test_kolmogorov_sf() {
        assert_eq!(kolmogorov_sf(0.0), 1.0);
        // P(K > 1.358) ~ 0.05
        assert!((kolmogorov_sf(1.358) - 0.05).abs() < 1e-3);
        assert_eq!(kolmogorov_sf(5.0), 0.0);
    }

    #[test]
    fn test_average_ranks_with_ties() {
        let (ranks, tie_term) = average_ranks(&[10.0, 20.0, 20.0, 5.0]);
        assert_eq!(ranks, vec![2.0, 3.5, 3.5, 1.0]);
        assert_eq!(tie_term, 6.0);
    }
}
