//! Leading-digit (Benford's law) conformity.

use serde_json::json;

use super::CheckContext;
use crate::error::CheckResult;
use crate::stats::chi2_sf;
use crate::types::{Finding, round_to};

const MIN_VALUES: usize = 100;

fn expected_share(digit: usize) -> f64 {
    (1.0 + 1.0 / digit as f64).log10()
}

/// First significant digit of a finite non-zero value.
fn first_digit(value: f64) -> Option<usize> {
    let value = value.abs();
    if !value.is_finite() || value == 0.0 {
        return None;
    }
    let scaled = value / 10f64.powf(value.log10().floor());
    // Guard against 9.999.. rounding up to 10 at the boundary.
    let digit = (scaled.floor() as usize).clamp(1, 9);
    Some(digit)
}

pub fn benford_law(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    let mut counts = [0usize; 9];
    for digit in ctx.profile.numeric_values().iter().filter_map(|v| first_digit(*v)) {
        counts[digit - 1] += 1;
    }
    let n: usize = counts.iter().sum();
    if n < MIN_VALUES {
        return Ok(ctx.insufficient(n, MIN_VALUES));
    }

    let total = n as f64;
    let mut chi2 = 0.0;
    let mut mad = 0.0;
    let mut observed = Vec::with_capacity(9);
    for (idx, &count) in counts.iter().enumerate() {
        let expected = expected_share(idx + 1);
        let share = count as f64 / total;
        chi2 += (count as f64 - expected * total).powi(2) / (expected * total);
        mad += (share - expected).abs();
        observed.push(round_to(share, 4));
    }
    mad /= 9.0;
    let p_value = chi2_sf(chi2, 8.0);

    Ok(ctx
        .graded(mad, format!("leading-digit MAD {:.4} against Benford's law", mad))
        .with_meta("chi2", chi2)
        .with_meta("p_value", p_value.map_or(json!(null), |p| json!(p)))
        .with_meta("digit_shares", observed)
        .with_meta("values", n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testing::numeric_finding;
    use crate::types::Severity;

    #[test]
    fn test_first_digit() {
        assert_eq!(first_digit(123.0), Some(1));
        assert_eq!(first_digit(0.0045), Some(4));
        assert_eq!(first_digit(-9.9), Some(9));
        assert_eq!(first_digit(1000.0), Some(1));
        assert_eq!(first_digit(0.0), None);
    }

    #[test]
    fn test_geometric_series_conforms() {
        // Powers of 1.1 follow Benford closely.
        let values: Vec<f64> = (0..500).map(|i| 1.1f64.powi(i)).collect();
        let finding = numeric_finding("BENFORD_LAW", &values);
        assert_eq!(finding.severity, Severity::Pass);
    }

    #[test]
    fn test_uniform_leading_digits_flagged() {
        let values: Vec<f64> = (0..450)
            .map(|i| ((i % 9) + 1) as f64 * 100.0 + (i / 9) as f64)
            .collect();
        let finding = numeric_finding("BENFORD_LAW", &values);
        assert_eq!(finding.severity, Severity::Medium);
    }

    #[test]
    fn test_too_few_values() {
        let finding = numeric_finding("BENFORD_LAW", &[1.0, 2.0, 3.0]);
        assert_eq!(finding.metadata["insufficient_data"], true);
    }
}
