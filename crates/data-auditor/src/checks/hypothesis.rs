//! Hypothesis-test checks on numeric columns.
//!
//! Mean and variance comparisons are routed through the column's cached
//! normality gate: parametric tests when the gate accepts normality, rank or
//! median based tests otherwise.

use std::collections::BTreeMap;

use serde_json::json;

use super::{CheckContext, MIN_NUMERIC_N};
use crate::error::{CheckError, CheckResult};
use crate::profiler::statistics::{mean, variance};
use crate::stats::hypothesis::{
    bartlett, kruskal_wallis, ks_normal_fit, levene_median, mann_whitney_u, welch_t_test,
    wilcoxon_signed_rank,
};
use crate::stats::normality::{anderson, lilliefors_test};
use crate::types::{Finding, Severity};

const MAX_GROUPS: usize = 20;

fn halves(values: &[f64]) -> (&[f64], &[f64]) {
    values.split_at(values.len() / 2)
}

fn gate_is_normal(ctx: &CheckContext<'_>) -> bool {
    ctx.normality_gate().is_some_and(|gate| gate.is_normal)
}

pub fn normality_test(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    let n = ctx.profile.numeric_values().len();
    if n < MIN_NUMERIC_N {
        return Ok(ctx.insufficient(n, MIN_NUMERIC_N));
    }
    let Some(gate) = ctx.normality_gate() else {
        return Ok(ctx.pass("normality test not applicable (constant values)"));
    };
    let finding = if gate.is_normal {
        ctx.pass(format!(
            "consistent with normality ({}, p={:.4})",
            gate.method.as_str(),
            gate.p_value
        ))
    } else {
        ctx.info(format!(
            "not normally distributed ({}, p={:.4})",
            gate.method.as_str(),
            gate.p_value
        ))
    };
    Ok(finding
        .with_value(gate.p_value)
        .with_meta("method", gate.method.as_str())
        .with_meta("statistic", gate.statistic)
        .with_meta("sample_size", gate.sample_size))
}

fn goodness_of_fit(
    ctx: &CheckContext<'_>,
    name: &str,
    test: fn(&[f64]) -> Option<crate::stats::TestOutcome>,
) -> CheckResult<Finding> {
    let values = ctx.profile.numeric_values();
    if values.len() < MIN_NUMERIC_N {
        return Ok(ctx.insufficient(values.len(), MIN_NUMERIC_N));
    }
    let alpha = ctx.param("alpha")?;
    let Some(outcome) = test(values) else {
        return Ok(ctx.pass(format!("{} not applicable", name)));
    };
    let finding = if outcome.is_significant(alpha) {
        ctx.info(format!("{} rejects normality (p={:.4})", name, outcome.p_value))
    } else {
        ctx.pass(format!("{} consistent with normality (p={:.4})", name, outcome.p_value))
    };
    Ok(finding
        .with_value(outcome.p_value)
        .with_threshold(alpha)
        .with_meta("statistic", outcome.statistic))
}

pub fn normality_anderson(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    goodness_of_fit(ctx, "Anderson-Darling", anderson)
}

pub fn normality_lilliefors(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    goodness_of_fit(ctx, "Lilliefors", lilliefors_test)
}

pub fn ks_goodness_fit(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    goodness_of_fit(ctx, "Kolmogorov-Smirnov", ks_normal_fit)
}

/// First half against second half: Welch if normal, Mann-Whitney otherwise.
pub fn mean_shift(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    let values = ctx.profile.numeric_values();
    if values.len() < 2 * MIN_NUMERIC_N {
        return Ok(ctx.insufficient(values.len(), 2 * MIN_NUMERIC_N));
    }
    let alpha = ctx.param("alpha")?;
    let relative_limit = ctx.param("relative_change")?;
    let (first, second) = halves(values);

    let normal = gate_is_normal(ctx);
    let (method, outcome) = if normal {
        ("welch_t", welch_t_test(first, second))
    } else {
        ("mann_whitney_u", mann_whitney_u(first, second))
    };
    let Some(outcome) = outcome else {
        return Ok(ctx.pass("halves have no spread to compare").with_meta("method", method));
    };

    let (m1, m2) = (mean(first), mean(second));
    let relative = if m1 != 0.0 {
        (m2 - m1).abs() / m1.abs()
    } else if m2 != m1 {
        f64::INFINITY
    } else {
        0.0
    };

    let finding = if outcome.is_significant(alpha) {
        let severity = if relative > relative_limit {
            Severity::High
        } else {
            Severity::Medium
        };
        ctx.finding(
            severity,
            format!(
                "mean shifts from {:.4} to {:.4} between halves (p={:.4})",
                m1, m2, outcome.p_value
            ),
        )
    } else {
        ctx.pass(format!("no mean shift between halves (p={:.4})", outcome.p_value))
    };
    Ok(finding
        .with_value(outcome.p_value)
        .with_threshold(alpha)
        .with_meta("method", method)
        .with_meta("first_half_mean", m1)
        .with_meta("second_half_mean", m2)
        .with_meta(
            "relative_change",
            if relative.is_finite() { json!(relative) } else { json!(null) },
        ))
}

/// First half against second half: Bartlett if normal, Levene otherwise.
pub fn variance_shift(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    let values = ctx.profile.numeric_values();
    if values.len() < 2 * MIN_NUMERIC_N {
        return Ok(ctx.insufficient(values.len(), 2 * MIN_NUMERIC_N));
    }
    let alpha = ctx.param("alpha")?;
    let ratio_limit = ctx.param("ratio")?;
    let (first, second) = halves(values);

    let normal = gate_is_normal(ctx);
    let (method, outcome) = if normal {
        ("bartlett", bartlett(&[first, second]))
    } else {
        ("levene_median", levene_median(&[first, second]))
    };
    let Some(outcome) = outcome else {
        return Ok(ctx.pass("halves have no spread to compare").with_meta("method", method));
    };

    let (v1, v2) = (variance(first, 1), variance(second, 1));
    let ratio = if v1 > 0.0 { v2 / v1 } else { f64::INFINITY };

    let finding = if outcome.is_significant(alpha) {
        let severity = if ratio > ratio_limit || ratio < 1.0 / ratio_limit {
            Severity::High
        } else {
            Severity::Medium
        };
        ctx.finding(
            severity,
            format!(
                "variance changes by a factor of {:.2} between halves (p={:.4})",
                ratio, outcome.p_value
            ),
        )
    } else {
        ctx.pass(format!("no variance shift between halves (p={:.4})", outcome.p_value))
    };
    Ok(finding
        .with_value(outcome.p_value)
        .with_threshold(alpha)
        .with_meta("method", method)
        .with_meta("variance_ratio", if ratio.is_finite() { json!(ratio) } else { json!(null) }))
}

/// Signed-rank test pairing the i-th value of each half.
pub fn wilcoxon_paired(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    let values = ctx.profile.numeric_values();
    if values.len() < 2 * MIN_NUMERIC_N {
        return Ok(ctx.insufficient(values.len(), 2 * MIN_NUMERIC_N));
    }
    let alpha = ctx.param("alpha")?;
    let (first, second) = halves(values);
    let Some(outcome) = wilcoxon_signed_rank(first, second) else {
        return Ok(ctx.pass("paired halves are identical"));
    };
    let finding = if outcome.is_significant(alpha) {
        ctx.finding(
            Severity::Medium,
            format!("paired halves differ systematically (p={:.4})", outcome.p_value),
        )
    } else {
        ctx.pass(format!("paired halves consistent (p={:.4})", outcome.p_value))
    };
    Ok(finding
        .with_value(outcome.p_value)
        .with_threshold(alpha)
        .with_meta("statistic", outcome.statistic))
}

/// Kruskal-Wallis of this column grouped by each categorical column with a
/// workable number of groups.
pub fn kruskal_wallis_by_category(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    let n = ctx.profile.numeric_values().len();
    if n < MIN_NUMERIC_N {
        return Ok(ctx.insufficient(n, MIN_NUMERIC_N));
    }
    let alpha = ctx.param("alpha")?;
    if ctx.profile.len() != ctx.dataset.row_count() {
        return Err(CheckError::computation("column and dataset row counts differ"));
    }

    let mut significant = Vec::new();
    let mut tested = 0;
    let mut min_p: Option<f64> = None;

    for (other, classification) in ctx.other_columns() {
        if !classification.semantic_type.is_categorical() {
            continue;
        }
        let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for (row, label) in other.raw().iter().enumerate() {
            let label = label.trim();
            if crate::utils::is_null_raw(label) {
                continue;
            }
            if let Some(value) = ctx.profile.numeric_at(row) {
                groups.entry(label).or_default().push(value);
            }
        }
        if groups.len() < 2 || groups.len() > MAX_GROUPS {
            continue;
        }
        let slices: Vec<&[f64]> = groups.values().map(|g| g.as_slice()).collect();
        let Some(outcome) = kruskal_wallis(&slices) else {
            continue;
        };
        tested += 1;
        min_p = Some(min_p.map_or(outcome.p_value, |p: f64| p.min(outcome.p_value)));
        if outcome.is_significant(alpha) {
            significant.push(json!({
                "column": other.name(),
                "groups": groups.len(),
                "h": outcome.statistic,
                "p_value": outcome.p_value,
            }));
        }
    }

    if tested == 0 {
        return Ok(ctx.pass("no categorical column to group by"));
    }
    let finding = if significant.is_empty() {
        ctx.pass(format!("no group differences across {} categorical columns", tested))
    } else {
        let names: Vec<String> = significant
            .iter()
            .filter_map(|s| s["column"].as_str().map(str::to_string))
            .collect();
        ctx.info(format!("distribution differs across groups of {}", names.join(", ")))
            .with_samples(names)
    };
    let finding = match min_p {
        Some(p) => finding.with_value(p),
        None => finding,
    };
    Ok(finding.with_threshold(alpha).with_meta("groupings", significant))
}

#[cfg(test)]
mod tests {
    use crate::checks::testing::{column_finding_in, numeric_finding};
    use crate::types::Severity;

    fn normal_like(n: usize, centre: f64, scale: f64) -> Vec<f64> {
        use statrs::distribution::{ContinuousCDF, Normal};
        let dist = Normal::new(centre, scale).unwrap();
        (1..=n)
            .map(|i| dist.inverse_cdf(i as f64 / (n as f64 + 1.0)))
            .collect()
    }

    /// Interleave so that both halves cover the whole distribution.
    fn shuffled(mut values: Vec<f64>) -> Vec<f64> {
        let n = values.len();
        let mut out = Vec::with_capacity(n);
        let (mut lo, mut hi) = (0, n);
        while lo < hi {
            out.push(values[lo]);
            lo += 1;
            if lo < hi {
                hi -= 1;
                out.push(values[hi]);
            }
        }
        values.clear();
        out
    }

    #[test]
    fn test_normality_gate_finding() {
        let finding = numeric_finding("NORMALITY_TEST", &normal_like(200, 50.0, 5.0));
        assert_eq!(finding.severity, Severity::Pass);
        assert_eq!(finding.metadata["method"], "shapiro_wilk");

        let skewed: Vec<f64> = (1..=200).map(|i| (i as f64 / 20.0).exp()).collect();
        let finding = numeric_finding("NORMALITY_TEST", &skewed);
        assert_eq!(finding.severity, Severity::Info);
        assert!(finding.passed);
    }

    #[test]
    fn test_mean_shift_detects_level_change() {
        let mut values = shuffled(normal_like(100, 50.0, 5.0));
        values.extend(shuffled(normal_like(100, 80.0, 5.0)));
        let finding = numeric_finding("MEAN_SHIFT", &values);
        assert_eq!(finding.severity, Severity::High);
    }

    #[test]
    fn test_mean_shift_stable() {
        let values = shuffled(normal_like(200, 50.0, 5.0));
        let finding = numeric_finding("MEAN_SHIFT", &values);
        assert_eq!(finding.severity, Severity::Pass);
    }

    #[test]
    fn test_variance_shift() {
        let mut values = shuffled(normal_like(100, 50.0, 1.0));
        values.extend(shuffled(normal_like(100, 50.0, 10.0)));
        let finding = numeric_finding("VARIANCE_SHIFT", &values);
        assert_eq!(finding.severity, Severity::High);
    }

    #[test]
    fn test_kruskal_wallis_groups() {
        let mut amounts = Vec::new();
        let mut regions = Vec::new();
        for i in 0..60 {
            let (region, base) = match i % 3 {
                0 => ("north", 10.0),
                1 => ("south", 50.0),
                _ => ("east", 90.0),
            };
            amounts.push(format!("{}", base + (i % 7) as f64));
            regions.push(region.to_string());
        }
        let amounts: Vec<&str> = amounts.iter().map(|s| s.as_str()).collect();
        let regions: Vec<&str> = regions.iter().map(|s| s.as_str()).collect();
        let finding = column_finding_in(
            "KRUSKAL_WALLIS",
            "amount",
            &[("amount", amounts), ("region", regions)],
        );
        assert_eq!(finding.severity, Severity::Info);
        assert_eq!(finding.sample_values, vec!["region".to_string()]);
    }
}
