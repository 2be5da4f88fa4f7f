//! Descriptive numeric checks: outliers, shape, sign and stability.

use super::{CheckContext, MIN_NUMERIC_N, pct, share};
use crate::error::CheckResult;
use crate::profiler::statistics::{
    IqrFences, excess_kurtosis, mean, median_absolute_deviation, median_sorted, population_std,
    quantile_sorted, sample_std, skewness, sorted, variance,
};
use crate::stats::series::mann_kendall;
use crate::types::{Finding, Severity};

const MODIFIED_Z_FACTOR: f64 = 0.6745;

/// Values of the column, or the PASS finding to return when there are too
/// few of them.
fn numeric_input<'c>(ctx: &'c CheckContext<'_>, need: usize) -> Result<&'c [f64], Finding> {
    let values = ctx.profile.numeric_values();
    if values.len() < need {
        Err(ctx.insufficient(values.len(), need))
    } else {
        Ok(values)
    }
}

// ==================== outliers ====================

/// Values outside the Tukey fences `[Q1 - k*IQR, Q3 + k*IQR]`, with
/// positional quartiles.
pub fn outlier_iqr(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    let values = match numeric_input(ctx, MIN_NUMERIC_N) {
        Ok(values) => values,
        Err(finding) => return Ok(finding),
    };
    let fences = IqrFences::from_sorted(&sorted(values), ctx.param("multiplier")?);
    let outliers: Vec<f64> = values.iter().copied().filter(|v| fences.is_outside(*v)).collect();
    let rate = share(outliers.len(), values.len());

    Ok(ctx
        .graded(
            rate,
            format!(
                "{} values outside [{:.4}, {:.4}] ({})",
                outliers.len(),
                fences.lower,
                fences.upper,
                pct(rate)
            ),
        )
        .with_affected(outliers.len(), values.len())
        .with_samples(&outliers)
        .with_meta("q1", fences.q1)
        .with_meta("q3", fences.q3)
        .with_meta("iqr", fences.iqr)
        .with_meta("lower_fence", fences.lower)
        .with_meta("upper_fence", fences.upper))
}

/// `|z| > z_threshold` with the population standard deviation. Capped at
/// INFO when the normality gate rejects normality.
pub fn outlier_zscore(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    let values = match numeric_input(ctx, MIN_NUMERIC_N) {
        Ok(values) => values,
        Err(finding) => return Ok(finding),
    };
    let cutoff = ctx.param("z_threshold")?;
    let m = mean(values);
    let std = population_std(values);
    if std == 0.0 {
        return Ok(ctx.pass("zero variance").with_meta("zero_std", true));
    }

    let outliers: Vec<f64> = values
        .iter()
        .copied()
        .filter(|v| ((v - m) / std).abs() > cutoff)
        .collect();
    let rate = share(outliers.len(), values.len());
    let mut finding = ctx
        .graded(rate, format!("{} values with |z| > {} ({})", outliers.len(), cutoff, pct(rate)))
        .with_affected(outliers.len(), values.len())
        .with_samples(&outliers)
        .with_meta("mean", m)
        .with_meta("std", std);

    if finding.severity.is_failing()
        && let Some(gate) = ctx.normality_gate()
        && !gate.is_normal
    {
        finding = finding
            .with_severity(Severity::Info)
            .with_meta("capped_non_normal", true);
        finding.message = format!(
            "{}; distribution is not normal (p={:.4}), see OUTLIER_MODIFIED_Z",
            finding.message, gate.p_value
        );
    }
    Ok(finding)
}

/// Modified z-score `0.6745 * (x - median) / MAD`. A zero MAD means no
/// spread to measure against and reports no outliers.
pub fn outlier_modified_z(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    let values = match numeric_input(ctx, MIN_NUMERIC_N) {
        Ok(values) => values,
        Err(finding) => return Ok(finding),
    };
    let cutoff = ctx.param("threshold")?;
    let median = median_sorted(&sorted(values));
    let mad = median_absolute_deviation(values, median);
    if mad == 0.0 {
        return Ok(ctx
            .pass("median absolute deviation is zero; no outliers reported")
            .with_meta("zero_mad", true)
            .with_meta("median", median));
    }

    let outliers: Vec<f64> = values
        .iter()
        .copied()
        .filter(|v| (MODIFIED_Z_FACTOR * (v - median) / mad).abs() > cutoff)
        .collect();
    let rate = share(outliers.len(), values.len());
    Ok(ctx
        .graded(
            rate,
            format!("{} values with |modified z| > {} ({})", outliers.len(), cutoff, pct(rate)),
        )
        .with_affected(outliers.len(), values.len())
        .with_samples(&outliers)
        .with_meta("median", median)
        .with_meta("mad", mad))
}

// ==================== shape ====================

pub fn distribution_skew(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    let values = match numeric_input(ctx, 20) {
        Ok(values) => values,
        Err(finding) => return Ok(finding),
    };
    let skew = skewness(values);
    Ok(ctx
        .graded(skew.abs(), format!("skewness {:.3}", skew))
        .with_meta("skewness", skew))
}

pub fn distribution_kurtosis(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    let values = match numeric_input(ctx, MIN_NUMERIC_N) {
        Ok(values) => values,
        Err(finding) => return Ok(finding),
    };
    let kurtosis = excess_kurtosis(values);
    Ok(ctx
        .graded(kurtosis, format!("excess kurtosis {:.3}", kurtosis))
        .with_meta("excess_kurtosis", kurtosis))
}

pub fn negative_values(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    let values = ctx.profile.numeric_values();
    let negatives: Vec<f64> = values.iter().copied().filter(|v| *v < 0.0).collect();
    let rate = share(negatives.len(), values.len());
    Ok(ctx
        .graded(rate, format!("{} negative values ({})", negatives.len(), pct(rate)))
        .with_affected(negatives.len(), values.len())
        .with_samples(&negatives))
}

pub fn zero_values(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    let values = ctx.profile.numeric_values();
    let zeros = values.iter().filter(|v| **v == 0.0).count();
    let rate = share(zeros, values.len());
    Ok(ctx
        .graded(rate, format!("{} zero values ({})", zeros, pct(rate)))
        .with_affected(zeros, values.len()))
}

// ==================== stability ====================

/// Windowed mean deviation, corroborated by Mann-Kendall.
pub fn trend_change(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    let values = match numeric_input(ctx, 50) {
        Ok(values) => values,
        Err(finding) => return Ok(finding),
    };
    let global_mean = mean(values);
    let std = sample_std(values);
    if std == 0.0 {
        return Ok(ctx.pass("zero variance"));
    }

    let window = (values.len() / 20).max(7);
    let deviations: Vec<f64> = values
        .chunks_exact(window)
        .map(|chunk| (mean(chunk) - global_mean).abs() / std)
        .collect();
    let (worst_window, worst) = deviations
        .iter()
        .copied()
        .enumerate()
        .fold((0, 0.0_f64), |acc, (i, d)| if d > acc.1 { (i, d) } else { acc });
    let lowest = ctx.check.thresholds.tiers().last().map(|t| t.threshold).unwrap_or(2.0);
    let flagged = deviations.iter().filter(|d| **d >= lowest).count();

    let mut finding = ctx
        .graded(
            worst,
            format!(
                "window {} deviates {:.2} std from the global mean ({} of {} windows flagged)",
                worst_window,
                worst,
                flagged,
                deviations.len()
            ),
        )
        .with_meta("window_size", window)
        .with_meta("windows", deviations.len())
        .with_meta("windows_flagged", flagged);

    if let Some(mk) = mann_kendall(values, 0.05) {
        finding = finding
            .with_meta("mann_kendall_s", mk.s)
            .with_meta("mann_kendall_z", mk.z)
            .with_meta("mann_kendall_p", mk.p_value)
            .with_meta("trend", serde_json::to_value(mk.trend).unwrap_or_default());
    }
    Ok(finding)
}

pub fn value_range(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    let values = match numeric_input(ctx, MIN_NUMERIC_N) {
        Ok(values) => values,
        Err(finding) => return Ok(finding),
    };
    let data = sorted(values);
    let (min, max) = (data[0], data[data.len() - 1]);
    let p001 = quantile_sorted(&data, 0.001);
    let p999 = quantile_sorted(&data, 0.999);
    let extremes: Vec<f64> = values.iter().copied().filter(|v| *v < p001 || *v > p999).collect();
    let rate = share(extremes.len(), values.len());
    let message = format!(
        "{} values outside [{:.2}, {:.2}] (range [{}, {}])",
        extremes.len(),
        p001,
        p999,
        min,
        max
    );
    let finding = if extremes.is_empty() { ctx.pass(message) } else { ctx.info(message) };
    Ok(finding
        .with_value(rate)
        .with_affected(extremes.len(), values.len())
        .with_samples(&extremes)
        .with_meta("min", min)
        .with_meta("max", max)
        .with_meta("p0_1", p001)
        .with_meta("p99_9", p999))
}

/// Ratio of the largest to the smallest variance over 5 segments.
pub fn variance_sudden_change(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    const SEGMENTS: usize = 5;
    const MAX_RATIO: f64 = 1e6;

    let values = match numeric_input(ctx, 100) {
        Ok(values) => values,
        Err(finding) => return Ok(finding),
    };
    let size = values.len() / SEGMENTS;
    let variances: Vec<f64> = values
        .chunks(size)
        .take(SEGMENTS)
        .map(|segment| variance(segment, 1))
        .collect();
    let max = variances.iter().copied().fold(0.0, f64::max);
    let min = variances.iter().copied().fold(f64::INFINITY, f64::min);
    if max == 0.0 {
        return Ok(ctx.pass("zero variance"));
    }
    let ratio = if min > 0.0 { (max / min).min(MAX_RATIO) } else { MAX_RATIO };

    Ok(ctx
        .graded(ratio, format!("segment variance ratio {:.2}", ratio))
        .with_meta("segment_variances", variances))
}
