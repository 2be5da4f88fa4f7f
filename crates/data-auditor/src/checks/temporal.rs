//! Checks that need a time axis.
//!
//! The [`TimeIndex`] is built once per run from the configured time column,
//! or the first DATE/DATETIME column. Without one every check here passes.

use chrono::{Datelike, NaiveDateTime};
use serde_json::json;
use tracing::debug;

use super::{DatasetContext, MIN_NUMERIC_N, pct, share};
use crate::error::{AuditError, CheckResult, Result};
use crate::profiler::dates::parse_datetime;
use crate::profiler::{Classification, ColumnProfile, Dataset};
use crate::profiler::statistics::sample_std;
use crate::stats::hypothesis::ks_two_sample;
use crate::stats::series::{autocorrelation, cusum_peak, periodogram};
use crate::types::{DATASET_COLUMN, Finding, Severity};

const MIN_DRIFT_ROWS: usize = 100;
const MIN_SERIES: usize = 2 * MIN_NUMERIC_N;
const MAX_SPECTRUM_POINTS: usize = 2048;

/// Bucket used to group rows in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Day,
    Week,
    Month,
}

impl Period {
    /// Month above a year of data, week above a month, day otherwise.
    fn for_span_days(days: i64) -> Self {
        if days > 365 {
            Period::Month
        } else if days > 30 {
            Period::Week
        } else {
            Period::Day
        }
    }

    fn key(&self, time: &NaiveDateTime) -> String {
        match self {
            Period::Day => time.format("%Y-%m-%d").to_string(),
            Period::Week => {
                let week = time.iso_week();
                format!("{}-W{:02}", week.year(), week.week())
            }
            Period::Month => time.format("%Y-%m").to_string(),
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Period::Day => "day",
            Period::Week => "week",
            Period::Month => "month",
        }
    }
}

/// Parsed time per row plus the rows in time order.
#[derive(Debug, Clone)]
pub struct TimeIndex {
    pub column: String,
    times: Vec<Option<NaiveDateTime>>,
    order: Vec<usize>,
}

impl TimeIndex {
    /// Build from the named column, or from the first temporal column.
    ///
    /// A named column that does not exist is an error; no temporal column at
    /// all yields `None`.
    pub fn build(
        dataset: &Dataset,
        classifications: &[Classification],
        configured: Option<&str>,
    ) -> Result<Option<Self>> {
        let profile = match configured {
            Some(name) => dataset
                .column(name)
                .ok_or_else(|| AuditError::ColumnNotFound(name.to_string()))?,
            None => match dataset
                .columns()
                .iter()
                .zip(classifications)
                .find(|(_, c)| c.semantic_type.is_temporal())
            {
                Some((profile, _)) => profile,
                None => return Ok(None),
            },
        };
        Ok(Some(Self::from_profile(profile)))
    }

    pub fn from_profile(profile: &ColumnProfile) -> Self {
        let times: Vec<Option<NaiveDateTime>> =
            profile.raw().iter().map(|v| parse_datetime(v)).collect();
        let mut order: Vec<usize> = (0..times.len()).filter(|&row| times[row].is_some()).collect();
        order.sort_by_key(|&row| times[row]);
        debug!(
            "Time index on '{}': {} of {} rows parsed",
            profile.name(),
            order.len(),
            times.len()
        );
        Self {
            column: profile.name().to_string(),
            times,
            order,
        }
    }

    /// Rows with a parsed time, earliest first.
    pub fn order(&self) -> &[usize] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn span_days(&self) -> i64 {
        match (self.order.first(), self.order.last()) {
            (Some(&first), Some(&last)) => match (self.times[first], self.times[last]) {
                (Some(a), Some(b)) => (b - a).num_days(),
                _ => 0,
            },
            _ => 0,
        }
    }

    /// Rows grouped by period, periods in time order.
    pub fn periods(&self) -> (Period, Vec<(String, Vec<usize>)>) {
        let period = Period::for_span_days(self.span_days());
        let mut groups: Vec<(String, Vec<usize>)> = Vec::new();
        for &row in &self.order {
            let Some(time) = self.times[row] else { continue };
            let key = period.key(&time);
            match groups.last_mut() {
                Some((last, rows)) if *last == key => rows.push(row),
                _ => groups.push((key, vec![row])),
            }
        }
        (period, groups)
    }

    /// Non-null numeric values of `column` in time order.
    pub fn series(&self, column: &ColumnProfile) -> Vec<f64> {
        self.order.iter().filter_map(|&row| column.numeric_at(row)).collect()
    }
}

fn no_time_column(ctx: &DatasetContext<'_>) -> Vec<Finding> {
    vec![ctx.pass("no time column").with_meta("time_column", serde_json::Value::Null)]
}

/// Numeric columns other than the time column itself.
fn value_columns<'a>(ctx: &DatasetContext<'a>, index: &TimeIndex) -> Vec<&'a ColumnProfile> {
    ctx.numeric_columns()
        .into_iter()
        .filter(|c| c.name() != index.column)
        .collect()
}

fn or_pass(mut findings: Vec<Finding>, ctx: &DatasetContext<'_>, message: &str) -> Vec<Finding> {
    if findings.is_empty() {
        findings.push(ctx.pass(message));
    }
    findings
}

/// Earliest quarter against latest quarter, per numeric column.
pub fn temporal_drift(ctx: &DatasetContext<'_>) -> CheckResult<Vec<Finding>> {
    let Some(index) = ctx.time_index else {
        return Ok(no_time_column(ctx));
    };
    if index.len() < MIN_DRIFT_ROWS {
        return Ok(vec![
            ctx.pass(format!(
                "insufficient data ({} timed rows, need {})",
                index.len(),
                MIN_DRIFT_ROWS
            ))
                .with_meta("insufficient_data", true),
        ]);
    }
    let alpha = ctx.param("alpha")?;
    let strong_alpha = ctx.param("strong_alpha")?;
    let quarter = index.len() / 4;
    let (early, late) = (&index.order()[..quarter], &index.order()[index.len() - quarter..]);

    let mut findings = Vec::new();
    for column in value_columns(ctx, index) {
        let first: Vec<f64> = early.iter().filter_map(|&r| column.numeric_at(r)).collect();
        let last: Vec<f64> = late.iter().filter_map(|&r| column.numeric_at(r)).collect();
        if first.len() < MIN_NUMERIC_N || last.len() < MIN_NUMERIC_N {
            continue;
        }
        let Some(outcome) = ks_two_sample(&first, &last) else {
            continue;
        };
        let severity = if outcome.p_value < strong_alpha {
            Severity::High
        } else if outcome.p_value < alpha {
            Severity::Medium
        } else {
            continue;
        };
        findings.push(
            Finding::new(
                ctx.id(),
                column.name(),
                severity,
                format!(
                    "distribution drifts over {} (KS D={:.3}, p={:.4})",
                    index.column, outcome.statistic, outcome.p_value
                ),
            )
            .with_value(outcome.p_value)
            .with_threshold(alpha)
            .with_meta("ks_statistic", outcome.statistic)
            .with_meta("time_column", index.column.as_str()),
        );
    }
    Ok(or_pass(findings, ctx, "no drift between first and last time quartiles"))
}

fn null_rate(columns: &[&ColumnProfile], rows: &[usize]) -> f64 {
    let nulls: usize = columns
        .iter()
        .map(|c| rows.iter().filter(|&&r| c.is_null_at(r)).count())
        .sum();
    share(nulls, columns.len() * rows.len())
}

/// Periods whose null rate is well above the average period.
pub fn temporal_completeness(ctx: &DatasetContext<'_>) -> CheckResult<Vec<Finding>> {
    let Some(index) = ctx.time_index else {
        return Ok(no_time_column(ctx));
    };
    let factor = ctx.param("factor")?;
    let columns: Vec<&ColumnProfile> = ctx
        .dataset
        .columns()
        .iter()
        .filter(|c| c.name() != index.column)
        .collect();
    let (period, groups) = index.periods();
    if columns.is_empty() || groups.len() < 2 {
        return Ok(vec![ctx.pass(format!("{} {} periods", groups.len(), period.as_str()))]);
    }

    let rates: Vec<(&str, f64)> = groups
        .iter()
        .map(|(key, rows)| (key.as_str(), null_rate(&columns, rows)))
        .collect();
    let average = rates.iter().map(|(_, r)| r).sum::<f64>() / rates.len() as f64;
    let degraded: Vec<(&str, f64)> = rates
        .iter()
        .copied()
        .filter(|(_, rate)| average > 0.0 && *rate > factor * average)
        .collect();

    let Some(worst) = degraded.iter().map(|(_, r)| *r).reduce(f64::max) else {
        return Ok(vec![
            ctx.pass(format!(
                "completeness is even across {} {} periods",
                groups.len(),
                period.as_str()
            ))
                .with_meta("period", period.as_str()),
        ]);
    };
    let severity = if worst > 0.5 { Severity::High } else { Severity::Medium };
    Ok(vec![
        ctx.finding(
            DATASET_COLUMN,
            severity,
            format!(
                "{} of {} {} periods have degraded completeness",
                degraded.len(),
                groups.len(),
                period.as_str()
            ),
        )
        .with_value(worst)
        .with_threshold(factor * average)
        .with_affected(degraded.len(), groups.len())
        .with_samples(degraded.iter().map(|(key, rate)| format!("{} ({})", key, pct(*rate))))
        .with_meta("period", period.as_str())
        .with_meta("average_null_rate", average),
    ])
}

/// Per-column periods with a null rate far above the column's own average.
pub fn temporal_null_concentration(ctx: &DatasetContext<'_>) -> CheckResult<Vec<Finding>> {
    let Some(index) = ctx.time_index else {
        return Ok(no_time_column(ctx));
    };
    let factor = ctx.param("factor")?;
    let (period, groups) = index.periods();
    if groups.len() < 2 {
        return Ok(vec![ctx.pass(format!("{} {} periods", groups.len(), period.as_str()))]);
    }

    let mut findings = Vec::new();
    for column in ctx.dataset.columns().iter().filter(|c| c.name() != index.column) {
        let average = null_rate(&[column], index.order());
        if average == 0.0 {
            continue;
        }
        let hot: Vec<(&str, f64)> = groups
            .iter()
            .map(|(key, rows)| (key.as_str(), null_rate(&[column], rows)))
            .filter(|(_, rate)| *rate > factor * average)
            .collect();
        if hot.is_empty() {
            continue;
        }
        findings.push(
            Finding::new(
                ctx.id(),
                column.name(),
                Severity::Medium,
                format!("nulls concentrate in {} {} periods", hot.len(), period.as_str()),
            )
            .with_value(hot.iter().map(|(_, r)| *r).fold(0.0, f64::max))
            .with_threshold(factor * average)
            .with_samples(hot.iter().map(|(key, rate)| format!("{} ({})", key, pct(*rate))))
            .with_meta("period", period.as_str())
            .with_meta("average_null_rate", average),
        );
    }
    Ok(or_pass(findings, ctx, "nulls are spread evenly over time"))
}

/// Lag-1 autocorrelation outside the white-noise band.
pub fn autocorrelation_check(ctx: &DatasetContext<'_>) -> CheckResult<Vec<Finding>> {
    let Some(index) = ctx.time_index else {
        return Ok(no_time_column(ctx));
    };
    let mut findings = Vec::new();
    for column in value_columns(ctx, index) {
        let series = index.series(column);
        if series.len() < MIN_SERIES {
            continue;
        }
        let Some(acf) = autocorrelation(&series, 1) else {
            continue;
        };
        let band = 1.96 / (series.len() as f64).sqrt();
        if acf.abs() > band {
            findings.push(
                Finding::info(ctx.id(), column.name(), format!("lag-1 autocorrelation {:.3}", acf))
                    .with_value(acf)
                    .with_threshold(band),
            );
        }
    }
    Ok(or_pass(findings, ctx, "no significant autocorrelation"))
}

/// Every `step`-th value so that at most `max` remain.
fn thin(series: &[f64], max: usize) -> Vec<f64> {
    let step = series.len().div_ceil(max).max(1);
    series.iter().step_by(step).copied().collect()
}

/// A dominant periodogram peak (excluding the lowest frequency).
pub fn seasonality(ctx: &DatasetContext<'_>) -> CheckResult<Vec<Finding>> {
    let Some(index) = ctx.time_index else {
        return Ok(no_time_column(ctx));
    };
    let min_share = ctx.param("min_power_share")?;
    let mut findings = Vec::new();
    for column in value_columns(ctx, index) {
        let series = thin(&index.series(column), MAX_SPECTRUM_POINTS);
        if series.len() < MIN_SERIES {
            continue;
        }
        let power = periodogram(&series);
        let total: f64 = power.iter().sum();
        if total <= 0.0 {
            continue;
        }
        let peak = power
            .iter()
            .enumerate()
            .skip(1)
            .max_by(|a, b| a.1.total_cmp(b.1));
        let Some((idx, &peak_power)) = peak else {
            continue;
        };
        let frequency = idx + 1;
        let peak_share = peak_power / total;
        if peak_share > min_share {
            let period = series.len() as f64 / frequency as f64;
            findings.push(
                Finding::info(
                    ctx.id(),
                    column.name(),
                    format!(
                        "cycle of about {:.1} observations holds {} of spectral power",
                        period,
                        pct(peak_share)
                    ),
                )
                .with_value(peak_share)
                .with_threshold(min_share)
                .with_meta("period", period)
                .with_meta("frequency", frequency),
            );
        }
    }
    Ok(or_pass(findings, ctx, "no dominant seasonal cycle"))
}

/// CUSUM excursion beyond `2·σ·√n`.
pub fn changepoint_cusum(ctx: &DatasetContext<'_>) -> CheckResult<Vec<Finding>> {
    let Some(index) = ctx.time_index else {
        return Ok(no_time_column(ctx));
    };
    let multiplier = ctx.param("sigma_multiplier")?;
    let mut findings = Vec::new();
    for column in value_columns(ctx, index) {
        let rows: Vec<(usize, f64)> = index
            .order()
            .iter()
            .filter_map(|&row| column.numeric_at(row).map(|v| (row, v)))
            .collect();
        if rows.len() < MIN_SERIES {
            continue;
        }
        let series: Vec<f64> = rows.iter().map(|(_, v)| *v).collect();
        let sigma = sample_std(&series);
        let Some((at, peak)) = cusum_peak(&series) else {
            continue;
        };
        let limit = multiplier * sigma * (series.len() as f64).sqrt();
        if sigma > 0.0 && peak > limit {
            let changed_at = index.times[rows[at].0].map(|t| t.to_string());
            findings.push(
                Finding::new(
                    ctx.id(),
                    column.name(),
                    Severity::Medium,
                    format!("level change detected near {}", changed_at.as_deref().unwrap_or("?")),
                )
                .with_value(peak)
                .with_threshold(limit)
                .with_meta("changepoint_index", at)
                .with_meta("changepoint_time", json!(changed_at)),
            );
        }
    }
    Ok(or_pass(findings, ctx, "no level change detected"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testing::dataset_finding;
    use crate::profiler::ColumnProfile;

    fn days(n: usize) -> Vec<String> {
        let start = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n)
            .map(|i| (start + chrono::Duration::days(i as i64)).format("%Y-%m-%d").to_string())
            .collect()
    }

    fn refs(values: &[String]) -> Vec<&str> {
        values.iter().map(|s| s.as_str()).collect()
    }

    // ==================== index tests ====================

    #[test]
    fn test_time_index_orders_rows() {
        let profile = ColumnProfile::from_raw(
            "ts",
            vec!["2024-03-01".into(), "2024-01-01".into(), "".into(), "2024-02-01".into()],
        );
        let index = TimeIndex::from_profile(&profile);
        assert_eq!(index.order(), &[1, 3, 0]);
        assert_eq!(index.span_days(), 60);
        assert_eq!(index.periods().0, Period::Week);
    }

    #[test]
    fn test_period_choice() {
        assert_eq!(Period::for_span_days(10), Period::Day);
        assert_eq!(Period::for_span_days(90), Period::Week);
        assert_eq!(Period::for_span_days(400), Period::Month);
    }

    #[test]
    fn test_thin_keeps_bound() {
        let series: Vec<f64> = (0..5000).map(|i| i as f64).collect();
        assert!(thin(&series, 2048).len() <= 2048);
        assert_eq!(thin(&series[..10], 2048).len(), 10);
    }

    // ==================== check tests ====================

    #[test]
    fn test_no_time_column_passes() {
        let findings = dataset_finding("TEMPORAL_DRIFT", &[("a", vec!["1", "2", "3"])]);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Pass);
        assert_eq!(findings[0].message, "no time column");
    }

    #[test]
    fn test_drift_between_quartiles() {
        let dates = days(200);
        let values: Vec<String> = (0..200)
            .map(|i| format!("{}", if i < 100 { 10.0 } else { 50.0 } + (i % 10) as f64))
            .collect();
        let findings =
            dataset_finding("TEMPORAL_DRIFT", &[("day", refs(&dates)), ("value", refs(&values))]);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].column, "value");
        assert_eq!(findings[0].severity, Severity::High);
    }

    #[test]
    fn test_changepoint_and_autocorrelation() {
        let dates = days(120);
        let values: Vec<String> = (0..120)
            .map(|i| format!("{}", if i < 60 { 0.0 } else { 10.0 } + (i % 3) as f64))
            .collect();
        let columns = [("day", refs(&dates)), ("value", refs(&values))];

        let cusum = dataset_finding("CHANGEPOINT_CUSUM", &columns);
        assert_eq!(cusum[0].severity, Severity::Medium);
        assert_eq!(cusum[0].metadata["changepoint_index"], 59);

        let acf = dataset_finding("AUTOCORRELATION", &columns);
        assert_eq!(acf[0].severity, Severity::Info);
    }

    #[test]
    fn test_seasonality_detects_cycle() {
        let dates = days(240);
        let values: Vec<String> = (0..240)
            .map(|i| {
                let angle = 2.0 * std::f64::consts::PI * i as f64 / 12.0;
                format!("{:.4}", angle.sin() * 5.0 + 20.0)
            })
            .collect();
        let findings =
            dataset_finding("SEASONALITY", &[("day", refs(&dates)), ("value", refs(&values))]);
        assert_eq!(findings[0].severity, Severity::Info);
        assert_eq!(findings[0].metadata["frequency"], 20);
    }

    #[test]
    fn test_temporal_completeness_flags_sparse_period() {
        let dates = days(120);
        let values: Vec<String> = (0..120)
            .map(|i| {
                if (60..90).contains(&i) && i % 3 != 0 {
                    String::new()
                } else {
                    format!("{}", i)
                }
            })
            .collect();
        let labels: Vec<String> = (0..120).map(|i| format!("r{}", i % 7)).collect();
        let findings = dataset_finding(
            "TEMPORAL_COMPLETENESS",
            &[("day", refs(&dates)), ("value", refs(&values)), ("label", refs(&labels))],
        );
        assert!(findings[0].severity >= Severity::Medium);
        assert_eq!(findings[0].metadata["period"], "week");

        let concentration = dataset_finding(
            "TEMPORAL_NULL_CONCENTRATION",
            &[("day", refs(&dates)), ("value", refs(&values)), ("label", refs(&labels))],
        );
        assert_eq!(concentration[0].column, "value");
        assert_eq!(concentration[0].severity, Severity::Medium);
    }
}
