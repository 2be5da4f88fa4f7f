//! Missing-value structure across columns.

use serde_json::json;

use super::{DatasetContext, pct, share};
use crate::error::CheckResult;
use crate::profiler::ColumnProfile;
use crate::stats::association::pearson;
use crate::stats::hypothesis::mann_whitney_u;
use crate::types::{DATASET_COLUMN, Finding, Severity};

const MIN_GROUP: usize = 5;

fn null_mask(column: &ColumnProfile, rows: usize) -> Vec<f64> {
    (0..rows)
        .map(|row| if column.is_null_at(row) { 1.0 } else { 0.0 })
        .collect()
}

/// Columns with some, but not all, values missing.
fn partially_null<'a>(ctx: &DatasetContext<'a>) -> Vec<&'a ColumnProfile> {
    ctx.dataset
        .columns()
        .iter()
        .filter(|c| {
            let stats = c.stats();
            stats.null_count > 0 && stats.null_count < stats.row_count
        })
        .collect()
}

/// Columns whose null indicators move together.
pub fn null_correlation(ctx: &DatasetContext<'_>) -> CheckResult<Vec<Finding>> {
    let alpha = ctx.param("alpha")?;
    let min_r = ctx.param("min_r")?;
    let rows = ctx.dataset.row_count();
    let columns = partially_null(ctx);
    let masks: Vec<Vec<f64>> = columns.iter().map(|c| null_mask(c, rows)).collect();

    let mut findings = Vec::new();
    for i in 0..columns.len() {
        for j in (i + 1)..columns.len() {
            let Some(outcome) = pearson(&masks[i], &masks[j]) else {
                continue;
            };
            if outcome.statistic > min_r && outcome.is_significant(alpha) {
                let (a, b) = (columns[i].name(), columns[j].name());
                findings.push(
                    ctx.finding(
                        DATASET_COLUMN,
                        Severity::Medium,
                        format!(
                            "{} and {} tend to be missing together (r={:.3})",
                            a, b, outcome.statistic
                        ),
                    )
                    .with_value(outcome.statistic)
                    .with_threshold(min_r)
                    .with_samples([format!("{} ~ {}", a, b)])
                    .with_meta("columns", json!([a, b]))
                    .with_meta("p_value", outcome.p_value),
                );
            }
        }
    }
    if findings.is_empty() {
        findings.push(
            ctx.pass(format!(
                "no correlated missingness among {} columns with nulls",
                columns.len()
            )),
        );
    }
    Ok(findings)
}

/// Rows that are mostly empty.
pub fn null_row_pattern(ctx: &DatasetContext<'_>) -> CheckResult<Vec<Finding>> {
    let row_share = ctx.param("row_null_share")?;
    let rows = ctx.dataset.row_count();
    let columns = ctx.dataset.columns();
    let mut sparse_rows = Vec::new();
    for row in 0..rows {
        let nulls = columns.iter().filter(|c| c.is_null_at(row)).count();
        if share(nulls, columns.len()) > row_share {
            sparse_rows.push(row);
        }
    }
    let rate = share(sparse_rows.len(), rows);
    Ok(vec![
        ctx.graded(
            DATASET_COLUMN,
            rate,
            format!(
                "{} rows ({}) are more than {} empty",
                sparse_rows.len(),
                pct(rate),
                pct(row_share)
            ),
        )
        .with_affected(sparse_rows.len(), rows)
        .with_samples(sparse_rows.iter().map(|r| format!("row {}", r))),
    ])
}

/// Numeric values that differ depending on whether another column is
/// missing, which rules out missing-completely-at-random.
pub fn mcar_violation(ctx: &DatasetContext<'_>) -> CheckResult<Vec<Finding>> {
    let alpha = ctx.param("alpha")?;
    let rows = ctx.dataset.row_count();
    let with_nulls = partially_null(ctx);
    let mut violations = Vec::new();

    for target in ctx.numeric_columns() {
        for other in &with_nulls {
            if other.name() == target.name() {
                continue;
            }
            let (mut missing, mut present) = (Vec::new(), Vec::new());
            for row in 0..rows {
                let Some(value) = target.numeric_at(row) else {
                    continue;
                };
                if other.is_null_at(row) {
                    missing.push(value);
                } else {
                    present.push(value);
                }
            }
            if missing.len() < MIN_GROUP || present.len() < MIN_GROUP {
                continue;
            }
            if let Some(outcome) = mann_whitney_u(&missing, &present)
                && outcome.p_value < alpha
            {
                violations.push(json!({
                    "column": target.name(),
                    "missing_in": other.name(),
                    "p_value": outcome.p_value,
                }));
            }
        }
    }

    let count = violations.len();
    let samples: Vec<String> = violations
        .iter()
        .map(|v| {
            format!(
                "{} by {} missing",
                v["column"].as_str().unwrap_or(""),
                v["missing_in"].as_str().unwrap_or("")
            )
        })
        .collect();
    Ok(vec![
        ctx.graded(DATASET_COLUMN, count as f64, format!("{} MCAR violations", count))
            .with_samples(samples)
            .with_meta("violations", violations),
    ])
}
