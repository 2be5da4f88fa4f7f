//! Checks that apply to every column, plus full-row duplication.

use std::collections::HashSet;

use super::{CheckContext, DatasetContext, pct, share};
use crate::error::CheckResult;
use crate::types::{DATASET_COLUMN, Finding};
use crate::utils::{is_null_like, is_null_raw, truncate_str};

/// Share of values that are null or a null-like token.
///
/// Registered as `NULL_RATE` and `DATE_NULL_RATE`.
pub fn null_rate(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    let raw = ctx.profile.raw();
    let nulls = raw.iter().filter(|v| is_null_like(v)).count();
    let rate = share(nulls, raw.len());
    Ok(ctx
        .graded(rate, format!("{} of values are null or null-like", pct(rate)))
        .with_affected(nulls, raw.len()))
}

/// Values with leading or trailing whitespace.
pub fn whitespace_issues(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    if ctx.profile.is_numeric() {
        return Ok(ctx.pass("numeric column"));
    }
    let values: Vec<&String> = ctx.profile.raw().iter().filter(|v| !is_null_raw(v)).collect();
    let padded: Vec<&String> = values
        .iter()
        .copied()
        .filter(|v| v.trim() != v.as_str())
        .collect();

    let rate = share(padded.len(), values.len());
    Ok(ctx
        .graded(rate, format!("{} values have leading/trailing whitespace", padded.len()))
        .with_affected(padded.len(), values.len())
        .with_samples(padded.iter().map(|v| format!("{:?}", v))))
}

/// A column holding a single distinct value.
pub fn constant_column(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    let stats = ctx.profile.stats();
    if stats.non_null_count == 0 || stats.distinct_count != 1 {
        return Ok(ctx.pass(format!("{} distinct values", stats.distinct_count)));
    }
    let value = ctx.profile.top_value().map(|(v, _)| v).unwrap_or_default();
    Ok(ctx
        .graded(1.0, format!("column is constant ('{}')", truncate_str(value, 40)))
        .with_affected(stats.non_null_count, stats.row_count)
        .with_samples([value]))
}

/// One value dominating a column that is not strictly constant.
pub fn near_constant(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    let stats = ctx.profile.stats();
    let Some((top, count)) = ctx.profile.top_value() else {
        return Ok(ctx.pass("no values"));
    };
    if stats.distinct_count < 2 {
        return Ok(ctx.pass("column is constant"));
    }
    let top_share = share(count, stats.non_null_count);
    Ok(ctx
        .graded(
            top_share,
            format!("'{}' makes up {} of values", truncate_str(top, 40), pct(top_share)),
        )
        .with_affected(count, stats.non_null_count)
        .with_samples([top])
        .with_meta("top_value", top))
}

/// Full-row duplicates over the raw values.
pub fn duplicate_rows(ctx: &DatasetContext<'_>) -> CheckResult<Vec<Finding>> {
    let columns = ctx.dataset.columns();
    let rows = ctx.dataset.row_count();
    let mut seen: HashSet<Vec<&str>> = HashSet::with_capacity(rows);
    let mut duplicates = 0;
    let mut first_duplicate_rows = Vec::new();

    for row in 0..rows {
        let key: Vec<&str> = columns
            .iter()
            .map(|c| c.raw().get(row).map(|v| v.as_str()).unwrap_or(""))
            .collect();
        if !seen.insert(key) {
            duplicates += 1;
            if first_duplicate_rows.len() < 5 {
                first_duplicate_rows.push(row);
            }
        }
    }

    let rate = share(duplicates, rows);
    Ok(vec![
        ctx.graded(DATASET_COLUMN, rate, format!("{} duplicate rows ({})", duplicates, pct(rate)))
            .with_affected(duplicates, rows)
            .with_samples(first_duplicate_rows.iter().map(|r| format!("row {}", r))),
    ])
}
