//! Checks for DATE and DATETIME columns.

use std::collections::{BTreeMap, HashSet};

use chrono::{NaiveDate, NaiveDateTime};

use super::{CheckContext, pct, share};
use crate::error::{CheckError, CheckResult};
use crate::profiler::dates::{detect_format, parse_datetime};
use crate::types::Finding;

const FORMAT_MIX_SAMPLE: usize = 500;
const GAP_FACTOR: f64 = 3.0;

fn parsed_values<'a>(ctx: &'a CheckContext<'a>) -> Vec<(&'a str, NaiveDateTime)> {
    ctx.profile
        .non_null_values()
        .filter_map(|v| parse_datetime(v).map(|dt| (v, dt)))
        .collect()
}

fn ancient_cutoff() -> CheckResult<NaiveDateTime> {
    NaiveDate::from_ymd_opt(1900, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| CheckError::computation("invalid cutoff date"))
}

/// Distinct formats among the first non-null values.
pub fn date_format_mix(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    let mut formats: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut examples: BTreeMap<&'static str, &str> = BTreeMap::new();
    for value in ctx.profile.non_null_values().take(FORMAT_MIX_SAMPLE) {
        if let Some((format, _)) = detect_format(value) {
            *formats.entry(format.pattern).or_insert(0) += 1;
            examples.entry(format.pattern).or_insert(value);
        }
    }
    let active = formats.len();
    let finding = ctx.graded(active as f64, format!("{} date formats in use", active));
    let finding = if active > 1 {
        finding.with_samples(examples.values())
    } else {
        finding
    };
    Ok(finding.with_meta("formats", serde_json::to_value(&formats).unwrap_or_default()))
}

/// Dates later than the reference time.
pub fn date_future(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    let parsed = parsed_values(ctx);
    let future: Vec<&str> = parsed
        .iter()
        .filter(|(_, dt)| *dt > ctx.reference_time)
        .map(|(v, _)| *v)
        .collect();
    let rate = share(future.len(), parsed.len());
    Ok(ctx
        .graded(rate, format!("{} dates after {}", future.len(), ctx.reference_time.date()))
        .with_affected(future.len(), parsed.len())
        .with_samples(future)
        .with_meta("reference_time", ctx.reference_time.to_string()))
}

/// Dates before 1900-01-01.
pub fn date_ancient(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    let cutoff = ancient_cutoff()?;
    let parsed = parsed_values(ctx);
    let ancient: Vec<&str> = parsed
        .iter()
        .filter(|(_, dt)| *dt < cutoff)
        .map(|(v, _)| *v)
        .collect();
    let rate = share(ancient.len(), parsed.len());
    Ok(ctx
        .graded(rate, format!("{} dates before 1900-01-01", ancient.len()))
        .with_affected(ancient.len(), parsed.len())
        .with_samples(ancient))
}

/// Gaps between consecutive distinct dates larger than three median gaps.
pub fn date_sequence_gaps(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    let mut times: Vec<NaiveDateTime> = parsed_values(ctx).into_iter().map(|(_, dt)| dt).collect();
    times.sort();
    times.dedup();
    if times.len() < 3 {
        return Ok(ctx.insufficient(times.len(), 3));
    }

    let gaps: Vec<(i64, NaiveDateTime, NaiveDateTime)> = times
        .windows(2)
        .map(|w| ((w[1] - w[0]).num_seconds(), w[0], w[1]))
        .filter(|(secs, _, _)| *secs > 0)
        .collect();
    let mut seconds: Vec<i64> = gaps.iter().map(|(s, _, _)| *s).collect();
    seconds.sort_unstable();
    let median = seconds[seconds.len() / 2] as f64;

    let large: Vec<&(i64, NaiveDateTime, NaiveDateTime)> = gaps
        .iter()
        .filter(|(secs, _, _)| *secs as f64 > GAP_FACTOR * median)
        .collect();
    let largest_days = large
        .iter()
        .map(|(s, _, _)| *s)
        .max()
        .map(|s| s as f64 / 86_400.0);

    let finding = ctx
        .graded(
            large.len() as f64,
            format!("{} unusually large gaps in the date sequence", large.len()),
        )
        .with_samples(large.iter().map(|(_, from, to)| format!("{} -> {}", from, to)))
        .with_meta("median_gap_days", median / 86_400.0);
    Ok(match largest_days {
        Some(days) => finding.with_meta("largest_gap_days", days),
        None => finding,
    })
}

/// Repeated date values.
pub fn date_duplicates(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    let parsed = parsed_values(ctx);
    let mut seen = HashSet::with_capacity(parsed.len());
    let duplicates: Vec<&str> = parsed
        .iter()
        .filter(|(_, dt)| !seen.insert(*dt))
        .map(|(v, _)| *v)
        .collect();
    if duplicates.is_empty() {
        return Ok(ctx.pass("all dates are distinct"));
    }
    Ok(ctx
        .info(format!("{} repeated date values", duplicates.len()))
        .with_value(share(duplicates.len(), parsed.len()))
        .with_affected(duplicates.len(), parsed.len())
        .with_samples(duplicates))
}

/// Whether the dates run in either direction without reversals.
pub fn date_monotonicity(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    let times: Vec<NaiveDateTime> = parsed_values(ctx).into_iter().map(|(_, dt)| dt).collect();
    if times.len() < 2 {
        return Ok(ctx.insufficient(times.len(), 2));
    }
    let increasing = times.windows(2).all(|w| w[0] <= w[1]);
    let decreasing = times.windows(2).all(|w| w[0] >= w[1]);
    if increasing || decreasing {
        let direction = if increasing { "non-decreasing" } else { "non-increasing" };
        return Ok(ctx.pass(format!("dates are {}", direction)).with_meta("direction", direction));
    }
    let reversals = times.windows(2).filter(|w| w[1] < w[0]).count();
    Ok(ctx
        .info(format!("dates are not ordered ({} reversals)", reversals))
        .with_meta("reversals", reversals))
}

/// Share of non-null values that no known format parses.
pub fn date_invalid_parsed(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    let values: Vec<&str> = ctx.profile.non_null_values().collect();
    let invalid: Vec<&str> = values
        .iter()
        .copied()
        .filter(|v| parse_datetime(v).is_none())
        .collect();
    let rate = share(invalid.len(), values.len());
    Ok(ctx
        .graded(rate, format!("{} of values do not parse as dates", pct(rate)))
        .with_affected(invalid.len(), values.len())
        .with_samples(invalid))
}

#[cfg(test)]
mod tests {
    use crate::checks::testing::column_finding;
    use crate::types::Severity;

    fn daily(days: u32) -> Vec<String> {
        (1..=days).map(|d| format!("2024-01-{:02}", d)).collect()
    }

    fn refs(values: &[String]) -> Vec<&str> {
        values.iter().map(|s| s.as_str()).collect()
    }

    // ==================== format tests ====================

    #[test]
    fn test_format_mix_counts_active_formats() {
        let mut values = daily(20);
        values.push("05/01/2024".to_string());
        let finding = column_finding("DATE_FORMAT_MIX", &refs(&values));
        assert_eq!(finding.value, Some(2.0));
        assert_eq!(finding.severity, Severity::High);
    }

    #[test]
    fn test_single_format_passes() {
        let values = daily(20);
        let finding = column_finding("DATE_FORMAT_MIX", &refs(&values));
        assert_eq!(finding.severity, Severity::Pass);
    }

    #[test]
    fn test_invalid_parsed() {
        let mut values = daily(18);
        values.push("2024-02-30".to_string());
        values.push("soon".to_string());
        let finding = column_finding("DATE_INVALID_PARSED", &refs(&values));
        assert_eq!(finding.affected_count, 2);
        assert_eq!(finding.severity, Severity::Medium);
    }

    // ==================== range tests ====================

    #[test]
    fn test_future_dates_against_reference_time() {
        let mut values = daily(20);
        values.push("2031-01-01".to_string());
        let finding = column_finding("DATE_FUTURE", &refs(&values));
        assert_eq!(finding.affected_count, 1);
        assert_eq!(finding.severity, Severity::Medium);
        assert_eq!(finding.sample_values, vec!["2031-01-01".to_string()]);
    }

    #[test]
    fn test_ancient_dates() {
        let mut values = daily(20);
        values.push("1850-03-01".to_string());
        let finding = column_finding("DATE_ANCIENT", &refs(&values));
        assert_eq!(finding.severity, Severity::High);
    }

    // ==================== sequence tests ====================

    #[test]
    fn test_sequence_gap_detected() {
        let mut values = daily(20);
        values.push("2024-03-15".to_string());
        let finding = column_finding("DATE_SEQUENCE_GAPS", &refs(&values));
        assert_eq!(finding.value, Some(1.0));
        assert_eq!(finding.severity, Severity::Low);
    }

    #[test]
    fn test_regular_sequence_has_no_gaps() {
        let values = daily(28);
        let finding = column_finding("DATE_SEQUENCE_GAPS", &refs(&values));
        assert_eq!(finding.severity, Severity::Pass);
    }

    #[test]
    fn test_duplicates_and_monotonicity() {
        let mut values = daily(20);
        values.push("2024-01-03".to_string());
        let duplicates = column_finding("DATE_DUPLICATES", &refs(&values));
        assert_eq!(duplicates.severity, Severity::Info);
        assert_eq!(duplicates.affected_count, 1);

        let monotonic = column_finding("DATE_MONOTONICITY", &refs(&values));
        assert_eq!(monotonic.severity, Severity::Info);
        assert_eq!(monotonic.metadata["reversals"], 1);

        let ordered = column_finding("DATE_MONOTONICITY", &refs(&daily(20)));
        assert_eq!(ordered.severity, Severity::Pass);
    }
}
