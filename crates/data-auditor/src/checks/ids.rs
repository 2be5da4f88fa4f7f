//! Checks for ID_CANDIDATE columns.

use serde_json::json;

use super::{CheckContext, pct, share};
use crate::error::CheckResult;
use crate::types::{Finding, Severity, round_to};
use crate::utils::value_counts;

/// Repeated identifiers.
pub fn id_duplicates(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    let total = ctx.profile.stats().non_null_count;
    let repeated: Vec<(&str, usize)> = ctx
        .profile
        .value_counts()
        .iter()
        .filter(|(_, count)| *count > 1)
        .map(|(value, count)| (value.as_str(), *count))
        .collect();
    let extra: usize = repeated.iter().map(|(_, count)| count - 1).sum();
    let rate = share(extra, total);
    Ok(ctx
        .graded(rate, format!("{} duplicate identifiers ({})", extra, pct(rate)))
        .with_affected(extra, total)
        .with_samples(repeated.iter().map(|(v, c)| format!("{} (x{})", v, c))))
}

/// Letters become `A`, digits `9`, everything else is kept.
pub(crate) fn shape_mask(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_digit() {
                '9'
            } else if c.is_alphabetic() {
                'A'
            } else {
                c
            }
        })
        .collect()
}

const FORMAT_SAMPLE: usize = 1000;
/// Dominant shape share below which the column is inconsistent.
const CONSISTENT_SHARE: f64 = 0.90;
/// Below this share, with more than [`HIGH_MIN_SHAPES`] shapes, the mix is severe.
const HIGH_SHARE: f64 = 0.80;
const HIGH_MIN_SHAPES: usize = 3;
/// A consistent column with more than this many shapes still gets a note.
const LOW_MIN_SHAPES: usize = 2;

/// Grade the dominant shape share and shape count of identifiers.
fn format_severity(dominant_share: f64, shapes: usize) -> Severity {
    if dominant_share < HIGH_SHARE && shapes > HIGH_MIN_SHAPES {
        Severity::High
    } else if dominant_share < CONSISTENT_SHARE {
        Severity::Medium
    } else if shapes > LOW_MIN_SHAPES {
        Severity::Low
    } else {
        Severity::Pass
    }
}

/// How consistently identifiers follow one shape, over the first values.
pub fn id_format_consistency(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    let values: Vec<&str> = ctx.profile.non_null_values().take(FORMAT_SAMPLE).collect();
    let masks: Vec<String> = values.iter().map(|v| shape_mask(v)).collect();
    let counts = value_counts(masks.iter().map(|m| m.as_str()));
    let Some(&(dominant, dominant_count)) = counts.first() else {
        return Ok(ctx.pass("no values"));
    };

    let dominant_share = share(dominant_count, values.len());
    let severity = format_severity(dominant_share, counts.len());
    let minority: Vec<&str> = match counts.get(1) {
        Some((mask, _)) => values
            .iter()
            .zip(masks.iter())
            .filter(|(_, m)| m.as_str() == *mask)
            .map(|(v, _)| *v)
            .take(3)
            .collect(),
        None => Vec::new(),
    };

    Ok(ctx
        .finding(
            severity,
            format!(
                "{} identifier shapes (dominant '{}' covers {})",
                counts.len(),
                dominant,
                pct(dominant_share)
            ),
        )
        .with_value(round_to(dominant_share, 4))
        .with_threshold(CONSISTENT_SHARE)
        .with_affected(values.len() - dominant_count, values.len())
        .with_samples(minority)
        .with_meta("dominant_shape", dominant)
        .with_meta("shapes", counts.len())
        .with_meta(
            "top_shapes",
            counts
                .iter()
                .take(5)
                .map(|(mask, count)| {
                    let top_share = round_to(share(*count, values.len()), 4);
                    (mask.to_string(), json!(top_share))
                })
                .collect::<serde_json::Map<_, _>>(),
        ))
}

/// Any missing identifier.
pub fn id_null(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    let stats = ctx.profile.stats();
    let rate = share(stats.null_count, stats.row_count);
    Ok(ctx
        .graded(rate, format!("{} identifiers are missing", stats.null_count))
        .with_affected(stats.null_count, stats.row_count))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testing::column_finding;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("ORD-{:05}", i + 10_000)).collect()
    }

    fn refs(values: &[String]) -> Vec<&str> {
        values.iter().map(|s| s.as_str()).collect()
    }

    #[test]
    fn test_shape_mask() {
        assert_eq!(shape_mask("ORD-00123"), "AAA-99999");
        assert_eq!(shape_mask("a1_b2"), "A9_A9");
    }

    #[test]
    fn test_id_duplicates_severity() {
        let mut values = ids(50);
        values.push("ORD-10003".to_string());
        let finding = column_finding("ID_DUPLICATES", &refs(&values));
        assert_eq!(finding.affected_count, 1);
        assert_eq!(finding.severity, Severity::Critical);

        let finding = column_finding("ID_DUPLICATES", &refs(&ids(50)));
        assert_eq!(finding.severity, Severity::Pass);
    }

    #[test]
    fn test_id_format_consistency() {
        let mut values = ids(40);
        values.extend((0..6).map(|i| format!("X{}", 900_000 + i)));
        let finding = column_finding("ID_FORMAT_CONSISTENCY", &refs(&values));
        assert_eq!(finding.severity, Severity::Medium);
        assert_eq!(finding.metadata["dominant_shape"], "AAA-99999");
        assert_eq!(finding.metadata["shapes"], 2);
        assert_eq!(finding.sample_values, vec!["X900000", "X900001", "X900002"]);
    }

    #[test]
    fn test_id_format_consistency_tiers() {
        assert_eq!(format_severity(0.95, 2), Severity::Pass);
        assert_eq!(format_severity(0.90, 2), Severity::Pass);
        assert_eq!(format_severity(0.90, 3), Severity::Low);
        assert_eq!(format_severity(0.89, 2), Severity::Medium);
        assert_eq!(format_severity(0.80, 4), Severity::Medium);
        assert_eq!(format_severity(0.79, 3), Severity::Medium);
        assert_eq!(format_severity(0.79, 4), Severity::High);
    }

    #[test]
    fn test_id_format_consistency_at_ninety_percent_passes() {
        let mut values = ids(45);
        values.extend((0..5).map(|i| format!("X{}", 900_000 + i)));
        let finding = column_finding("ID_FORMAT_CONSISTENCY", &refs(&values));
        assert_eq!(finding.severity, Severity::Pass);
        assert_eq!(finding.value, Some(0.9));
    }

    #[test]
    fn test_id_format_consistency_many_shapes_at_eighty_percent() {
        let mut values = ids(40);
        values.extend((0..4).map(|i| format!("X{}", 900_000 + i)));
        values.extend((0..3).map(|i| format!("{}", 70_000 + i)));
        values.extend((0..3).map(|i| format!("ab-{}", i)));
        let finding = column_finding("ID_FORMAT_CONSISTENCY", &refs(&values));
        assert_eq!(finding.metadata["shapes"], 4);
        assert_eq!(finding.severity, Severity::Medium);

        values.push("ZZ".to_string());
        let finding = column_finding("ID_FORMAT_CONSISTENCY", &refs(&values));
        assert_eq!(finding.severity, Severity::High);
    }

    #[test]
    fn test_id_format_consistency_samples_first_values() {
        let mut values = ids(FORMAT_SAMPLE);
        values.extend((0..200).map(|i| format!("X{}", 900_000 + i)));
        let finding = column_finding("ID_FORMAT_CONSISTENCY", &refs(&values));
        assert_eq!(finding.severity, Severity::Pass);
        assert_eq!(finding.metadata["shapes"], 1);
    }

    #[test]
    fn test_id_null_is_critical() {
        let mut values = ids(40);
        values.push(String::new());
        let finding = column_finding("ID_NULL", &refs(&values));
        assert_eq!(finding.severity, Severity::Critical);
        assert_eq!(finding.affected_count, 1);
    }
}
