//! Checks for CATEGORICAL and BOOLEAN columns.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::json;

use super::{CheckContext, pct, share};
use crate::error::CheckResult;
use crate::stats::association::contingency_test;
use crate::types::Finding;
use crate::utils::is_null_raw;

/// Categories considered by the pairwise typo scan.
const TYPO_MAX_CATEGORIES: usize = 200;

/// Categories whose share falls below `rare_share`.
pub fn rare_categories(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    let rare_share = ctx.param("rare_share")?;
    let total = ctx.profile.stats().non_null_count;
    let rare: Vec<(&str, usize)> = ctx
        .profile
        .value_counts()
        .iter()
        .filter(|(_, count)| share(*count, total) < rare_share)
        .map(|(value, count)| (value.as_str(), *count))
        .collect();
    let affected: usize = rare.iter().map(|(_, c)| c).sum();

    Ok(ctx
        .graded(
            rare.len() as f64,
            format!("{} categories below {} of values", rare.len(), pct(rare_share)),
        )
        .with_affected(affected, total)
        .with_samples(rare.iter().rev().map(|(v, _)| *v))
        .with_meta("rare_share", rare_share))
}

/// Distinct count, and how it differs between the two halves of the rows.
pub fn cardinality_change(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    let values: Vec<&str> = ctx.profile.non_null_values().collect();
    if values.is_empty() {
        return Ok(ctx.pass("no values"));
    }
    let (first, second) = values.split_at(values.len() / 2);
    let first: BTreeSet<&str> = first.iter().copied().collect();
    let second: BTreeSet<&str> = second.iter().copied().collect();
    let appeared: Vec<&str> = second.difference(&first).copied().collect();
    let disappeared: Vec<&str> = first.difference(&second).copied().collect();
    let distinct = ctx.profile.stats().distinct_count;

    Ok(ctx
        .info(format!(
            "{} distinct categories ({} in first half, {} in second)",
            distinct,
            first.len(),
            second.len()
        ))
        .with_value(distinct as f64)
        .with_samples(appeared.iter().chain(disappeared.iter()))
        .with_meta("first_half_distinct", first.len())
        .with_meta("second_half_distinct", second.len())
        .with_meta("appeared", appeared)
        .with_meta("disappeared", disappeared))
}

/// Groups of distinct values that differ only by letter case.
pub fn case_inconsistency(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    let mut groups: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for (value, _) in ctx.profile.value_counts() {
        groups.entry(value.to_lowercase()).or_default().push(value);
    }
    let inconsistent: Vec<String> = groups
        .values()
        .filter(|variants| variants.len() > 1)
        .map(|variants| variants.join(" / "))
        .collect();

    Ok(ctx
        .graded(
            inconsistent.len() as f64,
            format!("{} values appear with inconsistent casing", inconsistent.len()),
        )
        .with_samples(inconsistent.iter()))
}

/// Share held by the most frequent class.
pub fn class_imbalance(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    let total = ctx.profile.stats().non_null_count;
    let Some((top, count)) = ctx.profile.top_value() else {
        return Ok(ctx.pass("no values"));
    };
    let top_share = share(count, total);
    Ok(ctx
        .graded(top_share, format!("majority class '{}' holds {}", top, pct(top_share)))
        .with_affected(count, total)
        .with_meta("majority_class", top)
        .with_meta("classes", ctx.profile.stats().distinct_count))
}

/// Edit distance over chars.
pub(crate) fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];
    for i in 1..=a.len() {
        current[0] = i;
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            current[j] = (previous[j] + 1)
                .min(current[j - 1] + 1)
                .min(previous[j - 1] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

/// `1 - distance / longer length`.
pub(crate) fn similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / longest as f64
}

/// Pairs of frequent categories that are near-identical strings.
pub fn typo_candidates(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    let threshold = ctx.param("similarity_threshold")?;
    let categories: Vec<(&str, usize)> = ctx
        .profile
        .value_counts()
        .iter()
        .filter(|(_, count)| *count > 1)
        .take(TYPO_MAX_CATEGORIES)
        .map(|(value, count)| (value.as_str(), *count))
        .collect();

    let mut pairs = Vec::new();
    for (i, (a, count_a)) in categories.iter().enumerate() {
        for (b, count_b) in &categories[i + 1..] {
            if a.to_lowercase() == b.to_lowercase() {
                continue;
            }
            let score = similarity(a, b);
            if score > threshold {
                pairs.push((*a, *count_a, *b, *count_b, score));
            }
        }
    }

    Ok(ctx
        .graded(pairs.len() as f64, format!("{} possible typo pairs", pairs.len()))
        .with_threshold(threshold)
        .with_samples(pairs.iter().map(|(a, _, b, _, _)| format!("{} ~ {}", a, b)))
        .with_meta(
            "pairs",
            pairs
                .iter()
                .map(|(a, ca, b, cb, s)| {
                    json!({"a": a, "a_count": ca, "b": b, "b_count": cb, "similarity": s})
                })
                .collect::<Vec<_>>(),
        )
        .with_meta("categories_compared", categories.len()))
}

/// Chi-square independence against every other categorical column.
pub fn chi2_independence(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    let alpha = ctx.param("alpha")?;
    let min_v = ctx.param("min_cramers_v")?;
    let own = ctx.full_profile.raw();

    let mut associated = Vec::new();
    let mut tested = 0;
    for (other, classification) in ctx.other_columns() {
        if !classification.semantic_type.is_categorical() {
            continue;
        }
        let pairs = own
            .iter()
            .zip(other.raw().iter())
            .map(|(a, b)| (a.trim(), b.trim()))
            .filter(|(a, b)| !is_null_raw(a) && !is_null_raw(b));
        let Some(table) = contingency_test(pairs) else {
            continue;
        };
        tested += 1;
        if table.p_value < alpha && table.cramers_v > min_v {
            associated.push((other.name(), table));
        }
    }

    if associated.is_empty() {
        return Ok(ctx
            .pass(format!("independent of {} categorical columns", tested))
            .with_meta("columns_tested", tested));
    }
    let names: Vec<&str> = associated.iter().map(|(name, _)| *name).collect();
    Ok(ctx
        .info(format!("associated with {}", names.join(", ")))
        .with_samples(names.iter())
        .with_meta(
            "associations",
            associated
                .iter()
                .map(|(name, t)| {
                    json!({
                        "column": name,
                        "chi2": t.chi2,
                        "p_value": t.p_value,
                        "cramers_v": t.cramers_v,
                        "dof": t.dof,
                    })
                })
                .collect::<Vec<_>>(),
        ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testing::{column_finding, column_finding_in};
    use crate::types::Severity;

    // ==================== similarity tests ====================

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("same", "same"), 0);
        assert_eq!(levenshtein("café", "cafe"), 1);
    }

    #[test]
    fn test_similarity_is_normalized() {
        assert_eq!(similarity("abc", "abc"), 1.0);
        assert!((similarity("California", "Califronia") - 0.8).abs() < 1e-12);
        assert!(similarity("Pennsylvania", "Pensylvania") > 0.9);
    }

    // ==================== check tests ====================

    #[test]
    fn test_typo_candidates_pairs() {
        let mut values = Vec::new();
        for _ in 0..40 {
            values.push("Pennsylvania");
            values.push("New York");
        }
        values.extend(["Pensylvania", "Pensylvania", "new york", "new york"]);
        let finding = column_finding("TYPO_CANDIDATES", &values);
        assert_eq!(finding.severity, Severity::Low);
        assert_eq!(finding.sample_values, vec!["Pennsylvania ~ Pensylvania".to_string()]);
    }

    #[test]
    fn test_case_inconsistency() {
        let mut values = vec!["Red"; 30];
        values.extend(["red"; 3]);
        values.extend(["Blue"; 30]);
        let finding = column_finding("CASE_INCONSISTENCY", &values);
        assert_eq!(finding.value, Some(1.0));
        assert_eq!(finding.severity, Severity::Low);
    }

    #[test]
    fn test_rare_categories() {
        let mut values = vec!["a"; 500];
        values.extend(["b"; 498]);
        values.extend(["c", "d"]);
        let finding = column_finding("RARE_CATEGORIES", &values);
        assert_eq!(finding.value, Some(2.0));
        assert_eq!(finding.severity, Severity::Low);
    }

    #[test]
    fn test_class_imbalance_on_boolean() {
        let mut values = vec!["yes"; 96];
        values.extend(["no"; 4]);
        let finding = column_finding("CLASS_IMBALANCE", &values);
        assert_eq!(finding.severity, Severity::High);
        assert_eq!(finding.metadata["majority_class"], "yes");
    }

    #[test]
    fn test_cardinality_change_reports_new_categories() {
        let mut values = ["a", "b"].repeat(10);
        values.extend(["a", "c"].repeat(10));
        let finding = column_finding("CARDINALITY_CHANGE", &values);
        assert_eq!(finding.severity, Severity::Info);
        assert_eq!(finding.value, Some(3.0));
        assert_eq!(finding.metadata["appeared"], json!(["c"]));
        assert_eq!(finding.metadata["disappeared"], json!(["b"]));
    }

    #[test]
    fn test_chi2_independence_detects_association() {
        let mut region = Vec::new();
        let mut tier = Vec::new();
        for i in 0..120 {
            let r = ["north", "south", "east"][i % 3];
            region.push(r);
            tier.push(match r {
                "north" => "gold",
                "south" => "silver",
                _ => "bronze",
            });
        }
        let finding =
            column_finding_in("CHI2_INDEPENDENCE", "region", &[("region", region), ("tier", tier)]);
        assert_eq!(finding.severity, Severity::Info);
        assert_eq!(finding.sample_values, vec!["tier".to_string()]);
    }
}
