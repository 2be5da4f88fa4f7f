//! Dataset-wide checks relating pairs or groups of columns.

use serde_json::json;

use super::DatasetContext;
use crate::error::CheckResult;
use crate::profiler::ColumnProfile;
use crate::profiler::type_inference::is_boolean_token;
use crate::stats::association::{contingency_test, pearson, variance_inflation};
use crate::types::{DATASET_COLUMN, Finding, SemanticType, Severity};
use crate::utils::is_null_raw;

/// Numeric columns considered for pairwise and VIF analysis.
const MAX_NUMERIC_COLUMNS: usize = 50;
const MIN_PAIRED_ROWS: usize = 10;

const TRUTHY: [&str; 8] = ["true", "t", "yes", "y", "si", "sí", "1", "verdadero"];

/// Rows where both columns hold a number.
fn paired(a: &ColumnProfile, b: &ColumnProfile) -> (Vec<f64>, Vec<f64>) {
    let rows = a.len().min(b.len());
    (0..rows)
        .filter_map(|row| Some((a.numeric_at(row)?, b.numeric_at(row)?)))
        .unzip()
}

fn pair_label(a: &str, b: &str) -> String {
    format!("{} ~ {}", a, b)
}

/// Pearson |r| above the lowest table tier for every numeric pair.
pub fn high_correlation(ctx: &DatasetContext<'_>) -> CheckResult<Vec<Finding>> {
    let columns: Vec<&ColumnProfile> = ctx
        .numeric_columns()
        .into_iter()
        .take(MAX_NUMERIC_COLUMNS)
        .collect();
    let mut findings = Vec::new();
    let mut tested = 0;

    for (i, a) in columns.iter().enumerate() {
        for b in &columns[i + 1..] {
            let (x, y) = paired(a, b);
            if x.len() < MIN_PAIRED_ROWS {
                continue;
            }
            let Some(outcome) = pearson(&x, &y) else {
                continue;
            };
            tested += 1;
            let r = outcome.statistic;
            let finding = ctx.graded(
                DATASET_COLUMN,
                r.abs(),
                format!("{} and {} are highly correlated (r={:.3})", a.name(), b.name(), r),
            );
            if finding.passed {
                continue;
            }
            findings.push(
                finding
                    .with_samples([pair_label(a.name(), b.name())])
                    .with_meta("columns", json!([a.name(), b.name()]))
                    .with_meta("r", r)
                    .with_meta("p_value", outcome.p_value)
                    .with_meta("n", x.len()),
            );
        }
    }

    if findings.is_empty() {
        findings.push(
            ctx.pass(format!("no highly correlated pairs among {} tested", tested))
                .with_meta("pairs_tested", tested),
        );
    }
    Ok(findings)
}

/// Variance inflation factor per numeric column over complete rows.
pub fn multicollinearity_vif(ctx: &DatasetContext<'_>) -> CheckResult<Vec<Finding>> {
    let columns: Vec<&ColumnProfile> = ctx
        .numeric_columns()
        .into_iter()
        .filter(|c| c.stats().distinct_count > 1)
        .take(MAX_NUMERIC_COLUMNS)
        .collect();
    if columns.len() < 3 {
        return Ok(vec![ctx.pass(format!("{} numeric columns, need 3", columns.len()))]);
    }

    let rows = ctx.dataset.row_count();
    let mut matrix: Vec<Vec<f64>> = vec![Vec::new(); columns.len()];
    for row in 0..rows {
        let values: Option<Vec<f64>> = columns.iter().map(|c| c.numeric_at(row)).collect();
        if let Some(values) = values {
            for (column, value) in matrix.iter_mut().zip(values) {
                column.push(value);
            }
        }
    }
    let complete = matrix.first().map_or(0, Vec::len);
    if complete <= columns.len() + 1 {
        return Ok(vec![ctx.pass(format!("{} complete rows is too few", complete))]);
    }

    let Some(factors) = variance_inflation(&matrix) else {
        let names: Vec<&str> = columns.iter().map(|c| c.name()).collect();
        return Ok(vec![
            ctx.finding(DATASET_COLUMN, Severity::High, "numeric columns are perfectly collinear")
                .with_samples(names.iter())
                .with_meta("singular", true),
        ]);
    };

    let findings: Vec<Finding> = columns
        .iter()
        .zip(factors)
        .map(|(column, vif)| {
            ctx.graded(column.name(), vif, format!("VIF {:.2}", vif))
                .with_meta("complete_rows", complete)
        })
        .filter(|f| !f.passed)
        .collect();
    if findings.is_empty() {
        return Ok(vec![ctx.pass(format!("no multicollinearity among {} columns", columns.len()))]);
    }
    Ok(findings)
}

/// Cramér's V between every pair of categorical columns.
pub fn categorical_association(ctx: &DatasetContext<'_>) -> CheckResult<Vec<Finding>> {
    let alpha = ctx.param("alpha")?;
    let min_v = ctx.param("min_cramers_v")?;
    let columns = ctx.columns_where(|t| t.is_categorical());
    let mut findings = Vec::new();

    for (i, (a, _)) in columns.iter().enumerate() {
        for (b, _) in &columns[i + 1..] {
            let pairs = a
                .raw()
                .iter()
                .zip(b.raw().iter())
                .map(|(x, y)| (x.trim(), y.trim()))
                .filter(|(x, y)| !is_null_raw(x) && !is_null_raw(y));
            let Some(table) = contingency_test(pairs) else {
                continue;
            };
            if table.p_value < alpha && table.cramers_v > min_v {
                findings.push(
                    ctx.finding(
                        DATASET_COLUMN,
                        Severity::Medium,
                        format!(
                            "{} and {} are strongly associated (V={:.3})",
                            a.name(),
                            b.name(),
                            table.cramers_v
                        ),
                    )
                    .with_value(table.cramers_v)
                    .with_threshold(min_v)
                    .with_samples([pair_label(a.name(), b.name())])
                    .with_meta("columns", json!([a.name(), b.name()]))
                    .with_meta("chi2", table.chi2)
                    .with_meta("p_value", table.p_value)
                    .with_meta("dof", table.dof),
                );
            }
        }
    }
    if findings.is_empty() {
        findings.push(ctx.pass("no strongly associated categorical pairs"));
    }
    Ok(findings)
}

fn boolean_indicator(value: &str) -> f64 {
    if TRUTHY.contains(&value.trim().to_lowercase().as_str()) { 1.0 } else { 0.0 }
}

/// Point-biserial correlation between boolean and numeric columns.
pub fn point_biserial(ctx: &DatasetContext<'_>) -> CheckResult<Vec<Finding>> {
    let alpha = ctx.param("alpha")?;
    let min_r = ctx.param("min_abs_r")?;
    let flags = ctx.columns_where(|t| t == SemanticType::Boolean);
    let numbers = ctx.numeric_columns();
    let mut findings = Vec::new();

    for (flag, _) in &flags {
        for number in &numbers {
            let (x, y): (Vec<f64>, Vec<f64>) = flag
                .raw()
                .iter()
                .enumerate()
                .filter(|(_, v)| !is_null_raw(v) && is_boolean_token(v))
                .filter_map(|(row, v)| Some((boolean_indicator(v), number.numeric_at(row)?)))
                .unzip();
            if x.len() < MIN_PAIRED_ROWS {
                continue;
            }
            let Some(outcome) = pearson(&x, &y) else {
                continue;
            };
            if outcome.statistic.abs() > min_r && outcome.is_significant(alpha) {
                findings.push(
                    Finding::info(
                        ctx.id(),
                        number.name(),
                        format!(
                            "{} separates {} (r={:.3})",
                            flag.name(),
                            number.name(),
                            outcome.statistic
                        ),
                    )
                    .with_value(outcome.statistic)
                    .with_threshold(min_r)
                    .with_samples([flag.name()])
                    .with_meta("boolean_column", flag.name())
                    .with_meta("p_value", outcome.p_value),
                );
            }
        }
    }
    if findings.is_empty() {
        findings.push(ctx.pass("no boolean column separates a numeric column"));
    }
    Ok(findings)
}

#[cfg(test)]
mod tests {
    use crate::checks::testing::dataset_finding;
    use crate::types::{DATASET_COLUMN, Severity};

    fn numbers(values: impl Iterator<Item = f64>) -> Vec<String> {
        values.map(|v| format!("{}", v)).collect()
    }

    fn refs(values: &[String]) -> Vec<&str> {
        values.iter().map(|s| s.as_str()).collect()
    }

    #[test]
    fn test_high_correlation_pair() {
        let a = numbers((0..50).map(|i| i as f64));
        let b = numbers((0..50).map(|i| i as f64 * 2.0 + if i % 2 == 0 { 0.5 } else { -0.5 }));
        let c = numbers((0..50).map(|i| ((i * 37) % 50) as f64));
        let findings = dataset_finding(
            "HIGH_CORRELATION",
            &[("a", refs(&a)), ("b", refs(&b)), ("c", refs(&c))],
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::High);
        assert_eq!(findings[0].column, DATASET_COLUMN);
        assert_eq!(findings[0].sample_values, vec!["a ~ b".to_string()]);
    }

    #[test]
    fn test_vif_flags_collinear_columns() {
        let a = numbers((0..60).map(|i| i as f64));
        let b = numbers((0..60).map(|i| ((i * 7) % 60) as f64));
        let c = numbers(
            (0..60).map(|i| i as f64 + ((i * 7) % 60) as f64 + if i % 3 == 0 { 1.0 } else { 0.0 }),
        );
        let findings = dataset_finding(
            "MULTICOLLINEARITY_VIF",
            &[("a", refs(&a)), ("b", refs(&b)), ("c", refs(&c))],
        );
        assert!(findings.iter().any(|f| f.column == "c" && f.severity == Severity::High));
    }

    #[test]
    fn test_point_biserial() {
        let flag: Vec<&str> = (0..40).map(|i| if i % 2 == 0 { "yes" } else { "no" }).collect();
        let amount = numbers(
            (0..40).map(|i| if i % 2 == 0 { 100.0 + i as f64 } else { 10.0 + i as f64 }),
        );
        let findings =
            dataset_finding("POINT_BISERIAL", &[("vip", flag), ("amount", refs(&amount))]);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].column, "amount");
        assert_eq!(findings[0].severity, Severity::Info);
    }

    #[test]
    fn test_categorical_association() {
        let region: Vec<&str> = (0..90).map(|i| ["n", "s", "e"][i % 3]).collect();
        let zone: Vec<&str> = (0..90).map(|i| ["z1", "z2", "z3"][i % 3]).collect();
        let findings =
            dataset_finding("CATEGORICAL_ASSOCIATION", &[("region", region), ("zone", zone)]);
        assert_eq!(findings[0].severity, Severity::Medium);
    }
}
