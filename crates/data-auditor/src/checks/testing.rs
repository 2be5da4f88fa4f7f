//! Helpers that run a single built-in check against in-memory columns.

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::OnceCell;

use super::{CheckContext, DatasetContext, TimeIndex};
use crate::config::AuditConfig;
use crate::profiler::{Classification, ColumnProfile, Dataset, TypeClassifier};
use crate::registry::{CheckKind, CheckRegistry, ResolvedCheck};
use crate::types::Finding;

pub(crate) fn reference_time() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap()
}

fn resolve(id: &str) -> ResolvedCheck<'static> {
    CheckRegistry::builtin()
        .resolve_check(id, &AuditConfig::default())
        .unwrap_or_else(|| panic!("unknown check {}", id))
}

fn dataset_of<'s, S: AsRef<[&'s str]>>(columns: &[(&str, S)]) -> (Dataset, Vec<Classification>) {
    let profiles = columns
        .iter()
        .map(|(name, values)| {
            ColumnProfile::from_raw(*name, values.as_ref().iter().map(|v| v.to_string()).collect())
        })
        .collect();
    let dataset = Dataset::new(profiles).unwrap();
    let classifier = TypeClassifier::default();
    let classifications = dataset.columns().iter().map(|p| classifier.classify(p)).collect();
    (dataset, classifications)
}

/// Run column check `id` on `column` of a multi-column dataset.
pub(crate) fn column_finding_in<'s, S: AsRef<[&'s str]>>(
    id: &str,
    column: &str,
    columns: &[(&str, S)],
) -> Finding {
    let (dataset, classifications) = dataset_of(columns);
    let check = resolve(id);
    let position = dataset
        .columns()
        .iter()
        .position(|c| c.name() == column)
        .unwrap_or_else(|| panic!("no column {}", column));
    let profile = &dataset.columns()[position];
    let gate = OnceCell::new();
    let ctx = CheckContext {
        profile,
        full_profile: profile,
        classification: &classifications[position],
        check: &check,
        dataset: &dataset,
        classifications: &classifications,
        gate: &gate,
        reference_time: reference_time(),
        seed: 42,
    };
    match check.definition.kind {
        CheckKind::Column(run) => run(&ctx).unwrap(),
        CheckKind::Dataset(_) => panic!("{} is a dataset check", id),
    }
}

/// Run column check `id` on a single column named `col`.
pub(crate) fn column_finding(id: &str, values: &[&str]) -> Finding {
    column_finding_in(id, "col", &[("col", values)])
}

pub(crate) fn numeric_finding(id: &str, values: &[f64]) -> Finding {
    let text: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    let refs: Vec<&str> = text.iter().map(|s| s.as_str()).collect();
    column_finding(id, &refs)
}

/// Run dataset check `id`; the time column is inferred.
pub(crate) fn dataset_finding<'s, S: AsRef<[&'s str]>>(
    id: &str,
    columns: &[(&str, S)],
) -> Vec<Finding> {
    let (dataset, classifications) = dataset_of(columns);
    let check = resolve(id);
    let time_index = TimeIndex::build(&dataset, &classifications, None).unwrap();
    let ctx = DatasetContext {
        dataset: &dataset,
        classifications: &classifications,
        check: &check,
        time_index: time_index.as_ref(),
        seed: 42,
    };
    match check.definition.kind {
        CheckKind::Dataset(run) => run(&ctx).unwrap(),
        CheckKind::Column(_) => panic!("{} is a column check", id),
    }
}
