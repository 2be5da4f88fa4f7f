//! Integration tests for the data quality auditor.
//!
//! These tests run full audits over polars frames and a CSV fixture.

use data_auditor::checks::CheckContext;
use data_auditor::error::CheckResult;
use data_auditor::registry::{CheckDefinition, CheckKind, CheckScope};
use data_auditor::{
    AuditConfig, AuditReport, Auditor, CheckExecutor, CheckRegistry, DATASET_COLUMN, Dataset,
    Finding, Grade, SemanticType, Severity, TypeClassifier, load_csv,
};
use chrono::NaiveDate;
use polars::prelude::*;
use pretty_assertions::assert_eq;
use std::path::PathBuf;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn pinned_config() -> AuditConfig {
    let now = NaiveDate::from_ymd_opt(2024, 6, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("valid date");
    AuditConfig::builder()
        .reference_time(now)
        .build()
        .expect("valid config")
}

fn audit_orders(config: AuditConfig) -> AuditReport {
    let dataset = load_csv(fixtures_path().join("orders.csv")).expect("Failed to load fixture");
    Auditor::builder()
        .config(config)
        .build()
        .expect("Failed to build auditor")
        .audit(&dataset)
        .expect("Audit should succeed")
}

fn finding<'a>(report: &'a AuditReport, column: &str, check: &str) -> &'a Finding {
    report
        .findings
        .iter()
        .find(|f| f.column == column && f.check_id == check)
        .unwrap_or_else(|| panic!("no {} finding for {}", check, column))
}

fn semantic_type(report: &AuditReport, column: &str) -> SemanticType {
    report
        .classifications
        .iter()
        .find(|c| c.column == column)
        .map(|c| c.semantic_type)
        .unwrap_or_else(|| panic!("no classification for {}", column))
}

fn sample_frame() -> DataFrame {
    let n = 60;
    let ids: Vec<String> = (0..n).map(|i| format!("CUST-{:04}", i)).collect();
    let spend: Vec<f64> = (0..n).map(|i| 100.0 + (i % 13) as f64 * 3.5).collect();
    let segment: Vec<&str> = (0..n).map(|i| ["retail", "wholesale", "online"][i % 3]).collect();
    let active: Vec<&str> = (0..n).map(|i| if i % 4 == 0 { "no" } else { "yes" }).collect();
    df!(
        "customer_id" => ids,
        "spend" => spend,
        "segment" => segment,
        "active" => active,
    )
    .expect("valid frame")
}

// ============================================================================
// CSV fixture
// ============================================================================

#[test]
fn test_fixture_classification() {
    let report = audit_orders(pinned_config());

    assert_eq!(report.row_count, 40);
    assert_eq!(report.column_count, 5);
    assert_eq!(semantic_type(&report, "order_id"), SemanticType::IdCandidate);
    assert_eq!(semantic_type(&report, "customer_email"), SemanticType::Email);
    assert_eq!(semantic_type(&report, "amount"), SemanticType::NumericContinuous);
    assert_eq!(semantic_type(&report, "status"), SemanticType::Categorical);
    assert_eq!(semantic_type(&report, "created_at"), SemanticType::Date);
    assert_eq!(report.time_column.as_deref(), Some("created_at"));
}

#[test]
fn test_fixture_findings() {
    let report = audit_orders(pinned_config());

    let duplicates = finding(&report, "order_id", "ID_DUPLICATES");
    assert_eq!(duplicates.severity, Severity::Critical);
    assert_eq!(duplicates.affected_count, 1);

    let emails = finding(&report, "customer_email", "EMAIL_FORMAT");
    assert_eq!(emails.severity, Severity::Low);
    assert_eq!(emails.affected_count, 1);

    let outliers = finding(&report, "amount", "OUTLIER_IQR");
    assert!(outliers.severity.is_failing());
    assert!(outliers.sample_values.iter().any(|v| v.starts_with("9999")));

    let typos = finding(&report, "status", "TYPO_CANDIDATES");
    assert!(typos.severity.is_failing());
    assert!(typos.sample_values.iter().any(|s| s.contains("shiped")));

    let future = finding(&report, "created_at", "DATE_FUTURE");
    assert_eq!(future.severity, Severity::Medium);

    assert_eq!(report.max_severity(), Severity::Critical);
    assert_eq!(report.exit_code(), 2);
}

#[test]
fn test_fixture_scores() {
    let report = audit_orders(pinned_config());

    assert_eq!(report.column_scores.len(), 6);
    let order_id = &report.column_scores["order_id"];
    assert!(order_id.score <= 75.0);
    assert_eq!(order_id.issues_by_severity[&Severity::Critical], 1);

    let dataset = &report.dataset_score;
    assert_eq!(dataset.columns_scored, 6);
    assert!(dataset.score > 0.0 && dataset.score < 100.0);
    assert_eq!(dataset.grade, Grade::from_score(dataset.score));
    assert_eq!(dataset.total_issues, report.issues().count());
}

#[test]
fn test_disabled_checks_do_not_run() {
    let config = AuditConfig::builder()
        .reference_time(pinned_config().reference_time.expect("pinned"))
        .disable_check("ID_DUPLICATES")
        .disable_check("PII_DETECTED")
        .build()
        .unwrap();
    let report = audit_orders(config);

    assert!(report.findings.iter().all(|f| f.check_id != "ID_DUPLICATES"));
    assert!(report.findings.iter().all(|f| f.check_id != "PII_DETECTED"));
}

#[test]
fn test_threshold_override_changes_severity() {
    let config = AuditConfig::builder()
        .reference_time(pinned_config().reference_time.expect("pinned"))
        .threshold_table(
            "EMAIL_FORMAT",
            data_auditor::ThresholdTable::new(vec![(0.01, Severity::High)]),
        )
        .build()
        .unwrap();
    let report = audit_orders(config);
    assert_eq!(finding(&report, "customer_email", "EMAIL_FORMAT").severity, Severity::High);
}

// ============================================================================
// DataFrame audits
// ============================================================================

#[test]
fn test_audit_dataframe() {
    let auditor = Auditor::builder().config(pinned_config()).build().unwrap();
    let report = auditor.audit_dataframe(&sample_frame()).unwrap();

    assert_eq!(report.row_count, 60);
    assert_eq!(semantic_type(&report, "customer_id"), SemanticType::IdCandidate);
    assert_eq!(semantic_type(&report, "segment"), SemanticType::Categorical);
    assert_eq!(semantic_type(&report, "active"), SemanticType::Boolean);
    assert!(semantic_type(&report, "spend").is_numeric());
    assert!(report.column_scores.contains_key(DATASET_COLUMN));

    // no time column, so temporal checks pass without running
    let drift = finding(&report, DATASET_COLUMN, "TEMPORAL_DRIFT");
    assert_eq!(drift.severity, Severity::Pass);
}

#[test]
fn test_runs_are_deterministic() {
    let auditor = Auditor::builder().config(pinned_config()).build().unwrap();
    let frame = sample_frame();

    let first = serde_json::to_string(&auditor.audit_dataframe(&frame).unwrap()).unwrap();
    let second = serde_json::to_string(&auditor.audit_dataframe(&frame).unwrap()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_findings_are_sorted() {
    let report = audit_orders(pinned_config());
    let keys: Vec<(&str, &str)> = report.findings.iter().map(|f| f.sort_key()).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
}

#[test]
fn test_completeness_weights_dataset_score() {
    let full: Vec<&str> = (0..20).map(|i| ["a", "b"][i % 2]).collect();
    let sparse: Vec<Option<&str>> =
        (0..20).map(|i| if i < 10 { None } else { Some("c") }).collect();
    let frame = df!("full" => full, "sparse" => sparse).unwrap();

    let auditor = Auditor::builder().config(pinned_config()).build().unwrap();
    let report = auditor.audit_dataframe(&frame).unwrap();

    let weights = &report.dataset_score.weights;
    assert_eq!(weights["full"], 1.0);
    assert!((weights["sparse"] - 1.0 / 1.5).abs() < 1e-6);
    assert_eq!(weights[DATASET_COLUMN], 1.0);
}

#[test]
fn test_costly_checks_sample_large_inputs() {
    let n = 3000;
    let values: Vec<f64> = (0..n)
        .map(|i| if i % 50 == 0 { 10_000.0 } else { (i % 97) as f64 })
        .collect();
    let frame = df!("value" => values).unwrap();
    let config = AuditConfig::builder()
        .reference_time(pinned_config().reference_time.expect("pinned"))
        .sampling_row_threshold(1000)
        .sample_size(500)
        .build()
        .unwrap();

    let auditor = Auditor::builder().config(config).build().unwrap();
    let report = auditor.audit_dataframe(&frame).unwrap();
    let iqr = finding(&report, "value", "OUTLIER_IQR");
    assert_eq!(iqr.metadata["sampled"], true);
    assert_eq!(iqr.metadata["sample_size"], 500);

    let skew = finding(&report, "value", "DISTRIBUTION_SKEW");
    assert!(!skew.metadata.contains_key("sampled"));
}

// ============================================================================
// Failure isolation
// ============================================================================

fn panicking_check(_: &CheckContext<'_>) -> CheckResult<Finding> {
    panic!("index out of bounds")
}

fn passing_check(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    Ok(ctx.pass("ok"))
}

#[test]
fn test_one_failing_check_does_not_stop_the_rest() {
    const TEXT: &[SemanticType] = &[SemanticType::Categorical];
    let definition = |id: &'static str, kind| CheckDefinition {
        id,
        title: id,
        scope: CheckScope::Types(TEXT),
        kind,
        costly: false,
        thresholds: &[],
        params: &[],
    };
    let registry = CheckRegistry::from_definitions(vec![
        definition("FIRST", CheckKind::Column(passing_check)),
        definition("BROKEN", CheckKind::Column(panicking_check)),
        definition("LAST", CheckKind::Column(passing_check)),
    ]);

    let mut values: Vec<String> = (0..30).map(|i| ["red", "green"][i % 2].to_string()).collect();
    values[0] = "blue".to_string();
    let dataset =
        Dataset::new(vec![data_auditor::ColumnProfile::from_raw("color", values)]).unwrap();
    let classifications: Vec<_> = dataset
        .columns()
        .iter()
        .map(|c| TypeClassifier::default().classify(c))
        .collect();
    assert_eq!(classifications[0].semantic_type, SemanticType::Categorical);

    let config = pinned_config();
    let executor = CheckExecutor::new(&registry, &config, config.reference_time.expect("pinned"));
    let findings = executor.run_column(&dataset, &classifications, 0);

    let ids: Vec<&str> = findings.iter().map(|f| f.check_id.as_str()).collect();
    assert_eq!(ids, vec!["FIRST", "BROKEN", "LAST"]);
    assert_eq!(findings[1].severity, Severity::Info);
    assert!(findings[1].message.contains("index out of bounds"));
    assert_eq!(findings[1].metadata["error_type"], "Panicked");
}

#[test]
fn test_unknown_time_column_fails_the_run() {
    let config = AuditConfig::builder()
        .reference_time(pinned_config().reference_time.expect("pinned"))
        .time_column("shipped_at")
        .build()
        .unwrap();
    let dataset = load_csv(fixtures_path().join("orders.csv")).unwrap();
    let result = Auditor::builder().config(config).build().unwrap().audit(&dataset);

    let error = result.unwrap_err();
    assert_eq!(error.error_code(), "COLUMN_NOT_FOUND");
    assert!(error.is_recoverable());
}

#[test]
fn test_config_from_json_file() {
    let dir = std::env::temp_dir().join("data_auditor_config_test");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("config.json");
    std::fs::write(
        &path,
        r#"{
            "disabled_checks": ["BENFORD_LAW"],
            "params": {"OUTLIER_ZSCORE": {"z_threshold": 2.5}},
            "severity_overrides": {"ZERO_VALUES": "LOW"},
            "seed": 7
        }"#,
    )
    .unwrap();

    let config = AuditConfig::from_json_file(&path).unwrap();
    assert!(config.is_disabled("BENFORD_LAW"));
    assert_eq!(config.param("OUTLIER_ZSCORE", "z_threshold"), Some(2.5));
    assert_eq!(config.seed, 7);
    assert_eq!(config.classification_sample_size, 200);
    assert!(Auditor::builder().config(config).build().is_ok());
    std::fs::remove_file(&path).ok();
}
