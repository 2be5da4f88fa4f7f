//! CLI entry point for the data quality auditor.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use data_auditor::utils::truncate_str;
use data_auditor::{AuditConfig, AuditReport, Auditor, Severity, load_csv};
use std::path::Path;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Schema-free data quality auditor",
    long_about = "Classifies every column of a CSV file, runs the statistical checks that fit \
                  each column type and grades the result.\n\n\
                  EXIT CODES:\n  \
                  0  no issues\n  \
                  1  issues found\n  \
                  2  critical issues found\n\n\
                  EXAMPLES:\n  \
                  # Human-readable summary\n  \
                  data-auditor -i orders.csv\n\n  \
                  # JSON report with a pinned time column\n  \
                  data-auditor -i orders.csv --time-column created_at --json\n\n  \
                  # Skip checks\n  \
                  data-auditor -i orders.csv --disable BENFORD_LAW --disable PII_DETECTED"
)]
struct Args {
    /// Path to the CSV file to audit
    #[arg(short, long)]
    input: String,

    /// JSON file with configuration overrides
    #[arg(short, long)]
    config: Option<String>,

    /// Output the JSON report to stdout instead of a summary
    ///
    /// Disables all logs so stdout only holds the report.
    #[arg(long)]
    json: bool,

    /// Column ordering rows in time (defaults to the first date column)
    #[arg(long)]
    time_column: Option<String>,

    /// Check identifier to skip (repeatable)
    #[arg(long = "disable", value_name = "CHECK")]
    disabled: Vec<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Only log warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

/// Initialize the tracing subscriber. `RUST_LOG` wins over `--log-level`;
/// nothing is logged under `--json`.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn build_config(args: &Args) -> Result<AuditConfig> {
    let mut config = match &args.config {
        Some(path) => AuditConfig::from_json_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path))?,
        None => AuditConfig::default(),
    };
    if let Some(column) = &args.time_column {
        config.time_column = Some(column.clone());
    }
    config.disabled_checks.extend(args.disabled.iter().cloned());
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level, args.quiet, args.json);

    if !Path::new(&args.input).exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }

    let config = build_config(&args)?;
    let auditor = Auditor::builder().config(config).build()?;
    let dataset = load_csv(&args.input)?;
    let report = auditor.audit(&dataset)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&args.input, &report);
    }

    let code = report.exit_code();
    info!("Exiting with code {}", code);
    std::process::exit(code);
}

/// Human-readable summary.
///
/// Uses `println!` on purpose: this is the command's output, not a log.
fn print_summary(input: &str, report: &AuditReport) {
    println!("\n{}", "=".repeat(80));
    println!("DATA QUALITY AUDIT");
    println!("{}", "=".repeat(80));
    println!("  File: {}", input);
    println!("  Rows: {}", report.row_count);
    println!("  Columns: {}", report.column_count);
    if let Some(column) = &report.time_column {
        println!("  Time column: {}", column);
    }
    println!(
        "  Score: {:.1} ({})",
        report.dataset_score.score, report.dataset_score.grade
    );
    println!();

    println!("COLUMNS");
    println!("{}", "-".repeat(40));
    println!(
        "{:<24} {:<20} {:>7} {:>6} {:>7}",
        "Column", "Type", "Score", "Grade", "Issues"
    );
    println!("{}", "-".repeat(68));
    for classification in &report.classifications {
        let Some(score) = report.column_scores.get(&classification.column) else {
            continue;
        };
        println!(
            "{:<24} {:<20} {:>7.1} {:>6} {:>7}",
            truncate_str(&classification.column, 23),
            classification.semantic_type.as_str(),
            score.score,
            score.grade.to_string(),
            score.checks_failed
        );
    }
    println!();

    println!("ISSUES");
    println!("{}", "-".repeat(40));
    let mut issues: Vec<_> = report.issues().collect();
    if issues.is_empty() {
        println!("  No issues found");
    } else {
        issues.sort_by(|a, b| b.severity.cmp(&a.severity));
        for finding in issues {
            println!(
                "  [{:<8}] {:<20} {:<24} {}",
                finding.severity.as_str(),
                truncate_str(&finding.column, 20),
                finding.check_id,
                truncate_str(&finding.message, 80)
            );
        }
    }
    println!();

    let counts: Vec<String> = Severity::DESCENDING
        .iter()
        .filter_map(|severity| {
            report
                .dataset_score
                .issues_by_severity
                .get(severity)
                .map(|count| format!("{} {}", count, severity))
        })
        .collect();
    if !counts.is_empty() {
        println!("  {}", counts.join(", "));
    }
    println!("Use --json for machine-readable output");
    println!("{}", "=".repeat(80));
}
