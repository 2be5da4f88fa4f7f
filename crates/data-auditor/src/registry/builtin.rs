//! Built-in check definitions.
//!
//! Registration order is the order checks run in for a column. Threshold
//! tables read most to least severe.

use super::{ANY, CheckDefinition, CheckKind, CheckScope, ColumnCheckFn, DatasetCheckFn};
use crate::checks::{
    benford, categorical, cross_column, dates, hypothesis, ids, null_patterns, numeric, pii,
    temporal, text, universal,
};
use crate::types::SemanticType::{self, *};
use crate::types::Severity::{self, Critical, High, Info, Low, Medium};

const ALL: &[SemanticType] = &SemanticType::ALL;
const NUMERIC: &[SemanticType] = &[NumericDiscrete, NumericContinuous];
const TEMPORAL: &[SemanticType] = &[Date, Datetime];
const CATEGORICAL: &[SemanticType] = &[Categorical, Boolean];
const FREE_TEXT: &[SemanticType] = &[HighCardinality, Email, Phone];
const ENCODED_TEXT: &[SemanticType] = &[Categorical, Boolean, HighCardinality, Email, Phone];

const NULL_TABLE: &[(f64, Severity)] = &[(0.5, Critical), (0.2, High), (0.05, Medium), (0.01, Low)];
const OUTLIER_Z_TABLE: &[(f64, Severity)] = &[(0.05, Critical), (0.02, High), (0.01, Medium)];
const INVALID_SHARE_TABLE: &[(f64, Severity)] = &[(0.2, High), (0.05, Medium), (ANY, Low)];
const ALPHA: &[(&str, f64)] = &[("alpha", 0.05)];

fn column(
    id: &'static str,
    title: &'static str,
    types: &'static [SemanticType],
    run: ColumnCheckFn,
) -> CheckDefinition {
    CheckDefinition {
        id,
        title,
        scope: CheckScope::Types(types),
        kind: CheckKind::Column(run),
        costly: false,
        thresholds: &[],
        params: &[],
    }
}

fn dataset(id: &'static str, title: &'static str, run: DatasetCheckFn) -> CheckDefinition {
    CheckDefinition {
        id,
        title,
        scope: CheckScope::Dataset,
        kind: CheckKind::Dataset(run),
        costly: false,
        thresholds: &[],
        params: &[],
    }
}

impl CheckDefinition {
    fn thresholds(mut self, thresholds: &'static [(f64, Severity)]) -> Self {
        self.thresholds = thresholds;
        self
    }

    fn params(mut self, params: &'static [(&'static str, f64)]) -> Self {
        self.params = params;
        self
    }

    fn costly(mut self) -> Self {
        self.costly = true;
        self
    }
}

pub(super) fn definitions() -> Vec<CheckDefinition> {
    let mut definitions = Vec::new();
    definitions.extend(universal_checks());
    definitions.extend(numeric_checks());
    definitions.extend(date_checks());
    definitions.extend(categorical_checks());
    definitions.extend(text_checks());
    definitions.extend(id_checks());
    definitions.extend(dataset_checks());
    definitions
}

fn universal_checks() -> Vec<CheckDefinition> {
    vec![
        column("NULL_RATE", "Missing values", ALL, universal::null_rate).thresholds(NULL_TABLE),
        column(
            "WHITESPACE_ISSUES",
            "Leading or trailing whitespace",
            ALL,
            universal::whitespace_issues,
        )
        .thresholds(&[(0.1, Medium), (0.01, Low), (ANY, Info)]),
        column("CONSTANT_COLUMN", "Constant column", ALL, universal::constant_column)
            .thresholds(&[(1.0, Low)]),
        column("NEAR_CONSTANT", "Near-constant column", ALL, universal::near_constant)
            .thresholds(&[(0.95, Low)]),
    ]
}

fn numeric_checks() -> Vec<CheckDefinition> {
    vec![
        column("OUTLIER_IQR", "Outliers (IQR fences)", NUMERIC, numeric::outlier_iqr)
            .thresholds(&[(0.10, Critical), (0.05, High), (0.02, Medium), (0.005, Low)])
            .params(&[("multiplier", 1.5)])
            .costly(),
        column("OUTLIER_ZSCORE", "Outliers (z-score)", NUMERIC, numeric::outlier_zscore)
            .thresholds(OUTLIER_Z_TABLE)
            .params(&[("z_threshold", 3.0)])
            .costly(),
        column(
            "OUTLIER_MODIFIED_Z",
            "Outliers (modified z-score)",
            NUMERIC,
            numeric::outlier_modified_z,
        )
        .thresholds(OUTLIER_Z_TABLE)
        .params(&[("threshold", 3.5)])
        .costly(),
        column("DISTRIBUTION_SKEW", "Skewed distribution", NUMERIC, numeric::distribution_skew)
            .thresholds(&[(3.0, High), (2.0, Medium), (1.0, Low)]),
        column("DISTRIBUTION_KURTOSIS", "Heavy tails", NUMERIC, numeric::distribution_kurtosis)
            .thresholds(&[(10.0, High), (5.0, Medium), (3.0, Low)]),
        column("NEGATIVE_VALUES", "Negative values", NUMERIC, numeric::negative_values)
            .thresholds(&[(0.2, Medium), (ANY, Info)]),
        column("ZERO_VALUES", "Zero values", NUMERIC, numeric::zero_values)
            .thresholds(&[(0.3, High), (0.1, Medium)]),
        column("TREND_CHANGE", "Windowed mean deviation", NUMERIC, numeric::trend_change)
            .thresholds(&[(3.0, Critical), (2.5, High), (2.0, Medium)]),
        column("VALUE_RANGE", "Value range", NUMERIC, numeric::value_range),
        column(
            "VARIANCE_SUDDEN_CHANGE",
            "Segment variance ratio",
            NUMERIC,
            numeric::variance_sudden_change,
        )
        .thresholds(&[(5.0, High), (3.0, Medium), (2.0, Low)]),
        column("NORMALITY_TEST", "Normality", NUMERIC, hypothesis::normality_test),
        column(
            "NORMALITY_ANDERSON",
            "Normality (Anderson-Darling)",
            NUMERIC,
            hypothesis::normality_anderson,
        )
        .params(ALPHA),
        column(
            "NORMALITY_LILLIEFORS",
            "Normality (Lilliefors)",
            NUMERIC,
            hypothesis::normality_lilliefors,
        )
        .params(ALPHA),
        column("MEAN_SHIFT", "Mean shift between halves", NUMERIC, hypothesis::mean_shift)
            .params(&[("alpha", 0.05), ("relative_change", 0.2)]),
        column(
            "VARIANCE_SHIFT",
            "Variance shift between halves",
            NUMERIC,
            hypothesis::variance_shift,
        )
        .params(&[("alpha", 0.05), ("ratio", 3.0)]),
        column("WILCOXON_PAIRED", "Paired halves (Wilcoxon)", NUMERIC, hypothesis::wilcoxon_paired)
            .params(ALPHA),
        column("KS_GOODNESS_FIT", "Fit to a normal (KS)", NUMERIC, hypothesis::ks_goodness_fit)
            .params(ALPHA),
        column(
            "KRUSKAL_WALLIS",
            "Differences across groups",
            NUMERIC,
            hypothesis::kruskal_wallis_by_category,
        )
        .params(ALPHA),
        column("BENFORD_LAW", "Leading-digit distribution", NUMERIC, benford::benford_law)
            .thresholds(&[(0.015, Medium), (0.012, Low)]),
    ]
}

fn date_checks() -> Vec<CheckDefinition> {
    vec![
        column("DATE_NULL_RATE", "Missing dates", TEMPORAL, universal::null_rate)
            .thresholds(NULL_TABLE),
        column("DATE_FORMAT_MIX", "Mixed date formats", TEMPORAL, dates::date_format_mix)
            .thresholds(&[(4.0, Critical), (2.0, High)]),
        column("DATE_FUTURE", "Dates in the future", TEMPORAL, dates::date_future)
            .thresholds(&[(0.1, High), (ANY, Medium)]),
        column("DATE_ANCIENT", "Dates before 1900", TEMPORAL, dates::date_ancient)
            .thresholds(&[(ANY, High)]),
        column(
            "DATE_SEQUENCE_GAPS",
            "Gaps in the date sequence",
            TEMPORAL,
            dates::date_sequence_gaps,
        )
        .thresholds(&[(11.0, High), (4.0, Medium), (1.0, Low)]),
        column("DATE_DUPLICATES", "Repeated dates", TEMPORAL, dates::date_duplicates),
        column("DATE_MONOTONICITY", "Date ordering", TEMPORAL, dates::date_monotonicity),
        column("DATE_INVALID_PARSED", "Unparseable dates", TEMPORAL, dates::date_invalid_parsed)
            .thresholds(INVALID_SHARE_TABLE),
    ]
}

fn categorical_checks() -> Vec<CheckDefinition> {
    vec![
        column("RARE_CATEGORIES", "Rare categories", CATEGORICAL, categorical::rare_categories)
            .thresholds(&[(11.0, Medium), (1.0, Low)])
            .params(&[("rare_share", 0.005)]),
        column(
            "CARDINALITY_CHANGE",
            "Category set change",
            &[Categorical, Boolean, HighCardinality],
            categorical::cardinality_change,
        ),
        column("CASE_INCONSISTENCY", "Case variants", CATEGORICAL, categorical::case_inconsistency)
            .thresholds(&[(6.0, Medium), (1.0, Low)]),
        column("ENCODING_ANOMALY", "Encoding problems", ENCODED_TEXT, text::encoding_anomaly)
            .thresholds(&[(0.05, High), (ANY, Medium)]),
        column("CLASS_IMBALANCE", "Class imbalance", CATEGORICAL, categorical::class_imbalance)
            .thresholds(&[(0.95, High), (0.90, Medium)]),
        column("TYPO_CANDIDATES", "Likely typos", CATEGORICAL, categorical::typo_candidates)
            .thresholds(&[(6.0, Medium), (1.0, Low)])
            .params(&[("similarity_threshold", 0.85)])
            .costly(),
        column(
            "CHI2_INDEPENDENCE",
            "Association with other categories",
            CATEGORICAL,
            categorical::chi2_independence,
        )
        .params(&[("alpha", 0.05), ("min_cramers_v", 0.3)]),
    ]
}

fn text_checks() -> Vec<CheckDefinition> {
    vec![
        column("LENGTH_OUTLIERS", "Unusual value lengths", FREE_TEXT, text::length_outliers)
            .params(&[("multiplier", 1.5)])
            .costly(),
        column("NULL_LIKE_STRINGS", "Placeholder values", FREE_TEXT, text::null_like_strings)
            .thresholds(&[(0.1, High), (0.02, Medium), (ANY, Low)]),
        column("TRUNCATION_SIGNS", "Truncated values", FREE_TEXT, text::truncation_signs)
            .thresholds(&[(ANY, Low)])
            .params(&[("max_length_share", 0.1)]),
        column("EMAIL_FORMAT", "Invalid email addresses", &[Email], text::email_format)
            .thresholds(INVALID_SHARE_TABLE),
        column("PHONE_FORMAT", "Invalid phone numbers", &[Phone], text::phone_format)
            .thresholds(INVALID_SHARE_TABLE),
    ]
}

fn id_checks() -> Vec<CheckDefinition> {
    vec![
        column("ID_DUPLICATES", "Duplicate identifiers", &[IdCandidate], ids::id_duplicates)
            .thresholds(&[(0.01, Critical), (ANY, High)]),
        column(
            "ID_FORMAT_CONSISTENCY",
            "Identifier shape",
            &[IdCandidate],
            ids::id_format_consistency,
        ),
        column("ID_NULL", "Missing identifiers", &[IdCandidate], ids::id_null)
            .thresholds(&[(ANY, Critical)]),
    ]
}

fn dataset_checks() -> Vec<CheckDefinition> {
    vec![
        dataset("DUPLICATE_ROWS", "Duplicate rows", universal::duplicate_rows)
            .thresholds(&[(0.1, Critical), (0.05, High), (0.01, Medium)]),
        dataset("HIGH_CORRELATION", "Highly correlated columns", cross_column::high_correlation)
            .thresholds(&[(0.95, High), (0.85, Medium)]),
        dataset("MULTICOLLINEARITY_VIF", "Multicollinearity", cross_column::multicollinearity_vif)
            .thresholds(&[(10.0, High), (5.0, Medium)]),
        dataset(
            "CATEGORICAL_ASSOCIATION",
            "Associated categorical columns",
            cross_column::categorical_association,
        )
        .params(&[("alpha", 0.05), ("min_cramers_v", 0.5)]),
        dataset("POINT_BISERIAL", "Boolean and numeric association", cross_column::point_biserial)
            .params(&[("alpha", 0.05), ("min_abs_r", 0.5)]),
        dataset("NULL_CORRELATION", "Correlated missingness", null_patterns::null_correlation)
            .params(&[("alpha", 0.05), ("min_r", 0.5)]),
        dataset("NULL_ROW_PATTERN", "Mostly empty rows", null_patterns::null_row_pattern)
            .thresholds(&[(0.1, High), (0.05, Medium), (ANY, Low)])
            .params(&[("row_null_share", 0.5)]),
        dataset("MCAR_VIOLATION", "Values depend on missingness", null_patterns::mcar_violation)
            .thresholds(&[(4.0, High), (1.0, Medium)])
            .params(&[("alpha", 0.01)]),
        dataset("PII_DETECTED", "Personal data", pii::pii_detected)
            .params(&[("min_match_pct", 0.0)]),
        dataset("TEMPORAL_DRIFT", "Drift over time", temporal::temporal_drift)
            .params(&[("alpha", 0.05), ("strong_alpha", 0.001)]),
        dataset("TEMPORAL_COMPLETENESS", "Degraded periods", temporal::temporal_completeness)
            .params(&[("factor", 2.0)]),
        dataset(
            "TEMPORAL_NULL_CONCENTRATION",
            "Missingness concentrated in time",
            temporal::temporal_null_concentration,
        )
        .params(&[("factor", 3.0)]),
        dataset("AUTOCORRELATION", "Lag-1 autocorrelation", temporal::autocorrelation_check),
        dataset("SEASONALITY", "Seasonality", temporal::seasonality)
            .params(&[("min_power_share", 0.2)]),
        dataset("CHANGEPOINT_CUSUM", "Change point", temporal::changepoint_cusum)
            .params(&[("sigma_multiplier", 2.0)]),
    ]
}
