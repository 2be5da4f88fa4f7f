//! Semantic type classification.
//!
//! The classifier runs a fixed-order decision list; the first rule that
//! matches wins, so every column gets exactly one [`SemanticType`].
//! Pattern rules (dates, emails, phones, ID tokens) look at a seeded random
//! sample of the column rather than its first rows. When sampling was used,
//! the same rules are replayed on the full column and any disagreement is
//! recorded on the [`Classification`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;
use tracing::debug;

use super::ColumnProfile;
use super::dates::{DATE_FORMATS, detect_format};
use crate::config::AuditConfig;
use crate::pipeline::sampling::seeded_sample_indices;
use crate::types::SemanticType;
use crate::utils::is_numeric_string;

const EMPTY_RATIO: f64 = 0.95;
const PATTERN_MATCH_RATIO: f64 = 0.80;
const DISCRETE_RATIO: f64 = 0.05;
const ID_UNIQUE_RATIO: f64 = 0.85;
const CATEGORICAL_RATIO: f64 = 0.15;
const ID_PATTERN_RATIO: f64 = 0.70;
const MIXED_NUMERIC_RANGE: (f64, f64) = (0.20, 0.80);

/// Tokens accepted as boolean values (compared lowercase).
pub const BOOLEAN_TOKENS: [&str; 14] = [
    "true", "false", "t", "f", "yes", "no", "y", "n", "si", "sí", "1", "0", "verdadero", "falso",
];

pub(crate) static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}$").expect("Invalid regex: email")
});

pub(crate) static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[\d\s\-.()]{7,20}$").expect("Invalid regex: phone"));

// Structured identifier shapes: hex/uuid-like, PREFIX-123, long digit runs, upper alnum codes
static ID_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"^[A-Fa-f0-9\-]{8,}$").expect("Invalid regex: hex id"),
        Regex::new(r"^[A-Z]{1,5}[\-_]\d+$").expect("Invalid regex: prefixed id"),
        Regex::new(r"^\d{5,}$").expect("Invalid regex: numeric id"),
        Regex::new(r"^[A-Z0-9]{6,}$").expect("Invalid regex: code id"),
    ]
});

/// Outcome of classifying one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub column: String,
    pub semantic_type: SemanticType,
    /// Most common date format in the sample (DATE/DATETIME only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dominant_date_format: Option<String>,
    /// Other date formats seen in the sample.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub alternate_date_formats: Vec<String>,
    /// Whether pattern rules ran on a sample instead of the full column.
    pub sampled: bool,
    /// Number of values the pattern rules looked at.
    pub sample_size: usize,
    /// The full column would have been classified differently.
    pub sampling_changed_outcome: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_column_type: Option<SemanticType>,
}

/// Result of the text rules (5-9) over a set of values.
#[derive(Debug, Clone, PartialEq)]
struct TextDecision {
    semantic_type: SemanticType,
    dominant_format: Option<&'static str>,
    alternate_formats: Vec<&'static str>,
}

impl TextDecision {
    fn plain(semantic_type: SemanticType) -> Self {
        Self {
            semantic_type,
            dominant_format: None,
            alternate_formats: Vec::new(),
        }
    }
}

/// Assigns one semantic type per column.
#[derive(Debug, Clone)]
pub struct TypeClassifier {
    sample_size: usize,
    seed: u64,
}

impl Default for TypeClassifier {
    fn default() -> Self {
        Self::new(200, 42)
    }
}

impl TypeClassifier {
    pub fn new(sample_size: usize, seed: u64) -> Self {
        Self {
            sample_size: sample_size.max(1),
            seed,
        }
    }

    pub fn from_config(config: &AuditConfig) -> Self {
        Self::new(config.classification_sample_size, config.seed)
    }

    /// Classify a column. Deterministic for identical input and settings.
    pub fn classify(&self, profile: &ColumnProfile) -> Classification {
        let mut classification = Classification {
            column: profile.name().to_string(),
            semantic_type: SemanticType::Mixed,
            dominant_date_format: None,
            alternate_date_formats: Vec::new(),
            sampled: false,
            sample_size: 0,
            sampling_changed_outcome: false,
            full_column_type: None,
        };

        classification.semantic_type = match self.classify_structural(profile) {
            Some(semantic_type) => semantic_type,
            None => {
                let values: Vec<&str> = profile.non_null_values().collect();
                let unique_ratio = profile.stats().distinct_count as f64 / values.len() as f64;

                let sampled = values.len() > self.sample_size;
                let sample: Vec<&str> = if sampled {
                    seeded_sample_indices(values.len(), self.sample_size, self.seed)
                        .into_iter()
                        .map(|i| values[i])
                        .collect()
                } else {
                    values.clone()
                };

                let decision = decide_text(&sample, unique_ratio);
                classification.sampled = sampled;
                classification.sample_size = sample.len();
                classification.dominant_date_format = decision.dominant_format.map(str::to_string);
                classification.alternate_date_formats = decision
                    .alternate_formats
                    .iter()
                    .map(|f| f.to_string())
                    .collect();

                if sampled {
                    let full = decide_text(&values, unique_ratio);
                    if full.semantic_type != decision.semantic_type {
                        classification.sampling_changed_outcome = true;
                        classification.full_column_type = Some(full.semantic_type);
                    }
                }
                decision.semantic_type
            }
        };

        debug!(
            "Classified column '{}' as {} (sampled: {})",
            profile.name(),
            classification.semantic_type,
            classification.sampled
        );
        classification
    }

    /// Rules 1-4, which depend only on profile statistics and the typed view.
    fn classify_structural(&self, profile: &ColumnProfile) -> Option<SemanticType> {
        let stats = profile.stats();

        // Rule 1
        if stats.row_count == 0
            || stats.non_null_count == 0
            || profile.null_ratio() >= EMPTY_RATIO
        {
            return Some(SemanticType::Empty);
        }

        // Rule 2
        if stats.distinct_count == 1 {
            return Some(SemanticType::Constant);
        }

        // Rule 3
        if stats.distinct_count == 2
            && profile
                .value_counts()
                .iter()
                .all(|(value, _)| is_boolean_token(value))
        {
            return Some(SemanticType::Boolean);
        }

        // Rule 4
        if profile.is_numeric() {
            let ratio = stats.distinct_count as f64 / stats.non_null_count as f64;
            return Some(if ratio < DISCRETE_RATIO {
                SemanticType::NumericDiscrete
            } else {
                SemanticType::NumericContinuous
            });
        }

        None
    }
}

pub fn is_boolean_token(value: &str) -> bool {
    let lower = value.trim().to_lowercase();
    BOOLEAN_TOKENS.contains(&lower.as_str())
}

/// Rules 5-9 for text columns.
fn decide_text(values: &[&str], unique_ratio: f64) -> TextDecision {
    if values.is_empty() {
        return TextDecision::plain(SemanticType::Mixed);
    }
    let total = values.len() as f64;

    // Rule 5: dates
    let mut format_counts: HashMap<&'static str, usize> = HashMap::new();
    let mut parsed = 0usize;
    for value in values {
        if let Some((fmt, _)) = detect_format(value) {
            parsed += 1;
            *format_counts.entry(fmt.pattern).or_insert(0) += 1;
        }
    }
    if parsed as f64 / total > PATTERN_MATCH_RATIO {
        // Ties go to the format listed first.
        let mut ordered: Vec<(usize, &'static str, bool)> = DATE_FORMATS
            .iter()
            .enumerate()
            .filter(|(_, fmt)| format_counts.contains_key(fmt.pattern))
            .map(|(idx, fmt)| (idx, fmt.pattern, fmt.has_time))
            .collect();
        ordered.sort_by(|a, b| format_counts[b.1].cmp(&format_counts[a.1]).then(a.0.cmp(&b.0)));

        if let Some(&(_, dominant, has_time)) = ordered.first() {
            return TextDecision {
                semantic_type: if has_time {
                    SemanticType::Datetime
                } else {
                    SemanticType::Date
                },
                dominant_format: Some(dominant),
                alternate_formats: ordered.iter().skip(1).map(|(_, p, _)| *p).collect(),
            };
        }
    }

    // Rule 6: emails
    if ratio_matching(values, |v| EMAIL_RE.is_match(v)) > PATTERN_MATCH_RATIO {
        return TextDecision::plain(SemanticType::Email);
    }

    // Rule 7: phones
    if ratio_matching(values, |v| PHONE_RE.is_match(v)) > PATTERN_MATCH_RATIO {
        return TextDecision::plain(SemanticType::Phone);
    }

    // Rule 9 guard: a substantial but partial share of numbers means the
    // column has no single coherent type.
    let numeric_share = ratio_matching(values, is_numeric_string);
    if numeric_share >= MIXED_NUMERIC_RANGE.0 && numeric_share <= MIXED_NUMERIC_RANGE.1 {
        return TextDecision::plain(SemanticType::Mixed);
    }

    // Rule 8: cardinality
    if unique_ratio > ID_UNIQUE_RATIO {
        let structured = ID_PATTERNS
            .iter()
            .any(|re| ratio_matching(values, |v| re.is_match(v)) > ID_PATTERN_RATIO);
        return TextDecision::plain(if structured {
            SemanticType::IdCandidate
        } else {
            SemanticType::HighCardinality
        });
    }
    if unique_ratio < CATEGORICAL_RATIO {
        return TextDecision::plain(SemanticType::Categorical);
    }
    TextDecision::plain(SemanticType::HighCardinality)
}

fn ratio_matching<F>(values: &[&str], predicate: F) -> f64
where
    F: Fn(&str) -> bool,
{
    if values.is_empty() {
        return 0.0;
    }
    values.iter().filter(|&&v| predicate(v)).count() as f64 / values.len() as f64
}
