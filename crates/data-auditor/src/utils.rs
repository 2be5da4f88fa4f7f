//! Shared utilities for the auditor.
//!
//! Helpers used across the profiler, the classifier and several check
//! families: dtype categories, null-token handling, numeric string parsing
//! and deterministic value counting.

use polars::prelude::*;
use std::collections::HashMap;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

// =============================================================================
// Null Tokens
// =============================================================================

/// Tokens that stand in for a missing value (compared lowercase, trimmed).
pub const NULL_LIKE_TOKENS: [&str; 13] = [
    "", "null", "none", "nan", "n/a", "na", "-", "--", "?", "missing", "undefined", "#n/a", "nil",
];

/// A raw value is null when it is blank or the literal `nan`.
///
/// This is the narrow definition used by profiling and classification;
/// see [`is_null_like`] for the broader token set used by null-rate checks.
#[inline]
pub fn is_null_raw(value: &str) -> bool {
    let trimmed = value.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan")
}

/// Check if a string is any of the [`NULL_LIKE_TOKENS`].
pub fn is_null_like(value: &str) -> bool {
    let lower = value.trim().to_lowercase();
    NULL_LIKE_TOKENS.iter().any(|&token| lower == token)
}

// =============================================================================
// String Parsing Utilities
// =============================================================================

/// Characters commonly used in numeric formatting that should be stripped.
pub const NUMERIC_FORMAT_CHARS: [char; 6] = [',', '$', '%', '€', '£', ' '];

/// Clean a string for numeric parsing by removing formatting characters.
pub fn clean_numeric_string(s: &str) -> String {
    let mut result = s.trim().to_string();
    for c in NUMERIC_FORMAT_CHARS {
        result = result.replace(c, "");
    }
    result
}

/// Try to parse a string as a numeric value, tolerating currency symbols,
/// percentages and thousands separators.
pub fn parse_numeric_string(s: &str) -> Option<f64> {
    let cleaned = clean_numeric_string(s);
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Check if a string can be parsed as a numeric value.
pub fn is_numeric_string(s: &str) -> bool {
    parse_numeric_string(s).is_some()
}

/// Strict float parse used for typed coercion: no formatting characters.
pub fn parse_plain_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

// =============================================================================
// Counting Utilities
// =============================================================================

/// Count occurrences of each value.
///
/// The result is ordered by descending count, ties broken by the value
/// itself, so it is stable across runs.
pub fn value_counts<'a, I>(values: I) -> Vec<(&'a str, usize)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: HashMap<&'a str, usize> = HashMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }
    let mut counts: Vec<(&str, usize)> = counts.into_iter().collect();
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    counts
}

/// Truncate a string for display, appending an ellipsis when shortened.
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_numeric_dtype() {
        assert!(is_numeric_dtype(&DataType::Int64));
        assert!(is_numeric_dtype(&DataType::Float32));
        assert!(!is_numeric_dtype(&DataType::String));
        assert!(!is_numeric_dtype(&DataType::Boolean));
    }

    #[test]
    fn test_null_tokens() {
        assert!(is_null_raw("   "));
        assert!(is_null_raw("NaN"));
        assert!(!is_null_raw("N/A"));
        assert!(is_null_like("N/A"));
        assert!(is_null_like(" undefined "));
        assert!(!is_null_like("0"));
    }

    #[test]
    fn test_parse_numeric_string() {
        assert_eq!(parse_numeric_string("$1,234.56"), Some(1234.56));
        assert_eq!(parse_numeric_string("  42%  "), Some(42.0));
        assert_eq!(parse_numeric_string("abc"), None);
        assert_eq!(parse_numeric_string(""), None);
        assert_eq!(parse_plain_number("1,000"), None);
        assert_eq!(parse_plain_number(" 3.5 "), Some(3.5));
    }

    #[test]
    fn test_value_counts_is_ordered() {
        let counts = value_counts(["b", "a", "b", "c", "a", "b"]);
        assert_eq!(counts, vec![("b", 3), ("a", 2), ("c", 1)]);
    }

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("short", 10), "short");
        assert_eq!(truncate_str("a very long column name", 10), "a very ...");
    }
}
