//! Personally identifiable information scan.
//!
//! Every pattern is matched independently against every value. Patterns
//! with a checksum (card numbers, IBANs) only count matches that validate,
//! and are the only ones tried on numeric columns. Sample values are masked
//! before they leave the check.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{DatasetContext, pct, share};
use crate::error::CheckResult;
use crate::types::{Finding, Severity};
use crate::utils::is_null_raw;

struct PiiPattern {
    name: &'static str,
    severity: Severity,
    regex: Regex,
    validate: Option<fn(&str) -> bool>,
}

impl PiiPattern {
    fn new(
        name: &'static str,
        severity: Severity,
        pattern: &str,
        validate: Option<fn(&str) -> bool>,
    ) -> Self {
        Self {
            name,
            severity,
            regex: Regex::new(pattern).expect("Invalid regex: pii pattern"),
            validate,
        }
    }

    /// First valid match in `value`.
    fn find<'v>(&self, value: &'v str) -> Option<&'v str> {
        self.regex
            .find_iter(value)
            .map(|m| m.as_str())
            .find(|m| self.validate.is_none_or(|valid| valid(m)))
    }

    fn is_checksummed(&self) -> bool {
        self.validate.is_some()
    }
}

static PATTERNS: Lazy<Vec<PiiPattern>> = Lazy::new(|| {
    vec![
        PiiPattern::new(
            "CREDIT_CARD",
            Severity::Critical,
            r"\b(?:\d[ -]?){12,18}\d\b",
            Some(luhn_valid),
        ),
        PiiPattern::new(
            "IBAN",
            Severity::Critical,
            r"\b[A-Z]{2}\d{2}(?: ?[A-Z0-9]){11,30}\b",
            Some(iban_valid),
        ),
        PiiPattern::new(
            "SSN_US",
            Severity::Critical,
            r"\b(?:00[1-9]|0[1-9]\d|[1-578]\d{2}|6[0-57-9]\d|66[0-57-9])-\d{2}-\d{4}\b",
            None,
        ),
        PiiPattern::new(
            "CURP_MX",
            Severity::Critical,
            r"\b[A-Z]{4}\d{6}[HM][A-Z]{5}[A-Z0-9]\d\b",
            None,
        ),
        PiiPattern::new("RFC_MX", Severity::High, r"\b[A-ZÑ&]{3,4}\d{6}[A-Z0-9]{3}\b", None),
        PiiPattern::new(
            "EMAIL",
            Severity::High,
            r"[a-zA-Z0-9._%+\-]+@[a-zA-Z0-9.\-]+\.[a-zA-Z]{2,}",
            None,
        ),
        PiiPattern::new(
            "PHONE_INTL",
            Severity::Medium,
            r"\+\d{1,3}[\s.\-]?\(?\d{1,4}\)?(?:[\s.\-]?\d{2,4}){2,4}",
            None,
        ),
        PiiPattern::new(
            "IP_ADDRESS",
            Severity::Medium,
            r"\b(?:(?:25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)\.){3}(?:25[0-5]|2[0-4]\d|1\d\d|[1-9]?\d)\b",
            None,
        ),
    ]
});

/// Luhn checksum over the digits of `value` (13 to 19 digits).
pub(crate) fn luhn_valid(value: &str) -> bool {
    let digits: Vec<u32> = value.chars().filter_map(|c| c.to_digit(10)).collect();
    if !(13..=19).contains(&digits.len()) || digits.iter().all(|&d| d == digits[0]) {
        return false;
    }
    let sum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(i, &d)| {
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

/// ISO 13616 mod-97 check.
pub(crate) fn iban_valid(value: &str) -> bool {
    let compact: String = value.chars().filter(|c| !c.is_whitespace()).collect();
    if !(15..=34).contains(&compact.len()) {
        return false;
    }
    let (head, tail) = compact.split_at(4);
    let mut remainder: u32 = 0;
    for c in tail.chars().chain(head.chars()) {
        let Some(digit) = c.to_digit(36) else {
            return false;
        };
        // Letters expand to two digits.
        remainder = if digit >= 10 {
            (remainder * 100 + digit) % 97
        } else {
            (remainder * 10 + digit) % 97
        };
    }
    remainder == 1
}

/// Keep the first and last two characters.
pub(crate) fn mask(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    chars
        .iter()
        .enumerate()
        .map(|(i, c)| if i < 2 || i >= chars.len() - 2 { *c } else { '*' })
        .collect()
}

pub fn pii_detected(ctx: &DatasetContext<'_>) -> CheckResult<Vec<Finding>> {
    let min_match_pct = ctx.param("min_match_pct")?;
    let mut findings = Vec::new();

    for (column, classification) in ctx.columns_where(|_| true) {
        let numeric = classification.semantic_type.is_numeric() || column.is_numeric();
        let values: Vec<&str> = column
            .raw()
            .iter()
            .map(|v| v.trim())
            .filter(|v| !is_null_raw(v))
            .collect();
        if values.is_empty() {
            continue;
        }

        for pattern in PATTERNS.iter() {
            if numeric && !pattern.is_checksummed() {
                continue;
            }
            let matches: Vec<&str> = values.iter().filter_map(|v| pattern.find(v)).collect();
            if matches.is_empty() {
                continue;
            }
            let rate = share(matches.len(), values.len());
            if rate * 100.0 < min_match_pct {
                continue;
            }
            findings.push(
                ctx.finding(
                    column.name(),
                    pattern.severity,
                    format!("{} values look like {} ({})", matches.len(), pattern.name, pct(rate)),
                )
                .with_value(rate)
                .with_affected(matches.len(), values.len())
                .with_samples(matches.iter().map(|m| mask(m)))
                .with_meta("pattern", pattern.name)
                .with_meta("checksum_validated", pattern.is_checksummed()),
            );
        }
    }

    if findings.is_empty() {
        findings.push(ctx.pass("no personal data patterns found"));
    }
    Ok(findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::testing::dataset_finding;

    // ==================== validator tests ====================

    #[test]
    fn test_luhn() {
        assert!(luhn_valid("4111 1111 1111 1111"));
        assert!(luhn_valid("5500-0000-0000-0004"));
        assert!(!luhn_valid("4111 1111 1111 1112"));
        assert!(!luhn_valid("0000000000000000"));
        assert!(!luhn_valid("12345"));
    }

    #[test]
    fn test_iban() {
        assert!(iban_valid("GB82WEST12345698765432"));
        assert!(iban_valid("DE89 3704 0044 0532 0130 00"));
        assert!(!iban_valid("GB82WEST12345698765433"));
    }

    #[test]
    fn test_mask() {
        assert_eq!(mask("4111111111111111"), "41************11");
        assert_eq!(mask("abc"), "***");
    }

    // ==================== scan tests ====================

    #[test]
    fn test_card_numbers_in_numeric_column() {
        let findings = dataset_finding(
            "PII_DETECTED",
            &[("card", vec!["4111111111111111", "5500000000000004", "1234567812345678"])],
        );
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].column, "card");
        assert_eq!(findings[0].severity, Severity::Critical);
        assert_eq!(findings[0].affected_count, 2);
        assert_eq!(findings[0].metadata["pattern"], "CREDIT_CARD");
        assert!(findings[0].sample_values.iter().all(|s| s.contains('*')));
    }

    #[test]
    fn test_contact_patterns_in_text() {
        let findings = dataset_finding(
            "PII_DETECTED",
            &[("notes", vec!["mail ana@example.com", "server at 10.0.0.12", "nothing here"])],
        );
        let patterns: Vec<&str> = findings
            .iter()
            .filter_map(|f| f.metadata["pattern"].as_str())
            .collect();
        assert_eq!(patterns, vec!["EMAIL", "IP_ADDRESS"]);
    }

    #[test]
    fn test_clean_dataset_passes_at_dataset_level() {
        let findings = dataset_finding("PII_DETECTED", &[("city", vec!["Lyon", "Paris", "Nice"])]);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Pass);
        assert_eq!(findings[0].column, crate::types::DATASET_COLUMN);
    }
}
