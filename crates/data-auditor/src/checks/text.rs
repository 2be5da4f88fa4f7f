//! Checks for free-text columns (HIGH_CARDINALITY, EMAIL, PHONE) and
//! encoding problems in any text column.

use super::{CheckContext, MIN_NUMERIC_N, pct, share};
use crate::error::CheckResult;
use crate::profiler::statistics::{IqrFences, sorted};
use crate::profiler::type_inference::{EMAIL_RE, PHONE_RE};
use crate::types::Finding;
use crate::utils::{is_null_like, truncate_str};

const REPLACEMENT_CHAR: char = '\u{FFFD}';
const PHONE_DIGITS: std::ops::RangeInclusive<usize> = 7..=15;

/// IQR outliers over value lengths in characters.
pub fn length_outliers(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    let values: Vec<&str> = ctx.profile.non_null_values().collect();
    if values.len() < MIN_NUMERIC_N {
        return Ok(ctx.insufficient(values.len(), MIN_NUMERIC_N));
    }
    let multiplier = ctx.param("multiplier")?;
    let lengths: Vec<f64> = values.iter().map(|v| v.chars().count() as f64).collect();
    let fences = IqrFences::from_sorted(&sorted(&lengths), multiplier);

    let outliers: Vec<&str> = values
        .iter()
        .zip(lengths.iter())
        .filter(|(_, len)| fences.is_outside(**len))
        .map(|(v, _)| *v)
        .collect();
    let finding = if outliers.is_empty() {
        ctx.pass("value lengths are consistent")
    } else {
        ctx.info(format!("{} values with unusual length", outliers.len()))
    };
    Ok(finding
        .with_value(share(outliers.len(), values.len()))
        .with_affected(outliers.len(), values.len())
        .with_samples(outliers.iter().map(|v| truncate_str(v, 60)))
        .with_meta("lower_fence", fences.lower)
        .with_meta("upper_fence", fences.upper))
}

/// Placeholder strings such as "N/A" or "null" stored as values.
pub fn null_like_strings(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    let values: Vec<&str> = ctx.profile.non_null_values().collect();
    let placeholders: Vec<&str> = values.iter().copied().filter(|v| is_null_like(v)).collect();
    let rate = share(placeholders.len(), values.len());
    Ok(ctx
        .graded(rate, format!("{} of values are null placeholders", pct(rate)))
        .with_affected(placeholders.len(), values.len())
        .with_samples(placeholders))
}

/// Values cut at a fixed maximum length, or ending in an ellipsis.
pub fn truncation_signs(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    let max_share = ctx.param("max_length_share")?;
    let stats = ctx.profile.stats();
    let values: Vec<&str> = ctx.profile.non_null_values().collect();
    if values.is_empty() {
        return Ok(ctx.pass("no values"));
    }

    let at_max: Vec<&str> = values
        .iter()
        .copied()
        .filter(|v| v.chars().count() == stats.max_length)
        .collect();
    let capped =
        stats.min_length < stats.max_length && share(at_max.len(), values.len()) >= max_share;
    let ellipsis: Vec<&str> = values
        .iter()
        .copied()
        .filter(|v| v.ends_with("...") || v.ends_with('\u{2026}'))
        .collect();

    let mut affected: Vec<&str> = ellipsis.clone();
    if capped {
        affected.extend(at_max.iter().copied().filter(|v| !ellipsis.contains(v)));
    }
    let rate = share(affected.len(), values.len());
    let message = if capped {
        format!(
            "{} of values share the maximum length of {} characters",
            pct(share(at_max.len(), values.len())),
            stats.max_length
        )
    } else {
        format!("{} values end with an ellipsis", ellipsis.len())
    };
    Ok(ctx
        .graded(rate, message)
        .with_affected(affected.len(), values.len())
        .with_samples(affected.iter().map(|v| truncate_str(v, 60)))
        .with_meta("max_length", stats.max_length)
        .with_meta("ellipsis_count", ellipsis.len()))
}

fn has_encoding_damage(value: &str) -> bool {
    value
        .chars()
        .any(|c| c == REPLACEMENT_CHAR || (c.is_control() && !matches!(c, '\t' | '\n' | '\r')))
}

/// Control characters or U+FFFD replacement characters.
pub fn encoding_anomaly(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    let values: Vec<&str> = ctx.profile.non_null_values().collect();
    let damaged: Vec<&str> = values.iter().copied().filter(|v| has_encoding_damage(v)).collect();
    let rate = share(damaged.len(), values.len());
    Ok(ctx
        .graded(rate, format!("{} values contain control or replacement characters", damaged.len()))
        .with_affected(damaged.len(), values.len())
        .with_samples(damaged.iter().map(|v| v.escape_debug().to_string())))
}

fn invalid_share(ctx: &CheckContext<'_>, label: &str, valid: impl Fn(&str) -> bool) -> Finding {
    let values: Vec<&str> = ctx.profile.non_null_values().collect();
    let invalid: Vec<&str> = values.iter().copied().filter(|v| !valid(v)).collect();
    let rate = share(invalid.len(), values.len());
    ctx.graded(rate, format!("{} of values are not valid {}", pct(rate), label))
        .with_affected(invalid.len(), values.len())
        .with_samples(invalid)
}

pub fn email_format(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    Ok(invalid_share(ctx, "email addresses", |v| EMAIL_RE.is_match(v)))
}

/// Phone shape plus a plausible digit count.
pub fn phone_format(ctx: &CheckContext<'_>) -> CheckResult<Finding> {
    Ok(invalid_share(ctx, "phone numbers", |v| {
        let digits = v.chars().filter(char::is_ascii_digit).count();
        PHONE_RE.is_match(v) && PHONE_DIGITS.contains(&digits)
    }))
}
