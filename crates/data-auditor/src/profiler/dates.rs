//! Known date/datetime formats and the parsing helpers built on them.

use chrono::{Datelike, NaiveDate, NaiveDateTime};

/// A textual date format in chrono `strftime` syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateFormat {
    pub pattern: &'static str,
    pub has_time: bool,
}

impl DateFormat {
    const fn date(pattern: &'static str) -> Self {
        Self {
            pattern,
            has_time: false,
        }
    }

    const fn datetime(pattern: &'static str) -> Self {
        Self {
            pattern,
            has_time: true,
        }
    }

    /// Parse a trimmed value with this format.
    pub fn parse(&self, value: &str) -> Option<NaiveDateTime> {
        if !has_four_digit_run(value) {
            return None;
        }
        if self.pattern == COMPACT_PATTERN {
            return parse_compact(value);
        }
        if self.pattern == SPANISH_LONG_PATTERN {
            return parse_spanish_long(value);
        }
        if self.has_time {
            NaiveDateTime::parse_from_str(value, self.pattern).ok()
        } else {
            NaiveDate::parse_from_str(value, self.pattern)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        }
    }
}

const COMPACT_PATTERN: &str = "%Y%m%d";
const SPANISH_LONG_PATTERN: &str = "%d de %B de %Y";

const SPANISH_MONTHS: [&str; 12] = [
    "enero",
    "febrero",
    "marzo",
    "abril",
    "mayo",
    "junio",
    "julio",
    "agosto",
    "septiembre",
    "octubre",
    "noviembre",
    "diciembre",
];

/// Formats in priority order. When a value parses under several formats
/// (e.g. `01/02/2024`), the earliest one in this list is its format.
pub const DATE_FORMATS: [DateFormat; 14] = [
    DateFormat::date("%Y-%m-%d"),
    DateFormat::date("%d/%m/%Y"),
    DateFormat::date("%m/%d/%Y"),
    DateFormat::date("%d-%m-%Y"),
    DateFormat::date("%Y/%m/%d"),
    DateFormat::date("%d.%m.%Y"),
    DateFormat::date(COMPACT_PATTERN),
    DateFormat::datetime("%Y-%m-%d %H:%M:%S"),
    DateFormat::datetime("%d/%m/%Y %H:%M:%S"),
    DateFormat::datetime("%Y-%m-%dT%H:%M:%S"),
    DateFormat::datetime("%Y-%m-%dT%H:%M:%SZ"),
    DateFormat::date("%d %b %Y"),
    DateFormat::date("%B %d, %Y"),
    DateFormat::date(SPANISH_LONG_PATTERN),
];

/// Find the first known format that parses `value`.
pub fn detect_format(value: &str) -> Option<(DateFormat, NaiveDateTime)> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| fmt.parse(trimmed).map(|dt| (*fmt, dt)))
}

/// Parse a value with any known format.
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    detect_format(value).map(|(_, dt)| dt)
}

fn parse_compact(value: &str) -> Option<NaiveDateTime> {
    if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = value[0..4].parse().ok()?;
    let month = value[4..6].parse().ok()?;
    let day = value[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(0, 0, 0)
}

/// `15 de marzo de 2024`. Month names are matched case-insensitively, in
/// Spanish (`setiembre` included) or English.
fn parse_spanish_long(value: &str) -> Option<NaiveDateTime> {
    let mut parts = value.split(" de ");
    let (day, month, year) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    let month_name = month.trim().to_lowercase();
    let month = match SPANISH_MONTHS.iter().position(|m| *m == month_name) {
        Some(idx) => idx as u32 + 1,
        None if month_name == "setiembre" => 9,
        None => {
            let english = format!("1 {} 2000", month.trim());
            NaiveDate::parse_from_str(&english, "%d %B %Y").ok()?.month()
        }
    };
    let day = day.trim().parse().ok()?;
    let year = year.trim().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(0, 0, 0)
}

/// Every supported format spells the year with four digits; requiring a
/// four-digit run keeps strings like `1.2.3` from parsing as year 3.
fn has_four_digit_run(value: &str) -> bool {
    let mut run = 0;
    for b in value.bytes() {
        if b.is_ascii_digit() {
            run += 1;
            if run >= 4 {
                return true;
            }
        } else {
            run = 0;
        }
    }
    false
}
