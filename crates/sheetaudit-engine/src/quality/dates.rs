//! Date recognition without guessing between day-first and month-first.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

/// Patterns a stored date string may follow. Day/month order is deliberately
/// not decided here: a string may match several.
const DATE_PATTERNS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%d-%m-%Y",
    "%m-%d-%Y",
    "%d.%m.%Y",
    "%d/%m/%y",
    "%m/%d/%y",
    "%d-%b-%Y",
    "%d %b %Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

/// Numeric layouts of [`DATE_PATTERNS`], without checking the field ranges.
static DATE_SHAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:\d{4}-\d{1,2}-\d{1,2}|\d{4}/\d{1,2}/\d{1,2}|\d{4}\.\d{1,2}\.\d{1,2}|\d{1,2}/\d{1,2}/(?:\d{2}|\d{4})|\d{1,2}-\d{1,2}-\d{4}|\d{1,2}\.\d{1,2}\.\d{4})$",
    )
    .expect("date shape regex must compile")
});

/// What spreadsheet exports write for an unparseable date.
const INVALID_DATE_MARKER: &str = "Invalid Date";

/// Every distinct date the text could mean, in ascending order.
pub fn candidate_dates(text: &str) -> Vec<NaiveDate> {
    let text = text.trim();
    if text.len() < 6 || !text.bytes().any(|b| b.is_ascii_digit()) {
        return Vec::new();
    }
    let mut dates: Vec<NaiveDate> = DATE_PATTERNS
        .iter()
        .filter_map(|pattern| NaiveDate::parse_from_str(text, pattern).ok())
        // `%Y` happily reads two-digit years as the first century
        .filter(|d| (1000..=9999).contains(&d.year()))
        .collect();
    dates.sort_unstable();
    dates.dedup();
    dates
}

pub fn is_date_like(text: &str) -> bool {
    !candidate_dates(text).is_empty()
}

/// Text laid out like a date (`2024-13-32`) that no pattern accepts, or the
/// `Invalid Date` marker itself.
pub fn is_invalid_date(text: &str) -> bool {
    let text = text.trim();
    text.eq_ignore_ascii_case(INVALID_DATE_MARKER)
        || (DATE_SHAPE.is_match(text) && candidate_dates(text).is_empty())
}

/// `01/02/2024` could be 1 February or 2 January.
pub fn is_ambiguous(text: &str) -> bool {
    candidate_dates(text).len() > 1
}

/// Whether a number-format code renders a date or time (`yyyy-mm-dd`,
/// `d-mmm`, `h:mm`). Quoted literals and bracketed sections are ignored.
pub fn is_date_format(code: &str) -> bool {
    let mut in_quotes = false;
    let mut in_brackets = false;
    let mut prev_escape = false;
    for c in code.chars() {
        if prev_escape {
            prev_escape = false;
            continue;
        }
        match c {
            '\\' => prev_escape = true,
            '"' => in_quotes = !in_quotes,
            '[' if !in_quotes => in_brackets = true,
            ']' if !in_quotes => in_brackets = false,
            _ if in_quotes || in_brackets => {}
            'y' | 'Y' | 'd' | 'D' | 'h' | 'H' | 's' | 'S' => return true,
            _ => {}
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_month_order_is_ambiguous_only_when_both_read() {
        assert!(is_ambiguous("01/02/2024"));
        assert!(is_ambiguous("05-01-2024"));
        assert!(!is_ambiguous("01/01/2024"));
        assert!(!is_ambiguous("13/02/2024"));
        assert!(!is_ambiguous("2024-01-05"));
        assert!(!is_ambiguous("03.01.2024"));
        assert!(!is_ambiguous("13/02/24"));
    }

    #[test]
    fn recognises_common_shapes() {
        for text in ["2024/01/02", "Jan 4, 2024", "01-Jan-2024", "2024.01.01", " 2024-01-08 "] {
            assert!(is_date_like(text), "{text}");
        }
        for text in ["yesterday", "2024-13-01", "1st Jan 2024", "42", "Invalid Date"] {
            assert!(!is_date_like(text), "{text}");
        }
    }

    #[test]
    fn invalid_dates_need_a_date_layout() {
        for text in ["2024-13-01", "2024-02-30", "31/31/2024", " invalid date "] {
            assert!(is_invalid_date(text), "{text}");
        }
        for text in ["2024-01-05", "01/02/24", "yesterday", "1st Jan 2024", "12345", "1.5"] {
            assert!(!is_invalid_date(text), "{text}");
        }
    }

    #[test]
    fn date_format_codes() {
        assert!(is_date_format("yyyy-mm-dd"));
        assert!(is_date_format("h:mm AM/PM"));
        assert!(is_date_format("[$-409]d-mmm-yy"));
        assert!(!is_date_format("#,##0.00"));
        assert!(!is_date_format("0%"));
        assert!(!is_date_format("[Red]0.00"));
        assert!(!is_date_format("\"days\" 0"));
    }
}
