//! Value kinds used for the per-column majority vote.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::dates;

/// Declaration order is the tie-break order of the majority vote.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ValueKind {
    Numeric,
    Percentage,
    Date,
    Text,
    Boolean,
}

impl ValueKind {
    pub const ALL: [ValueKind; 5] = [
        ValueKind::Numeric,
        ValueKind::Percentage,
        ValueKind::Date,
        ValueKind::Text,
        ValueKind::Boolean,
    ];

    /// Numbers and percentages are both numbers underneath; mixing them is a
    /// representation problem, not a type problem.
    pub fn compatible(self, other: ValueKind) -> bool {
        self == other
            || matches!(
                (self, other),
                (ValueKind::Numeric, ValueKind::Percentage) | (ValueKind::Percentage, ValueKind::Numeric)
            )
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ValueKind::Numeric => "numeric",
            ValueKind::Percentage => "percentage",
            ValueKind::Date => "date",
            ValueKind::Text => "text",
            ValueKind::Boolean => "boolean",
        })
    }
}

/// `$1,200.50`, `-40`, `100.`, `.90`: an optional currency symbol, digits
/// with optional thousands grouping, optional decimals.
static NUMERIC_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([-+])?([$€£¥])?([-+])?(\d{1,3}(?:,\d{3})+|\d+)?(?:\.(\d*))?$")
        .expect("numeric text regex must compile")
});

static PERCENT_TEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[-+]?(\d+(?:\.\d*)?|\.\d+)\s*%$").expect("percent text regex must compile")
});

/// A number written as text, decomposed.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericText {
    pub value: f64,
    pub currency: Option<char>,
    pub thousands: bool,
    pub decimals: u8,
}

/// Parse number-looking text after trimming. Text with no digit at all
/// (`"$"`, `"."`) is not a number.
pub fn parse_numeric_text(text: &str) -> Option<NumericText> {
    let caps = NUMERIC_TEXT.captures(text.trim())?;
    let int_part = caps.get(4).map(|m| m.as_str()).unwrap_or("");
    let frac_part = caps.get(5).map(|m| m.as_str());
    if int_part.is_empty() && frac_part.is_none_or(str::is_empty) {
        return None;
    }
    let negative = caps.get(1).or(caps.get(3)).is_some_and(|m| m.as_str() == "-");
    let digits: String = int_part.chars().filter(|c| *c != ',').collect();
    let number = format!(
        "{}{}.{}",
        if negative { "-" } else { "" },
        if digits.is_empty() { "0" } else { &digits },
        frac_part.filter(|f| !f.is_empty()).unwrap_or("0"),
    );
    let value = number.parse::<f64>().ok()?;
    Some(NumericText {
        value,
        currency: caps.get(2).and_then(|m| m.as_str().chars().next()),
        thousands: int_part.contains(','),
        decimals: frac_part.map(|f| f.len().min(u8::MAX as usize) as u8).unwrap_or(0),
    })
}

/// `95.00%` as a fraction (0.95).
pub fn parse_percent_text(text: &str) -> Option<f64> {
    let text = text.trim();
    if !PERCENT_TEXT.is_match(text) {
        return None;
    }
    text.trim_end_matches('%').trim().parse::<f64>().ok().map(|n| n / 100.0)
}

pub fn is_boolean_text(text: &str) -> bool {
    let t = text.trim();
    t.eq_ignore_ascii_case("true") || t.eq_ignore_ascii_case("false")
}

/// Kind of a text value.
pub fn text_kind(text: &str) -> ValueKind {
    if parse_percent_text(text).is_some() {
        ValueKind::Percentage
    } else if parse_numeric_text(text).is_some() {
        ValueKind::Numeric
    } else if dates::is_date_like(text) {
        ValueKind::Date
    } else if is_boolean_text(text) {
        ValueKind::Boolean
    } else {
        ValueKind::Text
    }
}

/// Kind of a stored number, decided by its number format.
pub fn number_kind(number_format: Option<&str>) -> ValueKind {
    match number_format {
        Some(code) if code.contains('%') => ValueKind::Percentage,
        Some(code) if dates::is_date_format(code) => ValueKind::Date,
        _ => ValueKind::Numeric,
    }
}
