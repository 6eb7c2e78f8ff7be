//! Normalised number representations, compared per column.

use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::kind::{self, NumericText};

/// How a number is written: currency symbol, thousands grouping and the
/// number of decimal places.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FormatSignature {
    pub currency: Option<char>,
    pub thousands: bool,
    pub decimals: u8,
}

impl FormatSignature {
    pub fn of_text(text: &NumericText) -> Self {
        FormatSignature {
            currency: text.currency,
            thousands: text.thousands,
            decimals: text.decimals,
        }
    }

    /// Signature of a number-format code such as `$#,##0.00`. `General`
    /// says nothing about the representation and yields `None`.
    pub fn of_number_format(code: &str) -> Option<Self> {
        if is_general(code) {
            return None;
        }
        let section = code.split(';').next().unwrap_or(code);

        let mut currency = None;
        let mut thousands = false;
        let mut decimals = 0u8;
        let mut seen_point = false;
        let mut seen_placeholder = false;
        let mut in_quotes = false;
        let mut chars = section.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '"' => in_quotes = !in_quotes,
                _ if in_quotes => {}
                '$' | '€' | '£' | '¥' if currency.is_none() => currency = Some(c),
                '0' | '#' | '?' => {
                    seen_placeholder = true;
                    if seen_point && c == '0' {
                        decimals = decimals.saturating_add(1);
                    }
                }
                ',' if seen_placeholder
                    && !seen_point
                    && chars.peek().is_some_and(|n| matches!(n, '0' | '#')) =>
                {
                    thousands = true
                }
                '.' => seen_point = true,
                _ => {}
            }
        }
        seen_placeholder.then_some(FormatSignature {
            currency,
            thousands,
            decimals,
        })
    }

    /// Signature of a stored number. Under `General` (or no format at all)
    /// the number shows as its shortest decimal rendering, so `10.999` has
    /// three decimals and `30` none.
    pub fn of_stored(value: f64, code: Option<&str>) -> Option<Self> {
        match code.filter(|c| !is_general(c)) {
            Some(code) => Self::of_number_format(code),
            None => kind::parse_numeric_text(&value.to_string()).map(|n| Self::of_text(&n)),
        }
    }
}

fn is_general(code: &str) -> bool {
    let section = code.split(';').next().unwrap_or(code).trim();
    section.is_empty() || section.eq_ignore_ascii_case("general")
}

impl fmt::Display for FormatSignature {
    /// Renders as a number-format pattern, e.g. `$#,##0.00`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(symbol) = self.currency {
            write!(f, "{symbol}")?;
        }
        f.write_str(if self.thousands { "#,##0" } else { "0" })?;
        if self.decimals > 0 {
            write!(f, ".{}", "0".repeat(self.decimals as usize))?;
        }
        Ok(())
    }
}

/// The most common signature; ties go to the smallest.
pub fn majority<'a>(signatures: impl IntoIterator<Item = &'a FormatSignature>) -> Option<FormatSignature> {
    let mut counts: BTreeMap<FormatSignature, usize> = BTreeMap::new();
    for sig in signatures {
        *counts.entry(*sig).or_default() += 1;
    }
    let mut best: Option<(FormatSignature, usize)> = None;
    for (sig, count) in counts {
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((sig, count));
        }
    }
    best.map(|(sig, _)| sig)
}
