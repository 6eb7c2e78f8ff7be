use std::{
    fmt::{self, Display},
    hash::{Hash, Hasher},
};

use crate::ErrorClass;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A literal operand as it appears inside formula text.
///
/// This is distinct from what a cell stores; the workbook model has its own
/// `CellValue` with an explicit formula variant.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Number(f64),
    Text(String),
    Boolean(bool),
    Error(ErrorClass),
}

impl Hash for LiteralValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            LiteralValue::Number(n) => n.to_bits().hash(state),
            LiteralValue::Text(s) => s.hash(state),
            LiteralValue::Boolean(b) => b.hash(state),
            LiteralValue::Error(e) => e.hash(state),
        }
    }
}

impl Eq for LiteralValue {}

impl Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::Number(n) => write!(f, "{n}"),
            LiteralValue::Text(s) => write!(f, "\"{}\"", s.replace('"', "\"\"")),
            LiteralValue::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            LiteralValue::Error(e) => write!(f, "{}", e.excel_code().unwrap_or("#ERROR!")),
        }
    }
}

impl LiteralValue {
    /// Numeric coercion the way an arithmetic operator applies it.
    ///
    /// Text coerces only when it is a plain number after trimming; booleans
    /// coerce to 1/0; errors never coerce.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            LiteralValue::Number(n) => Some(*n),
            LiteralValue::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            LiteralValue::Text(s) => parse_plain_number(s),
            LiteralValue::Error(_) => None,
        }
    }
}

/// Parse a plain decimal number (`12`, `-3.5`, `1e3`), rejecting the textual
/// specials Rust accepts (`inf`, `NaN`).
pub fn parse_plain_number(text: &str) -> Option<f64> {
    let t = text.trim();
    if t.is_empty()
        || !t
            .bytes()
            .all(|b| b.is_ascii_digit() || matches!(b, b'.' | b'-' | b'+' | b'e' | b'E'))
    {
        return None;
    }
    t.parse::<f64>().ok().filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_coerces_only_when_plainly_numeric() {
        assert_eq!(LiteralValue::Text(" 42 ".into()).as_number(), Some(42.0));
        assert_eq!(LiteralValue::Text("7OO".into()).as_number(), None);
        assert_eq!(LiteralValue::Text("inf".into()).as_number(), None);
        assert_eq!(LiteralValue::Boolean(true).as_number(), Some(1.0));
        assert_eq!(LiteralValue::Error(ErrorClass::NotAvailable).as_number(), None);
    }
}
