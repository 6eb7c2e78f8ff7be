//! Evaluation-error classes and the ordering used to pick the winning class
//! when several apply to one cell.
//!
//! - **`ErrorClass`**   : the failure mode a formula would evaluate to
//! - **`SeverityOrder`**: an injectable ranking table (highest first)
//!
//! `ErrorClass::None` is never part of the table; it always ranks lowest.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Classification of a cell's formula-evaluation failure mode.
///
/// Names are CamelCase while [`ErrorClass::excel_code`] renders the code a
/// spreadsheet application would show, where one exists.
///
/// Classes have no intrinsic ordering; compare them through a
/// [`SeverityOrder`].
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum ErrorClass {
    #[default]
    None,
    DivideByZero,
    UnknownFunction,
    UnresolvedReference,
    InvalidValueCoercion,
    MissingArgument,
    NullError,
    NotAvailable,
    CircularReference,
}

impl ErrorClass {
    /// Every class except `None`.
    pub const ERRORS: [ErrorClass; 8] = [
        ErrorClass::CircularReference,
        ErrorClass::UnresolvedReference,
        ErrorClass::UnknownFunction,
        ErrorClass::MissingArgument,
        ErrorClass::InvalidValueCoercion,
        ErrorClass::DivideByZero,
        ErrorClass::NullError,
        ErrorClass::NotAvailable,
    ];

    pub fn is_error(self) -> bool {
        self != ErrorClass::None
    }

    pub fn excel_code(self) -> Option<&'static str> {
        match self {
            ErrorClass::None | ErrorClass::MissingArgument => None,
            ErrorClass::DivideByZero => Some("#DIV/0!"),
            ErrorClass::UnknownFunction => Some("#NAME?"),
            ErrorClass::UnresolvedReference => Some("#REF!"),
            ErrorClass::InvalidValueCoercion => Some("#VALUE!"),
            ErrorClass::NullError => Some("#NULL!"),
            ErrorClass::NotAvailable => Some("#N/A"),
            ErrorClass::CircularReference => Some("#CIRC!"),
        }
    }

    /// Map an error literal as it appears in formula text. Unknown codes yield `None`.
    pub fn from_error_literal(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "#NULL!" => Some(ErrorClass::NullError),
            "#DIV/0!" => Some(ErrorClass::DivideByZero),
            "#VALUE!" | "#NUM!" => Some(ErrorClass::InvalidValueCoercion),
            "#REF!" => Some(ErrorClass::UnresolvedReference),
            "#NAME?" => Some(ErrorClass::UnknownFunction),
            "#N/A" | "#GETTING_DATA" => Some(ErrorClass::NotAvailable),
            "#CIRC!" => Some(ErrorClass::CircularReference),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorClass::None => "None",
            ErrorClass::DivideByZero => "DivideByZero",
            ErrorClass::UnknownFunction => "UnknownFunction",
            ErrorClass::UnresolvedReference => "UnresolvedReference",
            ErrorClass::InvalidValueCoercion => "InvalidValueCoercion",
            ErrorClass::MissingArgument => "MissingArgument",
            ErrorClass::NullError => "NullError",
            ErrorClass::NotAvailable => "NotAvailable",
            ErrorClass::CircularReference => "CircularReference",
        })
    }
}

/// Returned when an override table is not a permutation of [`ErrorClass::ERRORS`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeverityOrderError {
    ContainsNone,
    Duplicate(ErrorClass),
    Missing(ErrorClass),
}

impl fmt::Display for SeverityOrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeverityOrderError::ContainsNone => write!(f, "severity order must not rank None"),
            SeverityOrderError::Duplicate(class) => write!(f, "{class} ranked more than once"),
            SeverityOrderError::Missing(class) => write!(f, "{class} missing from severity order"),
        }
    }
}

impl std::error::Error for SeverityOrderError {}

/// Ranking of error classes, most severe first.
///
/// The default places `DivideByZero` directly below `InvalidValueCoercion`.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "Vec<ErrorClass>", into = "Vec<ErrorClass>"))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeverityOrder {
    ranked: Vec<ErrorClass>,
}

impl Default for SeverityOrder {
    fn default() -> Self {
        Self {
            ranked: ErrorClass::ERRORS.to_vec(),
        }
    }
}

impl SeverityOrder {
    /// Build an override table. It must rank every error class exactly once.
    pub fn new(ranked: Vec<ErrorClass>) -> Result<Self, SeverityOrderError> {
        let mut seen = [false; 9];
        for &class in &ranked {
            if class == ErrorClass::None {
                return Err(SeverityOrderError::ContainsNone);
            }
            let slot = &mut seen[class as usize];
            if *slot {
                return Err(SeverityOrderError::Duplicate(class));
            }
            *slot = true;
        }
        if let Some(&missing) = ErrorClass::ERRORS.iter().find(|c| !seen[**c as usize]) {
            return Err(SeverityOrderError::Missing(missing));
        }
        Ok(Self { ranked })
    }

    /// Higher is more severe; `None` is always 0.
    pub fn rank(&self, class: ErrorClass) -> usize {
        if class == ErrorClass::None {
            return 0;
        }
        self.ranked
            .iter()
            .position(|c| *c == class)
            .map(|idx| self.ranked.len() - idx)
            .unwrap_or(0)
    }

    /// The more severe of two classes; `a` wins ties.
    pub fn max(&self, a: ErrorClass, b: ErrorClass) -> ErrorClass {
        if self.rank(b) > self.rank(a) { b } else { a }
    }

    pub fn ranked(&self) -> &[ErrorClass] {
        &self.ranked
    }
}

impl TryFrom<Vec<ErrorClass>> for SeverityOrder {
    type Error = SeverityOrderError;

    fn try_from(value: Vec<ErrorClass>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SeverityOrder> for Vec<ErrorClass> {
    fn from(order: SeverityOrder) -> Self {
        order.ranked
    }
}
