//! Finding types shared by the analysis stages and the report.

use std::fmt;

use sheetaudit_common::{CellCoord, ColumnRef, ErrorClass};
use sheetaudit_parse::IssueKind;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Why a formula cell was flagged without evaluating anything.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StructuralKind {
    /// Raised by the formula lint.
    Formula(IssueKind),
    UnresolvedSheet,
    UndefinedName,
    ExternalReference,
    DivisionByZero,
    LookupMiss,
    LookupIndexOutOfRange,
    TextCellArithmetic,
    ComplexFormula,
    VolatileFunction,
}

/// A finding about one formula cell. `class` is `None` for purely
/// informational findings (volatile calls, complexity, external links).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct StructuralFinding {
    pub cell: CellCoord,
    pub kind: StructuralKind,
    pub class: ErrorClass,
    pub message: String,
    pub effectively_hidden: bool,
}

impl StructuralFinding {
    pub fn new(
        cell: CellCoord,
        kind: StructuralKind,
        class: ErrorClass,
        message: impl Into<String>,
    ) -> Self {
        StructuralFinding {
            cell,
            kind,
            class,
            message: message.into(),
            effectively_hidden: false,
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QualityKind {
    TypeInconsistency,
    FormatInconsistency,
    Outlier,
    WhitespaceIssue,
    AmbiguousDate,
    /// Date-shaped text that names no calendar day.
    InvalidDate,
    PercentageRepresentationMismatch,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        })
    }
}

/// What a quality finding is attached to.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FindingTarget {
    Cell(CellCoord),
    Column(ColumnRef),
}

impl FindingTarget {
    pub fn cell(&self) -> Option<&CellCoord> {
        match self {
            FindingTarget::Cell(coord) => Some(coord),
            FindingTarget::Column(_) => None,
        }
    }

    pub fn column(&self) -> ColumnRef {
        match self {
            FindingTarget::Cell(coord) => coord.column(),
            FindingTarget::Column(col) => col.clone(),
        }
    }
}

impl fmt::Display for FindingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FindingTarget::Cell(coord) => write!(f, "{coord}"),
            FindingTarget::Column(col) => write!(f, "{col}"),
        }
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct QualityFinding {
    pub target: FindingTarget,
    pub kind: QualityKind,
    pub severity: Severity,
    /// The offending raw value, as stored.
    pub value: Option<String>,
    /// The column's dominant type or format, for contrast.
    pub expected: String,
    pub suggestion: String,
    pub effectively_hidden: bool,
}
