//! Sheet-qualified grid coordinates shared by the parser, the graph and the report.
//!
//! Rows and columns are 1-based, exactly as they appear in A1 notation, and the
//! grid has the same limits as Excel: 1,048,576 rows × 16,384 columns.
//! `CellCoord` orders by sheet name, then row, then column; every deterministic
//! tie-break in the engine (cycle paths, propagation origins, report order)
//! relies on that ordering.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub const MAX_ROWS: u32 = 1_048_576;
pub const MAX_COLS: u32 = 16_384;

/// Errors returned when constructing coordinates from unchecked inputs.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CoordError {
    RowOutOfRange(u32),
    ColOutOfRange(u32),
    InvalidA1(String),
}

impl fmt::Display for CoordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordError::RowOutOfRange(row) => write!(f, "row {row} is outside 1..={MAX_ROWS}"),
            CoordError::ColOutOfRange(col) => write!(f, "col {col} is outside 1..={MAX_COLS}"),
            CoordError::InvalidA1(text) => write!(f, "'{text}' is not an A1 cell address"),
        }
    }
}

impl std::error::Error for CoordError {}

/// A single cell: (sheet name, 1-based row, 1-based column).
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellCoord {
    pub sheet: String,
    pub row: u32,
    pub col: u32,
}

impl CellCoord {
    /// Construct without bounds checks. Use [`CellCoord::try_new`] for untrusted input.
    pub fn new(sheet: impl Into<String>, row: u32, col: u32) -> Self {
        Self {
            sheet: sheet.into(),
            row,
            col,
        }
    }

    pub fn try_new(sheet: impl Into<String>, row: u32, col: u32) -> Result<Self, CoordError> {
        check_bounds(row, col)?;
        Ok(Self::new(sheet, row, col))
    }

    /// Parse an unqualified A1 address (`B7`, `$C$2`) on the given sheet.
    pub fn from_a1(sheet: impl Into<String>, a1: &str) -> Result<Self, CoordError> {
        let (row, col) = parse_a1(a1).ok_or_else(|| CoordError::InvalidA1(a1.to_string()))?;
        Self::try_new(sheet, row, col)
    }

    /// The unqualified A1 form, e.g. `B7`.
    pub fn a1(&self) -> String {
        format!("{}{}", column_to_letters(self.col), self.row)
    }

    pub fn column(&self) -> ColumnRef {
        ColumnRef::new(self.sheet.clone(), self.col)
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_sheet_prefix(f, &self.sheet)?;
        write!(f, "{}{}", column_to_letters(self.col), self.row)
    }
}

/// A whole column on one sheet; the unit the data-quality heuristics work on.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnRef {
    pub sheet: String,
    pub col: u32,
}

impl ColumnRef {
    pub fn new(sheet: impl Into<String>, col: u32) -> Self {
        Self {
            sheet: sheet.into(),
            col,
        }
    }

    pub fn letters(&self) -> String {
        column_to_letters(self.col)
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_sheet_prefix(f, &self.sheet)?;
        let letters = column_to_letters(self.col);
        write!(f, "{letters}:{letters}")
    }
}

fn write_sheet_prefix(f: &mut fmt::Formatter<'_>, sheet: &str) -> fmt::Result {
    if needs_quoting(sheet) {
        write!(f, "'{}'!", sheet.replace('\'', "''"))
    } else {
        write!(f, "{sheet}!")
    }
}

/// Sheet names containing anything beyond `[A-Za-z0-9_.]` are quoted in A1 text.
pub fn needs_quoting(sheet: &str) -> bool {
    sheet.is_empty()
        || sheet
            .chars()
            .any(|c| !(c.is_alphanumeric() || c == '_' || c == '.'))
}

pub fn check_bounds(row: u32, col: u32) -> Result<(), CoordError> {
    if row == 0 || row > MAX_ROWS {
        return Err(CoordError::RowOutOfRange(row));
    }
    if col == 0 || col > MAX_COLS {
        return Err(CoordError::ColOutOfRange(col));
    }
    Ok(())
}

/// Convert a 1-based column number to letters (`1 -> A`, `28 -> AB`).
pub fn column_to_letters(mut col: u32) -> String {
    let mut out = Vec::with_capacity(3);
    while col > 0 {
        col -= 1;
        out.push(b'A' + (col % 26) as u8);
        col /= 26;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Convert column letters to a 1-based column number. At most three letters,
/// case-insensitive; anything else is `None`.
pub fn letters_to_column(letters: &str) -> Option<u32> {
    let bytes = letters.as_bytes();
    if bytes.is_empty() || bytes.len() > 3 {
        return None;
    }
    let mut col = 0u32;
    for &b in bytes {
        if !b.is_ascii_alphabetic() {
            return None;
        }
        col = col * 26 + u32::from(b.to_ascii_uppercase() - b'A' + 1);
    }
    (col <= MAX_COLS).then_some(col)
}

/// Parse `A1`/`$A$1` into `(row, col)`.
pub fn parse_a1(text: &str) -> Option<(u32, u32)> {
    let bytes = text.as_bytes();
    let mut i = 0;
    if bytes.first() == Some(&b'$') {
        i += 1;
    }
    let col_start = i;
    while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
        i += 1;
    }
    let col = letters_to_column(&text[col_start..i])?;
    if i < bytes.len() && bytes[i] == b'$' {
        i += 1;
    }
    let row_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i == row_start || i != bytes.len() {
        return None;
    }
    let row = text[row_start..].parse::<u32>().ok()?;
    (row >= 1 && row <= MAX_ROWS).then_some((row, col))
}
