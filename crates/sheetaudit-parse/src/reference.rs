use std::error::Error;
use std::fmt::{self, Display};

use sheetaudit_common::{
    MAX_COLS, MAX_ROWS, check_bounds, column_to_letters, letters_to_column, needs_quoting,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Why a reference string could not be understood.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceError(pub String);

impl Display for ReferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid reference: {}", self.0)
    }
}

impl Error for ReferenceError {}

/// A reference to something outside the cell.
///
/// Sheet-less variants resolve against the sheet holding the formula.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ReferenceType {
    Cell {
        sheet: Option<String>,
        row: u32,
        col: u32,
    },
    /// `A1:B2`, `A:C` (whole columns) or `3:5` (whole rows).
    Range {
        sheet: Option<String>,
        start_row: Option<u32>,
        start_col: Option<u32>,
        end_row: Option<u32>,
        end_col: Option<u32>,
    },
    NamedRange(String),
    /// A reference into another workbook, e.g. `[Budget.xlsx]Q1!B4`.
    External {
        book: String,
        sheet: Option<String>,
        target: String,
    },
}

/// An inclusive, normalised rectangle of cells on one sheet.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub start_row: u32,
    pub start_col: u32,
    pub end_row: u32,
    pub end_col: u32,
}

impl Rect {
    pub fn new(r1: u32, c1: u32, r2: u32, c2: u32) -> Self {
        Rect {
            start_row: r1.min(r2),
            start_col: c1.min(c2),
            end_row: r1.max(r2),
            end_col: c1.max(c2),
        }
    }

    pub fn contains(&self, row: u32, col: u32) -> bool {
        (self.start_row..=self.end_row).contains(&row)
            && (self.start_col..=self.end_col).contains(&col)
    }

    pub fn intersects(&self, other: &Rect) -> bool {
        self.start_row <= other.end_row
            && other.start_row <= self.end_row
            && self.start_col <= other.end_col
            && other.start_col <= self.end_col
    }

    pub fn rows(&self) -> u32 {
        self.end_row - self.start_row + 1
    }

    pub fn cols(&self) -> u32 {
        self.end_col - self.start_col + 1
    }
}

impl ReferenceType {
    /// Create a reference from a string. Can be A1, $A$1, A:A, 1:1, A1:B2,
    /// Sheet1!A1, 'My Sheet'!A1:B2, [Book.xlsx]Sheet1!A1 or a defined name.
    pub fn from_string(reference: &str) -> Result<Self, ReferenceError> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(ReferenceError("empty reference".to_string()));
        }

        let (sheet, ref_part) = Self::extract_sheet_name(reference);

        if let Some(external) = Self::split_external(reference, sheet.as_deref(), &ref_part)? {
            return Ok(external);
        }
        if ref_part.contains('[') || sheet.as_deref().is_some_and(|s| s.contains('[')) {
            return Err(ReferenceError(reference.to_string()));
        }

        if ref_part.contains(':') {
            Self::parse_range_reference(&ref_part, sheet)
        } else if let Some((col, row)) = Self::parse_cell_reference(&ref_part) {
            check_bounds(row, col).map_err(|e| ReferenceError(e.to_string()))?;
            Ok(ReferenceType::Cell { sheet, row, col })
        } else if sheet.is_none() && is_valid_name(&ref_part) {
            Ok(ReferenceType::NamedRange(ref_part))
        } else {
            Err(ReferenceError(reference.to_string()))
        }
    }

    pub fn sheet(&self) -> Option<&str> {
        match self {
            ReferenceType::Cell { sheet, .. }
            | ReferenceType::Range { sheet, .. }
            | ReferenceType::External { sheet, .. } => sheet.as_deref(),
            ReferenceType::NamedRange(_) => None,
        }
    }

    pub fn is_external(&self) -> bool {
        matches!(self, ReferenceType::External { .. })
    }

    /// The rectangle covered by a cell or range reference. Unbounded ranges
    /// extend to the grid edge.
    pub fn rect(&self) -> Option<Rect> {
        match self {
            ReferenceType::Cell { row, col, .. } => Some(Rect::new(*row, *col, *row, *col)),
            ReferenceType::Range {
                start_row,
                start_col,
                end_row,
                end_col,
                ..
            } => Some(Rect::new(
                start_row.unwrap_or(1),
                start_col.unwrap_or(1),
                end_row.unwrap_or(MAX_ROWS),
                end_col.unwrap_or(MAX_COLS),
            )),
            ReferenceType::NamedRange(_) | ReferenceType::External { .. } => None,
        }
    }

    /// `[Book]Sheet!A1` arrives either as an unquoted token or as a quoted
    /// `'[Book]Sheet'!A1`; in both cases the sheet part starts with the book.
    fn split_external(
        reference: &str,
        sheet: Option<&str>,
        ref_part: &str,
    ) -> Result<Option<Self>, ReferenceError> {
        let scoped = match sheet {
            Some(s) if s.starts_with('[') => s,
            None if ref_part.starts_with('[') => ref_part,
            _ => return Ok(None),
        };
        let close = scoped
            .find(']')
            .ok_or_else(|| ReferenceError(reference.to_string()))?;
        let book = scoped[1..close].to_string();
        if book.is_empty() {
            return Err(ReferenceError(reference.to_string()));
        }
        let rest = &scoped[close + 1..];
        let (sheet, target) = match sheet {
            Some(_) => (
                (!rest.is_empty()).then(|| rest.to_string()),
                ref_part.to_string(),
            ),
            None => (None, rest.to_string()),
        };
        Ok(Some(ReferenceType::External {
            book,
            sheet,
            target,
        }))
    }

    /// Parse a range reference like "A1:B2", "A:A", or "1:1"
    fn parse_range_reference(reference: &str, sheet: Option<String>) -> Result<Self, ReferenceError> {
        let Some((start, end)) = reference.split_once(':') else {
            return Err(ReferenceError(reference.to_string()));
        };

        let (start_col, start_row) = Self::parse_range_part(start)?;
        let (end_col, end_row) = Self::parse_range_part(end)?;

        // Both ends must have the same shape: A1:B2, A:B or 1:2.
        if start_col.is_some() != end_col.is_some() || start_row.is_some() != end_row.is_some() {
            return Err(ReferenceError(format!("mixed range ends: {reference}")));
        }

        Ok(ReferenceType::Range {
            sheet,
            start_row,
            start_col,
            end_row,
            end_col,
        })
    }

    /// Parse a part of a range reference (either start or end).
    /// Returns (column, row) where either can be None for infinite ranges.
    fn parse_range_part(part: &str) -> Result<(Option<u32>, Option<u32>), ReferenceError> {
        if let Some((col, row)) = Self::parse_cell_reference(part) {
            check_bounds(row, col).map_err(|e| ReferenceError(e.to_string()))?;
            return Ok((Some(col), Some(row)));
        }

        let stripped = part.strip_prefix('$').unwrap_or(part);
        if !stripped.is_empty() && stripped.bytes().all(|b| b.is_ascii_alphabetic()) {
            let col = letters_to_column(stripped)
                .ok_or_else(|| ReferenceError(format!("Invalid column: {part}")))?;
            return Ok((Some(col), None));
        }
        if !stripped.is_empty() && stripped.bytes().all(|b| b.is_ascii_digit()) {
            let row = stripped
                .parse::<u32>()
                .ok()
                .filter(|r| (1..=MAX_ROWS).contains(r))
                .ok_or_else(|| ReferenceError(format!("Invalid row: {part}")))?;
            return Ok((None, Some(row)));
        }

        Err(ReferenceError(format!("Invalid range part: {part}")))
    }

    /// Parse a cell reference like "A1" or "$B$7" into (column, row).
    fn parse_cell_reference(reference: &str) -> Option<(u32, u32)> {
        let bytes = reference.as_bytes();
        let mut i = 0;

        if i < bytes.len() && bytes[i] == b'$' {
            i += 1;
        }

        let col_start = i;
        while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
            i += 1;
        }
        if i == col_start {
            return None;
        }
        let col = letters_to_column(&reference[col_start..i])?;

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

        let row = reference[row_start..].parse::<u32>().ok()?;
        Some((col, row))
    }

    /// Extract a sheet name from a reference. Quoted names have `''` unescaped.
    fn extract_sheet_name(reference: &str) -> (Option<String>, String) {
        let bytes = reference.as_bytes();

        if bytes.first() == Some(&b'\'') {
            let mut i = 1;
            while i < bytes.len() {
                if bytes[i] == b'\'' {
                    if i + 1 < bytes.len() && bytes[i + 1] == b'\'' {
                        i += 2;
                        continue;
                    }
                    if i + 1 < bytes.len() && bytes[i + 1] == b'!' {
                        let sheet = reference[1..i].replace("''", "'");
                        return (Some(sheet), reference[i + 2..].to_string());
                    }
                }
                i += 1;
            }
        }

        match reference.rfind('!') {
            Some(i) if i > 0 => (
                Some(reference[..i].to_string()),
                reference[i + 1..].to_string(),
            ),
            _ => (None, reference.to_string()),
        }
    }
}

/// Defined names start with a letter, `_` or `\` and continue with letters,
/// digits, `_`, `.` or `\`. Anything shaped like a cell address is not a name.
fn is_valid_name(name: &str) -> bool {
    let letters = name.bytes().take_while(|b| b.is_ascii_alphabetic()).count();
    if letters > 0
        && letters < name.len()
        && name.bytes().skip(letters).all(|b| b.is_ascii_digit())
    {
        return false;
    }
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_' || first == '\\')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '\\'))
}

fn write_sheet(f: &mut fmt::Formatter<'_>, sheet: &Option<String>) -> fmt::Result {
    match sheet {
        Some(s) if needs_quoting(s) => write!(f, "'{}'!", s.replace('\'', "''")),
        Some(s) => write!(f, "{s}!"),
        None => Ok(()),
    }
}

impl Display for ReferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceType::Cell { sheet, row, col } => {
                write_sheet(f, sheet)?;
                write!(f, "{}{}", column_to_letters(*col), row)
            }
            ReferenceType::Range {
                sheet,
                start_row,
                start_col,
                end_row,
                end_col,
            } => {
                write_sheet(f, sheet)?;
                let part = |col: &Option<u32>, row: &Option<u32>| {
                    format!(
                        "{}{}",
                        col.map(column_to_letters).unwrap_or_default(),
                        row.map(|r| r.to_string()).unwrap_or_default()
                    )
                };
                write!(f, "{}:{}", part(start_col, start_row), part(end_col, end_row))
            }
            ReferenceType::NamedRange(name) => write!(f, "{name}"),
            ReferenceType::External {
                book,
                sheet,
                target,
            } => match sheet {
                Some(s) => write!(f, "'[{book}]{}'!{target}", s.replace('\'', "''")),
                None => write!(f, "[{book}]{target}"),
            },
        }
    }
}
