//! The in-memory workbook handed over by the decoding layer.
//!
//! Sheets own their cells sparsely; absent coordinates are empty. The model is
//! only read during an analysis run, so a `&Workbook` can be shared across
//! threads freely.

mod hidden;

use std::collections::BTreeMap;
use std::ops::Bound;

use rustc_hash::FxHashMap;
use sheetaudit_common::{CellCoord, check_bounds, parse_plain_number};
use sheetaudit_parse::{FORMULA_MARKER, Rect, ReferenceType};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub use hidden::HiddenSet;

use crate::error::ModelError;

const MAX_SHEET_NAME_LEN: usize = 31;

/// What a cell stores, before any interpretation.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    Boolean(bool),
    /// Formula text including the leading `=`.
    Formula(String),
}

impl CellValue {
    /// Classify raw decoder text: `=...` is a formula, a clean number is
    /// numeric, anything else is text. Padded numbers such as `"800 "` stay
    /// text so their whitespace can be reported.
    pub fn from_raw(raw: &str) -> Self {
        if raw.is_empty() {
            CellValue::Empty
        } else if raw.starts_with(FORMULA_MARKER) {
            CellValue::Formula(raw.to_string())
        } else if raw.trim() == raw
            && let Some(n) = parse_plain_number(raw)
        {
            CellValue::Number(n)
        } else {
            CellValue::Text(raw.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    pub fn is_formula(&self) -> bool {
        matches!(self, CellValue::Formula(_))
    }

    pub fn as_formula(&self) -> Option<&str> {
        match self {
            CellValue::Formula(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

impl From<&str> for CellValue {
    fn from(raw: &str) -> Self {
        CellValue::from_raw(raw)
    }
}

/// The type tag a container format may store next to the value.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclaredType {
    Numeric,
    Text,
    Boolean,
    Date,
    Formula,
    Error,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SheetVisibility {
    #[default]
    Visible,
    Hidden,
    VeryHidden,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cell {
    pub value: CellValue,
    pub declared_type: Option<DeclaredType>,
    pub number_format: Option<String>,
    pub hidden: bool,
    /// Hidden by protection; only effective while the sheet is protected.
    pub protection_hidden: bool,
}

impl Cell {
    pub fn new(value: impl Into<CellValue>) -> Self {
        Cell {
            value: value.into(),
            ..Default::default()
        }
    }

    pub fn with_declared_type(mut self, declared: DeclaredType) -> Self {
        self.declared_type = Some(declared);
        self
    }

    pub fn with_number_format(mut self, format: impl Into<String>) -> Self {
        self.number_format = Some(format.into());
        self
    }

    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn with_protection_hidden(mut self, hidden: bool) -> Self {
        self.protection_hidden = hidden;
        self
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sheet {
    name: String,
    cells: BTreeMap<(u32, u32), Cell>,
    pub protected: bool,
    pub visibility: SheetVisibility,
    hidden_rows: HiddenSet,
    hidden_cols: HiddenSet,
}

impl Sheet {
    fn new(name: String) -> Self {
        Sheet {
            name,
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store a value, replacing whatever the cell held but keeping its metadata.
    pub fn set(
        &mut self,
        row: u32,
        col: u32,
        value: impl Into<CellValue>,
    ) -> Result<&mut Cell, ModelError> {
        check_bounds(row, col)?;
        let cell = self.cells.entry((row, col)).or_default();
        cell.value = value.into();
        Ok(cell)
    }

    pub fn set_raw(&mut self, row: u32, col: u32, raw: &str) -> Result<&mut Cell, ModelError> {
        self.set(row, col, CellValue::from_raw(raw))
    }

    pub fn set_cell(&mut self, row: u32, col: u32, cell: Cell) -> Result<(), ModelError> {
        check_bounds(row, col)?;
        self.cells.insert((row, col), cell);
        Ok(())
    }

    pub fn cell(&self, row: u32, col: u32) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    pub fn cell_mut(&mut self, row: u32, col: u32) -> Option<&mut Cell> {
        self.cells.get_mut(&(row, col))
    }

    /// Present cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = ((u32, u32), &Cell)> + '_ {
        self.cells.iter().map(|(pos, cell)| (*pos, cell))
    }

    /// Present cells inside `rect`, row-major.
    pub fn cells_in(&self, rect: Rect) -> impl Iterator<Item = ((u32, u32), &Cell)> + '_ {
        self.cells
            .range((
                Bound::Included((rect.start_row, rect.start_col)),
                Bound::Included((rect.end_row, rect.end_col)),
            ))
            .filter(move |((_, col), _)| (rect.start_col..=rect.end_col).contains(col))
            .map(|(pos, cell)| (*pos, cell))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The used area as (last row, last column), or `None` for a blank sheet.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        let last_row = self.cells.keys().next_back()?.0;
        let last_col = self.cells.keys().map(|(_, c)| *c).max()?;
        Some((last_row, last_col))
    }

    pub fn set_row_hidden(&mut self, row: u32, hidden: bool) -> bool {
        self.hidden_rows.set(row, hidden)
    }

    pub fn set_rows_hidden(&mut self, start: u32, end: u32, hidden: bool) -> bool {
        self.hidden_rows.set_range(start, end, hidden)
    }

    pub fn set_col_hidden(&mut self, col: u32, hidden: bool) -> bool {
        self.hidden_cols.set(col, hidden)
    }

    pub fn set_cols_hidden(&mut self, start: u32, end: u32, hidden: bool) -> bool {
        self.hidden_cols.set_range(start, end, hidden)
    }

    pub fn is_row_hidden(&self, row: u32) -> bool {
        self.hidden_rows.contains(row)
    }

    pub fn is_col_hidden(&self, col: u32) -> bool {
        self.hidden_cols.contains(col)
    }

    pub fn hidden_rows(&self) -> &HiddenSet {
        &self.hidden_rows
    }

    pub fn hidden_cols(&self) -> &HiddenSet {
        &self.hidden_cols
    }

    pub fn protect(&mut self, protected: bool) -> &mut Self {
        self.protected = protected;
        self
    }

    pub fn set_visibility(&mut self, visibility: SheetVisibility) -> &mut Self {
        self.visibility = visibility;
        self
    }
}

/// A workbook-scoped name pointing at a cell or range.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct DefinedName {
    pub name: String,
    /// Always sheet-qualified; the sheet need not exist.
    pub target: ReferenceType,
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    sheets: Vec<Sheet>,
    #[cfg_attr(feature = "serde", serde(skip))]
    sheet_index: FxHashMap<String, usize>,
    names: BTreeMap<String, DefinedName>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sheet. Names are unique ignoring ASCII case.
    pub fn add_sheet(&mut self, name: impl Into<String>) -> Result<&mut Sheet, ModelError> {
        let name = name.into();
        validate_sheet_name(&name)?;
        if self.sheet_position(&name).is_some() {
            return Err(ModelError::DuplicateSheet(name));
        }
        let key = name.to_ascii_lowercase();
        let idx = self.sheets.len();
        self.sheet_index.insert(key, idx);
        self.sheets.push(Sheet::new(name));
        Ok(&mut self.sheets[idx])
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheet_position(name).map(|idx| &self.sheets[idx])
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        self.sheet_position(name).map(|idx| &mut self.sheets[idx])
    }

    /// Mutable access that reports an unknown sheet as an error.
    pub fn try_sheet_mut(&mut self, name: &str) -> Result<&mut Sheet, ModelError> {
        self.sheet_mut(name)
            .ok_or_else(|| ModelError::UnknownSheet(name.to_string()))
    }

    fn sheet_position(&self, name: &str) -> Option<usize> {
        if self.sheet_index.len() != self.sheets.len() {
            // deserialized without the index
            return self
                .sheets
                .iter()
                .position(|s| s.name.eq_ignore_ascii_case(name));
        }
        self.sheet_index.get(&name.to_ascii_lowercase()).copied()
    }

    pub fn cell(&self, coord: &CellCoord) -> Option<&Cell> {
        self.sheet(&coord.sheet)?.cell(coord.row, coord.col)
    }

    /// Canonical spelling of a sheet name as stored in the workbook.
    pub fn canonical_sheet_name(&self, name: &str) -> Option<&str> {
        self.sheet(name).map(Sheet::name)
    }

    /// Define (or redefine) a workbook-scoped name such as `Rates` ->
    /// `Sheet1!$B$2:$B$9`.
    pub fn define_name(&mut self, name: &str, target: &str) -> Result<(), ModelError> {
        let invalid = |reason: &str| ModelError::InvalidName {
            name: name.to_string(),
            reason: reason.to_string(),
        };
        match ReferenceType::from_string(name) {
            Ok(ReferenceType::NamedRange(parsed)) if parsed == name => {}
            _ => return Err(invalid("not a valid defined name")),
        }
        let target = ReferenceType::from_string(target).map_err(|e| invalid(&e.to_string()))?;
        match &target {
            ReferenceType::Cell { sheet: Some(_), .. } | ReferenceType::Range { sheet: Some(_), .. } => {}
            _ => return Err(invalid("target must be a sheet-qualified cell or range")),
        }
        self.names.insert(
            name.to_ascii_uppercase(),
            DefinedName {
                name: name.to_string(),
                target,
            },
        );
        Ok(())
    }

    pub fn defined_name(&self, name: &str) -> Option<&DefinedName> {
        self.names.get(&name.to_ascii_uppercase())
    }

    pub fn defined_names(&self) -> impl Iterator<Item = &DefinedName> + '_ {
        self.names.values()
    }

    /// Every present cell with its coordinate, sheet by sheet in workbook order.
    pub fn cells(&self) -> impl Iterator<Item = (CellCoord, &Cell)> + '_ {
        self.sheets.iter().flat_map(|sheet| {
            sheet
                .cells()
                .map(move |((row, col), cell)| (CellCoord::new(sheet.name(), row, col), cell))
        })
    }
}

fn validate_sheet_name(name: &str) -> Result<(), ModelError> {
    let bad = name.trim().is_empty()
        || name.chars().count() > MAX_SHEET_NAME_LEN
        || name.starts_with('\'')
        || name.ends_with('\'')
        || name.contains(['[', ']', ':', '*', '?', '/', '\\']);
    if bad {
        Err(ModelError::InvalidSheetName(name.to_string()))
    } else {
        Ok(())
    }
}
