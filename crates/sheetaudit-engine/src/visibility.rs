//! Effective visibility of each cell.
//!
//! Pure over workbook metadata. Rows are reported one by one; grouping hidden
//! rows into runs is left to the report.

use std::collections::BTreeMap;

use rayon::prelude::*;
use sheetaudit_common::CellCoord;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::workbook::{Cell, Sheet, SheetVisibility, Workbook};

bitflags::bitflags! {
    /// Every reason a cell is hidden from a typical view.
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct HiddenReason: u8 {
        const CELL       = 0b0000_0001;
        const ROW        = 0b0000_0010;
        const COLUMN     = 0b0000_0100;
        /// Protection-hidden on a protected sheet.
        const PROTECTION = 0b0000_1000;
        const SHEET      = 0b0001_0000;
    }
}

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct VisibilityState {
    pub reasons: HiddenReason,
}

impl VisibilityState {
    pub const VISIBLE: VisibilityState = VisibilityState {
        reasons: HiddenReason::empty(),
    };

    pub fn effectively_hidden(&self) -> bool {
        !self.reasons.is_empty()
    }
}

pub struct VisibilityResolver<'a> {
    workbook: &'a Workbook,
}

impl<'a> VisibilityResolver<'a> {
    pub fn new(workbook: &'a Workbook) -> Self {
        Self { workbook }
    }

    /// State of one cell, present or not.
    pub fn state(&self, coord: &CellCoord) -> VisibilityState {
        match self.workbook.sheet(&coord.sheet) {
            Some(sheet) => cell_state(sheet, coord.row, coord.col, sheet.cell(coord.row, coord.col)),
            None => VisibilityState::VISIBLE,
        }
    }

    /// State of every present cell.
    pub fn resolve(&self, parallel: bool) -> BTreeMap<CellCoord, VisibilityState> {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("resolve_visibility").entered();

        let per_sheet = |sheet: &Sheet| -> Vec<(CellCoord, VisibilityState)> {
            sheet
                .cells()
                .map(|((row, col), cell)| {
                    (
                        CellCoord::new(sheet.name(), row, col),
                        cell_state(sheet, row, col, Some(cell)),
                    )
                })
                .collect()
        };
        let states: Vec<Vec<(CellCoord, VisibilityState)>> = if parallel {
            self.workbook.sheets().par_iter().map(per_sheet).collect()
        } else {
            self.workbook.sheets().iter().map(per_sheet).collect()
        };
        let states: BTreeMap<CellCoord, VisibilityState> = states.into_iter().flatten().collect();

        #[cfg(feature = "tracing")]
        tracing::debug!(
            hidden = states.values().filter(|s| s.effectively_hidden()).count(),
            "visibility resolved"
        );

        states
    }
}

fn cell_state(sheet: &Sheet, row: u32, col: u32, cell: Option<&Cell>) -> VisibilityState {
    let mut reasons = HiddenReason::empty();
    if let Some(cell) = cell {
        reasons.set(HiddenReason::CELL, cell.hidden);
        reasons.set(
            HiddenReason::PROTECTION,
            sheet.protected && cell.protection_hidden,
        );
    }
    reasons.set(HiddenReason::ROW, sheet.is_row_hidden(row));
    reasons.set(HiddenReason::COLUMN, sheet.is_col_hidden(col));
    reasons.set(
        HiddenReason::SHEET,
        sheet.visibility != SheetVisibility::Visible,
    );
    VisibilityState { reasons }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hidden_column_hides_an_unflagged_cell() {
        let mut wb = Workbook::new();
        let sheet = wb.add_sheet("S").unwrap();
        sheet.set(1, 1, "Content").unwrap();
        sheet.set(2, 2, "More").unwrap();
        sheet.set_col_hidden(1, true);

        let states = VisibilityResolver::new(&wb).resolve(false);
        let a1 = states[&CellCoord::new("S", 1, 1)];
        assert!(a1.effectively_hidden());
        assert_eq!(a1.reasons, HiddenReason::COLUMN);
        assert!(!states[&CellCoord::new("S", 2, 2)].effectively_hidden());
    }

    #[test]
    fn protection_counts_only_on_protected_sheets() {
        let mut wb = Workbook::new();
        let sheet = wb.add_sheet("S").unwrap();
        sheet
            .set_cell(1, 2, Cell::new("Hidden").with_protection_hidden(true))
            .unwrap();
        let coord = CellCoord::new("S", 1, 2);
        assert!(!VisibilityResolver::new(&wb).state(&coord).effectively_hidden());

        wb.sheet_mut("S").unwrap().protect(true);
        assert_eq!(
            VisibilityResolver::new(&wb).state(&coord).reasons,
            HiddenReason::PROTECTION
        );
    }

    #[test]
    fn reasons_accumulate() {
        let mut wb = Workbook::new();
        let sheet = wb.add_sheet("S").unwrap();
        sheet
            .set_cell(3, 3, Cell::new("Data").with_hidden(true))
            .unwrap();
        sheet.set_row_hidden(3, true);
        sheet.set_col_hidden(3, true);
        sheet.set_visibility(SheetVisibility::VeryHidden);
        let state = VisibilityResolver::new(&wb).state(&CellCoord::new("S", 3, 3));
        assert_eq!(
            state.reasons,
            HiddenReason::CELL | HiddenReason::ROW | HiddenReason::COLUMN | HiddenReason::SHEET
        );
    }
}
