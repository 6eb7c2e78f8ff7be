//! Common test helpers
use sheetaudit_common::CellCoord;

use crate::{AnalysisConfig, AnalysisReport, Workbook, analyze};

pub fn coord(a1: &str) -> CellCoord {
    CellCoord::from_a1("Sheet1", a1).unwrap()
}

/// A single-sheet workbook from `(address, raw text)` pairs.
pub fn sheet1(cells: &[(&str, &str)]) -> Workbook {
    let mut wb = Workbook::new();
    let sheet = wb.add_sheet("Sheet1").unwrap();
    for (a1, raw) in cells {
        let c = coord(a1);
        sheet.set_raw(c.row, c.col, raw).unwrap();
    }
    wb
}

pub fn run(wb: &Workbook) -> AnalysisReport {
    crate::init_tracing();
    analyze(wb, &AnalysisConfig::default()).unwrap()
}

pub fn run_sequential(wb: &Workbook) -> AnalysisReport {
    crate::init_tracing();
    analyze(wb, &AnalysisConfig::default().with_parallel(false)).unwrap()
}
