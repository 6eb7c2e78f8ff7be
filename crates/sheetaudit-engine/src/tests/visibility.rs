use super::common::{coord, run};
use crate::{
    Cell, CellValue, HiddenReason, SheetVisibility, StructuralKind, Workbook,
};

#[test]
fn protection_hidden_needs_a_protected_sheet() {
    let mut wb = Workbook::new();
    let sheet = wb.add_sheet("Sheet1").unwrap();
    sheet.set(1, 1, "Visible").unwrap();
    sheet
        .set_cell(1, 2, Cell::new("Hidden").with_protection_hidden(true))
        .unwrap();

    let report = run(&wb);
    assert!(!report.is_hidden(&coord("B1")));

    wb.sheet_mut("Sheet1").unwrap().protect(true);
    let report = run(&wb);
    assert!(!report.is_hidden(&coord("A1")));
    assert!(report.is_hidden(&coord("B1")));
    assert_eq!(report.visibility[&coord("B1")].reasons, HiddenReason::PROTECTION);
}

#[test]
fn hidden_rows_and_columns() {
    let mut wb = Workbook::new();
    let sheet = wb.add_sheet("Sheet1").unwrap();
    sheet.set(1, 1, "Content").unwrap();
    sheet.set(2, 2, "More").unwrap();
    sheet.set(3, 3, "Data").unwrap();
    sheet.set_col_hidden(1, true);
    sheet.set_col_hidden(3, true);
    sheet.set_row_hidden(1, true);
    sheet.set_row_hidden(3, true);

    let report = run(&wb);
    assert_eq!(
        report.visibility[&coord("A1")].reasons,
        HiddenReason::ROW | HiddenReason::COLUMN
    );
    assert!(!report.is_hidden(&coord("B2")));
    assert!(report.is_hidden(&coord("C3")));
    assert_eq!(report.hidden_rows["Sheet1"], vec![1, 3]);
    assert_eq!(report.hidden_columns["Sheet1"], vec![1, 3]);
}

#[test]
fn consecutive_hidden_rows_group_into_runs() {
    let mut wb = Workbook::new();
    let sheet = wb.add_sheet("Sheet1").unwrap();
    for row in 1..=5 {
        sheet.set(row, 1, CellValue::Text(format!("Row {row}"))).unwrap();
    }
    for row in [1, 2, 4, 5] {
        sheet.set_row_hidden(row, true);
    }

    let report = run(&wb);
    assert_eq!(report.hidden_rows["Sheet1"], vec![1, 2, 4, 5]);
    assert_eq!(report.hidden_row_runs("Sheet1"), vec![1..=2, 4..=5]);
    assert!(report.hidden_column_runs("Sheet1").is_empty());
    assert!(!report.is_hidden(&coord("A3")));
}

#[test]
fn hidden_sheets_hide_every_cell() {
    let mut wb = Workbook::new();
    wb.add_sheet("Main").unwrap().set(1, 1, "=Hidden!A1*2").unwrap();
    let hidden = wb.add_sheet("Hidden").unwrap();
    hidden.set(1, 1, 0.0).unwrap();
    hidden.set(2, 1, "=1/A1").unwrap();
    hidden.set_visibility(SheetVisibility::VeryHidden);

    let report = run(&wb);
    let h2 = sheetaudit_common::CellCoord::new("Hidden", 2, 1);
    assert_eq!(report.visibility[&h2].reasons, HiddenReason::SHEET);
    assert!(!report.is_hidden(&sheetaudit_common::CellCoord::new("Main", 1, 1)));
    assert_eq!(report.metadata.hidden_sheets, vec!["Hidden".to_string()]);

    let finding = report
        .structural_findings
        .iter()
        .find(|f| f.kind == StructuralKind::DivisionByZero)
        .unwrap();
    assert_eq!(finding.cell, h2);
    assert!(finding.effectively_hidden);
}

#[test]
fn column_findings_in_hidden_columns_are_marked() {
    let mut wb = Workbook::new();
    let sheet = wb.add_sheet("Sheet1").unwrap();
    for (row, raw) in ["1", "abc", "2024-01-05", "TRUE"].iter().enumerate() {
        sheet.set(row as u32 + 1, 1, CellValue::Text(raw.to_string())).unwrap();
    }
    sheet.set_col_hidden(1, true);

    let report = run(&wb);
    assert!(!report.quality_findings.is_empty());
    assert!(report.quality_findings.iter().all(|f| f.effectively_hidden));
}

#[test]
fn column_ranges_hide_every_column_in_them() {
    let mut wb = Workbook::new();
    let sheet = wb.add_sheet("Sheet1").unwrap();
    for col in 1..=5 {
        sheet.set(1, col, CellValue::Text(format!("c{col}"))).unwrap();
    }
    sheet.set_cols_hidden(2, 3, true);
    sheet.set_col_hidden(5, true);

    let report = run(&wb);
    assert_eq!(report.hidden_columns["Sheet1"], vec![2, 3, 5]);
    assert_eq!(report.hidden_column_runs("Sheet1"), vec![2..=3, 5..=5]);
    assert!(report.is_hidden(&coord("C1")));
    assert!(!report.is_hidden(&coord("D1")));
}
