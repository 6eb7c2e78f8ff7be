//! Column heuristics over an inventory-style sheet.
use super::common::coord;
use crate::{
    AnalysisConfig, AnalysisReport, Cell, CellValue, FindingTarget, QualityKind, Severity, Workbook,
    analyze,
};

fn text(s: &str) -> CellValue {
    CellValue::Text(s.to_string())
}

/// Header row plus Stock_Count (B) and Price (C), stored the way a decoder
/// hands them over: numbers as numbers, strings as strings.
fn inventory() -> Workbook {
    let mut wb = Workbook::new();
    let sheet = wb.add_sheet("Sheet1").unwrap();
    sheet.set(1, 2, text("Stock_Count")).unwrap();
    sheet.set(1, 3, text("Price")).unwrap();

    let stock: [Option<CellValue>; 10] = [
        Some(100.0.into()),
        Some(text("200")),
        Some(text("invalid")),
        Some(400.0.into()),
        Some((-999999.0).into()),
        Some(600.0.into()),
        Some(text("7OO")),
        Some(text("800 ")),
        None,
        Some(1000.0.into()),
    ];
    let price: [Option<CellValue>; 10] = [
        Some(10.999.into()),
        Some(text("20.00")),
        Some(30.0.into()),
        Some(text("40.0000")),
        Some(50.5.into()),
        Some(text("60")),
        None,
        Some(text("80.0")),
        Some(90.99999.into()),
        Some(text("100.")),
    ];
    for (i, (s, p)) in stock.into_iter().zip(price).enumerate() {
        let row = i as u32 + 2;
        if let Some(v) = s {
            sheet.set(row, 2, v).unwrap();
        }
        if let Some(v) = p {
            sheet.set(row, 3, v).unwrap();
        }
    }
    wb
}

fn analyze_default(wb: &Workbook) -> AnalysisReport {
    analyze(wb, &AnalysisConfig::default()).unwrap()
}

fn column_findings(report: &AnalysisReport, col: u32) -> Vec<(u32, QualityKind)> {
    report
        .quality_findings
        .iter()
        .filter(|f| f.target.column().col == col)
        .map(|f| (f.target.cell().map(|c| c.row).unwrap_or(0), f.kind))
        .collect()
}

#[test]
fn stock_count_column() {
    let report = analyze_default(&inventory());
    assert_eq!(
        column_findings(&report, 2),
        vec![
            (4, QualityKind::TypeInconsistency),
            (6, QualityKind::Outlier),
            (8, QualityKind::TypeInconsistency),
            (9, QualityKind::WhitespaceIssue),
        ]
    );

    let invalid: Vec<_> = report.quality_for(&coord("B4")).collect();
    assert_eq!(invalid[0].severity, Severity::Error);
    assert_eq!(invalid[0].value.as_deref(), Some("invalid"));
    assert_eq!(invalid[0].expected, "numeric");

    let padded: Vec<_> = report.quality_for(&coord("B9")).collect();
    assert_eq!(padded[0].severity, Severity::Info);
    assert_eq!(padded[0].expected, "800");
}

#[test]
fn price_column_formats() {
    let report = analyze_default(&inventory());
    // stored 10.999, 50.5 and 90.99999 compare by their rendered decimals
    assert_eq!(
        column_findings(&report, 3),
        vec![
            (2, QualityKind::FormatInconsistency),
            (3, QualityKind::FormatInconsistency),
            (5, QualityKind::FormatInconsistency),
            (6, QualityKind::FormatInconsistency),
            (9, QualityKind::FormatInconsistency),
            (10, QualityKind::FormatInconsistency),
        ]
    );
    let first = report.quality_for(&coord("C3")).next().unwrap();
    assert_eq!(first.expected, "0");
    let stored = report.quality_for(&coord("C2")).next().unwrap();
    assert_eq!(stored.value.as_deref(), Some("10.999"));
}

#[test]
fn default_config_flags_only_the_two_bad_stock_counts() {
    let report = analyze_default(&inventory());
    let flagged: Vec<(u32, Option<String>)> = report
        .quality_findings
        .iter()
        .filter(|f| f.target.column().col == 2)
        .filter(|f| {
            matches!(
                f.kind,
                QualityKind::TypeInconsistency | QualityKind::FormatInconsistency
            )
        })
        .map(|f| (f.target.cell().map(|c| c.row).unwrap_or(0), f.value.clone()))
        .collect();
    assert_eq!(
        flagged,
        vec![(4, Some("invalid".to_string())), (8, Some("7OO".to_string()))]
    );
}

#[test]
fn header_row_counts_as_data_when_disabled() {
    let report = analyze(&inventory(), &AnalysisConfig::default().with_header_rows(0)).unwrap();
    assert!(
        report
            .quality_for(&coord("B1"))
            .any(|f| f.kind == QualityKind::TypeInconsistency)
    );
}

#[test]
fn outlier_multiplier_is_configurable() {
    let wb = inventory();
    let strict = analyze(
        &wb,
        &AnalysisConfig::default().with_outlier_multiplier(1.0),
    )
    .unwrap();
    let outliers = column_findings(&strict, 2)
        .into_iter()
        .filter(|(_, k)| *k == QualityKind::Outlier)
        .count();
    assert!(outliers > 1);
}

#[test]
fn ambiguous_dates_are_warnings() {
    let mut wb = Workbook::new();
    let sheet = wb.add_sheet("Sheet1").unwrap();
    for (row, raw) in ["01/02/2024", "2024-01-05", "01/01/2024", "2024-13-01"].iter().enumerate() {
        sheet.set(row as u32 + 1, 1, text(raw)).unwrap();
    }
    let report = analyze(&wb, &AnalysisConfig::default()).unwrap();
    let dates: Vec<_> = report
        .quality_findings
        .iter()
        .filter(|f| f.kind == QualityKind::AmbiguousDate)
        .collect();
    assert_eq!(dates.len(), 1);
    assert_eq!(dates[0].target, FindingTarget::Cell(coord("A1")));
    assert_eq!(dates[0].severity, Severity::Warning);
    assert_eq!(dates[0].expected, "2024-01-02 or 2024-02-01");
}

#[test]
fn number_formats_give_stored_numbers_a_signature() {
    let mut wb = Workbook::new();
    let sheet = wb.add_sheet("Sheet1").unwrap();
    for row in 1..=4 {
        sheet
            .set_cell(row, 1, Cell::new(row as f64 * 1000.0).with_number_format("$#,##0.00"))
            .unwrap();
    }
    sheet.set(5, 1, text("5000")).unwrap();
    let report = analyze(&wb, &AnalysisConfig::default()).unwrap();
    let format = report.quality_for(&coord("A5")).next().unwrap();
    assert_eq!(format.kind, QualityKind::FormatInconsistency);
    assert_eq!(format.expected, "$#,##0.00");
}

#[test]
fn formula_literals_join_the_column_on_request() {
    let mut wb = Workbook::new();
    let sheet = wb.add_sheet("Sheet1").unwrap();
    for row in 1..=4 {
        sheet.set(row, 1, row as f64).unwrap();
    }
    sheet.set(5, 1, "=\"five\"").unwrap();

    let off = analyze(&wb, &AnalysisConfig::default()).unwrap();
    assert_eq!(off.quality_for(&coord("A5")).count(), 0);

    let on = analyze(&wb, &AnalysisConfig::default().with_formula_literals(true)).unwrap();
    assert!(
        on.quality_for(&coord("A5"))
            .any(|f| f.kind == QualityKind::TypeInconsistency)
    );
}
