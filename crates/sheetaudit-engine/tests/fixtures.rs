//! Analysis of the acceptance workbooks.
use sheetaudit_engine::{
    AnalysisConfig, AnalysisReport, CellCoord, ErrorClass, ErrorOrigin, HiddenReason, QualityKind,
    StructuralKind, Workbook, analyze,
};
use sheetaudit_testkit::{self as testkit, sheet1};

fn run(wb: &Workbook) -> AnalysisReport {
    sheetaudit_engine::init_tracing();
    analyze(wb, &AnalysisConfig::default()).unwrap()
}

fn findings_in(report: &AnalysisReport, col: u32) -> Vec<(u32, QualityKind)> {
    report
        .quality_findings
        .iter()
        .filter(|f| f.target.column().col == col)
        .map(|f| (f.target.cell().map(|c| c.row).unwrap_or(0), f.kind))
        .collect()
}

#[test]
fn direct_circular() {
    let report = run(&testkit::circular::direct());
    assert_eq!(report.cycles.len(), 1);
    assert_eq!(report.cycles[0].path, vec![sheet1("A1"), sheet1("A1")]);
    assert_eq!(report.class_of(&sheet1("A1")), ErrorClass::CircularReference);
}

#[test]
fn indirect_circular() {
    let report = run(&testkit::circular::indirect());
    assert_eq!(report.cycles.len(), 1);
    assert_eq!(
        report.cycles[0].path,
        vec![sheet1("A1"), sheet1("B1"), sheet1("C1"), sheet1("A1")]
    );
    for a1 in ["A1", "B1", "C1"] {
        assert_eq!(report.class_of(&sheet1(a1)), ErrorClass::CircularReference);
    }
}

#[test]
fn valid_cross_reference() {
    let report = run(&testkit::circular::valid_cross_reference());
    assert!(report.cycles.is_empty());
    assert!(report.error_classes.values().all(|c| !c.is_error()));
    assert_eq!(report.metadata.formula_count, 1);
}

#[test]
fn formula_error_grid() {
    let report = run(&testkit::formula_errors());

    // self-references through their own cell or range
    let cyclic: Vec<CellCoord> = report.cycles.iter().map(|c| c.members[0].clone()).collect();
    assert_eq!(cyclic, vec![sheet1("A1"), sheet1("B1"), sheet1("D1"), sheet1("A2")]);

    let expect = [
        ("A1", ErrorClass::CircularReference),
        ("B1", ErrorClass::CircularReference),
        ("C1", ErrorClass::UnknownFunction),
        ("D1", ErrorClass::CircularReference),
        ("A2", ErrorClass::CircularReference),
        ("B2", ErrorClass::UnresolvedReference),
        ("C2", ErrorClass::InvalidValueCoercion),
        ("D2", ErrorClass::UnresolvedReference),
        ("A3", ErrorClass::DivideByZero),
        ("B3", ErrorClass::NotAvailable),
        ("B4", ErrorClass::UnresolvedReference),
        ("C4", ErrorClass::InvalidValueCoercion),
        ("D4", ErrorClass::MissingArgument),
    ];
    for (a1, class) in expect {
        assert_eq!(report.class_of(&sheet1(a1)), class, "{a1}");
    }

    // malformed fragments are flagged, whatever their exact class
    assert!(report.class_of(&sheet1("C3")).is_error());
    assert!(report.class_of(&sheet1("D3")).is_error());

    // A4 has empty arguments but reads the circular A1
    let a4 = &report.error_classes[&sheet1("A4")];
    assert_eq!(a4.class, ErrorClass::CircularReference);
    assert_eq!(a4.origin, Some(ErrorOrigin::Propagated { from: sheet1("A1") }));
    assert!(
        report
            .structural_for(&sheet1("A4"))
            .any(|f| f.class == ErrorClass::MissingArgument)
    );

    assert!(report.error_classes.values().all(|c| c.is_error()));
}

#[test]
fn data_quality_columns() {
    let report = run(&testkit::data_quality());

    assert_eq!(
        findings_in(&report, 2),
        vec![
            (4, QualityKind::TypeInconsistency),
            (6, QualityKind::Outlier),
            (8, QualityKind::TypeInconsistency),
            (9, QualityKind::WhitespaceIssue),
        ]
    );
    let price_rows: Vec<u32> = findings_in(&report, 3)
        .into_iter()
        .filter(|(_, k)| *k == QualityKind::FormatInconsistency)
        .map(|(row, _)| row)
        .collect();
    assert_eq!(price_rows, vec![2, 3, 5, 6, 9, 10]);
    assert_eq!(findings_in(&report, 3).len(), 6);
    // 123 among product codes
    assert!(findings_in(&report, 1).contains(&(4, QualityKind::TypeInconsistency)));
    // "01-01-2024 "
    assert!(findings_in(&report, 4).contains(&(7, QualityKind::WhitespaceIssue)));
    // "2024-13-01"
    assert!(findings_in(&report, 4).contains(&(3, QualityKind::InvalidDate)));
}

#[test]
fn formatting_issues() {
    let report = run(&testkit::formatting_issues());

    let whitespace = |col| {
        findings_in(&report, col)
            .into_iter()
            .filter(|(_, k)| *k == QualityKind::WhitespaceIssue)
            .map(|(row, _)| row)
            .collect::<Vec<_>>()
    };
    assert_eq!(whitespace(1), vec![2, 3, 4, 5]);
    assert_eq!(whitespace(4), vec![2, 3, 5]);

    let salary = findings_in(&report, 2);
    assert_eq!(salary.len(), 4);
    assert!(salary.iter().all(|(_, k)| *k == QualityKind::FormatInconsistency));
    assert!(!salary.iter().any(|(row, _)| *row == 3));

    assert!(findings_in(&report, 3).is_empty());
    assert_eq!(
        findings_in(&report, 5),
        vec![
            (3, QualityKind::PercentageRepresentationMismatch),
            (4, QualityKind::PercentageRepresentationMismatch),
        ]
    );
}

#[test]
fn hidden_cells() {
    let report = run(&testkit::hidden::hidden_cells());
    assert!(!report.is_hidden(&sheet1("A1")));
    assert!(report.is_hidden(&sheet1("B1")));
    assert_eq!(report.visibility[&sheet1("B1")].reasons, HiddenReason::PROTECTION);
}

#[test]
fn hidden_rows_and_columns() {
    let report = run(&testkit::hidden::hidden_rows_columns());
    assert!(report.is_hidden(&sheet1("A1")));
    assert!(!report.is_hidden(&sheet1("B2")));
    assert!(report.is_hidden(&sheet1("C3")));
    assert_eq!(report.hidden_columns["Sheet1"], vec![1, 3]);
    assert_eq!(report.hidden_rows["Sheet1"], vec![1, 3]);
}

#[test]
fn consecutive_hidden_rows() {
    let report = run(&testkit::hidden::consecutive_hidden_rows());
    assert_eq!(report.hidden_rows["Sheet1"], vec![1, 2, 4, 5]);
    assert_eq!(report.hidden_row_runs("Sheet1"), vec![1..=2, 4..=5]);
}

#[test]
fn mixed_workbook_with_hidden_copy() {
    let report = run(&testkit::mixed_workbook());
    let main = |a1: &str| CellCoord::from_a1("Main", a1).unwrap();
    let hidden = |a1: &str| CellCoord::from_a1("Hidden", a1).unwrap();

    assert_eq!(report.metadata.sheet_count, 2);
    assert_eq!(report.metadata.hidden_sheets, vec!["Hidden".to_string()]);

    for coord in [main("E2"), hidden("E2")] {
        assert_eq!(report.class_of(&coord), ErrorClass::DivideByZero, "{coord}");
    }
    let hidden_div = report
        .structural_for(&hidden("E2"))
        .find(|f| f.kind == StructuralKind::DivisionByZero)
        .unwrap();
    assert!(hidden_div.effectively_hidden);
    let main_div = report
        .structural_for(&main("E2"))
        .find(|f| f.kind == StructuralKind::DivisionByZero)
        .unwrap();
    assert!(!main_div.effectively_hidden);

    assert_eq!(report.class_of(&main("E4")), ErrorClass::UnknownFunction);
    assert_eq!(report.class_of(&main("E8")), ErrorClass::InvalidValueCoercion);
    assert_eq!(report.class_of(&main("E10")), ErrorClass::MissingArgument);
    assert_eq!(report.class_of(&main("E11")), ErrorClass::UnresolvedReference);

    // "Sales " and " 1800.25 "
    assert!(
        report
            .quality_for(&main("D3"))
            .any(|f| f.kind == QualityKind::WhitespaceIssue)
    );
    assert!(
        report
            .quality_for(&main("C9"))
            .any(|f| f.kind == QualityKind::WhitespaceIssue)
    );
    // -999999999 among amounts
    assert!(report.quality_for(&main("C5")).any(|f| f.kind == QualityKind::Outlier));
    assert!(
        report
            .quality_for(&main("B4"))
            .any(|f| f.kind == QualityKind::InvalidDate)
    );
}
