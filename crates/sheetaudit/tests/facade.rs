use sheetaudit::doc_examples::analyze_cells;
use sheetaudit::{AnalysisConfig, CellStatus, ErrorClass, analyze};

#[test]
fn reexports_cover_the_pipeline() {
    let report = analyze_cells(&[("A1", "=1/0"), ("B1", "=A1*2"), ("C1", "7")]).unwrap();
    let b1 = sheetaudit::CellCoord::from_a1("Sheet1", "B1").unwrap();
    assert_eq!(report.class_of(&b1), ErrorClass::DivideByZero);
    assert_eq!(report.cell_status(&b1), CellStatus::Flagged);
}

#[test]
fn fixtures_through_the_facade() {
    let wb = sheetaudit_testkit::circular::indirect();
    let report = analyze(&wb, &AnalysisConfig::default()).unwrap();
    assert_eq!(report.cycles[0].len(), 3);
}

#[test]
fn invalid_config_is_the_only_failure() {
    let wb = sheetaudit_testkit::formula_errors();
    let err = analyze(&wb, &AnalysisConfig::default().with_outlier_multiplier(-1.0)).unwrap_err();
    assert!(err.to_string().contains("outlier"));
}
