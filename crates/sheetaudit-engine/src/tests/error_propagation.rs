//! Local error flags and how they travel along dependency edges.
use super::common::{coord, run, sheet1};
use crate::{
    AnalysisConfig, Cell, CellStatus, CellValue, DeclaredType, ErrorClass, ErrorOrigin,
    SeverityOrder, StructuralKind, Workbook, analyze,
};

#[test]
fn division_by_zero_propagates_to_dependents() {
    let wb = sheet1(&[("A1", "=1/0"), ("B1", "=A1+1"), ("C1", "=B1*2")]);
    let report = run(&wb);

    let a1 = &report.error_classes[&coord("A1")];
    assert_eq!(a1.class, ErrorClass::DivideByZero);
    assert_eq!(a1.origin, Some(ErrorOrigin::Local));

    let b1 = &report.error_classes[&coord("B1")];
    assert_eq!(b1.class, ErrorClass::DivideByZero);
    assert_eq!(b1.origin, Some(ErrorOrigin::Propagated { from: coord("A1") }));

    let c1 = &report.error_classes[&coord("C1")];
    assert_eq!(c1.origin, Some(ErrorOrigin::Propagated { from: coord("B1") }));
}

#[test]
fn dividing_by_an_empty_or_zero_cell() {
    let wb = sheet1(&[("A1", "=10/B1"), ("A2", "0"), ("B2", "=5/A2"), ("C2", "=MOD(7,A2)")]);
    let report = run(&wb);

    assert_eq!(report.class_of(&coord("A1")), ErrorClass::DivideByZero);
    assert_eq!(report.class_of(&coord("B2")), ErrorClass::DivideByZero);
    assert_eq!(report.class_of(&coord("C2")), ErrorClass::DivideByZero);
    assert!(
        report
            .structural_for(&coord("B2"))
            .any(|f| f.kind == StructuralKind::DivisionByZero)
    );
}

#[test]
fn clean_formulas_stay_clean() {
    let wb = sheet1(&[("A1", "1"), ("B1", "=A1*2"), ("C1", "=SUM(A1:B1)")]);
    let report = run(&wb);
    for a1 in ["A1", "B1", "C1"] {
        assert_eq!(report.class_of(&coord(a1)), ErrorClass::None, "{a1}");
        assert_eq!(report.error_classes[&coord(a1)].origin, None);
        assert_eq!(report.cell_status(&coord(a1)), CellStatus::Clean);
    }
    assert_eq!(report.cell_status(&coord("Z99")), CellStatus::NotAnalyzed);
}

#[test]
fn unknown_function_does_not_stop_the_analysis() {
    let wb = sheet1(&[("A1", "=UNKNOWNFUNC()"), ("B1", "=1/0"), ("C1", "=A1")]);
    let report = run(&wb);

    assert_eq!(report.class_of(&coord("A1")), ErrorClass::UnknownFunction);
    assert_eq!(report.class_of(&coord("B1")), ErrorClass::DivideByZero);
    assert_eq!(report.class_of(&coord("C1")), ErrorClass::UnknownFunction);
}

#[test]
fn worst_dependency_wins_under_the_configured_order() {
    let wb = sheet1(&[("A1", "=1/0"), ("B1", "=NA()"), ("C1", "=A1+B1")]);

    let report = run(&wb);
    assert_eq!(report.class_of(&coord("C1")), ErrorClass::DivideByZero);

    let mut ranked = vec![ErrorClass::NotAvailable];
    ranked.extend(
        ErrorClass::ERRORS
            .iter()
            .copied()
            .filter(|c| *c != ErrorClass::NotAvailable),
    );
    let config = AnalysisConfig::default().with_severity_order(SeverityOrder::new(ranked).unwrap());
    let report = analyze(&wb, &config).unwrap();
    let c1 = &report.error_classes[&coord("C1")];
    assert_eq!(c1.class, ErrorClass::NotAvailable);
    assert_eq!(c1.origin, Some(ErrorOrigin::Propagated { from: coord("B1") }));
}

#[test]
fn local_class_wins_ties_with_inherited() {
    let wb = sheet1(&[("A1", "=1/0"), ("B1", "=A1/0")]);
    let report = run(&wb);
    assert_eq!(report.error_classes[&coord("B1")].origin, Some(ErrorOrigin::Local));
}

#[test]
fn equal_dependencies_resolve_to_the_smallest_coordinate() {
    let wb = sheet1(&[("A2", "=1/0"), ("A1", "=2/0"), ("B1", "=A2+A1")]);
    let report = run(&wb);
    assert_eq!(
        report.error_classes[&coord("B1")].origin,
        Some(ErrorOrigin::Propagated { from: coord("A1") })
    );
}

#[test]
fn stored_error_values_propagate() {
    let mut wb = Workbook::new();
    let sheet = wb.add_sheet("Sheet1").unwrap();
    sheet
        .set_cell(
            1,
            1,
            Cell::new(CellValue::Text("#N/A".into())).with_declared_type(DeclaredType::Error),
        )
        .unwrap();
    sheet.set(1, 2, "=A1").unwrap();

    let report = run(&wb);
    assert_eq!(report.class_of(&coord("A1")), ErrorClass::NotAvailable);
    assert_eq!(
        report.error_classes[&coord("B1")].origin,
        Some(ErrorOrigin::Propagated { from: coord("A1") })
    );
}

#[test]
fn unresolvable_references() {
    let wb = sheet1(&[("A1", "=Missing!A1"), ("B1", "=NULL"), ("C1", "=SUM(#REF!)")]);
    let report = run(&wb);
    for a1 in ["A1", "B1", "C1"] {
        assert_eq!(report.class_of(&coord(a1)), ErrorClass::UnresolvedReference, "{a1}");
    }
    assert!(
        report
            .structural_for(&coord("A1"))
            .any(|f| f.kind == StructuralKind::UnresolvedSheet)
    );
    assert!(
        report
            .structural_for(&coord("B1"))
            .any(|f| f.kind == StructuralKind::UndefinedName)
    );
    assert!(report.edges.is_empty());
}

#[test]
fn defined_names_become_edges() {
    let mut wb = sheet1(&[("B1", "=1/0"), ("A1", "=Rate*2")]);
    wb.define_name("Rate", "Sheet1!$B$1").unwrap();
    let report = run(&wb);
    assert_eq!(
        report.error_classes[&coord("A1")].origin,
        Some(ErrorOrigin::Propagated { from: coord("B1") })
    );
}

#[test]
fn external_references_are_informational() {
    let wb = sheet1(&[("A1", "=[Budget.xlsx]Sheet1!A1+1")]);
    let report = run(&wb);
    assert_eq!(report.class_of(&coord("A1")), ErrorClass::None);
    assert!(
        report
            .structural_for(&coord("A1"))
            .any(|f| f.kind == StructuralKind::ExternalReference && f.class == ErrorClass::None)
    );
    assert_eq!(report.metadata.external_reference_count, 1);
}

#[test]
fn lookups_checked_against_their_tables() {
    let wb = sheet1(&[
        ("A1", "a"),
        ("A2", "b"),
        ("A3", "c"),
        ("B1", "=VLOOKUP(\"z\",A1:A3,1,FALSE)"),
        ("B2", "=VLOOKUP(\"B\",A1:A3,1,FALSE)"),
        ("B3", "=VLOOKUP(\"a\",A1:A3,3,FALSE)"),
        ("B4", "=MATCH(\"q\",A1:A3,0)"),
    ]);
    let report = run(&wb);
    assert_eq!(report.class_of(&coord("B1")), ErrorClass::NotAvailable);
    assert_eq!(report.class_of(&coord("B2")), ErrorClass::None);
    assert_eq!(report.class_of(&coord("B3")), ErrorClass::UnresolvedReference);
    assert_eq!(report.class_of(&coord("B4")), ErrorClass::NotAvailable);
}

#[test]
fn text_coercions() {
    let wb = sheet1(&[
        ("A1", "=VALUE(\"abc\")"),
        ("A2", "=1+\"text\""),
        ("A3", "hello"),
        ("A4", "=A3*2"),
        ("A5", "=VALUE(\"$1,200\")"),
    ]);
    let report = run(&wb);
    assert_eq!(report.class_of(&coord("A1")), ErrorClass::InvalidValueCoercion);
    assert_eq!(report.class_of(&coord("A2")), ErrorClass::InvalidValueCoercion);
    assert_eq!(report.class_of(&coord("A4")), ErrorClass::InvalidValueCoercion);
    assert_eq!(report.class_of(&coord("A5")), ErrorClass::None);
}

#[test]
fn missing_arguments() {
    let wb = sheet1(&[("A1", "=SUM()"), ("A2", "=IF(B1=\"\",,)"), ("A3", "=1+")]);
    let report = run(&wb);
    for a1 in ["A1", "A2", "A3"] {
        assert_eq!(report.class_of(&coord(a1)), ErrorClass::MissingArgument, "{a1}");
    }
}
