//! Circular references through the full pipeline.
use super::common::{coord, run, sheet1};
use crate::graph::GraphBuilder;
use crate::{CycleDetector, ErrorClass, ErrorOrigin, formulas::parse_formulas};

#[test]
fn direct_self_reference_is_a_cycle_of_one() {
    let wb = sheet1(&[("A1", "=A1+1")]);
    let report = run(&wb);

    assert_eq!(report.cycles.len(), 1);
    assert_eq!(report.cycles[0].members, vec![coord("A1")]);
    assert_eq!(report.cycles[0].path, vec![coord("A1"), coord("A1")]);
    assert_eq!(report.class_of(&coord("A1")), ErrorClass::CircularReference);
    assert_eq!(
        report.error_classes[&coord("A1")].origin,
        Some(ErrorOrigin::Circular)
    );
}

#[test]
fn three_cell_chain_is_one_cycle() {
    let wb = sheet1(&[("A1", "=B1+1"), ("B1", "=C1+1"), ("C1", "=A1+1")]);
    let report = run(&wb);

    assert_eq!(report.cycles.len(), 1);
    let cycle = &report.cycles[0];
    assert_eq!(cycle.members, vec![coord("A1"), coord("B1"), coord("C1")]);
    assert_eq!(
        cycle.path,
        vec![coord("A1"), coord("B1"), coord("C1"), coord("A1")]
    );
    for a1 in ["A1", "B1", "C1"] {
        assert_eq!(report.class_of(&coord(a1)), ErrorClass::CircularReference, "{a1}");
    }
}

#[test]
fn valid_cross_reference_has_no_cycle() {
    let wb = sheet1(&[("A1", "1"), ("B1", "=A1*2")]);
    let report = run(&wb);

    assert!(report.cycles.is_empty());
    assert_eq!(report.class_of(&coord("A1")), ErrorClass::None);
    assert_eq!(report.class_of(&coord("B1")), ErrorClass::None);
    assert_eq!(report.edges.len(), 1);
    assert_eq!(report.edges[0].from, coord("B1"));
    assert_eq!(report.edges[0].to, coord("A1"));
}

#[test]
fn circularity_dominates_local_errors() {
    // A1 divides by zero and references itself
    let wb = sheet1(&[("A1", "=A1/0")]);
    let report = run(&wb);
    assert_eq!(report.class_of(&coord("A1")), ErrorClass::CircularReference);
}

#[test]
fn cycle_members_propagate_to_dependents() {
    let wb = sheet1(&[("A1", "=B1"), ("B1", "=A1"), ("C1", "=A1+1"), ("D1", "=C1")]);
    let report = run(&wb);

    assert_eq!(report.cycles.len(), 1);
    assert!(report.cycle_containing(&coord("C1")).is_none());
    assert_eq!(report.class_of(&coord("C1")), ErrorClass::CircularReference);
    assert_eq!(
        report.error_classes[&coord("D1")].origin,
        Some(ErrorOrigin::Propagated { from: coord("C1") })
    );
}

#[test]
fn representative_path_takes_the_shortest_loop_from_the_smallest_member() {
    // A1 -> B1 -> A1 and A1 -> C1 -> D1 -> A1 share one component
    let wb = sheet1(&[
        ("A1", "=C1+B1"),
        ("B1", "=A1"),
        ("C1", "=D1"),
        ("D1", "=A1"),
    ]);
    let report = run(&wb);
    assert_eq!(report.cycles.len(), 1);
    assert_eq!(report.cycles[0].len(), 4);
    assert_eq!(report.cycles[0].path, vec![coord("A1"), coord("B1"), coord("A1")]);
}

#[test]
fn separate_cycles_stay_separate() {
    let wb = sheet1(&[("A1", "=B1"), ("B1", "=A1"), ("A5", "=A5"), ("C3", "=A1+A5")]);
    let report = run(&wb);
    assert_eq!(report.cycles.len(), 2);
    assert_eq!(report.cycles[0].members, vec![coord("A1"), coord("B1")]);
    assert_eq!(report.cycles[1].members, vec![coord("A5")]);
    assert!(report.cycle_containing(&coord("C3")).is_none());
}

#[test]
fn cycles_across_sheets() {
    let mut wb = crate::Workbook::new();
    wb.add_sheet("One").unwrap().set(1, 1, "=Two!A1").unwrap();
    wb.add_sheet("Two").unwrap().set(1, 1, "=One!A1").unwrap();
    let report = run(&wb);
    assert_eq!(report.cycles.len(), 1);
    assert_eq!(report.cycles[0].path[0].sheet, "One");
}

#[test]
fn long_chains_do_not_exhaust_the_stack() {
    let mut wb = crate::Workbook::new();
    let sheet = wb.add_sheet("Sheet1").unwrap();
    let n = 20_000;
    for row in 1..n {
        sheet.set(row, 1, format!("=A{}", row + 1).as_str()).unwrap();
    }
    sheet.set(n, 1, "=A1").unwrap();

    let formulas = parse_formulas(&wb, true);
    let (graph, _) = GraphBuilder::new(&wb).build(&formulas);
    let cycles = CycleDetector::new(&graph).detect();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles.cycles()[0].len(), n as usize);
    assert_eq!(cycles.cycles()[0].path.len(), n as usize + 1);
}

#[test]
fn tarjan_returns_every_node_exactly_once() {
    let wb = sheet1(&[("A1", "=B1+C1"), ("B1", "=C1"), ("C1", "1"), ("D1", "=D1")]);
    let formulas = parse_formulas(&wb, false);
    let (graph, _) = GraphBuilder::new(&wb).build(&formulas);
    let sccs = CycleDetector::new(&graph).strongly_connected_components();
    let mut all: Vec<_> = sccs.into_iter().flatten().collect();
    all.sort();
    assert_eq!(all, graph.node_ids().collect::<Vec<_>>());
}
