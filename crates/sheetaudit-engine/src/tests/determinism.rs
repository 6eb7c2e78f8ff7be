//! The same snapshot always yields the same report, with or without the
//! worker pool.
use proptest::prelude::*;

use super::common::{run, run_sequential};
use crate::Workbook;

const RAW: &[&str] = &[
    "1",
    "0",
    "-999999",
    "abc",
    " padded ",
    "01/02/2024",
    "$1,000.00",
    "50%",
    "TRUE",
    "=A1+1",
    "=B2/0",
    "=C3/A2",
    "=SUM(A1:D4)",
    "=A1",
    "=D4*2",
    "=NA()",
    "=FOO(1)",
    "=VLOOKUP(\"x\",A1:A4,2,FALSE)",
    "=Other!A1",
    "=1+",
];

fn workbook() -> impl Strategy<Value = Workbook> {
    prop::collection::vec(
        ((1u32..=4), (1u32..=4), prop::sample::select(RAW.to_vec())),
        0..24,
    )
    .prop_map(|cells| {
        let mut wb = Workbook::new();
        let sheet = wb.add_sheet("Sheet1").unwrap();
        for (row, col, raw) in cells {
            sheet.set(row, col, raw).unwrap();
        }
        wb
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn analysis_is_repeatable(wb in workbook()) {
        prop_assert_eq!(run(&wb), run(&wb));
    }

    #[test]
    fn parallel_matches_sequential(wb in workbook()) {
        prop_assert_eq!(run(&wb), run_sequential(&wb));
    }

    #[test]
    fn every_present_cell_is_classified(wb in workbook()) {
        let report = run(&wb);
        prop_assert_eq!(report.error_classes.len(), wb.cells().count());
        prop_assert_eq!(report.visibility.len(), wb.cells().count());
        for cycle in &report.cycles {
            prop_assert_eq!(cycle.path.first(), cycle.path.last());
            prop_assert_eq!(cycle.path.first(), cycle.members.first());
        }
    }
}
