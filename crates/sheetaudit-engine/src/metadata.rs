use sheetaudit_parse::ParsedFormula;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::formulas::FormulaSet;
use crate::workbook::{SheetVisibility, Workbook};

/// Workbook-level counts for the report header.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WorkbookMetadata {
    pub sheet_count: usize,
    pub hidden_sheets: Vec<String>,
    pub formula_count: usize,
    pub defined_names: Vec<String>,
    pub volatile_function_count: usize,
    pub external_reference_count: usize,
    /// Present cells, including ones that are stored but empty.
    pub total_cells: usize,
    pub data_cells: usize,
    pub empty_cells: usize,
    /// `data_cells / total_cells * 100`; 0 for a workbook without cells.
    pub percentage_populated: f64,
}

impl WorkbookMetadata {
    pub fn collect(workbook: &Workbook, formulas: &FormulaSet) -> Self {
        let total_cells = workbook.cells().count();
        let data_cells = workbook
            .cells()
            .filter(|(_, cell)| !cell.value.is_empty() && cell.value.as_text() != Some(""))
            .count();

        WorkbookMetadata {
            sheet_count: workbook.sheets().len(),
            hidden_sheets: workbook
                .sheets()
                .iter()
                .filter(|s| s.visibility != SheetVisibility::Visible)
                .map(|s| s.name().to_string())
                .collect(),
            formula_count: formulas.len(),
            defined_names: workbook.defined_names().map(|d| d.name.clone()).collect(),
            volatile_function_count: formulas.values().map(|f| f.lint.volatile_calls.len()).sum(),
            external_reference_count: formulas.values().map(external_references).sum(),
            total_cells,
            data_cells,
            empty_cells: total_cells - data_cells,
            percentage_populated: if total_cells == 0 {
                0.0
            } else {
                data_cells as f64 / total_cells as f64 * 100.0
            },
        }
    }
}

fn external_references(formula: &ParsedFormula) -> usize {
    formula.references().iter().filter(|r| r.is_external()).count()
}
