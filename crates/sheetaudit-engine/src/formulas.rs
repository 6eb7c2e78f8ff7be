//! Parsing stage: every formula cell in the workbook, parsed independently.

use std::collections::BTreeMap;

use rayon::prelude::*;
use sheetaudit_common::{CellCoord, ErrorClass};
use sheetaudit_parse::ParsedFormula;

use crate::config::AnalysisConfig;
use crate::findings::{StructuralFinding, StructuralKind};
use crate::workbook::Workbook;

/// Parsed formulas keyed by cell, in coordinate order.
pub type FormulaSet = BTreeMap<CellCoord, ParsedFormula>;

pub fn parse_formulas(workbook: &Workbook, parallel: bool) -> FormulaSet {
    #[cfg(feature = "tracing")]
    let _span = tracing::info_span!("parse_formulas", parallel).entered();

    let sources: Vec<(CellCoord, &str)> = workbook
        .cells()
        .filter_map(|(coord, cell)| cell.value.as_formula().map(|text| (coord, text)))
        .collect();

    let parsed: Vec<(CellCoord, ParsedFormula)> = if parallel {
        sources
            .into_par_iter()
            .map(|(coord, text)| (coord, ParsedFormula::parse(text)))
            .collect()
    } else {
        sources
            .into_iter()
            .map(|(coord, text)| (coord, ParsedFormula::parse(text)))
            .collect()
    };

    #[cfg(feature = "tracing")]
    tracing::debug!(formulas = parsed.len(), "parsed formulas");

    parsed.into_iter().collect()
}

/// Findings that need nothing but the formula text: lint issues, volatile
/// calls and overly complex formulas.
pub fn formula_findings(formulas: &FormulaSet, config: &AnalysisConfig) -> Vec<StructuralFinding> {
    let mut findings = Vec::new();
    for (coord, parsed) in formulas {
        for issue in parsed.issues() {
            findings.push(StructuralFinding::new(
                coord.clone(),
                StructuralKind::Formula(issue.kind),
                issue.class,
                issue.message.clone(),
            ));
        }
        for name in &parsed.lint.volatile_calls {
            findings.push(StructuralFinding::new(
                coord.clone(),
                StructuralKind::VolatileFunction,
                ErrorClass::None,
                format!("{name} is volatile and recalculates on every change"),
            ));
        }
        if parsed.lint.complexity > config.complexity_threshold {
            findings.push(StructuralFinding::new(
                coord.clone(),
                StructuralKind::ComplexFormula,
                ErrorClass::None,
                format!(
                    "complexity {:.1} exceeds {:.1}",
                    parsed.lint.complexity, config.complexity_threshold
                ),
            ));
        }
    }
    findings
}
