//! The analysis pipeline.
//!
//! Parse, then two independent branches: the formula chain (graph, cycles,
//! classification) and the value checks (data quality, visibility). The
//! formula chain is strictly ordered; the branches run side by side when
//! parallelism is enabled.

use std::collections::BTreeMap;

use sheetaudit_common::CellCoord;

use crate::classify::{self, ClassifiedCell, ErrorClassifier};
use crate::config::AnalysisConfig;
use crate::cycles::{Cycle, CycleDetector};
use crate::error::AnalysisError;
use crate::findings::{QualityFinding, StructuralFinding};
use crate::formulas::{self, FormulaSet};
use crate::graph::{Edge, GraphBuilder};
use crate::metadata::WorkbookMetadata;
use crate::quality::DataQualityAnalyzer;
use crate::report::AnalysisReport;
use crate::static_eval::StaticEvaluator;
use crate::visibility::{VisibilityResolver, VisibilityState};
use crate::workbook::Workbook;

struct FormulaOutcome {
    edges: Vec<Edge>,
    cycles: Vec<Cycle>,
    error_classes: BTreeMap<CellCoord, ClassifiedCell>,
    findings: Vec<StructuralFinding>,
}

struct ValueOutcome {
    quality: Vec<QualityFinding>,
    visibility: BTreeMap<CellCoord, VisibilityState>,
}

/// Analyze a workbook snapshot.
///
/// Fails only on an invalid configuration; every problem with the workbook
/// itself ends up in the report.
pub fn analyze(workbook: &Workbook, config: &AnalysisConfig) -> Result<AnalysisReport, AnalysisError> {
    config.validate()?;

    #[cfg(feature = "tracing")]
    let _span = tracing::info_span!(
        "analyze",
        sheets = workbook.sheets().len(),
        parallel = config.enable_parallel
    )
    .entered();

    let formulas = formulas::parse_formulas(workbook, config.enable_parallel);

    let (formula, values) = if config.enable_parallel {
        rayon::join(
            || formula_chain(workbook, &formulas, config),
            || value_checks(workbook, &formulas, config),
        )
    } else {
        (
            formula_chain(workbook, &formulas, config),
            value_checks(workbook, &formulas, config),
        )
    };

    let FormulaOutcome {
        edges,
        cycles,
        error_classes,
        mut findings,
    } = formula;
    let ValueOutcome {
        mut quality,
        visibility,
    } = values;

    let hidden = |coord: &CellCoord| visibility.get(coord).is_some_and(|s| s.effectively_hidden());
    for finding in &mut findings {
        finding.effectively_hidden = hidden(&finding.cell);
    }
    for finding in &mut quality {
        finding.effectively_hidden = match finding.target.cell() {
            Some(coord) => hidden(coord),
            None => workbook
                .sheet(&finding.target.column().sheet)
                .is_some_and(|s| s.is_col_hidden(finding.target.column().col)),
        };
    }

    let mut hidden_rows = BTreeMap::new();
    let mut hidden_columns = BTreeMap::new();
    for sheet in workbook.sheets() {
        if !sheet.hidden_rows().is_empty() {
            hidden_rows.insert(sheet.name().to_string(), sheet.hidden_rows().iter().collect());
        }
        if !sheet.hidden_cols().is_empty() {
            hidden_columns.insert(sheet.name().to_string(), sheet.hidden_cols().iter().collect());
        }
    }

    let report = AnalysisReport {
        edges,
        cycles,
        error_classes,
        structural_findings: findings,
        quality_findings: quality,
        visibility,
        hidden_rows,
        hidden_columns,
        metadata: WorkbookMetadata::collect(workbook, &formulas),
    };

    #[cfg(feature = "tracing")]
    tracing::info!(
        cells = report.error_classes.len(),
        cycles = report.cycles.len(),
        errored = report.error_classes.values().filter(|c| c.is_error()).count(),
        quality_findings = report.quality_findings.len(),
        "analysis complete"
    );

    Ok(report)
}

fn formula_chain(workbook: &Workbook, formulas: &FormulaSet, config: &AnalysisConfig) -> FormulaOutcome {
    let mut findings = formulas::formula_findings(formulas, config);

    let (graph, unresolved) = GraphBuilder::new(workbook).build(formulas);
    findings.extend(unresolved);
    findings.extend(StaticEvaluator::new(workbook, formulas).evaluate_all(config.enable_parallel));
    findings.sort_by(|a, b| (&a.cell, a.kind).cmp(&(&b.cell, b.kind)));

    let cycles = CycleDetector::new(&graph).detect();
    let local = classify::local_classes(workbook, &findings, &config.severity_order);
    let error_classes =
        ErrorClassifier::new(&graph, &cycles, &config.severity_order).classify(workbook, &local);

    FormulaOutcome {
        edges: graph.edges().collect(),
        cycles: cycles.into_cycles(),
        error_classes,
        findings,
    }
}

fn value_checks(workbook: &Workbook, formulas: &FormulaSet, config: &AnalysisConfig) -> ValueOutcome {
    ValueOutcome {
        quality: DataQualityAnalyzer::new(workbook, config)
            .with_formulas(formulas)
            .analyze(),
        visibility: VisibilityResolver::new(workbook).resolve(config.enable_parallel),
    }
}
