pub mod analyzer;
pub mod classify;
pub mod config;
pub mod cycles;
pub mod error;
pub mod findings;
pub mod formulas;
pub mod graph;
pub mod metadata;
pub mod quality;
pub mod report;
pub mod static_eval;
pub mod telemetry;
pub mod visibility;
pub mod workbook;

#[cfg(test)]
mod tests;

pub use analyzer::analyze;
pub use classify::{ClassifiedCell, ErrorClassifier, ErrorOrigin};
pub use config::AnalysisConfig;
pub use cycles::{Cycle, CycleDetector, CycleSet};
pub use error::{AnalysisError, ConfigError, ModelError};
pub use findings::{
    FindingTarget, QualityFinding, QualityKind, Severity, StructuralFinding, StructuralKind,
};
pub use graph::{DependencyGraph, Edge, GraphBuilder, NodeId};
pub use metadata::WorkbookMetadata;
pub use quality::DataQualityAnalyzer;
pub use quality::kind::ValueKind;
pub use report::{AnalysisReport, CellStatus, hidden_runs};
pub use telemetry::init_tracing;
pub use visibility::{HiddenReason, VisibilityResolver, VisibilityState};
pub use workbook::{Cell, CellValue, DeclaredType, DefinedName, HiddenSet, Sheet, SheetVisibility, Workbook};

// Re-export shared types
pub use sheetaudit_common::{CellCoord, ColumnRef, ErrorClass, SeverityOrder};
