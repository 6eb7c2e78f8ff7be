//! Meta crate that re-exports the sheetaudit layers. Depend on this crate and
//! pick layers through feature flags; the underlying crates stay reachable
//! for deeper integration.

#[cfg(feature = "common")]
pub use sheetaudit_common as common;

#[cfg(feature = "parse")]
pub use sheetaudit_parse as parse;

#[cfg(feature = "engine")]
pub use sheetaudit_engine as engine;

#[cfg(feature = "parse")]
pub use sheetaudit_parse::{ParsedFormula, parse_cell_text};

#[cfg(feature = "engine")]
pub use sheetaudit_engine::{
    AnalysisConfig, AnalysisError, AnalysisReport, Cell, CellCoord, CellStatus, CellValue,
    ErrorClass, Severity, SeverityOrder, Sheet, Workbook, analyze,
};

#[cfg(feature = "engine")]
pub mod doc_examples;
