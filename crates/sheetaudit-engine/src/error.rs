use sheetaudit_common::{CoordError, SeverityOrderError};
use thiserror::Error;

/// Contract violations while building a workbook model.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("sheet '{0}' already exists")]
    DuplicateSheet(String),
    #[error("'{0}' is not a valid sheet name")]
    InvalidSheetName(String),
    #[error("no sheet named '{0}'")]
    UnknownSheet(String),
    #[error(transparent)]
    Coord(#[from] CoordError),
    #[error("cannot define name '{name}': {reason}")]
    InvalidName { name: String, reason: String },
}

/// An analysis configuration the engine refuses to run with.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("outlier multiplier must be finite and positive, got {0}")]
    OutlierMultiplier(f64),
    #[error("complexity threshold must be finite and non-negative, got {0}")]
    ComplexityThreshold(f64),
    #[error("outlier detection needs at least 3 samples, got {0}")]
    OutlierMinSamples(usize),
    #[error(transparent)]
    SeverityOrder(#[from] SeverityOrderError),
}

/// The only ways `analyze` can fail. Everything about the workbook itself is
/// reported as findings instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("invalid analysis configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}
