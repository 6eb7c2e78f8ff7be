use sheetaudit_common::{ErrorClass, SeverityOrder};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Knobs consumed by [`crate::analyze`].
///
/// Partial documents deserialize onto the defaults, so an external config
/// layer only has to name what it overrides.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// A value is an outlier when it lies further than this many deviations
    /// from the column median.
    pub outlier_multiplier: f64,
    /// Let formulas that are a bare literal (`=42`) take part in the column
    /// statistics.
    pub include_formula_literals: bool,
    pub severity_order: SeverityOrder,
    /// Leading rows of every sheet treated as headers and left out of the
    /// column statistics. Defaults to a single header row; set 0 for sheets
    /// that start with data.
    pub header_rows: u32,
    pub outlier_min_samples: usize,
    pub complexity_threshold: f64,
    pub enable_parallel: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            outlier_multiplier: 10.0,
            include_formula_literals: false,
            severity_order: SeverityOrder::default(),
            header_rows: 1,
            outlier_min_samples: 3,
            complexity_threshold: 5.0,
            enable_parallel: true,
        }
    }
}

impl AnalysisConfig {
    pub fn with_outlier_multiplier(mut self, multiplier: f64) -> Self {
        self.outlier_multiplier = multiplier;
        self
    }

    pub fn with_formula_literals(mut self, include: bool) -> Self {
        self.include_formula_literals = include;
        self
    }

    pub fn with_severity_order(mut self, order: SeverityOrder) -> Self {
        self.severity_order = order;
        self
    }

    /// Replace the severity table from a most-severe-first list.
    pub fn with_severity_ranking(
        self,
        ranked: impl IntoIterator<Item = ErrorClass>,
    ) -> Result<Self, ConfigError> {
        let order = SeverityOrder::new(ranked.into_iter().collect())?;
        Ok(self.with_severity_order(order))
    }

    pub fn with_header_rows(mut self, rows: u32) -> Self {
        self.header_rows = rows;
        self
    }

    pub fn with_outlier_min_samples(mut self, samples: usize) -> Self {
        self.outlier_min_samples = samples;
        self
    }

    pub fn with_complexity_threshold(mut self, threshold: f64) -> Self {
        self.complexity_threshold = threshold;
        self
    }

    pub fn with_parallel(mut self, enable: bool) -> Self {
        self.enable_parallel = enable;
        self
    }

    /// Reject settings no analysis can honor. The severity table is checked
    /// again because a deserialized config may have bypassed its constructor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.outlier_multiplier.is_finite() || self.outlier_multiplier <= 0.0 {
            return Err(ConfigError::OutlierMultiplier(self.outlier_multiplier));
        }
        if !self.complexity_threshold.is_finite() || self.complexity_threshold < 0.0 {
            return Err(ConfigError::ComplexityThreshold(self.complexity_threshold));
        }
        if self.outlier_min_samples < 3 {
            return Err(ConfigError::OutlierMinSamples(self.outlier_min_samples));
        }
        SeverityOrder::new(self.severity_order.ranked().to_vec())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = AnalysisConfig::default();
        assert_eq!(config.outlier_multiplier, 10.0);
        assert!(!config.include_formula_literals);
        assert_eq!(config.header_rows, 1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_bad_multiplier() {
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = AnalysisConfig::default().with_outlier_multiplier(bad);
            assert!(matches!(
                config.validate(),
                Err(ConfigError::OutlierMultiplier(_))
            ));
        }
    }

    #[test]
    fn ranking_override_must_be_a_permutation() {
        let err = AnalysisConfig::default()
            .with_severity_ranking([ErrorClass::DivideByZero])
            .unwrap_err();
        assert!(matches!(err, ConfigError::SeverityOrder(_)));

        let mut ranked = ErrorClass::ERRORS.to_vec();
        ranked.reverse();
        let config = AnalysisConfig::default()
            .with_severity_ranking(ranked)
            .unwrap();
        assert_eq!(config.severity_order.ranked()[0], ErrorClass::NotAvailable);
    }
}
