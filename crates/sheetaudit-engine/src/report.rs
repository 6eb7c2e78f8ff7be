//! The aggregated result handed to a reporting layer.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;

use sheetaudit_common::{CellCoord, ErrorClass};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::classify::ClassifiedCell;
use crate::cycles::Cycle;
use crate::findings::{QualityFinding, StructuralFinding};
use crate::graph::Edge;
use crate::metadata::WorkbookMetadata;
use crate::visibility::VisibilityState;

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisReport {
    /// Dependency edges ordered by source, then target.
    pub edges: Vec<Edge>,
    /// Cycles ordered by their smallest member.
    pub cycles: Vec<Cycle>,
    /// One entry for every cell present in the input.
    #[cfg_attr(feature = "serde", serde(with = "pairs"))]
    pub error_classes: BTreeMap<CellCoord, ClassifiedCell>,
    pub structural_findings: Vec<StructuralFinding>,
    pub quality_findings: Vec<QualityFinding>,
    /// One entry for every cell present in the input.
    #[cfg_attr(feature = "serde", serde(with = "pairs"))]
    pub visibility: BTreeMap<CellCoord, VisibilityState>,
    /// Hidden row indices per sheet, ascending.
    pub hidden_rows: BTreeMap<String, Vec<u32>>,
    pub hidden_columns: BTreeMap<String, Vec<u32>>,
    pub metadata: WorkbookMetadata,
}

/// Whether a cell was covered by the analysis, and how it came out.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellStatus {
    /// Not present in the input.
    NotAnalyzed,
    Clean,
    Flagged,
}

impl AnalysisReport {
    pub fn class_of(&self, coord: &CellCoord) -> ErrorClass {
        self.error_classes
            .get(coord)
            .map(|c| c.class)
            .unwrap_or_default()
    }

    pub fn cell_status(&self, coord: &CellCoord) -> CellStatus {
        if !self.error_classes.contains_key(coord) {
            return CellStatus::NotAnalyzed;
        }
        let flagged = self.class_of(coord).is_error()
            || self.structural_for(coord).next().is_some()
            || self.quality_for(coord).next().is_some();
        if flagged {
            CellStatus::Flagged
        } else {
            CellStatus::Clean
        }
    }

    pub fn is_hidden(&self, coord: &CellCoord) -> bool {
        self.visibility
            .get(coord)
            .is_some_and(VisibilityState::effectively_hidden)
    }

    pub fn cycle_containing(&self, coord: &CellCoord) -> Option<&Cycle> {
        self.cycles.iter().find(|c| c.contains(coord))
    }

    pub fn structural_for<'a>(
        &'a self,
        coord: &CellCoord,
    ) -> impl Iterator<Item = &'a StructuralFinding> + use<'a> {
        let coord = coord.clone();
        self.structural_findings
            .iter()
            .filter(move |f| f.cell == coord)
    }

    pub fn quality_for<'a>(
        &'a self,
        coord: &CellCoord,
    ) -> impl Iterator<Item = &'a QualityFinding> + use<'a> {
        let coord = coord.clone();
        self.quality_findings
            .iter()
            .filter(move |f| f.target.cell() == Some(&coord))
    }

    /// Hidden rows of a sheet grouped into consecutive runs.
    pub fn hidden_row_runs(&self, sheet: &str) -> Vec<RangeInclusive<u32>> {
        self.hidden_rows
            .get(sheet)
            .map(|rows| hidden_runs(rows.iter().copied()))
            .unwrap_or_default()
    }

    pub fn hidden_column_runs(&self, sheet: &str) -> Vec<RangeInclusive<u32>> {
        self.hidden_columns
            .get(sheet)
            .map(|cols| hidden_runs(cols.iter().copied()))
            .unwrap_or_default()
    }
}

/// Group ascending indices into runs: `[1, 2, 4, 5]` -> `[1..=2, 4..=5]`.
/// Unsorted input is sorted first.
pub fn hidden_runs(indices: impl IntoIterator<Item = u32>) -> Vec<RangeInclusive<u32>> {
    let mut sorted: Vec<u32> = indices.into_iter().collect();
    sorted.sort_unstable();
    sorted.dedup();

    let mut runs = Vec::new();
    let mut iter = sorted.into_iter();
    let Some(first) = iter.next() else {
        return runs;
    };
    let (mut start, mut end) = (first, first);
    for idx in iter {
        if idx == end + 1 {
            end = idx;
        } else {
            runs.push(start..=end);
            start = idx;
            end = idx;
        }
    }
    runs.push(start..=end);
    runs
}

/// Maps keyed by coordinates serialize as `[key, value]` pairs so formats
/// with string-only keys (JSON) can carry them.
#[cfg(feature = "serde")]
mod pairs {
    use std::collections::BTreeMap;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<K, V, S>(map: &BTreeMap<K, V>, serializer: S) -> Result<S::Ok, S::Error>
    where
        K: Serialize,
        V: Serialize,
        S: Serializer,
    {
        serializer.collect_seq(map.iter())
    }

    pub fn deserialize<'de, K, V, D>(deserializer: D) -> Result<BTreeMap<K, V>, D::Error>
    where
        K: Deserialize<'de> + Ord,
        V: Deserialize<'de>,
        D: Deserializer<'de>,
    {
        let pairs = Vec::<(K, V)>::deserialize(deserializer)?;
        Ok(pairs.into_iter().collect())
    }
}
