//! Column heuristics over raw values: type and format inconsistency,
//! outliers, whitespace, ambiguous or invalid dates and mixed percentage
//! styles.
//!
//! Formula cells are skipped unless the configuration lets formulas that are
//! a bare literal take part.

pub mod dates;
pub mod format;
pub mod kind;
pub mod stats;

use std::collections::BTreeMap;

use rayon::prelude::*;
use sheetaudit_common::{CellCoord, ColumnRef, LiteralValue};

use crate::config::AnalysisConfig;
use crate::findings::{FindingTarget, QualityFinding, QualityKind, Severity};
use crate::formulas::FormulaSet;
use crate::workbook::{CellValue, Workbook};

use format::FormatSignature;
use kind::ValueKind;

/// One non-empty value as the heuristics see it.
#[derive(Debug, Clone, PartialEq)]
enum Observed {
    Number { value: f64, format: Option<String> },
    Text(String),
    Boolean(bool),
}

impl Observed {
    fn raw(&self) -> String {
        match self {
            Observed::Number { value, .. } => value.to_string(),
            Observed::Text(text) => text.clone(),
            Observed::Boolean(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        }
    }

    fn kind(&self) -> ValueKind {
        match self {
            Observed::Number { format, .. } => kind::number_kind(format.as_deref()),
            Observed::Text(text) => kind::text_kind(text),
            Observed::Boolean(_) => ValueKind::Boolean,
        }
    }

    /// Numeric value of a numeric-kind entry.
    fn number(&self) -> Option<f64> {
        match self {
            Observed::Number { value, .. } => Some(*value),
            Observed::Text(text) => kind::parse_numeric_text(text).map(|n| n.value),
            Observed::Boolean(_) => None,
        }
    }

    fn signature(&self) -> Option<FormatSignature> {
        match self {
            Observed::Number { value, format } => FormatSignature::of_stored(*value, format.as_deref()),
            Observed::Text(text) => kind::parse_numeric_text(text).map(|n| FormatSignature::of_text(&n)),
            Observed::Boolean(_) => None,
        }
    }

    fn percent_style(&self) -> Option<PercentStyle> {
        match self.kind() {
            ValueKind::Percentage => Some(PercentStyle::Suffixed),
            ValueKind::Numeric => self.number().map(|n| {
                if n.abs() < 1.0 {
                    PercentStyle::Fraction
                } else {
                    PercentStyle::WholeNumber
                }
            }),
            _ => None,
        }
    }
}

/// How a percentage is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum PercentStyle {
    /// `75%`
    Suffixed,
    /// `0.75`
    Fraction,
    /// `75`
    WholeNumber,
}

impl PercentStyle {
    fn describe(self) -> &'static str {
        match self {
            PercentStyle::Suffixed => "percent-suffixed (75%)",
            PercentStyle::Fraction => "bare fraction (0.75)",
            PercentStyle::WholeNumber => "bare whole number (75)",
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    coord: CellCoord,
    value: Observed,
    header: bool,
}

pub struct DataQualityAnalyzer<'a> {
    workbook: &'a Workbook,
    config: &'a AnalysisConfig,
    formulas: Option<&'a FormulaSet>,
}

impl<'a> DataQualityAnalyzer<'a> {
    pub fn new(workbook: &'a Workbook, config: &'a AnalysisConfig) -> Self {
        Self {
            workbook,
            config,
            formulas: None,
        }
    }

    /// Parsed formulas; their literal values take part when
    /// `include_formula_literals` is set.
    pub fn with_formulas(mut self, formulas: &'a FormulaSet) -> Self {
        self.formulas = Some(formulas);
        self
    }

    /// Findings ordered by target, then kind.
    pub fn analyze(&self) -> Vec<QualityFinding> {
        #[cfg(feature = "tracing")]
        let _span = tracing::info_span!("data_quality").entered();

        let columns = self.columns();
        let mut findings: Vec<QualityFinding> = if self.config.enable_parallel {
            columns
                .par_iter()
                .flat_map_iter(|(column, entries)| self.analyze_column(column, entries))
                .collect()
        } else {
            columns
                .iter()
                .flat_map(|(column, entries)| self.analyze_column(column, entries))
                .collect()
        };
        findings.sort_by(|a, b| (&a.target, a.kind).cmp(&(&b.target, b.kind)));

        #[cfg(feature = "tracing")]
        tracing::debug!(columns = columns.len(), findings = findings.len(), "data quality done");

        findings
    }

    fn columns(&self) -> BTreeMap<ColumnRef, Vec<Entry>> {
        let mut columns: BTreeMap<ColumnRef, Vec<Entry>> = BTreeMap::new();
        for (coord, cell) in self.workbook.cells() {
            let observed = match &cell.value {
                CellValue::Empty => continue,
                CellValue::Number(n) => Observed::Number {
                    value: *n,
                    format: cell.number_format.clone(),
                },
                CellValue::Text(text) => Observed::Text(text.clone()),
                CellValue::Boolean(b) => Observed::Boolean(*b),
                CellValue::Formula(_) => match self.formula_literal(&coord) {
                    Some(LiteralValue::Number(n)) => Observed::Number {
                        value: n,
                        format: cell.number_format.clone(),
                    },
                    Some(LiteralValue::Text(text)) => Observed::Text(text),
                    Some(LiteralValue::Boolean(b)) => Observed::Boolean(b),
                    Some(LiteralValue::Error(_)) | None => continue,
                },
            };
            let header = coord.row <= self.config.header_rows;
            columns.entry(coord.column()).or_default().push(Entry {
                coord,
                value: observed,
                header,
            });
        }
        columns
    }

    fn formula_literal(&self, coord: &CellCoord) -> Option<LiteralValue> {
        if !self.config.include_formula_literals {
            return None;
        }
        self.formulas?.get(coord)?.static_literal()
    }

    fn analyze_column(&self, column: &ColumnRef, entries: &[Entry]) -> Vec<QualityFinding> {
        let mut out = Vec::new();

        // per-cell checks, header rows included
        for entry in entries {
            if let Observed::Text(text) = &entry.value {
                if let Some(fixed) = whitespace_fix(text) {
                    out.push(cell_finding(
                        entry,
                        QualityKind::WhitespaceIssue,
                        Severity::Info,
                        fixed.clone(),
                        format!("replace with \"{fixed}\""),
                    ));
                }
                if dates::is_ambiguous(text) {
                    let readings: Vec<String> = dates::candidate_dates(text)
                        .iter()
                        .map(|d| d.format("%Y-%m-%d").to_string())
                        .collect();
                    out.push(cell_finding(
                        entry,
                        QualityKind::AmbiguousDate,
                        Severity::Warning,
                        readings.join(" or "),
                        "write the date unambiguously as YYYY-MM-DD".to_string(),
                    ));
                }
                if dates::is_invalid_date(text) {
                    out.push(cell_finding(
                        entry,
                        QualityKind::InvalidDate,
                        Severity::Warning,
                        "a calendar date as YYYY-MM-DD".to_string(),
                        "correct the day or month, or clear the cell".to_string(),
                    ));
                }
            }
        }

        let body: Vec<&Entry> = entries.iter().filter(|e| !e.header).collect();
        if body.is_empty() {
            return out;
        }
        let kinds: Vec<ValueKind> = body.iter().map(|e| e.value.kind()).collect();
        let (dominant, count) = dominant_kind(&kinds);

        if count * 2 <= kinds.len() && kinds.iter().any(|k| !k.compatible(dominant)) {
            let mut present: Vec<ValueKind> = kinds.clone();
            present.sort_unstable();
            present.dedup();
            let listed: Vec<String> = present.iter().map(ToString::to_string).collect();
            out.push(QualityFinding {
                target: FindingTarget::Column(column.clone()),
                kind: QualityKind::TypeInconsistency,
                severity: Severity::Warning,
                value: None,
                expected: format!("one type; found {}", listed.join(", ")),
                suggestion: "split the column or convert its values to one type".to_string(),
                effectively_hidden: false,
            });
        }

        for (entry, kind) in body.iter().zip(&kinds) {
            if !kind.compatible(dominant) {
                out.push(cell_finding(
                    entry,
                    QualityKind::TypeInconsistency,
                    Severity::Error,
                    dominant.to_string(),
                    format!("convert to {dominant} or move it out of this column"),
                ));
            }
        }

        if dominant == ValueKind::Numeric {
            self.check_formats(&body, &kinds, &mut out);
            self.check_outliers(&body, &kinds, &mut out);
        }
        if kinds.contains(&ValueKind::Percentage) {
            check_percent_styles(&body, &mut out);
        }
        out
    }

    fn check_formats(&self, body: &[&Entry], kinds: &[ValueKind], out: &mut Vec<QualityFinding>) {
        let signed: Vec<(&Entry, FormatSignature)> = body
            .iter()
            .zip(kinds)
            .filter(|(_, k)| **k == ValueKind::Numeric)
            .filter_map(|(e, _)| e.value.signature().map(|sig| (*e, sig)))
            .collect();
        let Some(majority) = format::majority(signed.iter().map(|(_, sig)| sig)) else {
            return;
        };
        for (entry, sig) in signed {
            if sig != majority {
                out.push(cell_finding(
                    entry,
                    QualityKind::FormatInconsistency,
                    Severity::Warning,
                    majority.to_string(),
                    format!("write as {majority} like the rest of the column (this is {sig})"),
                ));
            }
        }
    }

    fn check_outliers(&self, body: &[&Entry], kinds: &[ValueKind], out: &mut Vec<QualityFinding>) {
        let numeric: Vec<(&Entry, f64)> = body
            .iter()
            .zip(kinds)
            .filter(|(_, k)| **k == ValueKind::Numeric)
            .filter_map(|(e, _)| e.value.number().map(|n| (*e, n)))
            .collect();
        let values: Vec<f64> = numeric.iter().map(|(_, n)| *n).collect();
        let flagged = stats::outlier_indices(
            &values,
            self.config.outlier_multiplier,
            self.config.outlier_min_samples,
        );
        let center = stats::median(&values).unwrap_or_default();
        for idx in flagged {
            let (entry, _) = numeric[idx];
            out.push(cell_finding(
                entry,
                QualityKind::Outlier,
                Severity::Warning,
                format!("near {center}"),
                format!("verify this value; the column median is {center}"),
            ));
        }
    }
}

/// Plurality vote; ties follow [`ValueKind`] declaration order.
fn dominant_kind(kinds: &[ValueKind]) -> (ValueKind, usize) {
    let mut best = (ValueKind::Text, 0);
    for candidate in ValueKind::ALL {
        let count = kinds.iter().filter(|k| **k == candidate).count();
        if count > best.1 {
            best = (candidate, count);
        }
    }
    best
}

fn check_percent_styles(body: &[&Entry], out: &mut Vec<QualityFinding>) {
    let styled: Vec<(&Entry, PercentStyle)> = body
        .iter()
        .filter_map(|e| e.value.percent_style().map(|s| (*e, s)))
        .collect();
    let mut counts: BTreeMap<PercentStyle, usize> = BTreeMap::new();
    for (_, style) in &styled {
        *counts.entry(*style).or_default() += 1;
    }
    if counts.len() < 2 {
        return;
    }
    let mut baseline = PercentStyle::Suffixed;
    let mut best = 0;
    for (style, count) in counts {
        if count > best {
            baseline = style;
            best = count;
        }
    }
    for (entry, style) in styled {
        if style != baseline {
            out.push(cell_finding(
                entry,
                QualityKind::PercentageRepresentationMismatch,
                Severity::Warning,
                baseline.describe().to_string(),
                format!("write as {} instead of {}", baseline.describe(), style.describe()),
            ));
        }
    }
}

/// The cleaned text when `text` has leading, trailing or irregular internal
/// whitespace.
fn whitespace_fix(text: &str) -> Option<String> {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    (collapsed != text).then_some(collapsed)
}

fn cell_finding(
    entry: &Entry,
    kind: QualityKind,
    severity: Severity,
    expected: String,
    suggestion: String,
) -> QualityFinding {
    QualityFinding {
        target: FindingTarget::Cell(entry.coord.clone()),
        kind,
        severity,
        value: Some(entry.value.raw()),
        expected,
        suggestion,
        effectively_hidden: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(values: &[&str]) -> Workbook {
        let mut wb = Workbook::new();
        let sheet = wb.add_sheet("S").unwrap();
        for (i, raw) in values.iter().enumerate() {
            if raw.is_empty() {
                continue;
            }
            // string cells, the way a decoder hands over text columns
            sheet
                .set(i as u32 + 1, 1, CellValue::Text(raw.to_string()))
                .unwrap();
        }
        wb
    }

    fn findings(wb: &Workbook) -> Vec<(u32, QualityKind)> {
        let config = AnalysisConfig::default()
            .with_header_rows(0)
            .with_parallel(false);
        DataQualityAnalyzer::new(wb, &config)
            .analyze()
            .into_iter()
            .map(|f| (f.target.cell().map(|c| c.row).unwrap_or(0), f.kind))
            .collect()
    }

    #[test]
    fn whitespace_is_always_flagged() {
        assert_eq!(whitespace_fix(" John Doe"), Some("John Doe".into()));
        assert_eq!(whitespace_fix("Bob  Jones"), Some("Bob Jones".into()));
        assert_eq!(whitespace_fix("Tom\tWilson"), Some("Tom Wilson".into()));
        assert_eq!(whitespace_fix("Tom Wilson"), None);
    }

    #[test]
    fn dominant_kind_ties_prefer_numeric() {
        use ValueKind::*;
        assert_eq!(dominant_kind(&[Text, Numeric]), (Numeric, 1));
        assert_eq!(dominant_kind(&[Date, Text, Text]), (Text, 2));
    }

    #[test]
    fn percentage_styles_follow_the_majority() {
        let wb = column(&["95.00%", "87.5", "92", "88.75%", "90.0%"]);
        assert_eq!(
            findings(&wb),
            vec![
                (2, QualityKind::PercentageRepresentationMismatch),
                (3, QualityKind::PercentageRepresentationMismatch),
            ]
        );
    }

    #[test]
    fn formats_compare_against_the_majority_signature() {
        let wb = column(&["10", "20", "30", "40", "50"]);
        assert_eq!(findings(&wb), vec![]);
        let wb = column(&["20.00", "40.0000", "60", "80.0", "100."]);
        assert_eq!(
            findings(&wb),
            vec![
                (1, QualityKind::FormatInconsistency),
                (2, QualityKind::FormatInconsistency),
                (4, QualityKind::FormatInconsistency),
            ]
        );
    }

    #[test]
    fn stored_numbers_compare_their_decimals() {
        let mut wb = Workbook::new();
        let sheet = wb.add_sheet("S").unwrap();
        for (i, n) in [10.0, 20.0, 30.0, 40.99999, 50.0, 60.5].into_iter().enumerate() {
            sheet.set(i as u32 + 1, 1, n).unwrap();
        }
        assert_eq!(
            findings(&wb),
            vec![
                (4, QualityKind::FormatInconsistency),
                (6, QualityKind::FormatInconsistency),
            ]
        );
    }

    #[test]
    fn impossible_dates_are_flagged_per_cell() {
        let wb = column(&["abc", "2024-13-32", "Invalid Date", "2024-01-05", "def"]);
        let invalid: Vec<u32> = findings(&wb)
            .into_iter()
            .filter(|(_, k)| *k == QualityKind::InvalidDate)
            .map(|(row, _)| row)
            .collect();
        assert_eq!(invalid, vec![2, 3]);
    }

    #[test]
    fn mixed_column_without_majority_gets_a_column_finding() {
        let wb = column(&["1", "abc", "2024-01-05", "TRUE"]);
        let kinds = findings(&wb);
        assert!(kinds.contains(&(0, QualityKind::TypeInconsistency)));
        assert_eq!(
            kinds.iter().filter(|(row, k)| *row > 0 && *k == QualityKind::TypeInconsistency).count(),
            3
        );
    }
}
