use crate::{AnalysisConfig, AnalysisReport, Workbook, analyze};

/// Analyze a one-sheet workbook given as `(A1 address, raw cell text)` pairs.
///
/// This helper is intended for documentation examples to avoid repetitive setup.
///
/// # Example
///
/// ```rust
/// # use sheetaudit::doc_examples::analyze_cells;
/// let report = analyze_cells(&[("A1", "=B1+1"), ("B1", "=A1")])?;
/// assert_eq!(report.cycles.len(), 1);
/// # Ok::<(), Box<dyn std::error::Error + Send + Sync>>(())
/// ```
pub fn analyze_cells(
    cells: &[(&str, &str)],
) -> Result<AnalysisReport, Box<dyn std::error::Error + Send + Sync>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_sheet("Sheet1")?;
    for (a1, raw) in cells {
        let coord = crate::CellCoord::from_a1("Sheet1", a1)?;
        sheet.set_raw(coord.row, coord.col, raw)?;
    }
    Ok(analyze(&workbook, &AnalysisConfig::default())?)
}
