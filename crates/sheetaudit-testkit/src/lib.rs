//! In-memory fixture workbooks.
//!
//! Each builder reproduces one acceptance workbook cell for cell, the way a
//! decoder would hand it over: numbers as numbers, strings as text, strings
//! starting with `=` as formulas, missing values left out.

use sheetaudit_engine::{Cell, CellCoord, CellValue, Sheet, SheetVisibility, Workbook};

/// Date-time format pandas gives timestamps.
pub const TIMESTAMP_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

/// A fixed "now" (2024-10-15 12:00) so fixtures stay reproducible.
pub const FIXED_NOW_SERIAL: f64 = 45_580.5;

/// One value as the fixture generators wrote it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Raw {
    None,
    Int(i64),
    Float(f64),
    Str(&'static str),
    Timestamp,
}

impl Raw {
    fn into_cell(self) -> Option<Cell> {
        match self {
            Raw::None => None,
            Raw::Int(n) => Some(Cell::new(n as f64)),
            Raw::Float(n) => Some(Cell::new(n)),
            Raw::Str(s) if s.starts_with('=') => Some(Cell::new(CellValue::Formula(s.to_string()))),
            Raw::Str(s) => Some(Cell::new(CellValue::Text(s.to_string()))),
            Raw::Timestamp => Some(Cell::new(FIXED_NOW_SERIAL).with_number_format(TIMESTAMP_FORMAT)),
        }
    }
}

/// Write a data frame the way `DataFrame.to_excel(index=False)` lays it out:
/// header names in row 1, column values from row 2.
pub fn write_frame(sheet: &mut Sheet, columns: &[(&'static str, &[Raw])]) {
    for (idx, (header, values)) in columns.iter().enumerate() {
        let col = idx as u32 + 1;
        put(sheet, 1, col, Raw::Str(*header));
        for (offset, value) in values.iter().enumerate() {
            put(sheet, offset as u32 + 2, col, *value);
        }
    }
}

fn put(sheet: &mut Sheet, row: u32, col: u32, value: Raw) {
    if let Some(cell) = value.into_cell() {
        sheet
            .set_cell(row, col, cell)
            .expect("fixture coordinates are in bounds");
    }
}

fn single_sheet(cells: &[(&str, Raw)]) -> Workbook {
    let mut wb = Workbook::new();
    let sheet = wb.add_sheet("Sheet1").expect("fresh workbook");
    for (a1, value) in cells {
        let coord = CellCoord::from_a1("Sheet1", a1).expect("fixture address is valid A1");
        put(sheet, coord.row, coord.col, *value);
    }
    wb
}

pub fn sheet1(a1: &str) -> CellCoord {
    CellCoord::from_a1("Sheet1", a1).expect("fixture address is valid A1")
}

pub mod circular {
    use super::*;

    /// `A1 = A1 + 1`
    pub fn direct() -> Workbook {
        single_sheet(&[("A1", Raw::Str("=A1+1"))])
    }

    /// `A1 -> B1 -> C1 -> A1`
    pub fn indirect() -> Workbook {
        single_sheet(&[
            ("A1", Raw::Str("=B1+1")),
            ("B1", Raw::Str("=C1+1")),
            ("C1", Raw::Str("=A1+1")),
        ])
    }

    pub fn valid_cross_reference() -> Workbook {
        single_sheet(&[("A1", Raw::Int(1)), ("B1", Raw::Str("=A1*2"))])
    }
}

/// The 4x4 grid of broken formulas.
pub fn formula_errors() -> Workbook {
    const GRID: [[&str; 4]; 4] = [
        ["=A1/0", "=B1*C1", "=UNKNOWNFUNC()", "=D1+E1"],
        ["=VLOOKUP(\"x\",A1:A2,3,FALSE)", "=SUM(#REF!)", "=VALUE(\"abc\")", "=NULL"],
        ["=1/0", "=NA()", "=NAME?", "=VALUE!"],
        ["=IF(A1=\"\",,)", "=INDIRECT(\"invalid\")", "=1+\"text\"", "=SUM()"],
    ];
    let mut wb = Workbook::new();
    let sheet = wb.add_sheet("Sheet1").expect("fresh workbook");
    for (r, row) in GRID.iter().enumerate() {
        for (c, formula) in row.iter().enumerate() {
            put(sheet, r as u32 + 1, c as u32 + 1, Raw::Str(*formula));
        }
    }
    wb
}

/// Product_ID, Stock_Count, Price and Last_Updated with a header row.
pub fn data_quality() -> Workbook {
    use Raw::*;
    let mut wb = Workbook::new();
    let sheet = wb.add_sheet("Sheet1").expect("fresh workbook");
    write_frame(
        sheet,
        &[
            (
                "Product_ID",
                &[Str("A1"), Str("B2"), Int(123), Str("D4"), None, Str("F6"), Str("G7"), None, Str("I9"), Str("J10")],
            ),
            (
                "Stock_Count",
                &[Int(100), Str("200"), Str("invalid"), Int(400), Int(-999999), Int(600), Str("7OO"), Str("800 "), None, Int(1000)],
            ),
            (
                "Price",
                &[Float(10.999), Str("20.00"), Int(30), Str("40.0000"), Float(50.5), Str("60"), None, Str("80.0"), Float(90.99999), Str("100.")],
            ),
            (
                "Last_Updated",
                &[None, Str("2024-13-01"), Str("01/01/2024"), Str("2024.01.01"), Str("yesterday"), Str("01-01-2024 "), Str("2024/01/01"), Str("1st Jan 2024"), Timestamp, Str("2024-01-01")],
            ),
        ],
    );
    wb
}

/// Whitespace, currency, date and percentage inconsistencies.
pub fn formatting_issues() -> Workbook {
    use Raw::*;
    let mut wb = Workbook::new();
    let sheet = wb.add_sheet("Sheet1").expect("fresh workbook");
    write_frame(
        sheet,
        &[
            ("Employee", &[Str(" John Doe"), Str("Jane Smith "), Str("  Bob Jones"), Str("Alice Brown  "), Str("Tom Wilson")]),
            ("Salary", &[Str("$50,000"), Str("60000"), Str("$70,000.00"), Str("80000.0"), Str("90,000")]),
            ("Hire_Date", &[Str("01-Jan-2024"), Str("2024/01/02"), Str("03.01.2024"), Str("Jan 4, 2024"), Str("2024-01-05")]),
            ("Department", &[Str("IT "), Str(" HR"), Str("Finance"), Str("  Marketing "), Str("Sales")]),
            ("Performance", &[Str("95.00%"), Str("87.5"), Str("92"), Str("88.75%"), Str("90.0%")]),
        ],
    );
    wb
}

pub mod hidden {
    use super::*;

    /// Protected sheet; B1 is protection-hidden.
    pub fn hidden_cells() -> Workbook {
        let mut wb = single_sheet(&[("A1", Raw::Str("Visible")), ("B1", Raw::Str("Hidden"))]);
        let sheet = wb.sheet_mut("Sheet1").expect("fixture sheet");
        sheet.protect(true);
        if let Some(cell) = sheet.cell_mut(1, 2) {
            cell.protection_hidden = true;
        }
        wb
    }

    /// Columns A and C and rows 1 and 3 hidden.
    pub fn hidden_rows_columns() -> Workbook {
        let mut wb = single_sheet(&[
            ("A1", Raw::Str("Content")),
            ("B2", Raw::Str("More")),
            ("C3", Raw::Str("Data")),
        ]);
        let sheet = wb.sheet_mut("Sheet1").expect("fixture sheet");
        sheet.set_col_hidden(1, true);
        sheet.set_col_hidden(3, true);
        sheet.set_row_hidden(1, true);
        sheet.set_row_hidden(3, true);
        wb
    }

    /// `Row 1` .. `Row 5` in column A with rows 1, 2, 4 and 5 hidden.
    pub fn consecutive_hidden_rows() -> Workbook {
        let mut wb = Workbook::new();
        let sheet = wb.add_sheet("Sheet1").expect("fresh workbook");
        for row in 1..=5 {
            sheet
                .set(row, 1, CellValue::Text(format!("Row {row}")))
                .expect("fixture coordinates are in bounds");
        }
        sheet.set_rows_hidden(1, 2, true);
        sheet.set_rows_hidden(4, 5, true);
        wb
    }
}

mod frame {
    use super::Raw::{self, *};

    pub(super) const CATEGORY: &[Raw] = &[
        Str("Sales"), Str("Sales "), Str("SALES"), Str("Marketing"), Str("Marketing"),
        None, Str("Finance"), Str("HR"), Str("HR"), Str(""),
    ];

    pub(super) const MIXED_FRAME: &[(&str, &[Raw])] = &[
        ("ID", &[Int(1), Int(2), Int(3), Str("4"), Int(5), Int(6), Int(7), Int(8), Int(9), Int(10)]),
        (
            "Date",
            &[Str("2024-01-01"), Str("01/02/2024"), Str("Invalid Date"), Str("2024-01-04"), Str("05-01-2024"), Str("2024/01/06"), Timestamp, Str("2024-01-08 "), Str("2024-01-09"), None],
        ),
        (
            "Amount",
            &[Float(1000.5), Str("1,200.75"), Str("abc"), Int(-999_999_999), Float(1500.0), Float(1600.5), None, Str(" 1800.25 "), Float(1900.5), Int(2000)],
        ),
        ("Category", CATEGORY),
        (
            "Calculation",
            &[Str("=A2/0"), Str("=VLOOKUP(\"missing\",A1:B1,2)"), Str("=INVALID_FUNCTION()"), Str("=A1"), None, Str("=REF!"), Str("=VALUE(\"abc\")"), Str("=1+1"), Str("=SUM()"), Str("=NULL")],
        ),
        (
            "Percentage",
            &[Str("50%"), Str("0.75"), Str("80.00%"), Str(".90"), Str("100%"), None, Str("120%"), Str("60.5%"), Str("70%"), Str("65")],
        ),
        ("Category_2", CATEGORY),
    ];
}

/// Two copies of a mixed data frame: `Main`, and `Hidden` with sheet-level
/// visibility off. `Main!C4` carries a `0.0` format while the rest of column
/// C uses `#,##0.00`.
pub fn mixed_workbook() -> Workbook {
    let mut wb = Workbook::new();

    let main = wb.add_sheet("Main").expect("fresh workbook");
    write_frame(main, frame::MIXED_FRAME);
    for row in 2..=11 {
        if let Some(cell) = main.cell_mut(row, 3)
            && matches!(cell.value, CellValue::Number(_))
        {
            cell.number_format = Some("#,##0.00".to_string());
        }
    }
    main.set_cell(4, 3, Cell::new(1234.56).with_number_format("0.0"))
        .expect("fixture coordinates are in bounds");

    let hidden = wb.add_sheet("Hidden").expect("distinct sheet name");
    write_frame(hidden, frame::MIXED_FRAME);
    hidden.set_visibility(SheetVisibility::Hidden);
    wb
}
