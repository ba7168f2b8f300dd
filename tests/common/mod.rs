//! Workbook builders shared by the integration tests

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use itdash::core::dates::to_serial;
use itdash::excel::WorkbookReader;
use itdash::types::{Grid, StyledSheet};
use rust_xlsxwriter::{Color, Format, Formula, Workbook};

/// A cell to write into a test workbook
#[derive(Debug, Clone)]
pub enum Cell {
    Text(String),
    Number(f64),
    Date(NaiveDateTime),
    /// Text with bold font and a yellow fill
    Styled(String),
    /// No value, but a yellow fill
    FormattedBlank,
    /// Text on the first accent colour of the workbook theme
    Themed(String),
    /// Formula with the result a spreadsheet application would have cached
    Formula(String, f64),
}

pub fn t(s: &str) -> Cell {
    Cell::Text(s.to_string())
}

pub fn n(v: f64) -> Cell {
    Cell::Number(v)
}

pub fn d(y: i32, m: u32, day_of_month: u32) -> Cell {
    Cell::Date(day(y, m, day_of_month))
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

/// One worksheet as sparse `(row, col, cell)` entries
pub struct SheetSpec {
    pub name: String,
    pub cells: Vec<(u32, u16, Cell)>,
    pub merges: Vec<(u32, u16, u32, u16)>,
    pub row_heights: Vec<(u32, f64)>,
}

impl SheetSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            cells: Vec::new(),
            merges: Vec::new(),
            row_heights: Vec::new(),
        }
    }

    /// Rows laid out from A1
    pub fn table(name: &str, rows: Vec<Vec<Cell>>) -> Self {
        let mut sheet = Self::new(name);
        for (r, row) in rows.into_iter().enumerate() {
            for (c, cell) in row.into_iter().enumerate() {
                sheet.cells.push((r as u32, c as u16, cell));
            }
        }
        sheet
    }

    pub fn cell(mut self, row: u32, col: u16, cell: Cell) -> Self {
        self.cells.push((row, col, cell));
        self
    }

    pub fn merge(mut self, first_row: u32, first_col: u16, last_row: u32, last_col: u16) -> Self {
        self.merges.push((first_row, first_col, last_row, last_col));
        self
    }

    pub fn row_height(mut self, row: u32, height: f64) -> Self {
        self.row_heights.push((row, height));
        self
    }
}

pub const YELLOW: u32 = 0xFFFF00;

pub fn build_workbook(sheets: &[SheetSpec]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let date = Format::new().set_num_format("yyyy-mm-dd");
    let styled = Format::new()
        .set_bold()
        .set_background_color(Color::RGB(YELLOW));
    let themed = Format::new().set_background_color(Color::Theme(4, 0));

    for spec in sheets {
        let sheet = workbook.add_worksheet();
        sheet.set_name(&spec.name).unwrap();
        for &(first_row, first_col, last_row, last_col) in &spec.merges {
            sheet
                .merge_range(first_row, first_col, last_row, last_col, "", &Format::new())
                .unwrap();
        }
        for &(row, height) in &spec.row_heights {
            sheet.set_row_height(row, height).unwrap();
        }
        for (row, col, cell) in &spec.cells {
            let (row, col) = (*row, *col);
            match cell {
                Cell::Text(s) => {
                    sheet.write_string(row, col, s).unwrap();
                }
                Cell::Number(v) => {
                    sheet.write_number(row, col, *v).unwrap();
                }
                Cell::Date(dt) => {
                    sheet.write_number_with_format(row, col, to_serial(*dt), &date).unwrap();
                }
                Cell::Styled(s) => {
                    sheet.write_string_with_format(row, col, s, &styled).unwrap();
                }
                Cell::FormattedBlank => {
                    sheet.write_blank(row, col, &styled).unwrap();
                }
                Cell::Themed(s) => {
                    sheet.write_string_with_format(row, col, s, &themed).unwrap();
                }
                Cell::Formula(formula, result) => {
                    let formula = Formula::new(formula).set_result(result.to_string());
                    sheet.write_formula(row, col, formula).unwrap();
                }
            }
        }
    }
    workbook.save_to_buffer().unwrap()
}

pub fn read_grid(bytes: &[u8], sheet: &str) -> Grid {
    WorkbookReader::from_bytes("output.xlsx", bytes.to_vec())
        .unwrap()
        .grid(sheet)
        .unwrap()
}

pub fn read_styled(bytes: &[u8], sheet: &str) -> StyledSheet {
    WorkbookReader::from_bytes("output.xlsx", bytes.to_vec())
        .unwrap()
        .styled_sheet(sheet)
        .unwrap()
}

pub fn sheet_names(bytes: &[u8]) -> Vec<String> {
    WorkbookReader::from_bytes("output.xlsx", bytes.to_vec())
        .unwrap()
        .sheet_names()
}

/// Column values of a grid below its header row
pub fn column_text(grid: &Grid, col: usize) -> Vec<String> {
    (1..grid.height()).map(|r| grid.get(r, col).render()).collect()
}
