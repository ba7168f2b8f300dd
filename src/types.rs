use chrono::NaiveDateTime;
use std::collections::BTreeMap;

use crate::core::normalize::clean_label;
use crate::error::{DashError, DashResult};

//==============================================================================
// Cell Values
//==============================================================================

/// A single spreadsheet cell value, independent of the workbook library
#[derive(Debug, Clone, PartialEq, Default)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    /// Native date/time (already decoded from a serial or ISO string)
    Date(NaiveDateTime),
}

static EMPTY_CELL: CellValue = CellValue::Empty;

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    /// Empty cells and zero-length strings count as blank
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Render the value the way it is measured for column widths
    pub fn render(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
            CellValue::Bool(true) => "TRUE".to_string(),
            CellValue::Bool(false) => "FALSE".to_string(),
            CellValue::Date(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(dt: NaiveDateTime) -> Self {
        CellValue::Date(dt)
    }
}

//==============================================================================
// Grid (absolute cell positions of one sheet)
//==============================================================================

/// 2-D matrix of cell values; row 0 / column 0 is spreadsheet cell A1
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    rows: Vec<Vec<CellValue>>,
}

impl Grid {
    pub fn new(rows: Vec<Vec<CellValue>>) -> Self {
        Self { rows }
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Out-of-range positions read as empty
    pub fn get(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    pub fn row(&self, row: usize) -> &[CellValue] {
        self.rows.get(row).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Build a frame using the first non-blank row as the header row
    pub fn to_frame(&self) -> Frame {
        let Some(header_idx) = self
            .rows
            .iter()
            .position(|r| r.iter().any(|c| !c.is_blank()))
        else {
            return Frame::default();
        };

        let width = self.width();
        let header = self.row(header_idx);
        let names: Vec<String> = (0..width)
            .map(|col| match header.get(col) {
                Some(cell) if !cell.is_blank() => cell.render().trim().to_string(),
                _ => format!("Unnamed: {}", col),
            })
            .collect();

        let mut frame = Frame::with_columns(names);
        for row in self.rows.iter().skip(header_idx + 1) {
            let values = (0..width)
                .map(|col| row.get(col).cloned().unwrap_or_default())
                .collect();
            frame.push_values(values);
        }
        frame
    }
}

//==============================================================================
// Frame (named columns)
//==============================================================================

/// A named column of cell values
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<CellValue>,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            values: Vec::new(),
        }
    }
}

/// Ordered sequence of named columns, all of the same height
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    columns: Vec<Column>,
    height: usize,
}

impl Frame {
    pub fn with_columns<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: names.into_iter().map(Column::new).collect(),
            height: 0,
        }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.height == 0
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Position of the column whose cleaned label equals the cleaned `name`
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = clean_label(name);
        self.columns.iter().position(|c| clean_label(&c.name) == wanted)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.column_index(name).map(|idx| &self.columns[idx])
    }

    pub fn require_column(&self, name: &str, sheet: &str) -> DashResult<&Column> {
        self.column(name).ok_or_else(|| DashError::ColumnNotFound {
            sheet: sheet.to_string(),
            column: name.to_string(),
        })
    }

    pub fn get(&self, row: usize, col: usize) -> &CellValue {
        self.columns
            .get(col)
            .and_then(|c| c.values.get(row))
            .unwrap_or(&EMPTY_CELL)
    }

    pub fn set(&mut self, row: usize, col: usize, value: CellValue) {
        if let Some(cell) = self.columns.get_mut(col).and_then(|c| c.values.get_mut(row)) {
            *cell = value;
        }
    }

    /// Apply `f` to every column label
    pub fn rename_columns(&mut self, f: impl Fn(&str) -> String) {
        for column in &mut self.columns {
            column.name = f(&column.name);
        }
    }

    /// Append a positional row; missing trailing cells are padded with empties
    pub fn push_values(&mut self, values: Vec<CellValue>) {
        let mut values = values.into_iter();
        for column in &mut self.columns {
            column.values.push(values.next().unwrap_or_default());
        }
        self.height += 1;
    }

    /// Add an all-empty column (no-op if the label already exists)
    pub fn add_column(&mut self, name: &str) {
        if self.column_index(name).is_some() {
            return;
        }
        let mut column = Column::new(name);
        column.values = vec![CellValue::Empty; self.height];
        self.columns.push(column);
    }

    /// Cells of one row in column order
    pub fn row(&self, row: usize) -> Vec<&CellValue> {
        self.columns.iter().map(|c| c.values.get(row).unwrap_or(&EMPTY_CELL)).collect()
    }

    /// Stack `other` below `self`, aligning columns by cleaned label.
    /// Columns only in `other` are appended in their first-seen order.
    pub fn concat(&self, other: &Frame) -> Frame {
        let mut combined = self.clone();
        for column in &other.columns {
            combined.add_column(&column.name);
        }
        let positions: Vec<Option<usize>> = combined
            .columns
            .iter()
            .map(|c| other.column_index(&c.name))
            .collect();
        for row in 0..other.height {
            let values = positions
                .iter()
                .map(|pos| pos.map(|p| other.get(row, p).clone()).unwrap_or_default())
                .collect();
            combined.push_values(values);
        }
        combined
    }

    /// Keep only the columns at the given 0-based positions, in that order
    pub fn select_positions(&self, positions: &[usize], sheet: &str) -> DashResult<Frame> {
        let mut columns = Vec::with_capacity(positions.len());
        for &pos in positions {
            let column = self.columns.get(pos).ok_or_else(|| DashError::ColumnNotFound {
                sheet: sheet.to_string(),
                column: format!("#{} (sheet has {} columns)", pos, self.columns.len()),
            })?;
            columns.push(column.clone());
        }
        Ok(Frame {
            columns,
            height: self.height,
        })
    }

    /// Rearrange rows; `order[i]` is the source row of output row `i`
    pub fn reorder(&self, order: &[usize]) -> Frame {
        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: c.name.clone(),
                values: order
                    .iter()
                    .map(|&r| c.values.get(r).cloned().unwrap_or_default())
                    .collect(),
            })
            .collect();
        Frame {
            columns,
            height: order.len(),
        }
    }

}

//==============================================================================
// Styled Cells
//==============================================================================

/// Font or fill colour as the workbook stores it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellColor {
    /// 0xRRGGBB
    Rgb(u32),
    /// Theme palette slot; `tint` is in thousandths, negative darkens
    Theme { index: u8, tint: i16 },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Font {
    pub name: Option<String>,
    pub size: Option<f64>,
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
    pub color: Option<CellColor>,
}

/// Solid background fill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Fill {
    pub color: Option<CellColor>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HorizontalAlign {
    #[default]
    General,
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VerticalAlign {
    #[default]
    Bottom,
    Center,
    Top,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Alignment {
    pub horizontal: HorizontalAlign,
    pub vertical: VerticalAlign,
    pub wrap_text: bool,
}

impl Alignment {
    pub fn centered() -> Self {
        Self {
            horizontal: HorizontalAlign::Center,
            vertical: VerticalAlign::Center,
            wrap_text: false,
        }
    }
}

/// Uniform border applied to all four edges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BorderStyle {
    #[default]
    None,
    Thin,
    Medium,
    Thick,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CellStyle {
    pub font: Font,
    pub fill: Fill,
    pub alignment: Alignment,
    pub number_format: Option<String>,
    pub border: BorderStyle,
}

impl CellStyle {
    /// True if anything differs from the workbook default style
    pub fn has_style(&self) -> bool {
        *self != CellStyle::default()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct StyledCell {
    /// For formula cells, the result cached by the last application that saved it
    pub value: CellValue,
    pub style: CellStyle,
    /// Formula text without the leading `=`
    pub formula: Option<String>,
}

impl StyledCell {
    pub fn new(value: CellValue, style: CellStyle) -> Self {
        Self {
            value,
            style,
            formula: None,
        }
    }
}

impl From<CellValue> for StyledCell {
    fn from(value: CellValue) -> Self {
        Self::new(value, CellStyle::default())
    }
}

/// Inclusive block of merged cells, 0-based
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergedRange {
    pub first_row: u32,
    pub first_col: u16,
    pub last_row: u32,
    pub last_col: u16,
}

impl MergedRange {
    /// Parse an `A1:C2` reference
    pub fn parse(reference: &str) -> Option<Self> {
        let (first, last) = reference.split_once(':')?;
        let (first_row, first_col) = crate::excel::parse_cell_ref(first)?;
        let (last_row, last_col) = crate::excel::parse_cell_ref(last)?;
        Some(Self {
            first_row: u32::try_from(first_row.min(last_row)).ok()?,
            first_col: u16::try_from(first_col.min(last_col)).ok()?,
            last_row: u32::try_from(first_row.max(last_row)).ok()?,
            last_col: u16::try_from(first_col.max(last_col)).ok()?,
        })
    }

    pub fn is_single_cell(&self) -> bool {
        self.first_row == self.last_row && self.first_col == self.last_col
    }
}

/// One worksheet of styled cells plus sheet geometry, anchored at A1
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StyledSheet {
    pub name: String,
    rows: Vec<Vec<StyledCell>>,
    /// 0-based column → width in character units
    pub column_widths: BTreeMap<u16, f64>,
    /// 0-based row → height in points, custom heights only
    pub row_heights: BTreeMap<u32, f64>,
    pub merged: Vec<MergedRange>,
}

impl StyledSheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn from_rows(name: impl Into<String>, rows: Vec<Vec<StyledCell>>) -> Self {
        Self {
            name: name.into(),
            rows,
            ..Default::default()
        }
    }

    /// Unstyled sheet holding the values of `grid`
    pub fn from_grid(name: impl Into<String>, grid: &Grid) -> Self {
        let rows = (0..grid.height())
            .map(|r| grid.row(r).iter().cloned().map(StyledCell::from).collect())
            .collect();
        Self::from_rows(name, rows)
    }

    /// Number of allocated rows (formatted-but-empty rows included)
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    pub fn rows(&self) -> &[Vec<StyledCell>] {
        &self.rows
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&StyledCell> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    pub fn value(&self, row: usize, col: usize) -> &CellValue {
        self.cell(row, col).map(|c| &c.value).unwrap_or(&EMPTY_CELL)
    }

    /// Mutable access, growing the sheet as needed
    pub fn cell_mut(&mut self, row: usize, col: usize) -> &mut StyledCell {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize_with(col + 1, StyledCell::default);
        }
        &mut cells[col]
    }

    pub fn set_column_width(&mut self, col: u16, width: f64) {
        self.column_widths.insert(col, width);
    }

    /// Values only
    pub fn to_grid(&self) -> Grid {
        Grid::new(
            self.rows
                .iter()
                .map(|r| r.iter().map(|c| c.value.clone()).collect())
                .collect(),
        )
    }
}
