//! Workbook loading: values through calamine, formatting through the package

use calamine::{Data, Range, Reader, Xlsx};
use chrono::NaiveDateTime;
use std::io::Cursor;
use tracing::debug;

use crate::core::dates::from_serial;
use crate::error::{DashError, DashResult};
use crate::excel::styles::{Package, PackageStyles};
use crate::types::{CellValue, Frame, Grid, StyledSheet};

/// An uploaded workbook held in memory
pub struct WorkbookReader {
    label: String,
    bytes: Vec<u8>,
    workbook: Xlsx<Cursor<Vec<u8>>>,
}

impl WorkbookReader {
    /// `label` names the upload in error messages (usually its file name)
    pub fn from_bytes(label: impl Into<String>, bytes: Vec<u8>) -> DashResult<Self> {
        let label = label.into();
        let workbook = Xlsx::new(Cursor::new(bytes.clone()))
            .map_err(|e| DashError::Read(format!("{}: {}", label, e)))?;
        Ok(Self { label, bytes, workbook })
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names().to_vec()
    }

    pub fn has_sheet(&self, sheet: &str) -> bool {
        self.workbook.sheet_names().iter().any(|s| s == sheet)
    }

    fn first_sheet_name(&self) -> DashResult<String> {
        self.workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| DashError::Read(format!("{}: workbook has no sheets", self.label)))
    }

    fn require_sheet(&self, sheet: &str) -> DashResult<()> {
        if self.has_sheet(sheet) {
            return Ok(());
        }
        Err(DashError::SheetNotFound {
            sheet: sheet.to_string(),
            available: self.sheet_names().join(", "),
        })
    }

    /// Absolutely positioned values of `sheet` (row 0 / col 0 = A1)
    pub fn grid(&mut self, sheet: &str) -> DashResult<Grid> {
        self.require_sheet(sheet)?;
        let range = self
            .workbook
            .worksheet_range(sheet)
            .map_err(|e| DashError::Read(format!("{} / {}: {}", self.label, sheet, e)))?;
        Ok(range_to_grid(&range))
    }

    pub fn first_grid(&mut self) -> DashResult<(String, Grid)> {
        let name = self.first_sheet_name()?;
        let grid = self.grid(&name)?;
        Ok((name, grid))
    }

    /// `sheet` as a table whose header is its first non-blank row
    pub fn frame(&mut self, sheet: &str) -> DashResult<Frame> {
        Ok(self.grid(sheet)?.to_frame())
    }

    /// Values, formulas, per-cell formatting and sheet geometry
    pub fn styled_sheet(&mut self, sheet: &str) -> DashResult<StyledSheet> {
        let mut package = Package::new(self.bytes.clone())?;
        let styles = package.styles()?;
        self.styled_sheet_with(&mut package, &styles, sheet)
    }

    pub fn first_styled_sheet(&mut self) -> DashResult<StyledSheet> {
        let name = self.first_sheet_name()?;
        self.styled_sheet(&name)
    }

    /// Every sheet in workbook order; the package is opened once
    pub fn styled_sheets(&mut self) -> DashResult<Vec<StyledSheet>> {
        let mut package = Package::new(self.bytes.clone())?;
        let styles = package.styles()?;
        self.sheet_names()
            .iter()
            .map(|name| self.styled_sheet_with(&mut package, &styles, name))
            .collect()
    }

    fn styled_sheet_with(
        &mut self,
        package: &mut Package,
        styles: &PackageStyles,
        sheet: &str,
    ) -> DashResult<StyledSheet> {
        let grid = self.grid(sheet)?;
        let formulas = self.formulas(sheet)?;
        let layout = package.sheet_layout(sheet)?;
        debug!(
            workbook = %self.label,
            sheet,
            styles = styles.len(),
            styled_cells = layout.cell_styles.len(),
            formulas = formulas.len(),
            merged = layout.merged.len(),
            "loaded sheet formatting"
        );

        let mut styled = StyledSheet::from_grid(sheet, &grid);
        for (&(row, col), &xf) in &layout.cell_styles {
            styled.cell_mut(row, col).style = styles.style(xf);
        }
        for (row, col, formula) in formulas {
            styled.cell_mut(row, col).formula = Some(formula);
        }
        styled.column_widths = layout.column_widths;
        styled.row_heights = layout.row_heights;
        styled.merged = layout.merged;
        Ok(styled)
    }

    /// `(row, col, formula)` for every formula cell, absolutely positioned,
    /// without the leading `=`
    fn formulas(&mut self, sheet: &str) -> DashResult<Vec<(usize, usize, String)>> {
        let range = self
            .workbook
            .worksheet_formula(sheet)
            .map_err(|e| DashError::Read(format!("{} / {}: {}", self.label, sheet, e)))?;
        let Some((start_row, start_col)) = range.start() else {
            return Ok(Vec::new());
        };
        Ok(range
            .cells()
            .filter(|(_, _, formula)| !formula.is_empty())
            .map(|(row, col, formula)| {
                (
                    start_row as usize + row,
                    start_col as usize + col,
                    formula.trim_start_matches('=').to_string(),
                )
            })
            .collect())
    }
}

fn range_to_grid(range: &Range<Data>) -> Grid {
    let Some((start_row, start_col)) = range.start() else {
        return Grid::default();
    };
    let (height, width) = range.get_size();
    let (start_row, start_col) = (start_row as usize, start_col as usize);

    let mut rows = vec![vec![CellValue::Empty; start_col + width]; start_row + height];
    for (row, col, data) in range.cells() {
        rows[start_row + row][start_col + col] = convert(data);
    }
    Grid::new(rows)
}

fn convert(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => from_serial(dt.as_f64())
            .map(CellValue::Date)
            .unwrap_or(CellValue::Number(dt.as_f64())),
        Data::DateTimeIso(s) => parse_iso(s).map(CellValue::Date).unwrap_or_else(|| CellValue::Text(s.clone())),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(e.to_string()),
    }
}

fn parse_iso(s: &str) -> Option<NaiveDateTime> {
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d"]
        .iter()
        .find_map(|fmt| {
            NaiveDateTime::parse_from_str(s, fmt).ok().or_else(|| {
                chrono::NaiveDate::parse_from_str(s, fmt)
                    .ok()
                    .map(|d| d.and_time(chrono::NaiveTime::MIN))
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_convert_values() {
        assert_eq!(convert(&Data::Int(3)), CellValue::Number(3.0));
        assert_eq!(convert(&Data::String("x".into())), CellValue::text("x"));
        assert_eq!(convert(&Data::Empty), CellValue::Empty);
        assert_eq!(
            convert(&Data::DateTimeIso("2025-09-01T00:00:00".into())),
            CellValue::Date(NaiveDate::from_ymd_opt(2025, 9, 1).unwrap().and_hms_opt(0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_styled_sheets_reads_every_sheet_once() {
        use rust_xlsxwriter::{Format, Workbook};

        let mut workbook = Workbook::new();
        let bold = Format::new().set_bold();
        for (name, label) in [("Summary", "Total"), ("Overall database", "App")] {
            let sheet = workbook.add_worksheet();
            sheet.set_name(name).unwrap();
            sheet.write_string_with_format(0, 0, label, &bold).unwrap();
            sheet.write_number(1, 0, 2.0).unwrap();
        }
        let bytes = workbook.save_to_buffer().unwrap();

        let mut reader = WorkbookReader::from_bytes("manual.xlsx", bytes).unwrap();
        let sheets = reader.styled_sheets().unwrap();
        let names: Vec<&str> = sheets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Summary", "Overall database"]);
        for sheet in &sheets {
            assert!(sheet.cell(0, 0).unwrap().style.font.bold, "{}", sheet.name);
            assert!(!sheet.cell(1, 0).unwrap().style.font.bold, "{}", sheet.name);
        }
        assert_eq!(sheets[1].value(0, 0), &CellValue::text("App"));
    }

    #[test]
    fn test_garbage_bytes_are_read_errors() {
        let err = WorkbookReader::from_bytes("upload.xlsx", b"not a zip".to_vec()).err().unwrap();
        assert!(matches!(err, DashError::Read(_)));
        assert!(err.to_string().contains("upload.xlsx"));
    }
}
