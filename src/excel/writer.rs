//! Workbook rendering with rust_xlsxwriter

use rust_xlsxwriter::{
    Color, Format, FormatAlign, FormatBorder, FormatPattern, FormatUnderline, Formula, Workbook, Worksheet,
};
use std::collections::HashMap;

use crate::core::dates::to_serial;
use crate::error::DashResult;
use crate::types::{
    Alignment, BorderStyle, CellColor, CellStyle, CellValue, Frame, HorizontalAlign, StyledCell, StyledSheet,
    VerticalAlign,
};

/// MIME type of generated workbooks
pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Display format for dates that carry none of their own
const DEFAULT_DATE_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

/// How column widths of a rendered frame are chosen
#[derive(Debug, Clone, PartialEq, Default)]
pub enum WidthPolicy {
    #[default]
    None,
    /// Longest rendered value in the column (header included) plus padding
    Autofit { padding: f64 },
    /// Widths for columns A, B, ... in order
    Fixed(Vec<f64>),
}

/// Presentation of a frame written as a sheet
#[derive(Debug, Clone, Default)]
pub struct FrameLayout {
    /// 0-based column → number format applied to its non-blank data cells
    pub column_formats: Vec<(usize, String)>,
    /// Center every cell horizontally and vertically
    pub align_center: bool,
    pub widths: WidthPolicy,
}

/// Lay a frame out as a sheet: bold bordered header in row 1, data below
pub fn frame_sheet(name: &str, frame: &Frame, layout: &FrameLayout) -> StyledSheet {
    let mut sheet = StyledSheet::new(name);
    let header_style = CellStyle {
        font: crate::types::Font {
            bold: true,
            ..Default::default()
        },
        alignment: Alignment::centered(),
        border: BorderStyle::Thin,
        ..Default::default()
    };
    for (col, column) in frame.columns().iter().enumerate() {
        *sheet.cell_mut(0, col) = StyledCell::new(CellValue::Text(column.name.clone()), header_style.clone());
    }

    let formats: HashMap<usize, &str> = layout.column_formats.iter().map(|(c, f)| (*c, f.as_str())).collect();
    for row in 0..frame.height() {
        for col in 0..frame.width() {
            let value = frame.get(row, col).clone();
            let mut style = CellStyle::default();
            if layout.align_center {
                style.alignment = Alignment::centered();
            }
            if !value.is_blank() {
                style.number_format = formats.get(&col).map(|f| f.to_string());
            }
            *sheet.cell_mut(row + 1, col) = StyledCell::new(value, style);
        }
    }

    match &layout.widths {
        WidthPolicy::None => {}
        WidthPolicy::Autofit { padding } => autofit_columns(&mut sheet, *padding),
        WidthPolicy::Fixed(widths) => {
            for (col, width) in widths.iter().enumerate() {
                sheet.set_column_width(col as u16, *width);
            }
        }
    }
    sheet
}

/// Set every column's width to its longest rendered value plus `padding`
pub fn autofit_columns(sheet: &mut StyledSheet, padding: f64) {
    let mut longest: Vec<usize> = vec![0; sheet.width()];
    for row in sheet.rows() {
        for (col, cell) in row.iter().enumerate() {
            longest[col] = longest[col].max(cell.value.render().chars().count());
        }
    }
    for (col, len) in longest.into_iter().enumerate() {
        sheet.set_column_width(col as u16, len as f64 + padding);
    }
}

/// Closest of the six shades the writer offers for a theme column
fn theme_shade(index: u8, tint: i16) -> u8 {
    let shades: [i16; 6] = match index {
        0 => [0, -50, -150, -250, -350, -500],
        1 => [0, 500, 350, 250, 150, 50],
        2 => [0, -100, -250, -500, -750, -900],
        _ => [0, 800, 600, 400, -250, -500],
    };
    shades
        .iter()
        .enumerate()
        .min_by_key(|(_, shade)| (i32::from(**shade) - i32::from(tint)).abs())
        .map_or(0, |(i, _)| i as u8)
}

/// Theme slots past 9 (hyperlink colours) have no writer equivalent
fn writer_color(color: CellColor) -> Option<Color> {
    match color {
        CellColor::Rgb(rgb) => Some(Color::RGB(rgb)),
        CellColor::Theme { index, tint } if index <= 9 => Some(Color::Theme(index, theme_shade(index, tint))),
        CellColor::Theme { .. } => None,
    }
}

/// Translate a plain cell style into a writer format
pub fn style_to_format(style: &CellStyle) -> Format {
    let mut format = Format::new();
    let font = &style.font;
    if let Some(name) = &font.name {
        format = format.set_font_name(name);
    }
    if let Some(size) = font.size {
        format = format.set_font_size(size);
    }
    if font.bold {
        format = format.set_bold();
    }
    if font.italic {
        format = format.set_italic();
    }
    if font.underline {
        format = format.set_underline(FormatUnderline::Single);
    }
    if let Some(color) = font.color.and_then(writer_color) {
        format = format.set_font_color(color);
    }
    if let Some(color) = style.fill.color.and_then(writer_color) {
        format = format.set_pattern(FormatPattern::Solid).set_background_color(color);
    }
    format = match style.alignment.horizontal {
        HorizontalAlign::General => format,
        HorizontalAlign::Left => format.set_align(FormatAlign::Left),
        HorizontalAlign::Center => format.set_align(FormatAlign::Center),
        HorizontalAlign::Right => format.set_align(FormatAlign::Right),
    };
    format = match style.alignment.vertical {
        VerticalAlign::Bottom => format,
        VerticalAlign::Center => format.set_align(FormatAlign::VerticalCenter),
        VerticalAlign::Top => format.set_align(FormatAlign::Top),
    };
    if style.alignment.wrap_text {
        format = format.set_text_wrap();
    }
    if let Some(num_format) = &style.number_format {
        format = format.set_num_format(num_format);
    }
    match style.border {
        BorderStyle::None => format,
        BorderStyle::Thin => format.set_border(FormatBorder::Thin),
        BorderStyle::Medium => format.set_border(FormatBorder::Medium),
        BorderStyle::Thick => format.set_border(FormatBorder::Thick),
    }
}

/// Collects sheets and renders them into one in-memory workbook
pub struct WorkbookWriter {
    workbook: Workbook,
    sheets: usize,
}

impl Default for WorkbookWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkbookWriter {
    pub fn new() -> Self {
        Self {
            workbook: Workbook::new(),
            sheets: 0,
        }
    }

    pub fn add_sheet(&mut self, sheet: &StyledSheet) -> DashResult<()> {
        let worksheet = self.workbook.add_worksheet();
        worksheet.set_name(&sheet.name)?;
        write_merges(worksheet, sheet)?;
        write_cells(worksheet, sheet)?;
        for (&col, &width) in &sheet.column_widths {
            worksheet.set_column_width(col, width)?;
        }
        for (&row, &height) in &sheet.row_heights {
            worksheet.set_row_height(row, height)?;
        }
        self.sheets += 1;
        Ok(())
    }

    pub fn finish(mut self) -> DashResult<Vec<u8>> {
        if self.sheets == 0 {
            self.workbook.add_worksheet();
        }
        Ok(self.workbook.save_to_buffer()?)
    }
}

/// Merged blocks go first; the anchor cell's own value and format are
/// written over them by `write_cells`.
fn write_merges(worksheet: &mut Worksheet, sheet: &StyledSheet) -> DashResult<()> {
    for range in sheet.merged.iter().filter(|r| !r.is_single_cell()) {
        let format = sheet
            .cell(range.first_row as usize, range.first_col as usize)
            .map(|c| style_to_format(&c.style))
            .unwrap_or_default();
        worksheet.merge_range(
            range.first_row,
            range.first_col,
            range.last_row,
            range.last_col,
            "",
            &format,
        )?;
    }
    Ok(())
}

/// Cached result stored next to a formula, shown until the sheet recalculates
fn formula_result(value: &CellValue) -> String {
    match value {
        CellValue::Date(dt) => to_serial(*dt).to_string(),
        other => other.render(),
    }
}

fn write_cells(worksheet: &mut Worksheet, sheet: &StyledSheet) -> DashResult<()> {
    for (r, cells) in sheet.rows().iter().enumerate() {
        let row = r as u32;
        for (c, cell) in cells.iter().enumerate() {
            let col = c as u16;
            let mut style = cell.style.clone();
            if matches!(cell.value, CellValue::Date(_)) && style.number_format.is_none() {
                style.number_format = Some(DEFAULT_DATE_FORMAT.to_string());
            }
            let format = style_to_format(&style);
            if let Some(formula) = &cell.formula {
                let formula = Formula::new(formula.as_str()).set_result(formula_result(&cell.value));
                worksheet.write_formula_with_format(row, col, formula, &format)?;
                continue;
            }
            match &cell.value {
                CellValue::Empty => {
                    if style.has_style() {
                        worksheet.write_blank(row, col, &format)?;
                    }
                }
                CellValue::Text(s) => {
                    worksheet.write_string_with_format(row, col, s, &format)?;
                }
                CellValue::Number(n) => {
                    worksheet.write_number_with_format(row, col, *n, &format)?;
                }
                CellValue::Bool(b) => {
                    worksheet.write_boolean_with_format(row, col, *b, &format)?;
                }
                CellValue::Date(dt) => {
                    worksheet.write_number_with_format(row, col, to_serial(*dt), &format)?;
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel::WorkbookReader;
    use chrono::NaiveDate;

    fn frame() -> Frame {
        let mut frame = Frame::with_columns(["OE", "Date", "Value"]);
        let date = NaiveDate::from_ymd_opt(2025, 10, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        frame.push_values(vec!["AZCH".into(), CellValue::Date(date), 12.0.into()]);
        frame.push_values(vec!["Allianz Malaysia".into(), CellValue::Empty, 3.0.into()]);
        frame
    }

    #[test]
    fn test_frame_sheet_header_and_formats() {
        let layout = FrameLayout {
            column_formats: vec![(1, "mmm-yy".to_string())],
            align_center: true,
            widths: WidthPolicy::None,
        };
        let sheet = frame_sheet("Sheet1", &frame(), &layout);
        let header = sheet.cell(0, 0).unwrap();
        assert_eq!(header.value, CellValue::text("OE"));
        assert!(header.style.font.bold);

        let date = sheet.cell(1, 1).unwrap();
        assert_eq!(date.style.number_format.as_deref(), Some("mmm-yy"));
        assert_eq!(date.style.alignment, Alignment::centered());
        // Blank cells do not pick up the column format
        assert_eq!(sheet.cell(2, 1).unwrap().style.number_format, None);
    }

    #[test]
    fn test_autofit_widths() {
        let layout = FrameLayout {
            widths: WidthPolicy::Autofit { padding: 1.0 },
            ..Default::default()
        };
        let sheet = frame_sheet("Sheet1", &frame(), &layout);
        assert_eq!(sheet.column_widths.get(&0), Some(&17.0));
        // "2025-10-01 00:00:00"
        assert_eq!(sheet.column_widths.get(&1), Some(&20.0));
        assert_eq!(sheet.column_widths.get(&2), Some(&6.0));
    }

    #[test]
    fn test_fixed_widths() {
        let layout = FrameLayout {
            widths: WidthPolicy::Fixed(vec![15.0, 20.0]),
            ..Default::default()
        };
        let sheet = frame_sheet("IT Stability", &frame(), &layout);
        assert_eq!(sheet.column_widths.get(&1), Some(&20.0));
        assert_eq!(sheet.column_widths.get(&2), None);
    }

    #[test]
    fn test_written_workbook_reads_back() {
        let layout = FrameLayout {
            column_formats: vec![(1, "mmm-yy".to_string())],
            ..Default::default()
        };
        let mut writer = WorkbookWriter::new();
        writer.add_sheet(&frame_sheet("Sheet1", &frame(), &layout)).unwrap();
        let bytes = writer.finish().unwrap();

        let mut reader = WorkbookReader::from_bytes("out.xlsx", bytes).unwrap();
        assert_eq!(reader.sheet_names(), vec!["Sheet1"]);
        let frame = reader.frame("Sheet1").unwrap();
        assert_eq!(frame.column_names(), vec!["OE", "Date", "Value"]);
        assert_eq!(frame.get(0, 0), &CellValue::text("AZCH"));
        assert_eq!(
            frame.get(0, 1),
            &CellValue::Date(NaiveDate::from_ymd_opt(2025, 10, 1).unwrap().and_hms_opt(0, 0, 0).unwrap())
        );
        assert_eq!(frame.get(1, 2), &CellValue::Number(3.0));
    }

    #[test]
    fn test_styles_survive_round_trip() {
        let mut sheet = StyledSheet::new("Overall database");
        *sheet.cell_mut(0, 0) = StyledCell::new(
            CellValue::text("App"),
            CellStyle {
                font: crate::types::Font {
                    bold: true,
                    color: Some(CellColor::Rgb(0xC00000)),
                    ..Default::default()
                },
                fill: crate::types::Fill {
                    color: Some(CellColor::Theme { index: 4, tint: 800 }),
                },
                border: BorderStyle::Thin,
                ..Default::default()
            },
        );
        sheet.set_column_width(0, 25.0);
        let mut writer = WorkbookWriter::new();
        writer.add_sheet(&sheet).unwrap();
        let bytes = writer.finish().unwrap();

        let mut reader = WorkbookReader::from_bytes("out.xlsx", bytes).unwrap();
        let back = reader.styled_sheet("Overall database").unwrap();
        let style = &back.cell(0, 0).unwrap().style;
        assert!(style.font.bold);
        assert_eq!(style.font.color, Some(CellColor::Rgb(0xC00000)));
        assert_eq!(style.fill.color, Some(CellColor::Theme { index: 4, tint: 800 }));
        assert_eq!(style.border, BorderStyle::Thin);
        let width = back.column_widths.get(&0).copied().unwrap_or_default();
        assert!((width - 25.0).abs() < 1.0, "width {}", width);
    }

    #[test]
    fn test_theme_shade_picks_nearest() {
        assert_eq!(theme_shade(4, 0), 0);
        assert_eq!(theme_shade(4, 800), 1);
        assert_eq!(theme_shade(4, -250), 4);
        assert_eq!(theme_shade(0, -150), 2);
        assert_eq!(theme_shade(1, 480), 1);
        assert!(writer_color(CellColor::Theme { index: 10, tint: 0 }).is_none());
    }

    #[test]
    fn test_formulas_merges_and_row_heights_round_trip() {
        let mut sheet = StyledSheet::new("Summary");
        *sheet.cell_mut(0, 0) = StyledCell::new(
            CellValue::text("Toxic applications"),
            CellStyle {
                font: crate::types::Font {
                    bold: true,
                    ..Default::default()
                },
                alignment: Alignment::centered(),
                ..Default::default()
            },
        );
        sheet.cell_mut(1, 0).value = CellValue::Number(3.0);
        sheet.cell_mut(1, 1).value = CellValue::Number(4.0);
        let total = sheet.cell_mut(1, 2);
        total.value = CellValue::Number(7.0);
        total.formula = Some("SUM(A2:B2)".to_string());
        sheet.merged.push(crate::types::MergedRange::parse("A1:C1").unwrap());
        sheet.row_heights.insert(0, 30.0);

        let mut writer = WorkbookWriter::new();
        writer.add_sheet(&sheet).unwrap();
        let bytes = writer.finish().unwrap();

        let mut reader = WorkbookReader::from_bytes("out.xlsx", bytes).unwrap();
        let back = reader.styled_sheet("Summary").unwrap();
        assert_eq!(back.value(0, 0), &CellValue::text("Toxic applications"));
        assert!(back.cell(0, 0).unwrap().style.font.bold);
        assert_eq!(back.cell(1, 2).unwrap().formula.as_deref(), Some("SUM(A2:B2)"));
        assert_eq!(back.value(1, 2), &CellValue::Number(7.0));
        assert_eq!(back.cell(1, 0).unwrap().formula, None);
        assert_eq!(back.merged, sheet.merged);
        assert_eq!(back.row_heights.get(&0), Some(&30.0));
    }

    #[test]
    fn test_empty_writer_still_produces_workbook() {
        let bytes = WorkbookWriter::new().finish().unwrap();
        assert!(WorkbookReader::from_bytes("empty.xlsx", bytes).is_ok());
    }
}
