//! Toxic data appender
//!
//! Pastes the rows of a new data export under the last filled row of the
//! manual database sheet, keeping the source formatting and stamping the
//! `File` and `Date` columns with the next month. The other sheets go back
//! out as read, formulas and merged cells included.

use chrono::NaiveDateTime;
use tracing::{debug, info, warn};

use crate::config::ToxicConfig;
use crate::core::dates::{coerce_date, day_label, first_of_next_month};
use crate::core::locator::find_header_row;
use crate::core::transplant::{last_filled_row, transplant_rows, TransplantPlan};
use crate::dashboards::{Dashboard, DashboardOutput, Upload};
use crate::error::{DashError, DashResult};
use crate::excel::WorkbookWriter;
use crate::types::StyledSheet;

/// Latest date in `col`, scanning up from the last filled row to row 2
pub fn base_date(sheet: &StyledSheet, col: usize, formats: &[String]) -> Option<NaiveDateTime> {
    let last = last_filled_row(sheet)?;
    (1..=last).rev().find_map(|row| {
        let value = sheet.value(row, col);
        if value.is_blank() {
            return None;
        }
        let parsed = coerce_date(value, formats);
        if parsed.is_none() {
            debug!(row = row + 1, value = %value.render(), "not a date");
        }
        parsed
    })
}

/// Paste the new export into the manual workbook
pub fn run(manual: Upload, new: Upload, config: &ToxicConfig, now: NaiveDateTime) -> DashResult<DashboardOutput> {
    let mut manual_book = manual.open()?;
    let mut sheets = manual_book.styled_sheets()?;
    let target = sheets
        .iter()
        .position(|s| s.name == config.target_sheet)
        .ok_or_else(|| DashError::SheetNotFound {
            sheet: config.target_sheet.clone(),
            available: manual_book.sheet_names().join(", "),
        })?;

    let source = new.open()?.first_styled_sheet()?;
    let dest = &mut sheets[target];

    let header = find_header_row(&dest.to_grid(), &config.period_labels, config.header_scan_rows);
    let period_columns: Vec<usize> = match &header {
        Some(h) => config.period_labels.iter().filter_map(|l| h.column(l)).collect(),
        None => {
            warn!(
                sheet = %config.target_sheet,
                labels = ?config.period_labels,
                "no header row with period labels, period columns left as copied"
            );
            Vec::new()
        }
    };
    debug!(header_row = ?header.as_ref().map(|h| h.row + 1), columns = ?period_columns, "period columns");

    let base = period_columns
        .iter()
        .find_map(|&col| base_date(dest, col, &config.date_formats))
        .unwrap_or(now);
    let period = first_of_next_month(base);
    info!(base = %base, next = %day_label(period), "detected period");

    let plan = TransplantPlan {
        first_source_row: config.first_source_row.saturating_sub(1),
        last_source_row: None,
        period_columns,
        period,
        period_format: config.period_format.clone(),
    };
    let report = transplant_rows(&source, dest, &plan);

    let mut writer = WorkbookWriter::new();
    for sheet in &sheets {
        writer.add_sheet(sheet)?;
    }

    let summary = format!(
        "Pasted {} rows into '{}' from row {}",
        report.rows_appended,
        config.target_sheet,
        report.start_row + 1
    );
    info!("{}", summary);
    Ok(DashboardOutput {
        dashboard: Dashboard::Toxic,
        file_name: format!("{}{}.xlsx", config.output_prefix, now.format("%d%b%y")),
        bytes: writer.finish()?,
        rows_appended: report.rows_appended,
        period: Some(period),
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellValue;
    use chrono::NaiveDate;

    fn day(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn formats() -> Vec<String> {
        ToxicConfig::default().date_formats
    }

    fn database(file_values: &[CellValue]) -> StyledSheet {
        let mut sheet = StyledSheet::new("Overall database");
        sheet.cell_mut(0, 0).value = CellValue::text("App");
        sheet.cell_mut(0, 1).value = CellValue::text("File");
        for (i, value) in file_values.iter().enumerate() {
            sheet.cell_mut(i + 1, 0).value = CellValue::text(format!("app{}", i));
            sheet.cell_mut(i + 1, 1).value = value.clone();
        }
        sheet
    }

    #[test]
    fn test_base_date_from_last_parseable_value() {
        let sheet = database(&[
            CellValue::text("1-Aug-25"),
            CellValue::Date(day(2025, 9, 1)),
            CellValue::text("pending"),
            CellValue::Empty,
        ]);
        assert_eq!(base_date(&sheet, 1, &formats()), Some(day(2025, 9, 1)));
    }

    #[test]
    fn test_base_date_accepts_text_and_serials() {
        let sheet = database(&[CellValue::text("01/09/2025")]);
        assert_eq!(base_date(&sheet, 1, &formats()), Some(day(2025, 9, 1)));
        let sheet = database(&[CellValue::Number(45901.0)]);
        assert_eq!(base_date(&sheet, 1, &formats()), Some(day(2025, 9, 1)));
    }

    #[test]
    fn test_base_date_ignores_header_row() {
        let sheet = database(&[]);
        assert_eq!(base_date(&sheet, 1, &formats()), None);
    }
}
