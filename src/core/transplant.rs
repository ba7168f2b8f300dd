//! Appending styled rows below the real end of a sheet
//!
//! Destination sheets often carry formatted but empty rows after the data,
//! so the append position comes from the cell values, never from the
//! allocated row count.

use chrono::NaiveDateTime;
use tracing::debug;

use crate::types::{Alignment, BorderStyle, CellValue, HorizontalAlign, StyledCell, StyledSheet, VerticalAlign};

/// 0-based index of the last row holding any non-blank value
pub fn last_filled_row(sheet: &StyledSheet) -> Option<usize> {
    sheet
        .rows()
        .iter()
        .rposition(|row| row.iter().any(|cell| !cell.value.is_blank()))
}

/// What to copy and how to stamp the period
#[derive(Debug, Clone)]
pub struct TransplantPlan {
    /// 0-based first source row
    pub first_source_row: usize,
    /// 0-based last source row, inclusive; `None` means the last filled row
    pub last_source_row: Option<usize>,
    /// 0-based destination columns overwritten with `period`
    pub period_columns: Vec<usize>,
    pub period: NaiveDateTime,
    pub period_format: String,
}

/// Where the rows landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransplantReport {
    /// 0-based destination row of the first appended row
    pub start_row: usize,
    pub rows_appended: usize,
}

/// Copy the planned source rows below the last filled row of `dst`.
///
/// Fully blank source rows are skipped. Every copied cell keeps its font,
/// fill, alignment and number format, loses text wrapping and gains a thin
/// border.
pub fn transplant_rows(src: &StyledSheet, dst: &mut StyledSheet, plan: &TransplantPlan) -> TransplantReport {
    let start_row = last_filled_row(dst).map_or(0, |r| r + 1);
    let width = src.width();
    let last = plan.last_source_row.or_else(|| last_filled_row(src));

    let mut target = start_row;
    if let Some(last) = last {
        for row in plan.first_source_row..=last {
            let cells = src.rows().get(row).map(Vec::as_slice).unwrap_or(&[]);
            if cells.iter().all(|c| c.value.is_blank()) {
                debug!(row = row + 1, "skipping blank source row");
                continue;
            }
            for col in 0..width {
                let copied = cells.get(col).map(copy_cell).unwrap_or_else(|| bordered(CellValue::Empty));
                *dst.cell_mut(target, col) = copied;
            }
            for &col in &plan.period_columns {
                *dst.cell_mut(target, col) = period_cell(plan);
            }
            target += 1;
        }
    }

    TransplantReport {
        start_row,
        rows_appended: target - start_row,
    }
}

fn copy_cell(cell: &StyledCell) -> StyledCell {
    let mut copied = cell.clone();
    copied.style.alignment.wrap_text = false;
    copied.style.border = BorderStyle::Thin;
    copied
}

fn bordered(value: CellValue) -> StyledCell {
    let mut cell = StyledCell::from(value);
    cell.style.border = BorderStyle::Thin;
    cell
}

fn period_cell(plan: &TransplantPlan) -> StyledCell {
    let mut cell = bordered(CellValue::Date(plan.period));
    cell.style.number_format = Some(plan.period_format.clone());
    cell.style.alignment = Alignment {
        horizontal: HorizontalAlign::Left,
        vertical: VerticalAlign::Center,
        wrap_text: false,
    };
    cell
}
