//! ITIS cockpit KPI updater
//!
//! Pulls rating cells such as `Good (99.9)` out of four KPI slides, lines
//! them up per entity and appends them to the KPI2 history as next month.

use chrono::NaiveDateTime;
use regex::Regex;
use tracing::{debug, info, warn};

use crate::config::{CockpitConfig, KpiSheet};
use crate::core::dates::{add_months, month_label};
use crate::core::locator::{locate_headers, ScanWindow};
use crate::core::merge::{outer_join, sort_by_period_and_order, SortSpec};
use crate::core::normalize::{clean_label, strip_group_marker};
use crate::dashboards::{last_period, Dashboard, DashboardOutput, Upload};
use crate::error::{DashError, DashResult};
use crate::excel::{autofit_columns, frame_sheet, FrameLayout, WidthPolicy, WorkbookWriter};
use crate::types::{CellValue, Frame, Grid, StyledSheet};

/// Rating cells per entity for one KPI slide.
///
/// Columns are `oe_column` followed by the located headers. An entity row is
/// kept only if at least one of its KPI cells holds a rating.
pub fn extract_kpis(grid: &Grid, sheet: &KpiSheet, config: &CockpitConfig, rating: &Regex) -> DashResult<Frame> {
    let window = ScanWindow {
        rows: config.header_rows,
        cols: config.header_cols,
    };
    let headers = locate_headers(grid, &sheet.headers, window, &sheet.name)?;
    debug!(sheet = %sheet.name, found = headers.len(), "located KPI headers");

    let names = headers.headers();
    let mut frame = Frame::with_columns(std::iter::once(config.oe_column.as_str()).chain(names.iter().copied()));
    let entity_col = config.entity_column.saturating_sub(1);

    for row in config.first_data_row.saturating_sub(1)..config.last_data_row {
        let Some(entity) = grid.get(row, entity_col).as_text() else {
            continue;
        };
        let entity = clean_label(entity);
        if entity.is_empty() {
            continue;
        }

        let mut values = vec![CellValue::Empty; names.len()];
        let mut found = false;
        for (col, header) in headers.iter() {
            let Some(text) = grid.get(row, col).as_text() else {
                continue;
            };
            if !rating.is_match(text) {
                continue;
            }
            if let Some(slot) = names.iter().position(|h| *h == header) {
                values[slot] = CellValue::text(text.trim());
                found = true;
            }
        }
        if found {
            let mut row_values = vec![CellValue::Text(entity)];
            row_values.extend(values);
            frame.push_values(row_values);
        }
    }
    info!(sheet = %sheet.name, entities = frame.height(), "extracted KPI ratings");
    Ok(frame)
}

/// Look up an entity's id in the KPI2 history: exact cleaned name first,
/// then with the group marker removed on both sides.
fn find_id(history: &Frame, oe_idx: usize, id_idx: usize, entity: &str) -> CellValue {
    let wanted = clean_label(entity).to_lowercase();
    let exact = (0..history.height()).find(|&r| clean_label(&history.get(r, oe_idx).render()).to_lowercase() == wanted);
    let row = exact.or_else(|| {
        let wanted = strip_group_marker(entity).to_lowercase();
        (0..history.height()).find(|&r| strip_group_marker(&history.get(r, oe_idx).render()).to_lowercase() == wanted)
    });
    match row {
        Some(r) => history.get(r, id_idx).clone(),
        None => {
            debug!(entity, "no id in history");
            CellValue::Empty
        }
    }
}

/// Rows to append: `{Date, id, OE, KPIs...}` per merged entity
pub fn build_append(merged: &Frame, history: &Frame, config: &CockpitConfig, period: NaiveDateTime) -> DashResult<Frame> {
    let sheet = config.kpi_sheet.as_str();
    history.require_column(&config.oe_column, sheet)?;
    history.require_column(&config.id_column, sheet)?;
    let hist_oe = history.column_index(&config.oe_column).unwrap_or(0);
    let hist_id = history.column_index(&config.id_column).unwrap_or(0);
    let merged_oe = merged.column_index(&config.oe_column).unwrap_or(0);

    let mut names = vec![config.date_column.clone(), config.id_column.clone(), config.oe_column.clone()];
    let kpi_positions: Vec<usize> = (0..merged.width()).filter(|&c| c != merged_oe).collect();
    names.extend(kpi_positions.iter().map(|&c| clean_label(&merged.columns()[c].name)));

    let mut append = Frame::with_columns(names);
    for row in 0..merged.height() {
        let entity = clean_label(&merged.get(row, merged_oe).render());
        let mut values = vec![
            CellValue::Date(period),
            find_id(history, hist_oe, hist_id, &entity),
            CellValue::Text(entity),
        ];
        values.extend(kpi_positions.iter().map(|&c| merged.get(row, c).clone()));
        append.push_values(values);
    }
    Ok(append)
}

/// Append next month's KPI ratings to the KPI2 workbook
pub fn run(raw: Upload, kpi: Upload, config: &CockpitConfig) -> DashResult<DashboardOutput> {
    let rating = Regex::new(&config.rating_pattern)
        .map_err(|e| DashError::Config(format!("invalid rating pattern: {}", e)))?;

    let mut kpi_book = kpi.open()?;
    let mut history = kpi_book.frame(&config.kpi_sheet)?;
    history.rename_columns(clean_label);
    let last = last_period(&history, &config.date_column, &config.period_formats, &config.kpi_sheet)?;
    let period = add_months(last, 1);
    info!(last = %month_label(last), next = %month_label(period), "detected period");

    let mut raw_book = raw.open()?;
    let mut merged: Option<Frame> = None;
    for sheet in &config.sheets {
        let grid = raw_book.grid(&sheet.name)?;
        let kpis = extract_kpis(&grid, sheet, config, &rating)?;
        merged = Some(match merged {
            None => kpis,
            Some(left) => outer_join(&left, &kpis, &config.oe_column, &sheet.name)?,
        });
    }
    let merged = merged.unwrap_or_else(|| Frame::with_columns([config.oe_column.as_str()]));

    let append = build_append(&merged, &history, config, period)?;
    let mut combined = history.concat(&append);
    let oe_idx = combined.column_index(&config.oe_column).unwrap_or(0);
    for row in 0..combined.height() {
        let value = combined.get(row, oe_idx);
        if !value.is_blank() {
            let cleaned = clean_label(&value.render());
            combined.set(row, oe_idx, CellValue::Text(cleaned));
        }
    }
    let spec = SortSpec {
        period_column: &config.date_column,
        oe_column: &config.oe_column,
        oe_order: &config.oe_order,
        period_formats: &config.period_formats,
    };
    let combined = sort_by_period_and_order(&combined, &spec, &config.kpi_sheet)?;

    let layout = FrameLayout {
        column_formats: vec![(0, config.period_format.clone())],
        align_center: false,
        widths: WidthPolicy::Autofit {
            padding: config.width_padding,
        },
    };
    let mut writer = WorkbookWriter::new();
    writer.add_sheet(&frame_sheet(&config.kpi_sheet, &combined, &layout))?;
    if kpi_book.has_sheet(&config.passthrough_sheet) {
        let grid = kpi_book.grid(&config.passthrough_sheet)?;
        let mut passthrough = StyledSheet::from_grid(&config.passthrough_sheet, &grid);
        autofit_columns(&mut passthrough, config.width_padding);
        writer.add_sheet(&passthrough)?;
    } else {
        warn!(sheet = %config.passthrough_sheet, "sheet not in KPI workbook, not copied");
    }

    let summary = format!("Added {} new rows for {}", append.height(), month_label(period));
    info!("{}", summary);
    Ok(DashboardOutput {
        dashboard: Dashboard::Cockpit,
        file_name: config.output_file.clone(),
        bytes: writer.finish()?,
        rows_appended: append.height(),
        period: Some(period),
        summary,
    })
}
