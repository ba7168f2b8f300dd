//! Aging incident table updater
//!
//! Counts open and resolved incidents per entity into day-count buckets and
//! appends next month's complete block to the PowerBI table.

use chrono::NaiveDateTime;
use tracing::{debug, info};

use crate::config::AgingConfig;
use crate::core::buckets::{block_frame, count_buckets, period_block, AgedIncident, BlockColumns};
use crate::core::dates::{add_months, coerce_date, elapsed_days, month_label};
use crate::core::merge::{append_block, SortSpec};
use crate::core::normalize::OeMatcher;
use crate::dashboards::{last_period, Dashboard, DashboardOutput, Upload};
use crate::error::DashResult;
use crate::excel::{frame_sheet, FrameLayout, WidthPolicy, WorkbookWriter};
use crate::types::{CellValue, Frame};

/// Age every usable incident of the raw export.
///
/// Rows without a parseable creation date or without a recognised entity are
/// dropped. Unresolved incidents are aged up to `now`.
pub fn aged_incidents(raw: &Frame, config: &AgingConfig, now: NaiveDateTime) -> DashResult<Vec<AgedIncident>> {
    let sheet = config.raw_sheet.as_str();
    raw.require_column(&config.created_column, sheet)?;
    raw.require_column(&config.resolved_column, sheet)?;
    raw.require_column(&config.oe_column, sheet)?;
    let created = raw.column_index(&config.created_column).unwrap_or(0);
    let resolved = raw.column_index(&config.resolved_column).unwrap_or(0);
    let oe = raw.column_index(&config.oe_column).unwrap_or(0);

    let matcher = OeMatcher::new(&config.oe_rules);
    let mut incidents = Vec::new();
    let (mut undated, mut unmatched) = (0usize, 0usize);
    for row in 0..raw.height() {
        let Some(start) = coerce_date(raw.get(row, created), &config.date_formats) else {
            debug!(row = row + 2, "no creation date, skipped");
            undated += 1;
            continue;
        };
        let end = coerce_date(raw.get(row, resolved), &config.date_formats);
        let entity = raw.get(row, oe).render();
        let Some(code) = matcher.match_code(&entity) else {
            debug!(row = row + 2, entity = %entity, "entity not recognised, skipped");
            unmatched += 1;
            continue;
        };
        incidents.push(AgedIncident {
            oe: code.to_string(),
            days: elapsed_days(start, end, now),
        });
    }
    info!(
        kept = incidents.len(),
        undated,
        unmatched,
        "aged raw incidents"
    );
    Ok(incidents)
}

/// Turn text periods such as `Aug-25` into real dates so the column format
/// applies to every row. Values that do not parse are left as they are.
fn coerce_period_column(frame: &mut Frame, col: usize, formats: &[String]) {
    for row in 0..frame.height() {
        let value = frame.get(row, col);
        if value.is_blank() || matches!(value, CellValue::Date(_)) {
            continue;
        }
        match coerce_date(value, formats) {
            Some(date) => frame.set(row, col, CellValue::Date(date)),
            None => debug!(row = row + 2, value = %value.render(), "period left as is"),
        }
    }
}

/// Append next month's aging block to the PowerBI table
pub fn run(powerbi: Upload, raw: Upload, config: &AgingConfig, now: NaiveDateTime) -> DashResult<DashboardOutput> {
    let mut raw_book = raw.open()?;
    let raw_frame = raw_book.frame(&config.raw_sheet)?;
    let incidents = aged_incidents(&raw_frame, config, now)?;

    let counts = count_buckets(&incidents, &config.buckets);
    let metrics = config.metrics();
    for metric in &metrics {
        info!(metric = %metric, count = counts.metric_total(metric), "bucket total");
    }

    let mut powerbi_book = powerbi.open()?;
    let (sheet, grid) = powerbi_book.first_grid()?;
    let existing = grid.to_frame();
    let last = last_period(&existing, &config.date_column, &config.date_formats, &sheet)?;
    let period = add_months(last, 1);
    info!(last = %month_label(last), next = %month_label(period), "detected period");

    let records = period_block(&counts, &config.oe_order, &metrics, period);
    let block = block_frame(
        &records,
        BlockColumns {
            oe: &config.oe_output_column,
            metric: &config.metric_column,
            date: &config.date_column,
            value: &config.value_column,
        },
    );
    let spec = SortSpec {
        period_column: &config.date_column,
        oe_column: &config.oe_output_column,
        oe_order: &config.oe_order,
        period_formats: &config.date_formats,
    };
    let mut combined = append_block(&existing, &block, &spec, &sheet)?;
    let date_idx = combined.column_index(&config.date_column).unwrap_or(0);
    coerce_period_column(&mut combined, date_idx, &config.date_formats);

    let layout = FrameLayout {
        column_formats: vec![(date_idx, config.period_format.clone())],
        align_center: true,
        widths: WidthPolicy::Autofit {
            padding: config.width_padding,
        },
    };
    let mut writer = WorkbookWriter::new();
    writer.add_sheet(&frame_sheet(&config.output_sheet, &combined, &layout))?;

    let summary = format!("Appended {} rows for {}", block.height(), month_label(period));
    info!("{}", summary);
    Ok(DashboardOutput {
        dashboard: Dashboard::Aging,
        file_name: config.output_file.clone(),
        bytes: writer.finish()?,
        rows_appended: block.height(),
        period: Some(period),
        summary,
    })
}
