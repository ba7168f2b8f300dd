//! Monthly IT stability appender

use tracing::info;

use crate::config::StabilityConfig;
use crate::dashboards::{Dashboard, DashboardOutput, Upload};
use crate::error::{DashError, DashResult};
use crate::excel::{frame_sheet, FrameLayout, WidthPolicy, WorkbookWriter};
use crate::types::Frame;

/// Picked columns of one source export
pub fn pick_columns(source: &Frame, config: &StabilityConfig, label: &str) -> DashResult<Frame> {
    source.select_positions(&config.pick_columns, &format!("{} ({})", config.source_sheet, label))
}

/// Append every source export to the IT stability sheet
pub fn run(sources: Vec<Upload>, target: Upload, config: &StabilityConfig) -> DashResult<DashboardOutput> {
    if sources.is_empty() {
        return Err(DashError::InvalidInput("at least one source workbook is required".to_string()));
    }

    let source_count = sources.len();
    let mut extracted = Frame::default();
    for upload in sources {
        let label = upload.name.clone();
        let mut book = upload.open()?;
        let picked = pick_columns(&book.frame(&config.source_sheet)?, config, &label)?;
        info!(source = %label, rows = picked.height(), "extracted source rows");
        extracted = if extracted.width() == 0 { picked } else { extracted.concat(&picked) };
    }

    let mut target_book = target.open()?;
    let existing = target_book.frame(&config.target_sheet)?;
    let combined = existing.concat(&extracted);

    let layout = FrameLayout {
        column_formats: config
            .date_columns
            .iter()
            .map(|&c| (c, config.period_format.clone()))
            .collect(),
        align_center: false,
        widths: WidthPolicy::Fixed(config.column_widths.clone()),
    };
    let mut writer = WorkbookWriter::new();
    writer.add_sheet(&frame_sheet(&config.target_sheet, &combined, &layout))?;

    let summary = format!(
        "Appended {} rows from {} files",
        extracted.height(),
        source_count
    );
    info!("{}", summary);
    Ok(DashboardOutput {
        dashboard: Dashboard::Stability,
        file_name: config.output_file.clone(),
        bytes: writer.finish()?,
        rows_appended: extracted.height(),
        period: None,
        summary,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CellValue;

    fn export(width: usize) -> Frame {
        let mut frame = Frame::with_columns((0..width).map(|c| format!("Col{}", c)));
        frame.push_values((0..width).map(|c| CellValue::Number(c as f64)).collect());
        frame
    }

    #[test]
    fn test_pick_columns_in_configured_order() {
        let picked = pick_columns(&export(15), &StabilityConfig::default(), "jan.xlsx").unwrap();
        assert_eq!(
            picked.column_names(),
            vec!["Col0", "Col1", "Col2", "Col5", "Col14", "Col7", "Col8", "Col9", "Col11"]
        );
        assert_eq!(picked.get(0, 4), &CellValue::Number(14.0));
    }

    #[test]
    fn test_pick_columns_too_narrow() {
        let err = pick_columns(&export(10), &StabilityConfig::default(), "jan.xlsx").unwrap_err();
        assert!(matches!(err, DashError::ColumnNotFound { .. }));
        assert!(err.to_string().contains("jan.xlsx"));
    }

    #[test]
    fn test_no_sources_rejected() {
        let target = Upload::new("target.xlsx", Vec::new());
        let err = run(Vec::new(), target, &StabilityConfig::default()).unwrap_err();
        assert!(matches!(err, DashError::InvalidInput(_)));
    }
}
