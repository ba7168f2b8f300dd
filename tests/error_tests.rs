//! Error handling tests

use itdash::error::{DashError, DashResult};

// ═══════════════════════════════════════════════════════════════════════════
// MESSAGES
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_header_not_found_message() {
    let err = DashError::HeaderNotFound {
        sheet: "Architecture & Demand(H06)".to_string(),
        wanted: "Cloudification, Legacy Index".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "Could not find any of the headers [Cloudification, Legacy Index] in sheet 'Architecture & Demand(H06)'"
    );
}

#[test]
fn test_sheet_not_found_lists_available() {
    let err = DashError::SheetNotFound {
        sheet: "KPI2".to_string(),
        available: "Sheet1, Notes".to_string(),
    };
    assert_eq!(err.to_string(), "Worksheet 'KPI2' not found (available: Sheet1, Notes)");
}

#[test]
fn test_column_and_period_messages() {
    let column = DashError::ColumnNotFound {
        sheet: "Page 1".to_string(),
        column: "Created".to_string(),
    };
    assert_eq!(column.to_string(), "Column 'Created' not found in sheet 'Page 1'");

    let period = DashError::NoPeriod {
        sheet: "Sheet1".to_string(),
        column: "Date".to_string(),
    };
    assert_eq!(period.to_string(), "No usable period found in column 'Date' of sheet 'Sheet1'");
}

// ═══════════════════════════════════════════════════════════════════════════
// CONVERSIONS
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_io_error_conversion() {
    fn read() -> DashResult<Vec<u8>> {
        Ok(std::fs::read("/definitely/not/here.xlsx")?)
    }
    let err = read().unwrap_err();
    assert!(matches!(err, DashError::Io(_)));
    assert!(err.to_string().starts_with("IO error:"));
}

#[test]
fn test_yaml_error_conversion() {
    let parsed: Result<Vec<String>, _> = serde_yaml::from_str("{not: [a list");
    let err: DashError = parsed.unwrap_err().into();
    assert!(matches!(err, DashError::Config(_)));
}

#[test]
fn test_zip_error_conversion() {
    let err: DashError = zip::result::ZipError::FileNotFound.into();
    assert!(err.to_string().contains("not a valid .xlsx package"));
}

// ═══════════════════════════════════════════════════════════════════════════
// CLASSIFICATION
// ═══════════════════════════════════════════════════════════════════════════

#[test]
fn test_input_errors() {
    let input = [
        DashError::InvalidInput("x".to_string()),
        DashError::Read("x".to_string()),
        DashError::NoPeriod {
            sheet: "s".to_string(),
            column: "c".to_string(),
        },
        DashError::HeaderNotFound {
            sheet: "s".to_string(),
            wanted: "h".to_string(),
        },
    ];
    assert!(input.iter().all(DashError::is_input_error));
}

#[test]
fn test_tool_errors() {
    let tool = [
        DashError::Write("x".to_string()),
        DashError::Config("x".to_string()),
        DashError::Io(std::io::Error::other("disk full")),
    ];
    assert!(tool.iter().all(|e| !e.is_input_error()));
}
