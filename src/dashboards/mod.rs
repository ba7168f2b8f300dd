//! The four monthly dashboard transforms
//!
//! Each transform is a single synchronous run: uploaded workbooks in, one
//! rendered workbook out. Nothing is kept between runs.

pub mod aging;
pub mod cockpit;
pub mod stability;
pub mod toxic;

use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;
use std::path::Path;

use crate::core::dates::coerce_date;
use crate::error::{DashError, DashResult};
use crate::excel::WorkbookReader;
use crate::types::Frame;

/// Dashboard selector shared by the CLI and the HTTP surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dashboard {
    Aging,
    Cockpit,
    Stability,
    Toxic,
}

impl Dashboard {
    pub const ALL: [Dashboard; 4] = [
        Dashboard::Aging,
        Dashboard::Cockpit,
        Dashboard::Stability,
        Dashboard::Toxic,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Dashboard::Aging => "aging",
            Dashboard::Cockpit => "cockpit",
            Dashboard::Stability => "stability",
            Dashboard::Toxic => "toxic",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Dashboard::Aging => "Aging Incident Table Updater",
            Dashboard::Cockpit => "ITIS Cockpit KPI Auto-Updater",
            Dashboard::Stability => "Monthly IT Stability Data Appender",
            Dashboard::Toxic => "Toxic Data Appender",
        }
    }

    /// Upload field names, in the order they are expected
    pub fn inputs(self) -> &'static [&'static str] {
        match self {
            Dashboard::Aging => &["powerbi", "raw"],
            Dashboard::Cockpit => &["raw", "kpi"],
            Dashboard::Stability => &["source", "target"],
            Dashboard::Toxic => &["manual", "new"],
        }
    }
}

impl fmt::Display for Dashboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One uploaded workbook
#[derive(Debug, Clone)]
pub struct Upload {
    /// Uploaded file name, used in messages
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> DashResult<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            DashError::InvalidInput(format!("cannot read '{}': {}", path.display(), e))
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(name, bytes))
    }

    pub fn open(self) -> DashResult<WorkbookReader> {
        WorkbookReader::from_bytes(self.name, self.bytes)
    }
}

/// The rendered workbook and what happened
#[derive(Debug, Clone, Serialize)]
pub struct DashboardOutput {
    pub dashboard: Dashboard,
    pub file_name: String,
    #[serde(skip)]
    pub bytes: Vec<u8>,
    pub rows_appended: usize,
    /// Period stamped on the appended rows, if the dashboard has one
    pub period: Option<NaiveDateTime>,
    pub summary: String,
}

/// Last non-blank value of `column` that resolves to a date
pub(crate) fn last_period(frame: &Frame, column: &str, formats: &[String], sheet: &str) -> DashResult<NaiveDateTime> {
    let idx = frame
        .column_index(column)
        .ok_or_else(|| DashError::ColumnNotFound {
            sheet: sheet.to_string(),
            column: column.to_string(),
        })?;
    let last = (0..frame.height())
        .rev()
        .map(|row| frame.get(row, idx))
        .find(|value| !value.is_blank());
    last.and_then(|value| coerce_date(value, formats))
        .ok_or_else(|| DashError::NoPeriod {
            sheet: sheet.to_string(),
            column: column.to_string(),
        })
}
