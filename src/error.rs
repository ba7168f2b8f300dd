use thiserror::Error;

pub type DashResult<T> = Result<T, DashError>;

#[derive(Error, Debug)]
pub enum DashError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not find any of the headers [{wanted}] in sheet '{sheet}'")]
    HeaderNotFound { sheet: String, wanted: String },

    #[error("Worksheet '{sheet}' not found (available: {available})")]
    SheetNotFound { sheet: String, available: String },

    #[error("Column '{column}' not found in sheet '{sheet}'")]
    ColumnNotFound { sheet: String, column: String },

    #[error("No usable period found in column '{column}' of sheet '{sheet}'")]
    NoPeriod { sheet: String, column: String },

    #[error("Failed to read workbook: {0}")]
    Read(String),

    #[error("Failed to write workbook: {0}")]
    Write(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<calamine::XlsxError> for DashError {
    fn from(e: calamine::XlsxError) -> Self {
        DashError::Read(e.to_string())
    }
}

impl From<zip::result::ZipError> for DashError {
    fn from(e: zip::result::ZipError) -> Self {
        DashError::Read(format!("not a valid .xlsx package: {}", e))
    }
}

impl From<quick_xml::Error> for DashError {
    fn from(e: quick_xml::Error) -> Self {
        DashError::Read(format!("malformed workbook XML: {}", e))
    }
}

impl From<rust_xlsxwriter::XlsxError> for DashError {
    fn from(e: rust_xlsxwriter::XlsxError) -> Self {
        DashError::Write(e.to_string())
    }
}

impl From<serde_yaml::Error> for DashError {
    fn from(e: serde_yaml::Error) -> Self {
        DashError::Config(e.to_string())
    }
}

impl DashError {
    /// True for errors caused by the uploaded files rather than by the tool itself.
    pub fn is_input_error(&self) -> bool {
        !matches!(
            self,
            DashError::Io(_) | DashError::Write(_) | DashError::Config(_)
        )
    }
}
