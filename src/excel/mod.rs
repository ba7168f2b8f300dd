//! Excel workbook I/O
//!
//! - Read: calamine for values, the raw package for cell formatting
//! - Write: rust_xlsxwriter into an in-memory buffer

mod reader;
mod styles;
mod writer;

pub use reader::WorkbookReader;
pub use styles::{parse_cell_ref, PackageStyles, SheetLayout};
pub use writer::{autofit_columns, frame_sheet, style_to_format, FrameLayout, WidthPolicy, WorkbookWriter, XLSX_MIME};
