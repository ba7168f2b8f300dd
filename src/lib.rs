//! itdash - monthly IT dashboard workbook updater
//!
//! Reads the monthly Excel exports behind four IT governance dashboards,
//! derives next month's rows and renders an updated workbook:
//!
//! - **aging**: buckets open incidents by age per organisational entity
//! - **cockpit**: extracts KPI ratings from the cockpit slides
//! - **stability**: appends picked columns of the stability exports
//! - **toxic**: pastes new rows under the manual database, styles included
//!
//! # Example
//!
//! ```no_run
//! use itdash::config::DashboardConfig;
//! use itdash::dashboards::{stability, Upload};
//! use std::path::Path;
//!
//! let config = DashboardConfig::default();
//! let output = stability::run(
//!     vec![Upload::from_path(Path::new("jan.xlsx"))?],
//!     Upload::from_path(Path::new("All Data.xlsx"))?,
//!     &config.stability,
//! )?;
//! std::fs::write(&output.file_name, &output.bytes)?;
//! # Ok::<(), itdash::error::DashError>(())
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod core;
pub mod dashboards;
pub mod error;
pub mod excel;
pub mod types;

// Re-export commonly used types
pub use config::DashboardConfig;
pub use dashboards::{Dashboard, DashboardOutput, Upload};
pub use error::{DashError, DashResult};
