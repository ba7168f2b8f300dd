//! CLI command handlers

pub mod commands;

pub use commands::{aging, cockpit, load_config, show_config, stability, toxic};
