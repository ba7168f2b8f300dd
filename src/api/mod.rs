//! itdash upload server
//!
//! HTTP surface for the dashboard transforms.
//! Run with `itdash-server`.

pub mod handlers;
pub mod server;

pub use server::{router, run_api_server, ApiConfig, AppState};
