//! itdash upload server binary
//!
//! Accepts the monthly workbooks over HTTP and answers with the updated
//! dashboard workbook.

use clap::Parser;
use itdash::api::{run_api_server, ApiConfig};
use itdash::cli::load_config;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "itdash-server")]
#[command(version)]
#[command(about = "itdash server - upload monthly exports, download updated dashboards")]
#[command(long_about = r#"
itdash server - HTTP upload surface for the dashboard updaters

Endpoints (multipart/form-data, answer is the .xlsx attachment):
  - POST /api/v1/aging      - fields: powerbi, raw
  - POST /api/v1/cockpit    - fields: raw, kpi
  - POST /api/v1/stability  - fields: source (repeatable), target
  - POST /api/v1/toxic      - fields: manual, new

Additional endpoints:
  - GET  /health            - Health check
  - GET  /version           - Server version info
  - GET  /                  - Endpoint list

Errors come back as JSON with a request id:
  {"success": false, "request_id": "...", "error": "..."}

Example usage:
  itdash-server                           # Start on localhost:8080
  itdash-server --host 0.0.0.0 --port 3000

  curl -F powerbi=@PowerBI_ITSM.xlsx -F raw=@aging.xlsx \
    -o Updated_PowerBI_ITSM.xlsx http://localhost:8080/api/v1/aging
"#)]
struct Args {
    /// Host address to bind to (use 0.0.0.0 for all interfaces)
    #[arg(short = 'H', long, default_value = "127.0.0.1", env = "ITDASH_HOST")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "ITDASH_PORT")]
    port: u16,

    /// YAML file overriding the built-in vocabularies
    #[arg(long, env = "ITDASH_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "itdash_server=info,itdash=info,tower_http=info".into()),
        )
        .init();

    let dashboards = load_config(args.config.as_deref())?;
    let config = ApiConfig {
        host: args.host,
        port: args.port,
    };

    run_api_server(config, dashboards).await
}
