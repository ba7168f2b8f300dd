use clap::{Parser, Subcommand};
use colored::Colorize;
use itdash::cli;
use itdash::error::DashResult;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "itdash")]
#[command(about = "Monthly IT dashboard workbook updater")]
#[command(long_about = "itdash - Monthly IT dashboard workbook updater
Reads the monthly Excel exports, appends next month and writes a new workbook.

COMMANDS:
  aging      - Append aging-incident counts to the PowerBI ITSM table
  cockpit    - Append ITIS cockpit KPI ratings to KPI2
  stability  - Append IT stability exports to the target sheet
  toxic      - Paste new toxic data into the manual database
  config     - Print the effective vocabulary configuration

EXAMPLES:
  itdash aging --powerbi PowerBI_ITSM.xlsx --raw aging.xlsx
  itdash cockpit --raw 'Raw Data.xlsx' --kpi KPI2.xlsx -o out.xlsx
  itdash stability --source a.xlsx --source b.xlsx --target 'All Data.xlsx'
  itdash toxic --manual manual.xlsx --new new.xlsx

Vocabularies (entity rules, orders, sheet names, headers) can be overridden
with a YAML file passed via --config or ITDASH_CONFIG.")]
#[command(version)]
struct Cli {
    /// YAML file overriding the built-in vocabularies
    #[arg(long, global = true, env = "ITDASH_CONFIG")]
    config: Option<PathBuf>,

    /// Show detailed output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Append next month's aging-incident counts to the PowerBI ITSM table
    Aging {
        /// PowerBI ITSM workbook (first sheet holds the table)
        #[arg(long)]
        powerbi: PathBuf,

        /// Raw aging-incident export (sheet 'Page 1')
        #[arg(long)]
        raw: PathBuf,

        /// Output file (default: Updated_PowerBI_ITSM.xlsx)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Append next month's KPI ratings to the KPI2 workbook
    Cockpit {
        /// Raw KPI workbook with the four KPI slides
        #[arg(long)]
        raw: PathBuf,

        /// KPI2 workbook (sheet 'KPI2', optional 'Sheet1')
        #[arg(long)]
        kpi: PathBuf,

        /// Output file (default: Updated_KPI2.xlsx)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Append IT stability exports to the 'IT Stability' sheet
    Stability {
        /// Source export (sheet 'Page 1'); repeat for every file
        #[arg(long = "source", required = true)]
        sources: Vec<PathBuf>,

        /// Target workbook (sheet 'IT Stability')
        #[arg(long)]
        target: PathBuf,

        /// Output file (default: All_Data_Updated.xlsx)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Paste new toxic data below the 'Overall database' sheet
    Toxic {
        /// Manual calculated workbook
        #[arg(long)]
        manual: PathBuf,

        /// New data workbook (first sheet is copied from row 2)
        #[arg(long)]
        new: PathBuf,

        /// Output file (default: manual_calculated_combined_<ddMonyy>.xlsx)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the effective vocabulary configuration as YAML
    Config,
}

fn run(cli: Cli) -> DashResult<()> {
    let config = cli::load_config(cli.config.as_deref())?;
    let verbose = cli.verbose;

    match cli.command {
        Commands::Aging { powerbi, raw, output } => cli::aging(powerbi, raw, output, &config, verbose).map(|_| ()),

        Commands::Cockpit { raw, kpi, output } => cli::cockpit(raw, kpi, output, &config, verbose).map(|_| ()),

        Commands::Stability {
            sources,
            target,
            output,
        } => cli::stability(sources, target, output, &config, verbose).map(|_| ()),

        Commands::Toxic { manual, new, output } => cli::toxic(manual, new, output, &config, verbose).map(|_| ()),

        Commands::Config => cli::show_config(&config),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "itdash=debug" } else { "itdash=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "❌ Error:".bold().red(), e);
            ExitCode::FAILURE
        }
    }
}
