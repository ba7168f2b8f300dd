use crate::config::DashboardConfig;
use crate::dashboards::{self, Dashboard, DashboardOutput, Upload};
use crate::error::DashResult;
use chrono::{Local, NaiveDateTime};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};

/// Load vocabulary overrides, or the built-in defaults without a file
pub fn load_config(path: Option<&Path>) -> DashResult<DashboardConfig> {
    match path {
        Some(path) => DashboardConfig::load(path),
        None => Ok(DashboardConfig::default()),
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn banner(dashboard: Dashboard) {
    println!("{}", format!("📊 {}", dashboard.title()).bold().green());
}

fn show_input(label: &str, path: &Path) {
    println!("   {}: {}", label, path.display());
}

/// Write the rendered workbook and report what was done
fn finish(output: DashboardOutput, target: Option<PathBuf>, verbose: bool) -> DashResult<PathBuf> {
    let path = target.unwrap_or_else(|| PathBuf::from(&output.file_name));
    fs::write(&path, &output.bytes)?;

    println!();
    println!("{}", format!("✅ {}", output.summary).bold().green());
    if verbose {
        if let Some(period) = output.period {
            println!("   Period: {}", period.format("%b-%y").to_string().bright_yellow());
        }
        println!("   Rows appended: {}", output.rows_appended);
        println!("   Size: {} bytes", output.bytes.len());
    }
    println!("   Output: {}", path.display().to_string().bright_blue().bold());
    Ok(path)
}

/// Execute the aging command
pub fn aging(
    powerbi: PathBuf,
    raw: PathBuf,
    output: Option<PathBuf>,
    config: &DashboardConfig,
    verbose: bool,
) -> DashResult<PathBuf> {
    banner(Dashboard::Aging);
    show_input("PowerBI ITSM", &powerbi);
    show_input("Aging incidents", &raw);

    let result = dashboards::aging::run(
        Upload::from_path(&powerbi)?,
        Upload::from_path(&raw)?,
        &config.aging,
        now(),
    )?;
    finish(result, output, verbose)
}

/// Execute the cockpit command
pub fn cockpit(
    raw: PathBuf,
    kpi: PathBuf,
    output: Option<PathBuf>,
    config: &DashboardConfig,
    verbose: bool,
) -> DashResult<PathBuf> {
    banner(Dashboard::Cockpit);
    show_input("Raw KPI data", &raw);
    show_input("KPI2", &kpi);
    if verbose {
        for sheet in &config.cockpit.sheets {
            println!("   {} {} ({} KPIs)", "🔍".cyan(), sheet.name, sheet.headers.len());
        }
    }

    let result = dashboards::cockpit::run(Upload::from_path(&raw)?, Upload::from_path(&kpi)?, &config.cockpit)?;
    finish(result, output, verbose)
}

/// Execute the stability command
pub fn stability(
    sources: Vec<PathBuf>,
    target: PathBuf,
    output: Option<PathBuf>,
    config: &DashboardConfig,
    verbose: bool,
) -> DashResult<PathBuf> {
    banner(Dashboard::Stability);
    for source in &sources {
        show_input("Source", source);
    }
    show_input("Target", &target);

    let uploads = sources
        .iter()
        .map(|p| Upload::from_path(p))
        .collect::<DashResult<Vec<_>>>()?;
    let result = dashboards::stability::run(uploads, Upload::from_path(&target)?, &config.stability)?;
    finish(result, output, verbose)
}

/// Execute the toxic command
pub fn toxic(
    manual: PathBuf,
    new: PathBuf,
    output: Option<PathBuf>,
    config: &DashboardConfig,
    verbose: bool,
) -> DashResult<PathBuf> {
    banner(Dashboard::Toxic);
    show_input("Manual calculated", &manual);
    show_input("New data", &new);

    let result = dashboards::toxic::run(
        Upload::from_path(&manual)?,
        Upload::from_path(&new)?,
        &config.toxic,
        now(),
    )?;
    finish(result, output, verbose)
}

/// Print the effective vocabulary configuration as YAML
pub fn show_config(config: &DashboardConfig) -> DashResult<()> {
    let yaml = serde_yaml::to_string(config)?;
    println!("{}", yaml);
    Ok(())
}
