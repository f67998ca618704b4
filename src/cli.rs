use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};

use crate::config::AnalysisConfig;
use crate::pipeline;

/// Configuration file looked up in the working directory when `--config`
/// is not given.
pub const DEFAULT_CONFIG: &str = "rectiplot.toml";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to TOML analysis description. Without it `rectiplot.toml` is used
    /// if present, otherwise the built-in defaults.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory to which charts and the run report are written.
    #[arg(short, long, default_value = "plots")]
    pub output_dir: PathBuf,

    /// Export the efficiency tensor (`.csv` or `.parquet`, relative to the
    /// output directory).
    #[arg(short, long)]
    pub export: Option<PathBuf>,

    /// Log debug detail (per-record messages).
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Default log filter, overridden by `RUST_LOG`.
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

/// Configuration and the directory its relative paths resolve against.
fn load_config(path: Option<&Path>) -> Result<(AnalysisConfig, PathBuf)> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None if Path::new(DEFAULT_CONFIG).is_file() => PathBuf::from(DEFAULT_CONFIG),
        None => {
            warn!("no {DEFAULT_CONFIG} found, using built-in defaults");
            return Ok((AnalysisConfig::default(), PathBuf::from(".")));
        }
    };
    let config = AnalysisConfig::from_file(&path)
        .with_context(|| format!("reading configuration {}", path.display()))?;
    let base = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    info!("configuration: {}", path.display());
    Ok((config, base))
}

pub fn run(args: Args) -> Result<()> {
    let (mut config, base) = load_config(args.config.as_deref())?;
    if args.export.is_some() {
        config.export = args.export;
    }

    let report = pipeline::run(&config, &base, &args.output_dir).context("analysis failed")?;

    for source in &report.sources {
        info!(
            "{}: {} records, {} skipped, {} artifacts, {} artifact failures",
            source.name,
            source.loaded,
            source.failures.len(),
            source.artifacts.len(),
            source.artifact_failures.len()
        );
    }

    let failed: Vec<&str> = report.failed_sources().map(|s| s.name.as_str()).collect();
    if !failed.is_empty() {
        bail!(
            "{} of {} sources failed: {} (see {})",
            failed.len(),
            report.sources.len(),
            failed.join(", "),
            args.output_dir.join(pipeline::REPORT_FILE).display()
        );
    }
    Ok(())
}
