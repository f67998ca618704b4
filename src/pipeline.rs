//! One analysis run: load every source, compute efficiency, draw the
//! configured charts and write the run report.
//!
//! Failures are contained at the smallest unit that owns them. A bad file
//! is skipped and recorded, a source with no usable records is marked
//! failed, a chart that cannot be drawn is recorded and the next one drawn.
//! Only configuration problems and an unwritable output directory stop the
//! run.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use log::{error, info, warn};
use serde::Serialize;

use crate::config::{AnalysisConfig, CircuitConfig, PlotConfig};
use crate::data::assemble::{Assembly, TensorAssembler};
use crate::data::axes::AxisSet;
use crate::data::efficiency::{efficiency, EfficiencyTensor};
use crate::data::export::export_tensor;
use crate::data::loader::Source;
use crate::data::model::MeasuredQuantity;
use crate::data::slice::{sweeps_at_frequency, sweeps_at_power, LoadSweep, SweepCurve};
use crate::error::{AnalysisError, MissingSlice, Result};
use crate::render::line::{draw_line_chart, LineSeriesSpec};
use crate::render::{contour, contour_page_path, fmt_coord, line_chart_path, power_chart_path};

/// Name of the run report written into the output directory.
pub const REPORT_FILE: &str = "report.json";

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// A skipped input unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    pub source_id: String,
    pub message: String,
}

impl Failure {
    fn new(fallback_id: &str, err: &AnalysisError) -> Self {
        Failure {
            source_id: err.source_id().unwrap_or(fallback_id).to_string(),
            message: err.to_string(),
        }
    }
}

/// A chart or export that could not be produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtifactFailure {
    pub path: PathBuf,
    pub message: String,
}

/// What happened to one source.
#[derive(Debug, Clone, Serialize)]
pub struct SourceReport {
    pub name: String,
    pub quantity: MeasuredQuantity,
    /// Records placed into the tensor.
    pub loaded: usize,
    pub failures: Vec<Failure>,
    pub missing: Vec<MissingSlice>,
    pub artifacts: Vec<PathBuf>,
    pub artifact_failures: Vec<ArtifactFailure>,
    /// Set when the source as a whole failed and nothing was drawn.
    pub error: Option<String>,
}

impl SourceReport {
    fn new(source: &Source) -> Self {
        SourceReport {
            name: source.name(),
            quantity: source.quantity(),
            loaded: 0,
            failures: Vec::new(),
            missing: Vec::new(),
            artifacts: Vec::new(),
            artifact_failures: Vec::new(),
            error: None,
        }
    }

    fn record_artifact(&mut self, path: PathBuf, outcome: Result<()>) {
        match outcome {
            Ok(()) => self.artifacts.push(path),
            Err(e) => {
                warn!("{}: {e}", path.display());
                self.artifact_failures.push(ArtifactFailure {
                    path,
                    message: e.to_string(),
                });
            }
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Summary of a whole run, serialised to [`REPORT_FILE`].
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub output_dir: PathBuf,
    /// `(loads, frequencies, powers)`
    pub shape: (usize, usize, usize),
    pub sources: Vec<SourceReport>,
}

impl RunReport {
    /// Sources that failed as a whole.
    pub fn failed_sources(&self) -> impl Iterator<Item = &SourceReport> {
        self.sources.iter().filter(|s| !s.succeeded())
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|e| AnalysisError::io(path.display().to_string(), e))?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)
            .map_err(|e| AnalysisError::Export(format!("{}: {e}", path.display())))?;
        info!("wrote {}", path.display());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Result of reading every record of one source.
#[derive(Debug)]
pub struct LoadOutcome {
    pub assembly: Assembly,
    pub loaded: usize,
    pub failures: Vec<Failure>,
}

impl LoadOutcome {
    /// `NoRecords` when nothing could be assembled.
    pub fn require_records(&self, source_id: &str) -> Result<()> {
        if self.loaded == 0 {
            return Err(AnalysisError::NoRecords {
                source_id: source_id.to_string(),
                failures: self.failures.len(),
            });
        }
        Ok(())
    }
}

/// Assemble one source, skipping and collecting per-unit failures.
///
/// Errors of the source as a whole (unreadable directory, malformed
/// simulation file) are returned.
pub fn load_source(source: &Source, axes: &AxisSet) -> Result<LoadOutcome> {
    let name = source.name();
    let mut assembler = TensorAssembler::new(axes, source.quantity());
    let mut failures = Vec::new();
    let mut loaded = 0;

    for item in source.records(axes)? {
        match item.and_then(|record| assembler.insert(record)) {
            Ok(_) => loaded += 1,
            Err(e) if e.is_per_source() => {
                warn!("skipping: {e}");
                failures.push(Failure::new(&name, &e));
            }
            Err(e) => return Err(e),
        }
    }

    info!(
        "{source}: {loaded} records, {} of {} loads filled, {} skipped",
        assembler.filled(),
        axes.loads().len(),
        failures.len()
    );
    Ok(LoadOutcome {
        assembly: assembler.finish(),
        loaded,
        failures,
    })
}

// ---------------------------------------------------------------------------
// Artifact naming
// ---------------------------------------------------------------------------

/// File name parts and captions for the charts of one source.
#[derive(Debug, Clone, PartialEq)]
struct Naming {
    contour_stem: String,
    chart_prefix: String,
    /// Sheets are captioned by their own name.
    caption: Option<String>,
}

impl Naming {
    fn for_source(circuit: &CircuitConfig, source: &Source) -> Self {
        match source {
            Source::RawDirectory { .. } => Naming {
                contour_stem: circuit.stem(),
                chart_prefix: format!("{}_{}", circuit.diode, circuit.circuit),
                caption: None,
            },
            Source::Simulation { .. } => Naming {
                contour_stem: source.name(),
                chart_prefix: source.name(),
                caption: None,
            },
            Source::Sheet { .. } => Naming {
                contour_stem: source.name(),
                chart_prefix: source.name(),
                caption: Some(source.name()),
            },
        }
    }

    fn contour_title(&self, circuit: &CircuitConfig, frequency_ghz: f64) -> String {
        if let Some(caption) = &self.caption {
            return caption.clone();
        }
        let f = fmt_coord(frequency_ghz);
        match &circuit.modulation {
            Some(m) => format!("Modulation = {m} Frequency = {f} GHz"),
            None => format!("Frequency = {f} GHz"),
        }
    }

    fn line_title(&self, circuit: &CircuitConfig, at: &str) -> String {
        match &self.caption {
            Some(caption) => format!("{caption} at {at}"),
            None => format!("Diode {} in {} at {at}", circuit.diode, circuit.circuit),
        }
    }
}

/// `eff.csv` becomes `eff_<name>.csv` when several sources share a run.
fn export_path(out_dir: &Path, configured: &Path, name: &str, shared: bool) -> PathBuf {
    let path = out_dir.join(configured);
    if !shared {
        return path;
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let file = match path.extension() {
        Some(ext) => format!("{stem}_{name}.{}", ext.to_string_lossy()),
        None => format!("{stem}_{name}"),
    };
    path.with_file_name(file)
}

// ---------------------------------------------------------------------------
// Charts
// ---------------------------------------------------------------------------

/// Dense curves for every sweep that can be interpolated; the others are
/// logged and left out.
fn curves(sweeps: &[LoadSweep], samples: usize) -> Result<Vec<SweepCurve>> {
    let mut out = Vec::with_capacity(sweeps.len());
    let mut last_err = None;
    for sweep in sweeps {
        match sweep.curve(samples) {
            Ok(c) => out.push(c),
            Err(e) => {
                warn!(
                    "no curve at {} GHz, {} dBm: {e}",
                    fmt_coord(sweep.at.frequency_ghz),
                    fmt_coord(sweep.at.power_dbm)
                );
                last_err = Some(e);
            }
        }
    }
    match (out.is_empty(), last_err) {
        (true, Some(e)) => Err(e),
        (true, None) => Err(AnalysisError::Interpolation("no sweeps requested".into())),
        _ => Ok(out),
    }
}

fn draw(path: &Path, title: &str, series: &[LineSeriesSpec<'_>]) -> Result<()> {
    draw_line_chart(path, title, series).map_err(|e| AnalysisError::Render(format!("{e:#}")))
}

fn frequency_chart(
    eff: &EfficiencyTensor,
    axes: &AxisSet,
    plots: &PlotConfig,
    frequency_ghz: f64,
    path: &Path,
    title: &str,
) -> Result<()> {
    let sweeps = sweeps_at_frequency(eff, axes, frequency_ghz, &plots.line_powers)?;
    let curves = curves(&sweeps, plots.curve_samples)?;
    let series: Vec<_> = curves
        .iter()
        .map(|c| LineSeriesSpec {
            label: format!("P_RF = {} dBm", fmt_coord(c.at.power_dbm)),
            curve: c,
        })
        .collect();
    draw(path, title, &series)
}

fn power_chart(
    eff: &EfficiencyTensor,
    axes: &AxisSet,
    plots: &PlotConfig,
    power_dbm: f64,
    path: &Path,
    title: &str,
) -> Result<()> {
    let sweeps = sweeps_at_power(eff, axes, power_dbm, axes.frequencies())?;
    let curves = curves(&sweeps, plots.curve_samples)?;
    let series: Vec<_> = curves
        .iter()
        .map(|c| LineSeriesSpec {
            label: format!("f = {} GHz", fmt_coord(c.at.frequency_ghz)),
            curve: c,
        })
        .collect();
    draw(path, title, &series)
}

fn draw_charts(
    config: &AnalysisConfig,
    axes: &AxisSet,
    eff: &EfficiencyTensor,
    naming: &Naming,
    out_dir: &Path,
    report: &mut SourceReport,
) {
    let plots = &config.plots;
    let circuit = &config.circuit;

    if plots.contour {
        for (f_idx, &f) in axes.frequencies().iter().enumerate() {
            let path = contour_page_path(out_dir, &naming.contour_stem, f);
            let title = naming.contour_title(circuit, f);
            let outcome =
                contour::draw_contour_page(&path, &title, axes, eff, f_idx, &plots.contour_levels)
                    .map_err(|e| AnalysisError::Render(format!("{e:#}")));
            report.record_artifact(path, outcome);
        }
    }

    for &f in &plots.line_frequencies {
        let path = line_chart_path(out_dir, &naming.chart_prefix, f);
        let title = naming.line_title(circuit, &format!("{} GHz", fmt_coord(f)));
        let outcome = frequency_chart(eff, axes, plots, f, &path, &title);
        report.record_artifact(path, outcome);
    }

    for &p in &plots.power_charts {
        let path = power_chart_path(out_dir, &naming.chart_prefix, p);
        let title = naming.line_title(circuit, &format!("P_RF = {} dBm", fmt_coord(p)));
        let outcome = power_chart(eff, axes, plots, p, &path, &title);
        report.record_artifact(path, outcome);
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

fn analyse_source(
    config: &AnalysisConfig,
    axes: &AxisSet,
    source: &Source,
    out_dir: &Path,
    shared: bool,
) -> SourceReport {
    let mut report = SourceReport::new(source);

    let outcome = match load_source(source, axes) {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("{source}: {e}");
            report.error = Some(e.to_string());
            return report;
        }
    };
    report.loaded = outcome.loaded;
    if let Err(e) = outcome.require_records(&report.name) {
        error!("{e}");
        report.failures = outcome.failures;
        report.error = Some(e.to_string());
        return report;
    }
    report.failures = outcome.failures;

    let Assembly { tensor, incomplete } = outcome.assembly;
    if let Some(err) = incomplete {
        if let AnalysisError::IncompleteData { missing } = &err {
            report.missing = missing.clone();
        }
        if config.require_complete {
            error!("{source}: {err}");
            report.error = Some(err.to_string());
            return report;
        }
        warn!("{source}: {err}");
    }

    let eff = efficiency(&tensor, axes);
    let naming = Naming::for_source(&config.circuit, source);
    draw_charts(config, axes, &eff, &naming, out_dir, &mut report);

    if let Some(configured) = &config.export {
        let path = export_path(out_dir, configured, &report.name, shared);
        let outcome = export_tensor(&eff, axes, &path);
        report.record_artifact(path, outcome);
    }

    report
}

/// Run the analysis described by `config`. Source paths resolve against
/// `base`; charts, the export and [`REPORT_FILE`] go to `out_dir`.
pub fn run(config: &AnalysisConfig, base: &Path, out_dir: &Path) -> Result<RunReport> {
    let axes = config.axes()?;
    let sources = config.sources(base)?;
    if sources.is_empty() {
        return Err(AnalysisError::Config(format!(
            "no sources found for {:?}",
            config.source
        )));
    }
    fs::create_dir_all(out_dir)
        .map_err(|e| AnalysisError::io(out_dir.display().to_string(), e))?;

    let (n_load, n_freq, n_power) = axes.shape();
    info!(
        "analysing {} source(s) on {n_load} loads x {n_freq} frequencies x {n_power} powers",
        sources.len()
    );

    let shared = sources.len() > 1;
    let reports = sources
        .iter()
        .map(|source| analyse_source(config, &axes, source, out_dir, shared))
        .collect();

    let report = RunReport {
        output_dir: out_dir.to_path_buf(),
        shape: axes.shape(),
        sources: reports,
    };
    report.write(&out_dir.join(REPORT_FILE))?;
    Ok(report)
}
