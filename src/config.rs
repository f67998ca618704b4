use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::data::axes::{self, AxisSet};
use crate::data::loader::Source;
use crate::data::model::MeasuredQuantity;
use crate::data::slice::DEFAULT_CURVE_SAMPLES;
use crate::error::{AnalysisError, Result};

/// DC loads shared by the measurement rigs and the simulations, in Ω.
pub const DEFAULT_LOADS: [f64; 15] = [
    1.0, 10.0, 100.0, 200.0, 300.0, 390.0, 512.0, 600.0, 910.0, 2.2e3, 5.2e3, 11e3, 51e3,
    110e3, 1.2e6,
];

/// Efficiency contour levels in percent.
pub const DEFAULT_CONTOUR_LEVELS: [f64; 7] = [0.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0];

// ---------------------------------------------------------------------------
// Axis specifications
// ---------------------------------------------------------------------------

/// Either an evenly spaced sweep or an explicit list of coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AxisSpec {
    Sweep { start: f64, stop: f64, step: f64 },
    Values { values: Vec<f64> },
}

impl AxisSpec {
    pub fn build(&self, name: &str) -> Result<Vec<f64>> {
        match self {
            AxisSpec::Sweep { start, stop, step } => axes::sweep(*start, *stop, *step),
            AxisSpec::Values { values } => axes::explicit(name, values),
        }
    }
}

fn default_frequency() -> AxisSpec {
    AxisSpec::Sweep {
        start: 5.0,
        stop: 6.0,
        step: 0.1,
    }
}

fn default_power() -> AxisSpec {
    AxisSpec::Sweep {
        start: -10.0,
        stop: 16.0,
        step: 2.0,
    }
}

fn default_loads() -> Vec<f64> {
    DEFAULT_LOADS.to_vec()
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Identifies the device under test; used in chart titles and file names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitConfig {
    pub diode: String,
    pub circuit: String,
    pub power_tier: String,
    /// Modulation label for titles; `None` for a CW signal.
    pub modulation: Option<String>,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        CircuitConfig {
            diode: "HSMS-286B".into(),
            circuit: "Shunt".into(),
            power_tier: "High".into(),
            modulation: None,
        }
    }
}

impl CircuitConfig {
    /// `<diode>_<circuit>_<power_tier>`, the raw measurement directory name.
    pub fn stem(&self) -> String {
        [&self.diode, &self.circuit, &self.power_tier]
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join("_")
    }
}

/// Where measurements come from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// Directory of per-load tab-delimited files. Defaults to
    /// `<diode>_<circuit>_<power_tier>` when `path` is omitted.
    Raw {
        path: Option<PathBuf>,
        #[serde(default = "default_raw_quantity")]
        quantity: MeasuredQuantity,
    },
    Simulation {
        path: PathBuf,
        #[serde(default = "default_simulation_quantity")]
        quantity: MeasuredQuantity,
    },
    /// Directory of per-sheet CSV exports.
    Workbook { path: PathBuf },
}

fn default_raw_quantity() -> MeasuredQuantity {
    MeasuredQuantity::DcVoltage
}

fn default_simulation_quantity() -> MeasuredQuantity {
    MeasuredQuantity::Efficiency
}

impl Default for SourceConfig {
    fn default() -> Self {
        SourceConfig::Raw {
            path: None,
            quantity: default_raw_quantity(),
        }
    }
}

/// Which charts to draw.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    /// One contour page per frequency.
    pub contour: bool,
    pub contour_levels: Vec<f64>,
    /// Frequencies (GHz) that get an efficiency-vs-load line chart.
    pub line_frequencies: Vec<f64>,
    /// Powers (dBm), one line each on every line chart.
    pub line_powers: Vec<f64>,
    /// Powers (dBm) that get a chart with one line per frequency.
    pub power_charts: Vec<f64>,
    pub curve_samples: usize,
}

impl Default for PlotConfig {
    fn default() -> Self {
        PlotConfig {
            contour: true,
            contour_levels: DEFAULT_CONTOUR_LEVELS.to_vec(),
            line_frequencies: vec![5.2],
            line_powers: vec![-4.0, 0.0, 4.0, 12.0],
            power_charts: Vec::new(),
            curve_samples: DEFAULT_CURVE_SAMPLES,
        }
    }
}

// ---------------------------------------------------------------------------
// AnalysisConfig
// ---------------------------------------------------------------------------

/// A complete analysis description, normally read from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub circuit: CircuitConfig,
    pub loads: Vec<f64>,
    pub frequency: AxisSpec,
    pub power: AxisSpec,
    pub source: SourceConfig,
    pub plots: PlotConfig,
    /// Tensor export path (`.csv` or `.parquet`).
    pub export: Option<PathBuf>,
    /// Treat unset tensor cells as a failed run instead of a warning.
    pub require_complete: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        AnalysisConfig {
            circuit: CircuitConfig::default(),
            loads: default_loads(),
            frequency: default_frequency(),
            power: default_power(),
            source: SourceConfig::default(),
            plots: PlotConfig::default(),
            export: None,
            require_complete: false,
        }
    }
}

impl AnalysisConfig {
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| AnalysisError::Config(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| AnalysisError::io(path.display().to_string(), e))?;
        Self::from_toml(&text)
    }

    pub fn axes(&self) -> Result<AxisSet> {
        AxisSet::new(
            &self.loads,
            &self.frequency.build("frequency")?,
            &self.power.build("power")?,
        )
    }

    /// The sources to analyse, each one producing its own set of charts.
    /// Relative paths resolve against `base`.
    pub fn sources(&self, base: &Path) -> Result<Vec<Source>> {
        match &self.source {
            SourceConfig::Raw { path, quantity } => {
                let dir = path
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(self.circuit.stem()));
                Ok(vec![Source::RawDirectory {
                    dir: base.join(dir),
                    quantity: *quantity,
                }])
            }
            SourceConfig::Simulation { path, quantity } => Ok(vec![Source::Simulation {
                path: base.join(path),
                quantity: *quantity,
            }]),
            SourceConfig::Workbook { path } => {
                crate::data::loader::workbook_sheets(&base.join(path))
            }
        }
    }
}
