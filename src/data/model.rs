use std::fmt;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// MeasuredQuantity – what the raw tables hold
// ---------------------------------------------------------------------------

/// Physical meaning of the numbers a source produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasuredQuantity {
    /// DC voltage across the load, in volts.
    DcVoltage,
    /// DC power delivered to the load, in watts.
    DcPower,
    /// Efficiency in percent, already computed upstream (simulator output).
    Efficiency,
}

impl fmt::Display for MeasuredQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeasuredQuantity::DcVoltage => write!(f, "DC voltage (V)"),
            MeasuredQuantity::DcPower => write!(f, "DC power (W)"),
            MeasuredQuantity::Efficiency => write!(f, "efficiency (%)"),
        }
    }
}

// ---------------------------------------------------------------------------
// SourceRecord – one raw input unit
// ---------------------------------------------------------------------------

/// One load slice worth of measurements: a table over (frequency, power).
///
/// Produced by a [`Source`](super::loader::Source) and consumed once by the
/// assembler.
#[derive(Debug, Clone)]
pub struct SourceRecord {
    /// Where the record came from (file name, `sheet:column`, ...).
    pub source_id: String,
    /// DC load resistance in Ω.
    pub load_ohms: f64,
    /// Rows are frequency points, columns are power points.
    pub table: Array2<f64>,
}

impl SourceRecord {
    pub fn new(source_id: impl Into<String>, load_ohms: f64, table: Array2<f64>) -> Self {
        SourceRecord {
            source_id: source_id.into(),
            load_ohms,
            table,
        }
    }

    /// `(n_frequencies, n_powers)`
    pub fn shape(&self) -> (usize, usize) {
        self.table.dim()
    }
}

impl fmt::Display for SourceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (rows, cols) = self.shape();
        write!(
            f,
            "{} ({} Ω, {rows}x{cols})",
            self.source_id, self.load_ohms
        )
    }
}
