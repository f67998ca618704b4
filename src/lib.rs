//! RF-to-DC rectifier efficiency analysis.
//!
//! Measurements (raw per-load files, simulator sweeps or spreadsheet
//! exports) are assembled into a `(load, frequency, power)` tensor,
//! converted to efficiency and drawn as load-sweep line charts and
//! efficiency contour pages.

pub mod cli;
pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod render;

pub use error::{AnalysisError, Result};
