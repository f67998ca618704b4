//! Chart rendering (SVG via plotters).
//!
//! Renderers only consume axis vectors, the efficiency tensor and prepared
//! sweep curves; they never touch the raw data.

use std::path::{Path, PathBuf};

pub mod color;
pub mod contour;
pub mod line;

/// Default figure size, golden ratio like the lab's published figures.
pub const FIGURE_SIZE: (u32, u32) = (800, 494);

/// Format an axis coordinate for titles and file names: at most three decimals,
/// trailing zeros dropped (`5.200000000000001` → `5.2`, `16.0` → `16`).
pub fn fmt_coord(value: f64) -> String {
    let s = format!("{value:.3}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

/// `<dir>/<prefix>_<freq>.svg`
pub fn line_chart_path(dir: &Path, prefix: &str, frequency_ghz: f64) -> PathBuf {
    dir.join(format!("{prefix}_{}.svg", fmt_coord(frequency_ghz)))
}

/// `<dir>/<prefix>_<power>dBm.svg`
pub fn power_chart_path(dir: &Path, prefix: &str, power_dbm: f64) -> PathBuf {
    dir.join(format!("{prefix}_{}dBm.svg", fmt_coord(power_dbm)))
}

/// `<dir>/<stem>_<freq>GHz.svg`, one page of a contour page set.
pub fn contour_page_path(dir: &Path, stem: &str, frequency_ghz: f64) -> PathBuf {
    dir.join(format!("{stem}_{}GHz.svg", fmt_coord(frequency_ghz)))
}
