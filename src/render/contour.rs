use std::path::Path;

use anyhow::{bail, Context, Result};
use log::info;
use plotters::prelude::*;

use super::color::sequential_ramp;
use super::{fmt_coord, FIGURE_SIZE};
use crate::data::axes::AxisSet;
use crate::data::efficiency::EfficiencyTensor;

/// Width of the colour bar strip on the right of a contour page.
const COLORBAR_WIDTH: u32 = 110;

/// Band a value falls into for `levels` (ascending): band `i` covers
/// `[levels[i], levels[i + 1])`, the last band also holds the top level
/// itself. NaN and values outside `[first, top]` have no band and stay blank.
pub fn band_index(value: f64, levels: &[f64]) -> Option<usize> {
    if levels.len() < 2 || value.is_nan() || value < levels[0] {
        return None;
    }
    if value > levels[levels.len() - 1] {
        return None;
    }
    let bands = levels.len() - 1;
    let i = levels.partition_point(|&l| l <= value);
    Some((i - 1).min(bands - 1))
}

/// Cell edges around each grid coordinate: midpoints between neighbours, with
/// the outer cells mirrored. `log` places midpoints geometrically.
pub fn cell_edges(coords: &[f64], log: bool) -> Vec<(f64, f64)> {
    let n = coords.len();
    let fwd = |c: f64| if log { c.log10() } else { c };
    let inv = |t: f64| if log { 10f64.powf(t) } else { t };
    let t: Vec<f64> = coords.iter().map(|&c| fwd(c)).collect();
    (0..n)
        .map(|i| {
            let half_left = if i > 0 {
                (t[i] - t[i - 1]) / 2.0
            } else if n > 1 {
                (t[1] - t[0]) / 2.0
            } else {
                0.5
            };
            let half_right = if i + 1 < n {
                (t[i + 1] - t[i]) / 2.0
            } else {
                half_left
            };
            (inv(t[i] - half_left), inv(t[i] + half_right))
        })
        .collect()
}

/// One contour page: efficiency over the (load, power) plane at one
/// frequency, filled by level band, with a colour bar of the levels.
pub fn draw_contour_page(
    path: &Path,
    title: &str,
    axes: &AxisSet,
    eff: &EfficiencyTensor,
    freq_idx: usize,
    levels: &[f64],
) -> Result<()> {
    if levels.len() < 2 || levels.windows(2).any(|w| w[1] <= w[0]) {
        bail!("contour levels must be at least two ascending values");
    }
    if freq_idx >= axes.frequencies().len() {
        bail!("frequency index {freq_idx} out of range");
    }

    let loads = axes.loads();
    let powers = axes.powers_dbm();
    let load_cells = cell_edges(loads, true);
    let power_cells = cell_edges(powers, false);
    let ramp = sequential_ramp(levels.len() - 1);

    let root = SVGBackend::new(path, FIGURE_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let (plot_area, bar_area) = root.split_horizontally(FIGURE_SIZE.0 - COLORBAR_WIDTH);

    let x_range = load_cells[0].0..load_cells[load_cells.len() - 1].1;
    let y_range = power_cells[0].0..power_cells[power_cells.len() - 1].1;

    let mut chart = ChartBuilder::on(&plot_area)
        .caption(title, ("serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_range.log_scale(), y_range)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("DC Load Resistance, Ω")
        .y_desc("Input RF Power, dBm")
        .y_labels(powers.len())
        .y_label_formatter(&|p| fmt_coord(*p))
        .draw()?;

    let mut cells = Vec::with_capacity(loads.len() * powers.len());
    for (l_idx, &(x0, x1)) in load_cells.iter().enumerate() {
        for (p_idx, &(y0, y1)) in power_cells.iter().enumerate() {
            let value = eff.get(l_idx, freq_idx, p_idx);
            if let Some(band) = band_index(value, levels) {
                cells.push(Rectangle::new([(x0, y0), (x1, y1)], ramp[band].filled()));
            }
        }
    }
    chart.draw_series(cells)?;

    let top = levels[levels.len() - 1];
    let mut bar = ChartBuilder::on(&bar_area)
        .margin_top(40)
        .margin_bottom(50)
        .margin_right(45)
        .y_label_area_size(0)
        .right_y_label_area_size(40)
        .build_cartesian_2d(0.0..1.0, levels[0]..top)?;
    bar.configure_mesh()
        .disable_mesh()
        .disable_x_axis()
        .y_desc("Efficiency, %")
        .y_labels(levels.len())
        .y_label_formatter(&|v| fmt_coord(*v))
        .draw()?;
    bar.draw_series(
        levels
            .windows(2)
            .zip(&ramp)
            .map(|(w, c)| Rectangle::new([(0.0, w[0]), (1.0, w[1])], c.filled())),
    )?;

    root.present()
        .with_context(|| format!("writing {}", path.display()))?;
    info!("wrote {}", path.display());
    Ok(())
}
