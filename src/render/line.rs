use std::path::Path;

use anyhow::{bail, Context, Result};
use log::info;
use plotters::prelude::*;

use super::color::generate_palette;
use super::FIGURE_SIZE;
use crate::data::slice::SweepCurve;

/// One labelled series of an efficiency-vs-load chart.
pub struct LineSeriesSpec<'a> {
    pub label: String,
    pub curve: &'a SweepCurve,
}

/// Y range covering every marker and curve sample, padded by 5 %.
pub fn value_range(series: &[LineSeriesSpec<'_>]) -> Option<(f64, f64)> {
    let (lo, hi) = series
        .iter()
        .flat_map(|s| s.curve.points.iter().chain(&s.curve.curve))
        .map(|&(_, y)| y)
        .filter(|y| y.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), y| {
            (lo.min(y), hi.max(y))
        });
    if !lo.is_finite() {
        return None;
    }
    let pad = ((hi - lo) * 0.05).max(1.0);
    Some((lo.min(0.0) - if lo < 0.0 { pad } else { 0.0 }, hi + pad))
}

/// Load (log) range covering every series.
fn load_range(series: &[LineSeriesSpec<'_>]) -> Option<(f64, f64)> {
    let (lo, hi) = series
        .iter()
        .flat_map(|s| s.curve.points.iter())
        .map(|&(x, _)| x)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| {
            (lo.min(x), hi.max(x))
        });
    (lo.is_finite() && hi > lo).then_some((lo, hi))
}

/// Draw efficiency vs. DC load, one colour per series: markers at the
/// measured loads and the interpolated curve through them.
pub fn draw_line_chart(path: &Path, title: &str, series: &[LineSeriesSpec<'_>]) -> Result<()> {
    if series.is_empty() {
        bail!("no series to draw for {title}");
    }
    let (x_lo, x_hi) = load_range(series).context("series have no load span")?;
    let (y_lo, y_hi) = value_range(series).context("series have no finite values")?;

    let root = SVGBackend::new(path, FIGURE_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(55)
        .build_cartesian_2d((x_lo..x_hi).log_scale(), y_lo..y_hi)?;

    chart
        .configure_mesh()
        .x_desc("DC load resistance, Ω")
        .y_desc("Efficiency, %")
        .draw()?;

    let colours = generate_palette(series.len());
    for (spec, &colour) in series.iter().zip(&colours) {
        chart
            .draw_series(LineSeries::new(
                spec.curve.curve.iter().copied(),
                colour.stroke_width(1),
            ))?
            .label(spec.label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], colour));

        chart.draw_series(
            spec.curve
                .points
                .iter()
                .map(|&(x, y)| Circle::new((x, y), 3, colour.filled())),
        )?;
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()
        .with_context(|| format!("writing {}", path.display()))?;
    info!("wrote {}", path.display());
    Ok(())
}
