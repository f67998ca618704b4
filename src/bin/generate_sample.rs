//! Writes a synthetic data set for trying `rectiplot` without lab data:
//! a raw measurement directory, a simulator sweep, a workbook of sheet
//! exports and one configuration file per layout.
//!
//! Usage: `generate_sample [OUTPUT_DIR]` (default `sample_data`).

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rectiplot::config::AnalysisConfig;
use rectiplot::data::axes::{dbm_to_watts, AxisSet};

/// Load with the best match for the synthetic diode, in Ω.
const OPTIMUM_LOAD: f64 = 2.0e3;
const CENTER_GHZ: f64 = 5.5;
const SHEET_GHZ: f64 = 5.8;

/// Efficiency in percent of a well-behaved rectifier: peaks near the optimum
/// load, grows with input power and rolls off away from the band centre.
fn model_efficiency(load: f64, frequency_ghz: f64, power_dbm: f64) -> f64 {
    let peak = 65.0 / (1.0 + (-(power_dbm - 2.0) / 4.0).exp());
    let load_term = (-(load / OPTIMUM_LOAD).log10().powi(2) / 1.5).exp();
    let freq_term = 1.0 - 0.4 * (frequency_ghz - CENTER_GHZ).powi(2);
    peak * load_term * freq_term
}

/// DC voltage across `load` that yields `efficiency` percent.
fn dc_voltage(efficiency: f64, load: f64, power_dbm: f64) -> f64 {
    (efficiency / 100.0 * dbm_to_watts(power_dbm) * load).max(0.0).sqrt()
}

/// Seeded splitmix64 stream; only Gaussian noise is drawn from it.
struct NoiseRng(u64);

impl NoiseRng {
    fn uniform(&mut self) -> f64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^= z >> 31;
        (z >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Normal sample by Box-Muller.
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.uniform().max(1e-15);
        let u2 = self.uniform();
        mean + std_dev * (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
    }
}

/// One tab-delimited file per load, rows = frequencies, columns = powers.
fn write_raw_directory(dir: &Path, stem: &str, axes: &AxisSet, rng: &mut NoiseRng) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    for &load in axes.loads() {
        let path = dir.join(format!("{stem}_{}.txt", load as u64));
        let mut writer = csv::WriterBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .from_path(&path)
            .with_context(|| format!("creating {}", path.display()))?;
        for &f in axes.frequencies() {
            let row: Vec<String> = axes
                .powers_dbm()
                .iter()
                .map(|&p| {
                    let v = dc_voltage(model_efficiency(load, f, p), load, p);
                    format!("{:.6}", v * (1.0 + rng.gauss(0.0, 0.01)))
                })
                .collect();
            writer.write_record(&row)?;
        }
        writer.flush()?;
    }
    Ok(())
}

/// Simulator sweep: frequency-major, then load, power innermost.
fn write_simulation(path: &Path, axes: &AxisSet) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    for &f in axes.frequencies() {
        for &load in axes.loads() {
            for &p in axes.powers_dbm() {
                writer.write_record(&[
                    format!("{f}"),
                    format!("{load}"),
                    format!("{p}"),
                    format!("{:.4}", model_efficiency(load, f, p)),
                ])?;
            }
        }
    }
    writer.flush()?;
    Ok(())
}

/// One sheet export: header = loads, rows = powers, values in millivolts.
fn write_sheet(path: &Path, axes: &AxisSet, rng: &mut NoiseRng) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record(axes.loads().iter().map(|l| format!("{l}")))?;
    for &p in axes.powers_dbm() {
        writer.write_record(axes.loads().iter().map(|&load| {
            let v = dc_voltage(model_efficiency(load, SHEET_GHZ, p), load, p);
            format!("{:.3}", 1000.0 * v * (1.0 + rng.gauss(0.0, 0.01)))
        }))?;
    }
    writer.flush()?;
    Ok(())
}

fn main() -> Result<()> {
    let out = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "sample_data".to_string());
    let out = Path::new(&out);
    fs::create_dir_all(out).with_context(|| format!("creating {}", out.display()))?;
    let mut rng = NoiseRng(42);

    let config = AnalysisConfig::default();
    let axes = config.axes()?;
    let stem = config.circuit.stem();

    write_raw_directory(&out.join(&stem), &stem, &axes, &mut rng)?;
    fs::write(
        out.join("raw.toml"),
        "[source]\nkind = \"raw\"\n\n[plots]\nline_frequencies = [5.2, 5.8]\npower_charts = [0]\n",
    )?;

    write_simulation(&out.join("shunt_sim.csv"), &axes)?;
    fs::write(
        out.join("simulation.toml"),
        "export = \"shunt_sim.parquet\"\n\n[source]\nkind = \"simulation\"\npath = \"shunt_sim.csv\"\n",
    )?;

    let sheet_axes = AxisSet::new(axes.loads(), &[SHEET_GHZ], axes.powers_dbm())?;
    let book = out.join("workbook");
    fs::create_dir_all(&book)?;
    write_sheet(&book.join("Shunt 5.8.csv"), &sheet_axes, &mut rng)?;
    fs::write(
        out.join("workbook.toml"),
        "[frequency]\nvalues = [5.8]\n\n[source]\nkind = \"workbook\"\npath = \"workbook\"\n\n[plots]\nline_frequencies = [5.8]\n",
    )?;

    let (n_load, n_freq, n_power) = axes.shape();
    println!(
        "Wrote {n_load} loads x {n_freq} frequencies x {n_power} powers to {}",
        out.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noise_is_seeded_and_uniform_draws_stay_in_unit_interval() {
        let mut a = NoiseRng(42);
        let mut b = NoiseRng(42);
        for _ in 0..1000 {
            let u = a.uniform();
            assert!((0.0..1.0).contains(&u));
            assert_eq!(u, b.uniform());
        }
        let mean = (0..20_000).map(|_| a.gauss(0.0, 0.01)).sum::<f64>() / 20_000.0;
        assert!(mean.abs() < 1e-3);
    }
}
