use super::axes::AxisSet;
use super::efficiency::EfficiencyTensor;
use crate::error::{AnalysisError, Result};

/// Number of samples in the dense curve drawn between markers.
pub const DEFAULT_CURVE_SAMPLES: usize = 4001;

// ---------------------------------------------------------------------------
// LoadSweep – efficiency vs. load at fixed frequency and power
// ---------------------------------------------------------------------------

/// What was held fixed to obtain a [`LoadSweep`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepPoint {
    pub frequency_ghz: f64,
    pub power_dbm: f64,
}

/// Efficiency across the load axis at one (frequency, power) point.
#[derive(Debug, Clone)]
pub struct LoadSweep {
    pub at: SweepPoint,
    pub loads: Vec<f64>,
    pub efficiency: Vec<f64>,
}

/// A sweep ready for plotting: the discrete samples for markers and the dense
/// interpolated line, kept apart.
#[derive(Debug, Clone)]
pub struct SweepCurve {
    pub at: SweepPoint,
    pub points: Vec<(f64, f64)>,
    pub curve: Vec<(f64, f64)>,
}

impl LoadSweep {
    /// Dense log-spaced curve of `samples` points between the smallest and
    /// largest finite loads, plus the finite discrete points.
    pub fn curve(&self, samples: usize) -> Result<SweepCurve> {
        let interp = LogLoadInterpolator::new(&self.loads, &self.efficiency)?;
        let points = interp.knots();
        let (lo, hi) = interp.domain();
        let curve = log_space(lo, hi, samples)
            .into_iter()
            .map(|x| (x, interp.eval(x)))
            .collect();
        Ok(SweepCurve {
            at: self.at,
            points,
            curve,
        })
    }
}

fn lookup(axes: &AxisSet, frequency_ghz: f64, power_dbm: f64) -> Result<(usize, usize)> {
    let f_idx = axes.frequency_index(frequency_ghz).ok_or_else(|| {
        AnalysisError::Interpolation(format!("{frequency_ghz} GHz is not on the frequency axis"))
    })?;
    let p_idx = axes.power_index(power_dbm).ok_or_else(|| {
        AnalysisError::Interpolation(format!("{power_dbm} dBm is not on the power axis"))
    })?;
    Ok((f_idx, p_idx))
}

fn extract(eff: &EfficiencyTensor, axes: &AxisSet, f_idx: usize, p_idx: usize) -> LoadSweep {
    LoadSweep {
        at: SweepPoint {
            frequency_ghz: axes.frequencies()[f_idx],
            power_dbm: axes.powers_dbm()[p_idx],
        },
        loads: axes.loads().to_vec(),
        efficiency: eff.load_sweep(f_idx, p_idx).to_vec(),
    }
}

/// One load sweep per requested power, all at `frequency_ghz`.
pub fn sweeps_at_frequency(
    eff: &EfficiencyTensor,
    axes: &AxisSet,
    frequency_ghz: f64,
    powers_dbm: &[f64],
) -> Result<Vec<LoadSweep>> {
    powers_dbm
        .iter()
        .map(|&p| {
            let (f_idx, p_idx) = lookup(axes, frequency_ghz, p)?;
            Ok(extract(eff, axes, f_idx, p_idx))
        })
        .collect()
}

/// One load sweep per requested frequency, all at `power_dbm`.
pub fn sweeps_at_power(
    eff: &EfficiencyTensor,
    axes: &AxisSet,
    power_dbm: f64,
    frequencies_ghz: &[f64],
) -> Result<Vec<LoadSweep>> {
    frequencies_ghz
        .iter()
        .map(|&f| {
            let (f_idx, p_idx) = lookup(axes, f, power_dbm)?;
            Ok(extract(eff, axes, f_idx, p_idx))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Interpolation
// ---------------------------------------------------------------------------

/// Piecewise-linear interpolation in `log10(load)`.
///
/// Non-finite samples are dropped; at least two finite points must remain.
#[derive(Debug, Clone)]
pub struct LogLoadInterpolator {
    log_loads: Vec<f64>,
    loads: Vec<f64>,
    values: Vec<f64>,
}

impl LogLoadInterpolator {
    pub fn new(loads: &[f64], values: &[f64]) -> Result<Self> {
        if loads.len() != values.len() {
            return Err(AnalysisError::Interpolation(format!(
                "{} loads but {} values",
                loads.len(),
                values.len()
            )));
        }
        let (loads, values): (Vec<f64>, Vec<f64>) = loads
            .iter()
            .zip(values)
            .filter(|(r, v)| r.is_finite() && **r > 0.0 && v.is_finite())
            .map(|(r, v)| (*r, *v))
            .unzip();
        if loads.len() < 2 {
            return Err(AnalysisError::Interpolation(format!(
                "need at least 2 finite points, have {}",
                loads.len()
            )));
        }
        if loads.windows(2).any(|w| w[1] <= w[0]) {
            return Err(AnalysisError::Interpolation(
                "loads must be strictly increasing".into(),
            ));
        }
        Ok(LogLoadInterpolator {
            log_loads: loads.iter().map(|r| r.log10()).collect(),
            loads,
            values,
        })
    }

    /// `(min_load, max_load)` of the finite points.
    pub fn domain(&self) -> (f64, f64) {
        (self.loads[0], self.loads[self.loads.len() - 1])
    }

    /// The finite `(load, value)` samples.
    pub fn knots(&self) -> Vec<(f64, f64)> {
        self.loads
            .iter()
            .copied()
            .zip(self.values.iter().copied())
            .collect()
    }

    /// Evaluate at `load`. Outside the domain the end values are held; a
    /// load that is not positive (or NaN) has no value and yields NaN.
    pub fn eval(&self, load: f64) -> f64 {
        if load.is_nan() || load <= 0.0 {
            return f64::NAN;
        }
        if let Some(i) = self.loads.iter().position(|&r| r == load) {
            return self.values[i];
        }
        let x = load.log10();
        let last = self.log_loads.len() - 1;
        if x <= self.log_loads[0] {
            return self.values[0];
        }
        if x >= self.log_loads[last] {
            return self.values[last];
        }
        let hi = self.log_loads.partition_point(|&k| k < x);
        let lo = hi - 1;
        let t = (x - self.log_loads[lo]) / (self.log_loads[hi] - self.log_loads[lo]);
        self.values[lo] + t * (self.values[hi] - self.values[lo])
    }
}

/// `n` points evenly spaced in log10 between `lo` and `hi`, endpoints exact.
pub fn log_space(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![lo],
        _ => {
            let (a, b) = (lo.log10(), hi.log10());
            let last = (n - 1) as f64;
            (0..n)
                .map(|i| match i {
                    0 => lo,
                    i if i == n - 1 => hi,
                    i => 10f64.powf(a + (b - a) * i as f64 / last),
                })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::assemble::TensorAssembler;
    use crate::data::efficiency::efficiency;
    use crate::data::model::{MeasuredQuantity, SourceRecord};
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn interpolation_hits_sample_points_exactly() {
        let interp = LogLoadInterpolator::new(&[1.0, 10.0, 100.0], &[10.0, 20.0, 15.0]).unwrap();
        assert_eq!(interp.eval(10.0), 20.0);
        assert_eq!(interp.eval(1.0), 10.0);
        assert_eq!(interp.eval(100.0), 15.0);
    }

    #[test]
    fn interpolation_is_linear_in_log_load() {
        let interp = LogLoadInterpolator::new(&[1.0, 100.0], &[0.0, 20.0]).unwrap();
        // log10(10) is halfway between log10(1) and log10(100)
        assert_relative_eq!(interp.eval(10.0), 10.0, epsilon = 1e-12);
        assert_eq!(interp.eval(0.5), 0.0);
        assert_eq!(interp.eval(1e4), 20.0);
    }

    #[test]
    fn non_positive_loads_evaluate_to_nan() {
        let interp = LogLoadInterpolator::new(&[1.0, 10.0, 100.0], &[10.0, 20.0, 15.0]).unwrap();
        assert!(interp.eval(f64::NAN).is_nan());
        assert!(interp.eval(-1.0).is_nan());
        assert!(interp.eval(0.0).is_nan());
        assert_eq!(interp.eval(0.5), 10.0);
    }

    #[test]
    fn too_few_finite_points_fail() {
        let err = LogLoadInterpolator::new(&[1.0, 10.0, 100.0], &[f64::NAN, 5.0, f64::NAN])
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Interpolation(_)));
        assert!(LogLoadInterpolator::new(&[1.0, 10.0], &[1.0]).is_err());
    }

    #[test]
    fn nan_points_are_skipped_not_zeroed() {
        let interp =
            LogLoadInterpolator::new(&[1.0, 10.0, 100.0], &[10.0, f64::NAN, 30.0]).unwrap();
        assert_eq!(interp.knots(), vec![(1.0, 10.0), (100.0, 30.0)]);
        assert_relative_eq!(interp.eval(10.0), 20.0, epsilon = 1e-12);
    }

    #[test]
    fn log_space_endpoints() {
        let xs = log_space(1.0, 1e6, 4001);
        assert_eq!(xs.len(), 4001);
        assert_eq!(xs[0], 1.0);
        assert_eq!(xs[4000], 1e6);
        assert_relative_eq!(xs[2000], 1e3, max_relative = 1e-12);
        assert!(xs.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn sweep_curve_keeps_markers_separate() {
        let axes = AxisSet::new(&[1.0, 10.0, 100.0], &[5.0, 5.2], &[-4.0, 0.0]).unwrap();
        let mut asm = TensorAssembler::new(&axes, MeasuredQuantity::Efficiency);
        for (load, v) in [(1.0, 10.0), (10.0, 20.0), (100.0, 15.0)] {
            asm.insert(SourceRecord::new("sim", load, array![[0.0, 0.0], [0.0, v]]))
                .unwrap();
        }
        let eff = efficiency(&asm.finish().tensor, &axes);

        let sweeps = sweeps_at_frequency(&eff, &axes, 5.2, &[0.0]).unwrap();
        assert_eq!(sweeps.len(), 1);
        assert_eq!(sweeps[0].efficiency, vec![10.0, 20.0, 15.0]);

        let curve = sweeps[0].curve(101).unwrap();
        assert_eq!(curve.points, vec![(1.0, 10.0), (10.0, 20.0), (100.0, 15.0)]);
        assert_eq!(curve.curve.len(), 101);
        assert_relative_eq!(curve.curve[50].0, 10.0, max_relative = 1e-12);
        assert_relative_eq!(curve.curve[50].1, 20.0, max_relative = 1e-9);

        let by_power = sweeps_at_power(&eff, &axes, -4.0, &[5.0, 5.2]).unwrap();
        assert_eq!(by_power.len(), 2);
        assert_eq!(by_power[1].at.frequency_ghz, 5.2);

        assert!(sweeps_at_frequency(&eff, &axes, 5.1, &[0.0]).is_err());
    }
}
