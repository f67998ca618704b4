use crate::error::{AnalysisError, Result};

// ---------------------------------------------------------------------------
// Unit conversion
// ---------------------------------------------------------------------------

/// Convert a power level in dBm to watts.
pub fn dbm_to_watts(dbm: f64) -> f64 {
    10f64.powf(dbm / 10.0) / 1000.0
}

/// Convert a power in watts to dBm.
pub fn watts_to_dbm(watts: f64) -> f64 {
    10.0 * (watts * 1000.0).log10()
}

// ---------------------------------------------------------------------------
// Axis construction
// ---------------------------------------------------------------------------

/// Largest number of points a sweep may produce.
pub const MAX_SWEEP_POINTS: usize = 10_000_000;

/// Evenly spaced inclusive sweep from `start` to `stop`.
///
/// The point count is `round((stop - start) / step) + 1`. Points are placed by
/// linear interpolation between the endpoints so the first and last elements
/// are exactly `start` and `stop`.
pub fn sweep(start: f64, stop: f64, step: f64) -> Result<Vec<f64>> {
    if !(start.is_finite() && stop.is_finite() && step.is_finite()) {
        return Err(AnalysisError::Config(format!(
            "sweep bounds must be finite (start={start}, stop={stop}, step={step})"
        )));
    }
    if step <= 0.0 {
        return Err(AnalysisError::Config(format!(
            "sweep step must be positive, got {step}"
        )));
    }
    if stop < start {
        return Err(AnalysisError::Config(format!(
            "sweep stop {stop} is below start {start}"
        )));
    }

    let intervals = ((stop - start) / step).round();
    if intervals >= MAX_SWEEP_POINTS as f64 {
        return Err(AnalysisError::Config(format!(
            "sweep {start}..{stop} step {step} exceeds {MAX_SWEEP_POINTS} points"
        )));
    }
    let npts = intervals as usize + 1;
    if npts == 1 {
        return Ok(vec![start]);
    }
    let span = stop - start;
    let last = (npts - 1) as f64;
    Ok((0..npts)
        .map(|i| {
            if i == npts - 1 {
                stop
            } else {
                start + span * (i as f64 / last)
            }
        })
        .collect())
}

/// Validate an explicit coordinate list: non-empty, finite, strictly increasing.
pub fn explicit(name: &str, values: &[f64]) -> Result<Vec<f64>> {
    if values.is_empty() {
        return Err(AnalysisError::Config(format!("{name} axis is empty")));
    }
    if let Some(v) = values.iter().find(|v| !v.is_finite()) {
        return Err(AnalysisError::Config(format!(
            "{name} axis contains non-finite value {v}"
        )));
    }
    if values.windows(2).any(|w| w[1] <= w[0]) {
        return Err(AnalysisError::Config(format!(
            "{name} axis must be strictly increasing"
        )));
    }
    Ok(values.to_vec())
}

/// Sort a fixed set of load resistances ascending, rejecting duplicates and
/// non-physical values.
pub fn load_axis(loads: &[f64]) -> Result<Vec<f64>> {
    if loads.is_empty() {
        return Err(AnalysisError::Config("load axis is empty".into()));
    }
    if let Some(r) = loads.iter().find(|r| !r.is_finite() || **r <= 0.0) {
        return Err(AnalysisError::Config(format!(
            "load resistance {r} Ω must be positive and finite"
        )));
    }
    let mut sorted = loads.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    if let Some(w) = sorted.windows(2).find(|w| w[0] == w[1]) {
        return Err(AnalysisError::Config(format!(
            "load resistance {} Ω is listed twice",
            w[0]
        )));
    }
    Ok(sorted)
}

// ---------------------------------------------------------------------------
// AxisSet
// ---------------------------------------------------------------------------

/// The three coordinate vectors of a measurement tensor.
///
/// Immutable once built; everything downstream borrows it.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisSet {
    loads: Vec<f64>,
    frequencies: Vec<f64>,
    powers_dbm: Vec<f64>,
    powers_watts: Vec<f64>,
}

impl AxisSet {
    /// Build an axis set from already generated coordinates.
    pub fn new(loads: &[f64], frequencies: &[f64], powers_dbm: &[f64]) -> Result<Self> {
        let loads = load_axis(loads)?;
        let frequencies = explicit("frequency", frequencies)?;
        let powers_dbm = explicit("power", powers_dbm)?;
        let powers_watts = powers_dbm.iter().map(|&p| dbm_to_watts(p)).collect();
        Ok(AxisSet {
            loads,
            frequencies,
            powers_dbm,
            powers_watts,
        })
    }

    /// DC load resistances in Ω, ascending.
    pub fn loads(&self) -> &[f64] {
        &self.loads
    }

    /// RF frequencies in GHz.
    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    /// RF input powers in dBm.
    pub fn powers_dbm(&self) -> &[f64] {
        &self.powers_dbm
    }

    /// RF input powers in watts.
    pub fn powers_watts(&self) -> &[f64] {
        &self.powers_watts
    }

    /// `(n_loads, n_frequencies, n_powers)`
    pub fn shape(&self) -> (usize, usize, usize) {
        (
            self.loads.len(),
            self.frequencies.len(),
            self.powers_dbm.len(),
        )
    }

    /// Exact membership lookup: a load that is not one of the configured values
    /// has no index.
    pub fn load_index(&self, load_ohms: f64) -> Option<usize> {
        self.loads.iter().position(|&r| r == load_ohms)
    }

    pub fn frequency_index(&self, frequency_ghz: f64) -> Option<usize> {
        coordinate_index(&self.frequencies, frequency_ghz)
    }

    pub fn power_index(&self, power_dbm: f64) -> Option<usize> {
        coordinate_index(&self.powers_dbm, power_dbm)
    }
}

/// Swept coordinates are not bit-exact (5.0 + 0.1 * 2 != 5.2), so presentation
/// lookups accept anything within a millionth of the local spacing.
fn coordinate_index(axis: &[f64], value: f64) -> Option<usize> {
    let spacing = axis
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold(f64::INFINITY, f64::min);
    let tol = if spacing.is_finite() {
        spacing * 1e-6
    } else {
        value.abs().max(1.0) * 1e-9
    };
    axis.iter().position(|&x| (x - value).abs() <= tol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sweep_has_expected_length_and_endpoints() {
        let cases = [
            (5.0, 6.0, 0.1),
            (-10.0, 16.0, 2.0),
            (5.2, 5.8, 0.6),
            (-9.0, 17.0, 2.0),
            (0.0, 0.0, 1.0),
            (1.0, 2.0, 0.3),
        ];
        for (start, stop, step) in cases {
            let axis = sweep(start, stop, step).unwrap();
            let expected = ((stop - start) / step).round() as usize + 1;
            assert_eq!(axis.len(), expected, "{start}..{stop} by {step}");
            assert!(axis.windows(2).all(|w| w[1] > w[0]));
            assert_relative_eq!(axis[0], start);
            assert_relative_eq!(*axis.last().unwrap(), stop);
        }
    }

    #[test]
    fn sweep_rejects_bad_parameters() {
        assert!(matches!(sweep(0.0, 1.0, 0.0), Err(AnalysisError::Config(_))));
        assert!(matches!(sweep(0.0, 1.0, -0.5), Err(AnalysisError::Config(_))));
        assert!(matches!(sweep(2.0, 1.0, 0.5), Err(AnalysisError::Config(_))));
        assert!(matches!(
            sweep(0.0, f64::NAN, 0.5),
            Err(AnalysisError::Config(_))
        ));
    }

    #[test]
    fn sweep_rejects_unbounded_point_count() {
        assert!(matches!(
            sweep(0.0, 1e300, 1e-300),
            Err(AnalysisError::Config(_))
        ));
        assert!(matches!(
            sweep(0.0, 1.0, 1e-12),
            Err(AnalysisError::Config(_))
        ));
        assert_eq!(sweep(0.0, 1.0, 1e-6).unwrap().len(), 1_000_001);
    }

    #[test]
    fn power_conversion_round_trips() {
        for x in [-40.0, -10.0, -3.5, 0.0, 1e-3, 4.0, 16.0, 33.3] {
            assert!((watts_to_dbm(dbm_to_watts(x)) - x).abs() < 1e-9);
        }
        assert_relative_eq!(dbm_to_watts(-10.0), 1e-4, max_relative = 1e-12);
        assert_relative_eq!(dbm_to_watts(0.0), 1e-3, max_relative = 1e-12);
    }

    #[test]
    fn loads_are_sorted_and_validated() {
        let loads = load_axis(&[100.0, 1.0, 10.0]).unwrap();
        assert_eq!(loads, vec![1.0, 10.0, 100.0]);
        assert!(load_axis(&[]).is_err());
        assert!(load_axis(&[1.0, 1.0]).is_err());
        assert!(load_axis(&[0.0, 1.0]).is_err());
    }

    #[test]
    fn explicit_axis_must_increase() {
        assert!(explicit("frequency", &[5.1, 5.2, 5.7, 5.8]).is_ok());
        assert!(explicit("frequency", &[5.2, 5.1]).is_err());
        assert!(explicit("frequency", &[]).is_err());
    }

    #[test]
    fn watts_cached_alongside_dbm() {
        let axes = AxisSet::new(&[1.0, 10.0], &[5.0], &[-10.0, 0.0]).unwrap();
        assert_relative_eq!(axes.powers_watts()[0], 1e-4, max_relative = 1e-12);
        assert_relative_eq!(axes.powers_watts()[1], 1e-3, max_relative = 1e-12);
        assert_eq!(axes.shape(), (2, 1, 2));
    }

    #[test]
    fn load_lookup_is_exact() {
        let axes = AxisSet::new(&[1.0, 10.0, 100.0], &[5.0], &[0.0]).unwrap();
        assert_eq!(axes.load_index(10.0), Some(1));
        assert_eq!(axes.load_index(10.000001), None);
        assert_eq!(axes.load_index(999.0), None);
    }

    #[test]
    fn swept_coordinates_found_despite_rounding() {
        let freqs = sweep(5.0, 6.0, 0.1).unwrap();
        let axes = AxisSet::new(&[1.0], &freqs, &[0.0]).unwrap();
        assert_eq!(axes.frequency_index(5.2), Some(2));
        assert_eq!(axes.frequency_index(5.25), None);
    }
}
