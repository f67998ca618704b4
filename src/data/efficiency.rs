use ndarray::{Array3, ArrayView1, ArrayView3, Axis};

use super::assemble::RawTensor;
use super::axes::AxisSet;
use super::model::MeasuredQuantity;

/// Rectification efficiency in percent, indexed by (load, frequency, power).
#[derive(Debug, Clone)]
pub struct EfficiencyTensor {
    data: Array3<f64>,
}

impl EfficiencyTensor {
    pub fn data(&self) -> ArrayView3<'_, f64> {
        self.data.view()
    }

    pub fn get(&self, load_idx: usize, freq_idx: usize, power_idx: usize) -> f64 {
        self.data[[load_idx, freq_idx, power_idx]]
    }

    /// Efficiency along the load axis at one (frequency, power) point.
    pub fn load_sweep(&self, freq_idx: usize, power_idx: usize) -> ArrayView1<'_, f64> {
        self.data
            .index_axis(Axis(2), power_idx)
            .index_axis_move(Axis(1), freq_idx)
    }
}

/// DC power delivered to the load: `V^2 / R`, or the readings themselves when
/// they already are powers. `None` for efficiency sources.
pub fn dc_power(raw: &RawTensor, axes: &AxisSet) -> Option<Array3<f64>> {
    match raw.quantity() {
        MeasuredQuantity::DcVoltage => {
            let mut power = raw.data().to_owned();
            for (mut slice, &load) in power.outer_iter_mut().zip(axes.loads()) {
                slice.mapv_inplace(|v| v * v / load);
            }
            Some(power)
        }
        MeasuredQuantity::DcPower => Some(raw.data().to_owned()),
        MeasuredQuantity::Efficiency => None,
    }
}

/// Efficiency of every cell against the available RF input power.
///
/// No clamping: readings can legitimately give values above 100 % or below
/// zero, and NaN cells stay NaN.
pub fn efficiency(raw: &RawTensor, axes: &AxisSet) -> EfficiencyTensor {
    let data = match dc_power(raw, axes) {
        Some(mut power) => {
            // Power axis is last, so a 1-D RF power vector broadcasts along it.
            let rf_watts = ArrayView1::from(axes.powers_watts());
            power /= &rf_watts;
            power *= 100.0;
            power
        }
        None => raw.data().to_owned(),
    };
    EfficiencyTensor { data }
}
