use log::{debug, warn};
use ndarray::{s, Array3, ArrayView2, ArrayView3};

use super::axes::AxisSet;
use super::model::{MeasuredQuantity, SourceRecord};
use crate::error::{AnalysisError, MissingSlice, Result};

// ---------------------------------------------------------------------------
// RawTensor – measured quantity indexed by (load, frequency, power)
// ---------------------------------------------------------------------------

/// Frozen result of assembly. Cells no source covered are NaN.
#[derive(Debug, Clone)]
pub struct RawTensor {
    data: Array3<f64>,
    quantity: MeasuredQuantity,
    /// Source that filled each load slice, indexed like the load axis.
    provenance: Vec<Option<String>>,
}

impl RawTensor {
    pub fn data(&self) -> ArrayView3<'_, f64> {
        self.data.view()
    }

    pub fn quantity(&self) -> MeasuredQuantity {
        self.quantity
    }

    pub fn provenance(&self) -> &[Option<String>] {
        &self.provenance
    }

    pub fn load_slice(&self, load_idx: usize) -> ArrayView2<'_, f64> {
        self.data.slice(s![load_idx, .., ..])
    }

    /// Number of cells that were never written.
    pub fn unset_cells(&self) -> usize {
        self.data.iter().filter(|v| v.is_nan()).count()
    }
}

// ---------------------------------------------------------------------------
// TensorAssembler
// ---------------------------------------------------------------------------

/// Places source records into the load slices of a raw tensor.
///
/// Mutation is strictly sequential; [`finish`](Self::finish) consumes the
/// assembler and hands out the read-only tensor.
pub struct TensorAssembler<'a> {
    axes: &'a AxisSet,
    data: Array3<f64>,
    quantity: MeasuredQuantity,
    provenance: Vec<Option<String>>,
}

/// Outcome of [`TensorAssembler::finish`].
#[derive(Debug)]
pub struct Assembly {
    pub tensor: RawTensor,
    /// `Some(IncompleteData)` when unset cells remain.
    pub incomplete: Option<AnalysisError>,
}

impl<'a> TensorAssembler<'a> {
    pub fn new(axes: &'a AxisSet, quantity: MeasuredQuantity) -> Self {
        TensorAssembler {
            axes,
            data: Array3::from_elem(axes.shape(), f64::NAN),
            quantity,
            provenance: vec![None; axes.loads().len()],
        }
    }

    /// Copy one record into its load slice, returning the load index.
    pub fn insert(&mut self, record: SourceRecord) -> Result<usize> {
        let load_idx = self
            .axes
            .load_index(record.load_ohms)
            .ok_or_else(|| AnalysisError::UnknownLoad {
                source_id: record.source_id.clone(),
                load_ohms: record.load_ohms,
            })?;

        let (_, n_freq, n_power) = self.axes.shape();
        if record.shape() != (n_freq, n_power) {
            let (rows, cols) = record.shape();
            return Err(AnalysisError::shape(
                record.source_id,
                format!("{n_freq}x{n_power} table"),
                format!("{rows}x{cols}"),
            ));
        }

        if let Some(previous) = &self.provenance[load_idx] {
            warn!(
                "{} replaces {previous} for load {} Ω",
                record.source_id, record.load_ohms
            );
        }

        self.data
            .slice_mut(s![load_idx, .., ..])
            .assign(&record.table);
        debug!("assembled {record}");
        self.provenance[load_idx] = Some(record.source_id);
        Ok(load_idx)
    }

    /// Number of load slices filled so far.
    pub fn filled(&self) -> usize {
        self.provenance.iter().filter(|p| p.is_some()).count()
    }

    /// Freeze the tensor and report any unset cells.
    pub fn finish(self) -> Assembly {
        let missing: Vec<MissingSlice> = self
            .axes
            .loads()
            .iter()
            .enumerate()
            .filter_map(|(idx, &load)| {
                let unset = self
                    .data
                    .slice(s![idx, .., ..])
                    .iter()
                    .filter(|v| v.is_nan())
                    .count();
                (unset > 0).then(|| MissingSlice {
                    load_ohms: load,
                    source: self.provenance[idx].clone(),
                    unset_cells: unset,
                })
            })
            .collect();

        let incomplete = (!missing.is_empty()).then_some(AnalysisError::IncompleteData { missing });
        Assembly {
            tensor: RawTensor {
                data: self.data,
                quantity: self.quantity,
                provenance: self.provenance,
            },
            incomplete,
        }
    }
}
