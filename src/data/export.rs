use std::path::Path;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use serde::Serialize;

use super::axes::AxisSet;
use super::efficiency::EfficiencyTensor;
use crate::error::{AnalysisError, Result};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Write the efficiency tensor as a tidy table, one row per cell, in
/// (load, frequency, power) order. Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header `load_ohms,frequency_ghz,power_dbm,efficiency_percent`
/// * `.parquet` – the same four Float64 columns
pub fn export_tensor(eff: &EfficiencyTensor, axes: &AxisSet, path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => export_csv(eff, axes, path),
        "parquet" | "pq" => export_parquet(eff, axes, path),
        other => Err(AnalysisError::Export(format!(
            "unsupported export extension: .{other}"
        ))),
    }
}

#[derive(Debug, Serialize)]
struct TidyRow {
    load_ohms: f64,
    frequency_ghz: f64,
    power_dbm: f64,
    efficiency_percent: f64,
}

fn tidy_rows(eff: &EfficiencyTensor, axes: &AxisSet) -> Vec<TidyRow> {
    eff.data()
        .indexed_iter()
        .map(|((l, f, p), &value)| TidyRow {
            load_ohms: axes.loads()[l],
            frequency_ghz: axes.frequencies()[f],
            power_dbm: axes.powers_dbm()[p],
            efficiency_percent: value,
        })
        .collect()
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

fn export_csv(eff: &EfficiencyTensor, axes: &AxisSet, path: &Path) -> Result<()> {
    let id = path.display().to_string();
    let mut writer = csv::Writer::from_path(path).map_err(|e| AnalysisError::csv(&id, e))?;
    for row in tidy_rows(eff, axes) {
        writer
            .serialize(row)
            .map_err(|e| AnalysisError::csv(&id, e))?;
    }
    writer.flush().map_err(|e| AnalysisError::io(&id, e))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Parquet
// ---------------------------------------------------------------------------

fn export_parquet(eff: &EfficiencyTensor, axes: &AxisSet, path: &Path) -> Result<()> {
    let id = path.display().to_string();
    let rows = tidy_rows(eff, axes);

    let column = |f: fn(&TidyRow) -> f64| -> ArrayRef {
        Arc::new(Float64Array::from(rows.iter().map(f).collect::<Vec<f64>>()))
    };

    let schema = Arc::new(Schema::new(vec![
        Field::new("load_ohms", DataType::Float64, false),
        Field::new("frequency_ghz", DataType::Float64, false),
        Field::new("power_dbm", DataType::Float64, false),
        // NaN marks cells no measurement covered
        Field::new("efficiency_percent", DataType::Float64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            column(|r| r.load_ohms),
            column(|r| r.frequency_ghz),
            column(|r| r.power_dbm),
            column(|r| r.efficiency_percent),
        ],
    )
    .map_err(|e| AnalysisError::Export(format!("{id}: building record batch: {e}")))?;

    let file = std::fs::File::create(path).map_err(|e| AnalysisError::io(&id, e))?;
    let mut writer = ArrowWriter::try_new(file, schema, None)
        .map_err(|e| AnalysisError::Export(format!("{id}: creating parquet writer: {e}")))?;
    writer
        .write(&batch)
        .map_err(|e| AnalysisError::Export(format!("{id}: writing batch: {e}")))?;
    writer
        .close()
        .map_err(|e| AnalysisError::Export(format!("{id}: closing writer: {e}")))?;
    Ok(())
}
