use std::fmt;
use std::path::{Path, PathBuf};

use log::debug;
use ndarray::{Array2, Array3, Axis};

use super::axes::AxisSet;
use super::model::{MeasuredQuantity, SourceRecord};
use crate::error::{AnalysisError, Result};

/// Lazily produced records of one source.
pub type RecordIter<'a> = Box<dyn Iterator<Item = Result<SourceRecord>> + 'a>;

// ---------------------------------------------------------------------------
// Source – the three input layouts behind one capability
// ---------------------------------------------------------------------------

/// A place measurements can be read from.
///
/// Supported layouts:
/// * raw directory – one tab-delimited file per load, load encoded in the name
/// * simulation    – one comma-delimited file with every (f, R, P) combination
/// * sheet         – one CSV export of a spreadsheet sheet, loads in the header
#[derive(Debug, Clone, PartialEq)]
pub enum Source {
    RawDirectory {
        dir: PathBuf,
        quantity: MeasuredQuantity,
    },
    Simulation {
        path: PathBuf,
        quantity: MeasuredQuantity,
    },
    Sheet {
        path: PathBuf,
    },
}

impl Source {
    /// Short identifier used for log messages and artifact names.
    pub fn name(&self) -> String {
        match self {
            Source::RawDirectory { dir, .. } => dir
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| dir.display().to_string()),
            Source::Simulation { path, .. } | Source::Sheet { path } => path
                .file_stem()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
        }
    }

    /// Physical quantity held by the records of this source.
    pub fn quantity(&self) -> MeasuredQuantity {
        match self {
            Source::RawDirectory { quantity, .. } | Source::Simulation { quantity, .. } => {
                *quantity
            }
            // Sheets are recorded in millivolts and converted on load.
            Source::Sheet { .. } => MeasuredQuantity::DcVoltage,
        }
    }

    /// Iterate over the records of this source.
    ///
    /// The outer error covers failures of the source as a whole (unreadable
    /// directory, malformed simulation file). Items carry per-unit failures
    /// that callers are expected to collect and skip. Calling this again
    /// re-reads the source from scratch.
    pub fn records<'a>(&'a self, axes: &'a AxisSet) -> Result<RecordIter<'a>> {
        match self {
            Source::RawDirectory { dir, .. } => {
                let files = list_files(dir)?;
                Ok(Box::new(
                    files.into_iter().map(move |path| load_raw_file(&path, axes)),
                ))
            }
            Source::Simulation { path, .. } => {
                let records = load_simulation(path, axes)?;
                Ok(Box::new(records.into_iter().map(Ok)))
            }
            Source::Sheet { path } => {
                let records = load_sheet(path, axes)?;
                Ok(Box::new(records.into_iter()))
            }
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::RawDirectory { dir, .. } => write!(f, "raw directory {}", dir.display()),
            Source::Simulation { path, .. } => write!(f, "simulation file {}", path.display()),
            Source::Sheet { path } => write!(f, "sheet {}", path.display()),
        }
    }
}

/// One [`Source::Sheet`] per CSV export found in a workbook directory.
pub fn workbook_sheets(dir: &Path) -> Result<Vec<Source>> {
    Ok(list_files(dir)?
        .into_iter()
        .filter(|p| {
            p.extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
        })
        .map(|path| Source::Sheet { path })
        .collect())
}

/// Regular, non-hidden files of a directory sorted by name.
fn list_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let id = dir.display().to_string();
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| AnalysisError::io(&id, e))? {
        let entry = entry.map_err(|e| AnalysisError::io(&id, e))?;
        let path = entry.path();
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if path.is_file() && !hidden {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

// ---------------------------------------------------------------------------
// Filename grammar
// ---------------------------------------------------------------------------

/// A raw measurement filename: `<prefix>_<load>[.<ext>]`.
///
/// `<load>` is the token after the last underscore of the part before the first
/// dot and must be a non-empty run of ASCII digits (Ω).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadFileName {
    pub prefix: String,
    pub load_ohms: u64,
    pub extension: Option<String>,
}

impl LoadFileName {
    pub fn parse(name: &str) -> Result<Self> {
        let (stem, extension) = match name.split_once('.') {
            Some((stem, ext)) => (stem, Some(ext.to_string())),
            None => (name, None),
        };
        let (prefix, token) = stem.rsplit_once('_').ok_or_else(|| {
            AnalysisError::parse(name, "no '_' separating the load value")
        })?;
        if prefix.is_empty() {
            return Err(AnalysisError::parse(name, "empty prefix before load value"));
        }
        if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AnalysisError::parse(
                name,
                format!("load token '{token}' is not an integer"),
            ));
        }
        let load_ohms = token
            .parse::<u64>()
            .map_err(|e| AnalysisError::parse(name, format!("load token '{token}': {e}")))?;
        Ok(LoadFileName {
            prefix: prefix.to_string(),
            load_ohms,
            extension,
        })
    }
}

// ---------------------------------------------------------------------------
// Delimited numeric tables
// ---------------------------------------------------------------------------

/// Read a header-less delimited file of numbers, one `Vec` per line.
/// Trailing empty fields (a dangling delimiter) are ignored.
fn read_numeric_rows(path: &Path, delimiter: u8, source_id: &str) -> Result<Vec<Vec<f64>>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| AnalysisError::csv(source_id, e))?;

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.map_err(|e| AnalysisError::csv(source_id, e))?;
        let fields: Vec<&str> = record.iter().collect();
        let n_fields = fields
            .iter()
            .rposition(|field| !field.is_empty())
            .map_or(0, |i| i + 1);
        if n_fields == 0 {
            continue;
        }
        let row = fields[..n_fields]
            .iter()
            .enumerate()
            .map(|(col, tok)| {
                tok.parse::<f64>().map_err(|_| {
                    AnalysisError::parse(
                        source_id,
                        format!("row {row_no}, column {col}: '{tok}' is not a number"),
                    )
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        rows.push(row);
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Raw measurement files
// ---------------------------------------------------------------------------

/// Load one raw measurement file: rows = frequencies, columns = powers.
fn load_raw_file(path: &Path, axes: &AxisSet) -> Result<SourceRecord> {
    let name = display_name(path);
    let parsed = LoadFileName::parse(&name)?;
    let rows = read_numeric_rows(path, b'\t', &name)?;

    let (_, n_freq, n_power) = axes.shape();
    if rows.len() != n_freq {
        return Err(AnalysisError::shape(
            &name,
            format!("{n_freq} frequency rows"),
            format!("{} rows", rows.len()),
        ));
    }
    if let Some((row_no, row)) = rows.iter().enumerate().find(|(_, r)| r.len() != n_power) {
        return Err(AnalysisError::shape(
            &name,
            format!("{n_power} power columns"),
            format!("{} columns in row {row_no}", row.len()),
        ));
    }

    let table = Array2::from_shape_vec((n_freq, n_power), rows.concat())
        .map_err(|e| AnalysisError::shape(&name, format!("{n_freq}x{n_power}"), e))?;
    debug!("loaded {name}: {} Ω", parsed.load_ohms);
    Ok(SourceRecord::new(name, parsed.load_ohms as f64, table))
}

// ---------------------------------------------------------------------------
// Simulation file
// ---------------------------------------------------------------------------

const SIM_COLUMNS: usize = 4;

fn same_coordinate(found: f64, expected: f64) -> bool {
    (found - expected).abs() <= 1e-6 * found.abs().max(expected.abs()).max(1.0)
}

/// Load a simulation export with columns `frequency, load, power, quantity`.
///
/// Rows run frequency-major, then load, with power varying fastest. Every
/// row's coordinates are checked against the axis value that order implies,
/// so a file written in a different order is rejected instead of reshaped into
/// scrambled slices.
fn load_simulation(path: &Path, axes: &AxisSet) -> Result<Vec<SourceRecord>> {
    let name = display_name(path);
    let rows = read_numeric_rows(path, b',', &name)?;

    let (n_load, n_freq, n_power) = axes.shape();
    let expected_rows = n_freq * n_load * n_power;
    if rows.len() != expected_rows {
        return Err(AnalysisError::shape(
            &name,
            format!("{expected_rows} rows ({n_freq} freq x {n_load} load x {n_power} power)"),
            format!("{} rows", rows.len()),
        ));
    }

    let mut values = Vec::with_capacity(expected_rows);
    for (i, row) in rows.iter().enumerate() {
        if row.len() != SIM_COLUMNS {
            return Err(AnalysisError::shape(
                &name,
                format!("{SIM_COLUMNS} columns"),
                format!("{} columns in row {i}", row.len()),
            ));
        }
        let f_idx = i / (n_load * n_power);
        let l_idx = (i / n_power) % n_load;
        let p_idx = i % n_power;
        let checks = [
            ("frequency", row[0], axes.frequencies()[f_idx]),
            ("load", row[1], axes.loads()[l_idx]),
            ("power", row[2], axes.powers_dbm()[p_idx]),
        ];
        for (column, found, expected) in checks {
            if !same_coordinate(found, expected) {
                return Err(AnalysisError::schema(
                    &name,
                    format!("row {i}: {column} column is {found}, traversal order expects {expected}"),
                ));
            }
        }
        values.push(row[3]);
    }

    let cube = Array3::from_shape_vec((n_freq, n_load, n_power), values)
        .map_err(|e| AnalysisError::shape(&name, format!("{n_freq}x{n_load}x{n_power}"), e))?;

    Ok(axes
        .loads()
        .iter()
        .enumerate()
        .map(|(l_idx, &load)| {
            SourceRecord::new(
                format!("{name}:{load}"),
                load,
                cube.index_axis(Axis(1), l_idx).to_owned(),
            )
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Spreadsheet sheet (CSV export)
// ---------------------------------------------------------------------------

const MILLIVOLTS_PER_VOLT: f64 = 1e3;

/// Load one sheet export: header = loads (Ω), rows = ascending RF power, cells
/// in millivolts. Yields one single-frequency record per load column.
fn load_sheet(path: &Path, axes: &AxisSet) -> Result<Vec<Result<SourceRecord>>> {
    let name = display_name(path);
    let sheet = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.clone());

    let (_, n_freq, n_power) = axes.shape();
    if n_freq != 1 {
        return Err(AnalysisError::shape(
            &name,
            "a single-frequency axis for a sheet",
            format!("{n_freq} frequencies"),
        ));
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| AnalysisError::csv(&name, e))?;

    let loads = reader
        .headers()
        .map_err(|e| AnalysisError::csv(&name, e))?
        .iter()
        .enumerate()
        .map(|(col, header)| {
            header.parse::<f64>().map_err(|_| {
                AnalysisError::schema(
                    &name,
                    format!("header '{header}' in column {col} is not a load resistance"),
                )
            })
        })
        .collect::<Result<Vec<f64>>>()?;

    let mut columns: Vec<Vec<f64>> = vec![Vec::with_capacity(n_power); loads.len()];
    for (row_no, result) in reader.records().enumerate() {
        let record = result.map_err(|e| AnalysisError::csv(&name, e))?;
        for (col, tok) in record.iter().enumerate() {
            let millivolts = tok.parse::<f64>().map_err(|_| {
                AnalysisError::parse(
                    &name,
                    format!("row {row_no}, column {col}: '{tok}' is not a number"),
                )
            })?;
            columns[col].push(millivolts / MILLIVOLTS_PER_VOLT);
        }
    }

    Ok(loads
        .into_iter()
        .zip(columns)
        .map(|(load, volts)| {
            let id = format!("{sheet}:{load}");
            if volts.len() != n_power {
                return Err(AnalysisError::shape(
                    id,
                    format!("{n_power} power rows"),
                    format!("{} rows", volts.len()),
                ));
            }
            let table = Array2::from_shape_vec((1, n_power), volts)
                .map_err(|e| AnalysisError::shape(&id, format!("1x{n_power}"), e))?;
            Ok(SourceRecord::new(id, load, table))
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::fs;

    fn axes_2x2x2() -> AxisSet {
        AxisSet::new(&[1.0, 10.0], &[5.0, 6.0], &[-10.0, 0.0]).unwrap()
    }

    #[test]
    fn filename_grammar() {
        let name = LoadFileName::parse("HSMS-286B_Shunt_High_1200000.csv").unwrap();
        assert_eq!(name.prefix, "HSMS-286B_Shunt_High");
        assert_eq!(name.load_ohms, 1_200_000);
        assert_eq!(name.extension.as_deref(), Some("csv"));

        let bare = LoadFileName::parse("shunt_10").unwrap();
        assert_eq!(bare.load_ohms, 10);
        assert_eq!(bare.extension, None);
    }

    #[test]
    fn filename_without_numeric_suffix_is_a_parse_error() {
        for bad in ["readme.txt", "shunt_.csv", "shunt_1k.csv", "_100.csv", "a_-5.csv"] {
            let err = LoadFileName::parse(bad).unwrap_err();
            assert!(matches!(err, AnalysisError::Parse { .. }), "{bad}: {err}");
        }
    }

    #[test]
    fn raw_directory_yields_one_record_per_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("d_c_Low_1.csv"), "1\t2\n3\t4\n").unwrap();
        fs::write(dir.path().join("d_c_Low_10.csv"), "5\t6\n7\t8\n").unwrap();
        fs::write(dir.path().join(".DS_Store"), "junk").unwrap();

        let axes = axes_2x2x2();
        let source = Source::RawDirectory {
            dir: dir.path().to_path_buf(),
            quantity: MeasuredQuantity::DcVoltage,
        };
        let records: Vec<SourceRecord> = source
            .records(&axes)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].load_ohms, 1.0);
        assert_eq!(records[0].table[[1, 0]], 3.0);
        assert_eq!(records[1].load_ohms, 10.0);
        assert_eq!(records[1].table[[0, 1]], 6.0);

        // Restartable: a second pass sees the same data.
        assert_eq!(source.records(&axes).unwrap().count(), 2);
    }

    #[test]
    fn raw_file_with_wrong_shape_is_a_shape_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("x_1.txt"), "1\t2\t3\n4\t5\t6\n").unwrap();
        fs::write(dir.path().join("x_10.txt"), "1\t2\n").unwrap();

        let axes = axes_2x2x2();
        let source = Source::RawDirectory {
            dir: dir.path().to_path_buf(),
            quantity: MeasuredQuantity::DcVoltage,
        };
        let results: Vec<_> = source.records(&axes).unwrap().collect();
        assert_eq!(results.len(), 2);
        for r in results {
            assert!(matches!(r, Err(AnalysisError::Shape { .. })));
        }
    }

    #[test]
    fn raw_file_tolerates_trailing_tab_and_scientific_notation() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("x_1.txt"),
            "1.000000000000000000e+00\t2.5e-01\t\n3e0\t4\t\n",
        )
        .unwrap();
        let axes = axes_2x2x2();
        let record = load_raw_file(&dir.path().join("x_1.txt"), &axes).unwrap();
        assert_eq!(record.table[[0, 1]], 0.25);
    }

    #[test]
    fn simulation_passes_quantity_through_per_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shunt_sim.csv");
        fs::write(&path, "5.2,100,-10,50\n5.2,100,0,60\n").unwrap();

        let axes = AxisSet::new(&[100.0], &[5.2], &[-10.0, 0.0]).unwrap();
        let source = Source::Simulation {
            path,
            quantity: MeasuredQuantity::Efficiency,
        };
        let records: Vec<SourceRecord> = source
            .records(&axes)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].load_ohms, 100.0);
        assert_eq!(records[0].table.iter().copied().collect::<Vec<_>>(), vec![50.0, 60.0]);
    }

    #[test]
    fn simulation_rows_are_frequency_major() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sim.csv");
        let mut text = String::new();
        for f in [5.0, 6.0] {
            for r in [1.0, 10.0] {
                for p in [-10.0, 0.0] {
                    text.push_str(&format!("{f},{r},{p},{}\n", f * 100.0 + r + p));
                }
            }
        }
        fs::write(&path, text).unwrap();

        let axes = axes_2x2x2();
        let records = load_simulation(&path, &axes).unwrap();
        assert_eq!(records[1].load_ohms, 10.0);
        // f = 6.0, p = -10 at load 10
        assert_relative_eq!(records[1].table[[1, 0]], 600.0);
    }

    #[test]
    fn simulation_in_wrong_order_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sim.csv");
        let mut text = String::new();
        // load-major instead of frequency-major
        for r in [1.0, 10.0] {
            for f in [5.0, 6.0] {
                for p in [-10.0, 0.0] {
                    text.push_str(&format!("{f},{r},{p},1\n"));
                }
            }
        }
        fs::write(&path, text).unwrap();

        let err = load_simulation(&path, &axes_2x2x2()).unwrap_err();
        assert!(matches!(err, AnalysisError::Schema { .. }), "{err}");
    }

    #[test]
    fn simulation_row_count_must_match_axes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sim.csv");
        fs::write(&path, "5.0,1,-10,1\n").unwrap();
        let err = load_simulation(&path, &axes_2x2x2()).unwrap_err();
        assert!(matches!(err, AnalysisError::Shape { .. }));
    }

    #[test]
    fn sheet_converts_millivolts_to_volts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Series.csv");
        fs::write(&path, "10,100\n500,1000\n700,1500\n").unwrap();

        let axes = AxisSet::new(&[10.0, 100.0], &[5.8], &[-10.0, -8.0]).unwrap();
        let records: Vec<SourceRecord> = load_sheet(&path, &axes)
            .unwrap()
            .into_iter()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[1].source_id, "Series:100");
        assert_eq!(records[1].load_ohms, 100.0);
        assert_relative_eq!(records[1].table[[0, 0]], 1.0);
        assert_relative_eq!(records[1].table[[0, 1]], 1.5);
    }

    #[test]
    fn sheet_with_text_header_is_a_schema_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Bad.csv");
        fs::write(&path, "10,load\n1,2\n").unwrap();
        let axes = AxisSet::new(&[10.0], &[5.8], &[-10.0]).unwrap();
        let err = load_sheet(&path, &axes).unwrap_err();
        assert!(matches!(err, AnalysisError::Schema { .. }));
    }

    #[test]
    fn workbook_lists_csv_sheets_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("Shunt.csv"), "1\n1\n").unwrap();
        fs::write(dir.path().join("Series.CSV"), "1\n1\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();
        let sheets = workbook_sheets(dir.path()).unwrap();
        let names: Vec<String> = sheets.iter().map(|s| s.name()).collect();
        assert_eq!(names, vec!["Series", "Shunt"]);
    }
}
