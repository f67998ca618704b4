use std::fmt;

use thiserror::Error;

/// A load slice of the raw tensor that still holds unset cells after loading.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct MissingSlice {
    pub load_ohms: f64,
    /// Source that filled this slice, `None` when no source covered the load.
    pub source: Option<String>,
    pub unset_cells: usize,
}

impl fmt::Display for MissingSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(src) => write!(
                f,
                "{} Ω ({src}: {} unset cells)",
                self.load_ohms, self.unset_cells
            ),
            None => write!(f, "{} Ω (no source)", self.load_ohms),
        }
    }
}

fn join_missing(missing: &[MissingSlice]) -> String {
    missing
        .iter()
        .map(|m| m.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("{source_id}: parse error: {message}")]
    Parse { source_id: String, message: String },

    #[error("{source_id}: schema error: {message}")]
    Schema { source_id: String, message: String },

    #[error("{source_id}: expected {expected} but found {found}")]
    Shape {
        source_id: String,
        expected: String,
        found: String,
    },

    #[error("{source_id}: load {load_ohms} Ω is not one of the configured loads")]
    UnknownLoad { source_id: String, load_ohms: f64 },

    #[error("{source_id}: no usable records ({failures} failed)")]
    NoRecords { source_id: String, failures: usize },

    #[error("incomplete data for loads: {}", join_missing(.missing))]
    IncompleteData { missing: Vec<MissingSlice> },

    #[error("interpolation error: {0}")]
    Interpolation(String),

    #[error("{source_id}: io error: {error}")]
    Io {
        source_id: String,
        #[source]
        error: std::io::Error,
    },

    #[error("{source_id}: csv error: {error}")]
    Csv {
        source_id: String,
        #[source]
        error: csv::Error,
    },

    #[error("export error: {0}")]
    Export(String),

    #[error("render error: {0}")]
    Render(String),
}

impl AnalysisError {
    pub fn parse(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        AnalysisError::Parse {
            source_id: source_id.into(),
            message: message.into(),
        }
    }

    pub fn schema(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        AnalysisError::Schema {
            source_id: source_id.into(),
            message: message.into(),
        }
    }

    pub fn shape(
        source_id: impl Into<String>,
        expected: impl fmt::Display,
        found: impl fmt::Display,
    ) -> Self {
        AnalysisError::Shape {
            source_id: source_id.into(),
            expected: expected.to_string(),
            found: found.to_string(),
        }
    }

    pub fn io(source_id: impl Into<String>, error: std::io::Error) -> Self {
        AnalysisError::Io {
            source_id: source_id.into(),
            error,
        }
    }

    pub fn csv(source_id: impl Into<String>, error: csv::Error) -> Self {
        AnalysisError::Csv {
            source_id: source_id.into(),
            error,
        }
    }

    /// Failures that concern a single input unit and must not abort the rest
    /// of the load.
    pub fn is_per_source(&self) -> bool {
        matches!(
            self,
            AnalysisError::Parse { .. }
                | AnalysisError::Schema { .. }
                | AnalysisError::Shape { .. }
                | AnalysisError::UnknownLoad { .. }
                | AnalysisError::Io { .. }
                | AnalysisError::Csv { .. }
        )
    }

    /// Identifier of the offending input unit, when the error has one.
    pub fn source_id(&self) -> Option<&str> {
        match self {
            AnalysisError::Parse { source_id, .. }
            | AnalysisError::Schema { source_id, .. }
            | AnalysisError::Shape { source_id, .. }
            | AnalysisError::UnknownLoad { source_id, .. }
            | AnalysisError::Io { source_id, .. }
            | AnalysisError::Csv { source_id, .. }
            | AnalysisError::NoRecords { source_id, .. } => Some(source_id),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
