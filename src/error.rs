use thiserror::Error;

use crate::types::Side;

/// Convenience result type for comparison operations.
pub type CompareResult<T> = Result<T, CompareError>;

/// Error type returned by loading, mapping resolution, indexing and comparison.
///
/// Every failure is raised before the diff step runs, so an `Err` never comes with a partial
/// [`crate::report::DiffResult`].
#[derive(Debug, Error)]
pub enum CompareError {
    /// Underlying I/O error (e.g. file not found, permission denied).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reader/writer error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON encode/decode error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(feature = "excel")]
    /// Excel input error (feature-gated behind `excel`).
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    #[cfg(feature = "xlsx")]
    /// `.xlsx` report writer error (feature-gated behind `xlsx`).
    #[error("xlsx error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// Invalid or unsatisfiable mapping / key-field configuration.
    #[error("config error: {message}")]
    Config { message: String },

    /// Malformed tabular input. `row` is 1-based and counts the header as row 1.
    #[error("format error{}: {message}", row.map(|r| format!(" at row {r}")).unwrap_or_default())]
    Format { row: Option<usize>, message: String },

    /// A declared key field is not a column of the dataset it is applied to.
    #[error("key field missing: '{field}' is not a {side} column. columns={available:?}")]
    KeyFieldMissing {
        side: Side,
        field: String,
        available: Vec<String>,
    },

    /// Two rows share a record key and the duplicate policy is `Error`.
    #[error("duplicate key in {side}: {key} appears at rows {first_row} and {row}")]
    DuplicateKey {
        side: Side,
        key: String,
        first_row: usize,
        row: usize,
    },
}

impl CompareError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub(crate) fn format(row: Option<usize>, message: impl Into<String>) -> Self {
        Self::Format {
            row,
            message: message.into(),
        }
    }
}
