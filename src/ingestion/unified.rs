//! Unified loading entrypoint.
//!
//! Most callers should use [`load_from_path`], which loads a file into an in-memory
//! [`crate::types::Dataset`].
//!
//! - If [`LoadOptions::format`] is `None`, the input format is inferred from the file extension.
//! - CSV/TSV parsing is controlled by [`LoadOptions::csv`].

use std::path::Path;

use crate::error::{CompareError, CompareResult};
use crate::types::Dataset;

use super::csv::CsvOptions;
use super::{csv, json};

/// Supported input formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// Comma-separated values (delimiter taken from [`LoadOptions::csv`]).
    Csv,
    /// Tab-separated values.
    Tsv,
    /// JSON array-of-objects or NDJSON.
    Json,
    /// Spreadsheet/workbook formats (feature-gated behind `excel`).
    Excel,
}

impl InputFormat {
    /// Parse an input format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" | "txt" => Some(Self::Csv),
            "tsv" | "tab" => Some(Self::Tsv),
            "json" | "ndjson" | "jsonl" => Some(Self::Json),
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => Some(Self::Excel),
            _ => None,
        }
    }

    /// Infer the format of `path` from its extension.
    pub fn from_path(path: &Path) -> CompareResult<Self> {
        let ext = path.extension().and_then(|s| s.to_str()).ok_or_else(|| {
            CompareError::config(format!(
                "cannot infer input format: path has no extension ({})",
                path.display()
            ))
        })?;

        Self::from_extension(ext).ok_or_else(|| {
            CompareError::config(format!(
                "cannot infer input format from extension '{ext}' for path ({})",
                path.display()
            ))
        })
    }
}

/// Options controlling unified loading behavior.
///
/// Use [`Default`] for common cases.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// If `None`, infer the format from the file extension.
    pub format: Option<InputFormat>,
    /// Delimited-text options (also used for TSV, with the delimiter forced to tab).
    pub csv: CsvOptions,
    /// Excel sheet to read; `None` reads the first sheet.
    pub excel_sheet: Option<String>,
}

/// Load a tabular file, choosing the parser by `options.format` or by extension.
pub fn load_from_path(path: impl AsRef<Path>, options: &LoadOptions) -> CompareResult<Dataset> {
    let path = path.as_ref();
    let fmt = match options.format {
        Some(f) => f,
        None => InputFormat::from_path(path)?,
    };

    match fmt {
        InputFormat::Csv => csv::load_csv_from_path(path, &options.csv),
        InputFormat::Tsv => {
            let tsv = CsvOptions {
                delimiter: b'\t',
                ..options.csv.clone()
            };
            csv::load_csv_from_path(path, &tsv)
        }
        InputFormat::Json => json::load_json_from_path(path),
        InputFormat::Excel => load_excel_dispatch(path, options.excel_sheet.as_deref()),
    }
}

fn load_excel_dispatch(path: &Path, sheet: Option<&str>) -> CompareResult<Dataset> {
    #[cfg(feature = "excel")]
    {
        super::excel::load_excel_from_path(path, sheet)
    }

    #[cfg(not(feature = "excel"))]
    {
        let _ = (path, sheet);
        Err(CompareError::config(
            "excel input not enabled (enable cargo feature 'excel')",
        ))
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::InputFormat;

    #[test]
    fn infers_format_from_extension() {
        assert_eq!(InputFormat::from_path(Path::new("a.CSV")).unwrap(), InputFormat::Csv);
        assert_eq!(InputFormat::from_path(Path::new("a.tsv")).unwrap(), InputFormat::Tsv);
        assert_eq!(InputFormat::from_path(Path::new("a.ndjson")).unwrap(), InputFormat::Json);
        assert_eq!(InputFormat::from_path(Path::new("a.xlsx")).unwrap(), InputFormat::Excel);
        assert!(InputFormat::from_path(Path::new("a.parquet")).is_err());
        assert!(InputFormat::from_path(Path::new("noext")).is_err());
    }
}
