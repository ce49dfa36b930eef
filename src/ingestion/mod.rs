//! Loading entrypoints and implementations.
//!
//! Most callers should use [`load_from_path`] (from [`unified`]) which auto-detects the format
//! by file extension (or you can override it via [`LoadOptions`]).
//!
//! Format-specific functions are also available under:
//! - [`csv`] (including the row-at-a-time [`CsvRows`] reader)
//! - [`json`]
//! - `excel` (feature `excel`)

pub mod csv;
#[cfg(feature = "excel")]
pub mod excel;
pub mod json;
pub mod unified;

pub use csv::{CsvOptions, CsvRows};
pub use unified::{load_from_path, InputFormat, LoadOptions};
