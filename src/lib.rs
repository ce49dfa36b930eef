//! `tabular-diff` compares two tabular datasets record by record.
//!
//! Records are matched on a set of key fields; values are compared under a field mapping
//! (source column → target column). The result is a [`report::DiffResult`] listing
//!
//! - **missing records**: source keys absent from the target,
//! - **value differences**: common keys where at least one mapped field differs,
//! - **target-only records**: target keys absent from the source,
//!
//! plus a [`report::Summary`] of counts and the mapping/key fields actually used.
//!
//! ## Pipeline
//!
//! 1. [`ingestion`] loads CSV/TSV, JSON/NDJSON or (feature `excel`) workbook files into a
//!    [`types::Dataset`]. Values are kept as read; empty CSV cells become [`types::Value::Null`].
//! 2. [`mapping::resolve`] combines explicit overrides with a persisted default
//!    [`mapping::MappingConfig`] into the field mapping and key fields.
//! 3. [`index::index`] builds a [`index::KeyedView`] per side.
//! 4. [`diff::diff`] classifies every key.
//! 5. A [`report::Renderer`] turns the result into JSON, a status payload, flat tables (CSV) or,
//!    with feature `xlsx`, a workbook.
//!
//! [`compare::compare`] and [`compare::compare_paths`] run steps 2–4 (and 1) in one call.
//!
//! ## Equality
//!
//! Two values are equal when both are null, or both are non-null with identical string forms.
//! A value that is null on exactly one side always differs. Record keys use the same rule.
//!
//! ## Example
//!
//! ```rust
//! use tabular_diff::compare::{compare, ComparisonRequest};
//! use tabular_diff::mapping::FieldMapping;
//! use tabular_diff::types::{Dataset, Schema, Value};
//!
//! let source = Dataset::new(
//!     Schema::new(["id", "name"]),
//!     vec![
//!         vec![Value::text("1"), Value::text("Alice")],
//!         vec![Value::text("2"), Value::text("Bob")],
//!     ],
//! );
//! let target = Dataset::new(
//!     Schema::new(["id", "full_name"]),
//!     vec![vec![Value::text("1"), Value::text("Alicia")]],
//! );
//!
//! let mapping: FieldMapping = [("name", "full_name")].into_iter().collect();
//! let request = ComparisonRequest::new()
//!     .with_field_mapping(mapping)
//!     .with_key_fields(["id"]);
//! let result = compare(&source, &target, &request).unwrap();
//!
//! assert_eq!(result.summary().data_loss_count, 1);
//! assert_eq!(result.summary().value_diff_count, 1);
//! assert_eq!(result.value_differences()[0].differences[0].target_field, "full_name");
//! ```
//!
//! ## Modules
//!
//! - [`ingestion`]: loading entrypoints and format-specific readers
//! - [`mapping`]: field mapping, key resolution and mapping storage
//! - [`index`]: key-indexed views and duplicate-key policies
//! - [`diff`]: the comparison itself
//! - [`report`]: result model and renderers
//! - [`compare`]: end-to-end entrypoints with observer reporting
//! - [`execution`]: parallel batches of independent comparisons
//! - [`observability`]: observer trait and stock observers
//! - [`types`], [`error`]

pub mod compare;
pub mod diff;
pub mod error;
pub mod execution;
pub mod index;
pub mod ingestion;
pub mod mapping;
pub mod observability;
pub mod report;
pub mod types;

pub use compare::{compare, compare_paths, CompareOptions, ComparisonRequest};
pub use error::{CompareError, CompareResult};
