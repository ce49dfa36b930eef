//! End-to-end comparison: resolve → index → diff, with observer reporting.
//!
//! [`compare`] works on datasets already in memory; [`compare_paths`] loads both sides first.
//! Both report to [`CompareOptions::observer`] when one is set:
//!
//! - `on_loaded` once per side (path-based runs only)
//! - `on_warning` for every skipped field-mapping entry
//! - `on_success` with the [`Summary`](crate::report::Summary)
//! - `on_failure` with a computed severity, and `on_alert` when that severity is at or above
//!   [`CompareOptions::alert_at_or_above`]
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tabular_diff::compare::{compare_paths, CompareOptions, ComparisonRequest};
//! use tabular_diff::ingestion::LoadOptions;
//! use tabular_diff::observability::{ComparisonSeverity, StdErrObserver};
//!
//! # fn main() -> Result<(), tabular_diff::CompareError> {
//! let request = ComparisonRequest::new()
//!     .with_key_fields(["id"])
//!     .with_options(CompareOptions {
//!         observer: Some(Arc::new(StdErrObserver)),
//!         alert_at_or_above: ComparisonSeverity::Critical,
//!         ..Default::default()
//!     });
//!
//! let result = compare_paths("before.csv", "after.csv", &LoadOptions::default(), &request)?;
//! println!("missing={}", result.summary().data_loss_count);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::diff::{diff, DiffOptions, UnmappedFieldPolicy};
use crate::error::CompareResult;
use crate::index::{index, DuplicateKeyPolicy, IndexOptions};
use crate::ingestion::{load_from_path, LoadOptions};
use crate::mapping::{resolve, FieldMapping, MappingConfig};
use crate::observability::{ComparisonContext, ComparisonObserver, ComparisonSeverity, LoadStats};
use crate::report::DiffResult;
use crate::types::{Dataset, Side};

/// Policies and reporting for one comparison.
#[derive(Clone)]
pub struct CompareOptions {
    /// Applied to both sides.
    pub duplicates: DuplicateKeyPolicy,
    pub unmapped_fields: UnmappedFieldPolicy,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn ComparisonObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: ComparisonSeverity,
}

impl fmt::Debug for CompareOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompareOptions")
            .field("duplicates", &self.duplicates)
            .field("unmapped_fields", &self.unmapped_fields)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            duplicates: DuplicateKeyPolicy::default(),
            unmapped_fields: UnmappedFieldPolicy::default(),
            observer: None,
            alert_at_or_above: ComparisonSeverity::Critical,
        }
    }
}

/// Mapping inputs plus options. Empty `field_mapping` / `key_fields` fall back to `defaults`
/// (see [`crate::mapping::resolve`]).
#[derive(Debug, Clone, Default)]
pub struct ComparisonRequest {
    pub field_mapping: FieldMapping,
    pub key_fields: Vec<String>,
    /// The persisted default mapping, typically from a [`crate::mapping::MappingStore`].
    pub defaults: Option<MappingConfig>,
    pub options: CompareOptions,
}

impl ComparisonRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field_mapping(mut self, field_mapping: FieldMapping) -> Self {
        self.field_mapping = field_mapping;
        self
    }

    pub fn with_key_fields<I, S>(mut self, key_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key_fields = key_fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_defaults(mut self, defaults: MappingConfig) -> Self {
        self.defaults = Some(defaults);
        self
    }

    pub fn with_options(mut self, options: CompareOptions) -> Self {
        self.options = options;
        self
    }
}

/// Compare two in-memory datasets.
pub fn compare(source: &Dataset, target: &Dataset, request: &ComparisonRequest) -> CompareResult<DiffResult> {
    let ctx = ComparisonContext::default();
    let result = run(source, target, request);
    report(&ctx, &request.options, result)
}

/// Load both files with `load_options`, then compare them.
pub fn compare_paths(
    source_path: impl AsRef<Path>,
    target_path: impl AsRef<Path>,
    load_options: &LoadOptions,
    request: &ComparisonRequest,
) -> CompareResult<DiffResult> {
    let ctx = ComparisonContext::from_paths(&source_path, &target_path);
    let result = load_side(&ctx, Side::Source, source_path.as_ref(), load_options, &request.options)
        .and_then(|source| {
            let target = load_side(&ctx, Side::Target, target_path.as_ref(), load_options, &request.options)?;
            run(&source, &target, request)
        });
    report(&ctx, &request.options, result)
}

fn load_side(
    ctx: &ComparisonContext,
    side: Side,
    path: &Path,
    load_options: &LoadOptions,
    options: &CompareOptions,
) -> CompareResult<Dataset> {
    let dataset = load_from_path(path, load_options)?;
    if let Some(obs) = options.observer.as_ref() {
        obs.on_loaded(
            ctx,
            LoadStats {
                side,
                rows: dataset.row_count(),
                columns: dataset.schema.len(),
            },
        );
    }
    Ok(dataset)
}

fn run(source: &Dataset, target: &Dataset, request: &ComparisonRequest) -> CompareResult<DiffResult> {
    let options = &request.options;
    let resolved = resolve(
        &request.field_mapping,
        &request.key_fields,
        request.defaults.as_ref(),
        &source.schema,
    )?;

    let source_view = index(
        source,
        &resolved.key_fields,
        &IndexOptions::new(Side::Source, options.duplicates),
    )?;
    let target_view = index(
        target,
        &resolved.target_key_columns(),
        &IndexOptions::new(Side::Target, options.duplicates),
    )?;

    diff(
        &source_view,
        &target_view,
        &resolved.field_mapping,
        &resolved.key_fields,
        &DiffOptions {
            unmapped_fields: options.unmapped_fields,
        },
    )
}

fn report(
    ctx: &ComparisonContext,
    options: &CompareOptions,
    result: CompareResult<DiffResult>,
) -> CompareResult<DiffResult> {
    if let Some(obs) = options.observer.as_ref() {
        match &result {
            Ok(diff) => {
                for skipped in &diff.summary().skipped_mappings {
                    obs.on_warning(
                        ctx,
                        &format!(
                            "field mapping '{}' -> '{}' skipped: column not in {} schema",
                            skipped.source_field, skipped.target_field, skipped.missing_from
                        ),
                    );
                }
                obs.on_success(ctx, diff.summary());
            }
            Err(e) => {
                let sev = ComparisonSeverity::for_error(e);
                obs.on_failure(ctx, sev, e);
                if sev >= options.alert_at_or_above {
                    obs.on_alert(ctx, sev, e);
                }
            }
        }
    }
    result
}
