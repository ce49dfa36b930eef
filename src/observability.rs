use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::CompareError;
use crate::report::Summary;
use crate::types::Side;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ComparisonSeverity {
    /// Informational event.
    Info,
    /// Non-fatal problem, e.g. a mapping entry that was skipped.
    Warning,
    /// The comparison failed.
    Error,
    /// Critical error (typically I/O or other infrastructure failures).
    Critical,
}

impl ComparisonSeverity {
    /// Severity of a failed comparison: I/O (also when wrapped by a parser) is critical,
    /// everything else is an error.
    pub fn for_error(error: &CompareError) -> Self {
        match error {
            CompareError::Io(_) => ComparisonSeverity::Critical,
            CompareError::Csv(err) => match err.kind() {
                ::csv::ErrorKind::Io(_) => ComparisonSeverity::Critical,
                _ => ComparisonSeverity::Error,
            },
            CompareError::Json(err) if err.is_io() => ComparisonSeverity::Critical,
            #[cfg(feature = "excel")]
            CompareError::Excel(err) if error_chain_contains_io(err) => ComparisonSeverity::Critical,
            #[cfg(feature = "xlsx")]
            CompareError::Xlsx(err) if error_chain_contains_io(err) => ComparisonSeverity::Critical,
            _ => ComparisonSeverity::Error,
        }
    }
}

#[cfg(any(feature = "excel", feature = "xlsx"))]
fn error_chain_contains_io(e: &(dyn std::error::Error + 'static)) -> bool {
    let mut cur: Option<&(dyn std::error::Error + 'static)> = Some(e);
    while let Some(err) = cur {
        if err.is::<std::io::Error>() {
            return true;
        }
        cur = err.source();
    }
    false
}

/// Identifies one comparison run in observer callbacks.
#[derive(Debug, Clone, Default)]
pub struct ComparisonContext {
    /// Source input path, when loaded from disk.
    pub source: Option<PathBuf>,
    /// Target input path, when loaded from disk.
    pub target: Option<PathBuf>,
}

impl ComparisonContext {
    pub fn from_paths(source: impl AsRef<Path>, target: impl AsRef<Path>) -> Self {
        Self {
            source: Some(source.as_ref().to_path_buf()),
            target: Some(target.as_ref().to_path_buf()),
        }
    }

    pub fn path(&self, side: Side) -> Option<&Path> {
        match side {
            Side::Source => self.source.as_deref(),
            Side::Target => self.target.as_deref(),
        }
    }
}

impl fmt::Display for ComparisonContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |p: &Option<PathBuf>| {
            p.as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<memory>".to_string())
        };
        write!(f, "source={} target={}", show(&self.source), show(&self.target))
    }
}

/// Shape of one loaded dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadStats {
    pub side: Side,
    pub rows: usize,
    pub columns: usize,
}

/// Observer interface for comparison outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts. Every callback has a no-op default.
pub trait ComparisonObserver: Send + Sync {
    /// Called after each side has been loaded (only for path-based runs).
    fn on_loaded(&self, _ctx: &ComparisonContext, _stats: LoadStats) {}

    /// Called when a comparison completes.
    fn on_success(&self, _ctx: &ComparisonContext, _summary: &Summary) {}

    /// Called when a comparison fails.
    fn on_failure(&self, _ctx: &ComparisonContext, _severity: ComparisonSeverity, _error: &CompareError) {}

    /// Called when a failure meets the alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &ComparisonContext, severity: ComparisonSeverity, error: &CompareError) {
        self.on_failure(ctx, severity, error)
    }

    /// Called for non-fatal problems in a comparison that still completes.
    fn on_warning(&self, _ctx: &ComparisonContext, _message: &str) {}
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn ComparisonObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn ComparisonObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl ComparisonObserver for CompositeObserver {
    fn on_loaded(&self, ctx: &ComparisonContext, stats: LoadStats) {
        for o in &self.observers {
            o.on_loaded(ctx, stats);
        }
    }

    fn on_success(&self, ctx: &ComparisonContext, summary: &Summary) {
        for o in &self.observers {
            o.on_success(ctx, summary);
        }
    }

    fn on_failure(&self, ctx: &ComparisonContext, severity: ComparisonSeverity, error: &CompareError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &ComparisonContext, severity: ComparisonSeverity, error: &CompareError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }

    fn on_warning(&self, ctx: &ComparisonContext, message: &str) {
        for o in &self.observers {
            o.on_warning(ctx, message);
        }
    }
}

/// Logs comparison events to stderr.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl ComparisonObserver for StdErrObserver {
    fn on_loaded(&self, ctx: &ComparisonContext, stats: LoadStats) {
        eprintln!(
            "[compare][load] side={} path={} rows={} columns={}",
            stats.side,
            ctx.path(stats.side).map(|p| p.display().to_string()).unwrap_or_default(),
            stats.rows,
            stats.columns
        );
    }

    fn on_success(&self, ctx: &ComparisonContext, summary: &Summary) {
        eprintln!(
            "[compare][ok] {ctx} missing={} differing={} matching={} target_only={}",
            summary.data_loss_count, summary.value_diff_count, summary.matching_records, summary.target_only_count
        );
    }

    fn on_failure(&self, ctx: &ComparisonContext, severity: ComparisonSeverity, error: &CompareError) {
        eprintln!("[compare][{severity:?}] {ctx} err={error}");
    }

    fn on_alert(&self, ctx: &ComparisonContext, severity: ComparisonSeverity, error: &CompareError) {
        eprintln!("[ALERT][compare][{severity:?}] {ctx} err={error}");
    }

    fn on_warning(&self, ctx: &ComparisonContext, message: &str) {
        eprintln!("[compare][Warning] {ctx} {message}");
    }
}

/// Appends comparison events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl ComparisonObserver for FileObserver {
    fn on_loaded(&self, ctx: &ComparisonContext, stats: LoadStats) {
        self.append_line(&format!(
            "{} load side={} {ctx} rows={} columns={}",
            unix_ts(),
            stats.side,
            stats.rows,
            stats.columns
        ));
    }

    fn on_success(&self, ctx: &ComparisonContext, summary: &Summary) {
        self.append_line(&format!(
            "{} ok {ctx} missing={} differing={} matching={} target_only={}",
            unix_ts(),
            summary.data_loss_count,
            summary.value_diff_count,
            summary.matching_records,
            summary.target_only_count
        ));
    }

    fn on_failure(&self, ctx: &ComparisonContext, severity: ComparisonSeverity, error: &CompareError) {
        self.append_line(&format!("{} fail severity={severity:?} {ctx} err={error}", unix_ts()));
    }

    fn on_alert(&self, ctx: &ComparisonContext, severity: ComparisonSeverity, error: &CompareError) {
        self.append_line(&format!("{} ALERT severity={severity:?} {ctx} err={error}", unix_ts()));
    }

    fn on_warning(&self, ctx: &ComparisonContext, message: &str) {
        self.append_line(&format!("{} warn {ctx} {message}", unix_ts()));
    }
}

/// Emits comparison events as `tracing` events.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl ComparisonObserver for TracingObserver {
    fn on_loaded(&self, ctx: &ComparisonContext, stats: LoadStats) {
        tracing::info!(
            side = %stats.side,
            path = ?ctx.path(stats.side),
            rows = stats.rows,
            columns = stats.columns,
            "dataset loaded"
        );
    }

    fn on_success(&self, ctx: &ComparisonContext, summary: &Summary) {
        tracing::info!(
            context = %ctx,
            missing = summary.data_loss_count,
            differing = summary.value_diff_count,
            matching = summary.matching_records,
            target_only = summary.target_only_count,
            "comparison finished"
        );
    }

    fn on_failure(&self, ctx: &ComparisonContext, severity: ComparisonSeverity, error: &CompareError) {
        tracing::error!(context = %ctx, severity = ?severity, error = %error, "comparison failed");
    }

    fn on_alert(&self, ctx: &ComparisonContext, severity: ComparisonSeverity, error: &CompareError) {
        tracing::error!(context = %ctx, severity = ?severity, error = %error, alert = true, "comparison failed");
    }

    fn on_warning(&self, ctx: &ComparisonContext, message: &str) {
        tracing::warn!(context = %ctx, "{message}");
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
