//! Batch execution of independent comparisons with configurable parallelism.
//!
//! Each comparison is a pure function of its inputs, so a batch simply fans jobs out over a
//! dedicated rayon pool. Results come back in job order regardless of completion order.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use rayon::ThreadPool;
use rayon::ThreadPoolBuilder;

use crate::compare::{compare, compare_paths, ComparisonRequest};
use crate::error::{CompareError, CompareResult};
use crate::ingestion::LoadOptions;
use crate::report::DiffResult;
use crate::types::Dataset;

/// Configuration for the [`BatchRunner`].
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Number of worker threads.
    ///
    /// If `None`, uses the platform's available parallelism.
    pub num_threads: Option<usize>,
}

/// What a job compares.
#[derive(Debug, Clone)]
pub enum JobInput {
    /// Load both files, then compare.
    Paths {
        source: PathBuf,
        target: PathBuf,
        load: LoadOptions,
    },
    /// Compare datasets that are already loaded.
    Datasets {
        source: Arc<Dataset>,
        target: Arc<Dataset>,
    },
}

/// One comparison in a batch.
#[derive(Debug, Clone)]
pub struct ComparisonJob {
    pub name: String,
    pub input: JobInput,
    pub request: ComparisonRequest,
}

impl ComparisonJob {
    pub fn paths(
        name: impl Into<String>,
        source: impl Into<PathBuf>,
        target: impl Into<PathBuf>,
        request: ComparisonRequest,
    ) -> Self {
        Self {
            name: name.into(),
            input: JobInput::Paths {
                source: source.into(),
                target: target.into(),
                load: LoadOptions::default(),
            },
            request,
        }
    }

    pub fn datasets(
        name: impl Into<String>,
        source: Arc<Dataset>,
        target: Arc<Dataset>,
        request: ComparisonRequest,
    ) -> Self {
        Self {
            name: name.into(),
            input: JobInput::Datasets { source, target },
            request,
        }
    }

    fn run(&self) -> CompareResult<DiffResult> {
        match &self.input {
            JobInput::Paths { source, target, load } => compare_paths(source, target, load, &self.request),
            JobInput::Datasets { source, target } => compare(source, target, &self.request),
        }
    }
}

/// Result of one job, tagged with the job name.
#[derive(Debug)]
pub struct JobOutcome {
    pub name: String,
    pub result: CompareResult<DiffResult>,
    pub elapsed: Duration,
}

/// Counters updated while a batch runs.
#[derive(Debug, Default)]
pub struct BatchMetrics {
    jobs_started: AtomicU64,
    jobs_succeeded: AtomicU64,
    jobs_failed: AtomicU64,
}

/// Point-in-time copy of [`BatchMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchMetricsSnapshot {
    pub jobs_started: u64,
    pub jobs_succeeded: u64,
    pub jobs_failed: u64,
}

impl BatchMetrics {
    pub fn snapshot(&self) -> BatchMetricsSnapshot {
        BatchMetricsSnapshot {
            jobs_started: self.jobs_started.load(Ordering::Relaxed),
            jobs_succeeded: self.jobs_succeeded.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
        }
    }
}

/// Runs comparison jobs on a dedicated thread pool.
pub struct BatchRunner {
    pool: ThreadPool,
    metrics: Arc<BatchMetrics>,
}

impl BatchRunner {
    /// Create a runner. `num_threads == Some(0)` is a [`CompareError::Config`].
    pub fn new(opts: BatchOptions) -> CompareResult<Self> {
        if opts.num_threads == Some(0) {
            return Err(CompareError::config("num_threads must be > 0 when set"));
        }
        let n_threads = opts
            .num_threads
            .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1));

        let pool = ThreadPoolBuilder::new()
            .num_threads(n_threads)
            .build()
            .map_err(|e| CompareError::config(format!("failed to build thread pool: {e}")))?;

        Ok(Self {
            pool,
            metrics: Arc::new(BatchMetrics::default()),
        })
    }

    /// Number of worker threads.
    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Get a handle to the batch counters.
    pub fn metrics(&self) -> Arc<BatchMetrics> {
        Arc::clone(&self.metrics)
    }

    /// Run every job; outcomes are in the same order as `jobs`.
    pub fn run(&self, jobs: &[ComparisonJob]) -> Vec<JobOutcome> {
        self.pool.install(|| {
            jobs.par_iter()
                .map(|job| {
                    self.metrics.jobs_started.fetch_add(1, Ordering::Relaxed);
                    let start = Instant::now();
                    let result = job.run();
                    let counter = if result.is_ok() {
                        &self.metrics.jobs_succeeded
                    } else {
                        &self.metrics.jobs_failed
                    };
                    counter.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(job = %job.name, ok = result.is_ok(), "batch job finished");
                    JobOutcome {
                        name: job.name.clone(),
                        result,
                        elapsed: start.elapsed(),
                    }
                })
                .collect()
        })
    }
}
