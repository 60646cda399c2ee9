//! Bounded-pool execution of analysis jobs.
//!
//! Jobs are dispatched FIFO onto a rayon pool sized to the host's available
//! parallelism. Each finished job is streamed to the caller as a
//! [`JobOutcome`]; the executor never touches the shared store.
//!
//! Cancellation is advisory: the flag is checked when a job is about to
//! start. Jobs already running finish normally and are still streamed;
//! discarding them is the merger's decision.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use rayon::{ThreadPool, ThreadPoolBuilder};
use tracing::{debug, info, warn};

use crate::error::{BatchError, BatchResult};
use crate::hash::compute_batch_id;
use crate::job::AnalysisJob;
use crate::solver::{JobFailure, Solver, SolverOutput};

/// Shared cooperative cancellation flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Clear the flag so the executor can be reused for another batch.
    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Receives progress from worker threads, possibly concurrently and out of order.
pub trait ProgressSink: Send + Sync {
    fn progress(&self, completed: usize, total: usize);

    fn finished(&self, _summary: &BatchSummary) {}
}

impl<F> ProgressSink for F
where
    F: Fn(usize, usize) + Send + Sync,
{
    fn progress(&self, completed: usize, total: usize) {
        self(completed, total)
    }
}

/// Sink that ignores all progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn progress(&self, _completed: usize, _total: usize) {}
}

/// Result of one dispatched job.
#[derive(Debug, Clone)]
pub enum JobOutcome {
    Success {
        job: AnalysisJob,
        output: SolverOutput,
    },
    Failure {
        job: AnalysisJob,
        failure: JobFailure,
    },
}

impl JobOutcome {
    pub fn job(&self) -> &AnalysisJob {
        match self {
            Self::Success { job, .. } | Self::Failure { job, .. } => job,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Counts for a finished batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub batch_id: String,
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Jobs never started because cancellation was requested first
    pub cancelled: usize,
}

impl BatchSummary {
    pub fn all_failed(&self) -> bool {
        self.total > 0 && self.succeeded == 0 && self.failed > 0
    }
}

#[derive(Debug, Clone)]
pub struct ExecutorOptions {
    /// Worker count; `None` uses the host's available parallelism.
    pub workers: Option<usize>,
    /// Directory under which per-batch scratch directories are created.
    pub scratch_root: PathBuf,
}

impl Default for ExecutorOptions {
    fn default() -> Self {
        Self {
            workers: None,
            scratch_root: std::env::temp_dir(),
        }
    }
}

/// Worker count matching the host's available parallelism.
pub fn default_workers() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// A running batch: its outcome stream, cancellation, and completion.
pub struct BatchHandle {
    outcomes: Receiver<JobOutcome>,
    cancel: CancelFlag,
    dispatcher: JoinHandle<BatchSummary>,
}

impl BatchHandle {
    /// Blocking iterator over outcomes as they finish; ends when the batch does.
    pub fn outcomes(&self) -> mpsc::Iter<'_, JobOutcome> {
        self.outcomes.iter()
    }

    /// Next outcome, or `None` once every dispatched job has reported.
    pub fn recv(&self) -> Option<JobOutcome> {
        self.outcomes.recv().ok()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Wait for the dispatcher and return the batch counts.
    pub fn join(self) -> BatchResult<BatchSummary> {
        self.dispatcher
            .join()
            .map_err(|_| BatchError::DispatcherPanicked)
    }
}

pub struct BatchExecutor<S> {
    solver: Arc<S>,
    pool: Arc<ThreadPool>,
    workers: usize,
    scratch_root: PathBuf,
    cancel: CancelFlag,
}

impl<S: Solver + 'static> BatchExecutor<S> {
    pub fn new(solver: S, options: ExecutorOptions) -> BatchResult<Self> {
        let workers = options.workers.unwrap_or_else(default_workers).max(1);
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("pf-solver-{i}"))
            .build()
            .map_err(|e| BatchError::WorkerPool(e.to_string()))?;
        Ok(Self {
            solver: Arc::new(solver),
            pool: Arc::new(pool),
            workers,
            scratch_root: options.scratch_root,
            cancel: CancelFlag::new(),
        })
    }

    /// Use an externally owned cancellation flag.
    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = flag;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn solver(&self) -> &S {
        &self.solver
    }

    /// The flag shared by every batch this executor starts.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Start `jobs` in the background and return a handle to their outcomes.
    ///
    /// Fails with `SolverUnavailable` before anything is dispatched if the
    /// solver cannot be invoked.
    pub fn spawn(
        &self,
        jobs: Vec<AnalysisJob>,
        sink: Arc<dyn ProgressSink>,
    ) -> BatchResult<BatchHandle> {
        self.solver.check_available()?;

        let batch_id = compute_batch_id(&jobs);
        let scratch = self
            .scratch_root
            .join(format!("polarflow-{}", &batch_id[..12]));
        fs::create_dir_all(&scratch)?;

        let total = jobs.len();
        info!(batch = %&batch_id[..12], jobs = total, workers = self.workers, "dispatching batch");

        let (tx, rx) = mpsc::channel();
        let solver = Arc::clone(&self.solver);
        let pool = Arc::clone(&self.pool);
        let cancel = self.cancel.clone();
        let dispatch_cancel = self.cancel.clone();

        let dispatcher = thread::Builder::new()
            .name("pf-dispatch".to_string())
            .spawn(move || {
                let completed = AtomicUsize::new(0);
                let succeeded = AtomicUsize::new(0);
                let skipped = AtomicUsize::new(0);

                pool.scope_fifo(|scope| {
                    for (index, job) in jobs.into_iter().enumerate() {
                        let tx = tx.clone();
                        let (solver, sink, flag) = (&solver, &sink, &dispatch_cancel);
                        let (completed, succeeded, skipped) = (&completed, &succeeded, &skipped);
                        let workdir = scratch.join(job_dir_name(index, &job.name));
                        scope.spawn_fifo(move |_| {
                            if flag.is_cancelled() {
                                skipped.fetch_add(1, Ordering::SeqCst);
                                debug!(job = %job.name, "batch cancelled, job not started");
                                return;
                            }
                            let outcome = run_job(&**solver, job, &workdir);
                            if outcome.is_success() {
                                succeeded.fetch_add(1, Ordering::SeqCst);
                            }
                            let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                            sink.progress(done, total);
                            // receiver may be gone if the caller stopped listening
                            let _ = tx.send(outcome);
                        });
                    }
                });
                drop(tx);

                if let Err(e) = fs::remove_dir_all(&scratch) {
                    debug!(dir = %scratch.display(), error = %e, "scratch directory not removed");
                }

                let completed = completed.into_inner();
                let succeeded = succeeded.into_inner();
                let summary = BatchSummary {
                    batch_id,
                    total,
                    succeeded,
                    failed: completed - succeeded,
                    cancelled: skipped.into_inner(),
                };
                info!(
                    succeeded = summary.succeeded,
                    failed = summary.failed,
                    cancelled = summary.cancelled,
                    "batch finished"
                );
                sink.finished(&summary);
                summary
            })?;

        Ok(BatchHandle {
            outcomes: rx,
            cancel,
            dispatcher,
        })
    }

    /// Run `jobs` to completion and collect every outcome.
    pub fn run(
        &self,
        jobs: Vec<AnalysisJob>,
        sink: Arc<dyn ProgressSink>,
    ) -> BatchResult<(Vec<JobOutcome>, BatchSummary)> {
        let handle = self.spawn(jobs, sink)?;
        let outcomes: Vec<JobOutcome> = handle.outcomes().collect();
        let summary = handle.join()?;
        Ok((outcomes, summary))
    }
}

fn job_dir_name(index: usize, name: &str) -> String {
    let safe: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{index:04}_{safe}")
}

fn run_job<S: Solver + ?Sized>(solver: &S, job: AnalysisJob, workdir: &Path) -> JobOutcome {
    if let Err(e) = fs::create_dir_all(workdir) {
        let failure = JobFailure::new(format!("creating scratch directory: {e}"));
        warn!(job = %job.name, reason = %failure, "job failed");
        return JobOutcome::Failure { job, failure };
    }
    let result = solver.analyze(&job, workdir);
    if let Err(e) = fs::remove_dir_all(workdir) {
        debug!(dir = %workdir.display(), error = %e, "job scratch not removed");
    }
    match result {
        Ok(output) => {
            debug!(job = %job.name, points = output.curve.samples().len(), "job succeeded");
            JobOutcome::Success { job, output }
        }
        Err(failure) => {
            warn!(job = %job.name, reason = %failure, "job failed");
            JobOutcome::Failure { job, failure }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_dir_names_are_filesystem_safe() {
        assert_eq!(job_dir_name(3, "NACA 0012/x_Re0.1"), "0003_NACA_0012_x_Re0.1");
    }

    #[test]
    fn cancel_flag_is_shared() {
        let flag = CancelFlag::new();
        let other = flag.clone();
        other.cancel();
        assert!(flag.is_cancelled());
        flag.reset();
        assert!(!other.is_cancelled());
    }

    #[test]
    fn summary_all_failed() {
        let s = BatchSummary {
            total: 2,
            failed: 2,
            ..BatchSummary::default()
        };
        assert!(s.all_failed());
        assert!(!BatchSummary::default().all_failed());
    }
}
