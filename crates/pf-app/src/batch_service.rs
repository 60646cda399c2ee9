//! Plan, execute and merge a batch of analyses.

use std::sync::Arc;
use std::time::Instant;

use pf_batch::{
    AnalysisJob, BatchExecutor, BatchJobPlanner, BatchPlan, BatchSummary, CancelFlag,
    ExecutorOptions, ExternalSolver, JobOutcome, NoProgress, Solver, compute_batch_id,
};
use pf_results::{MergeReport, ResultMerger, SharedStore};
use tracing::info;

use crate::config::BatchConfig;
use crate::error::AppResult;
use crate::progress::{BatchProgressEvent, BatchStage};

/// A job that produced no usable output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedJob {
    pub name: String,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct BatchResponse {
    /// Jobs dispatched after deduplication
    pub planned: usize,
    /// Requested polars already present in the store
    pub skipped_existing: usize,
    pub summary: BatchSummary,
    pub merge: MergeReport,
    pub failures: Vec<FailedJob>,
    pub elapsed_s: f64,
}

type ProgressCb<'a> = Option<&'a mut dyn FnMut(BatchProgressEvent)>;

fn emit(
    progress_cb: &mut ProgressCb<'_>,
    stage: BatchStage,
    started: Instant,
    message: Option<String>,
    jobs: Option<(usize, usize)>,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(BatchProgressEvent {
            stage,
            elapsed_wall_s: started.elapsed().as_secs_f64(),
            message,
            jobs,
        });
    }
}

/// Expand the configuration into jobs, skipping polars the store already has.
pub fn plan_batch(config: &BatchConfig, store: &SharedStore) -> AppResult<BatchPlan> {
    let plan = BatchJobPlanner::default().plan(
        &config.subjects,
        &config.reynolds,
        &config.alpha,
        &config.constants,
        store,
    )?;
    Ok(plan)
}

/// Run a configured batch with the external solver it names.
pub fn run_batch(
    config: &BatchConfig,
    store: &Arc<SharedStore>,
    cancel: &CancelFlag,
    progress_cb: ProgressCb<'_>,
) -> AppResult<BatchResponse> {
    let solver = ExternalSolver::new(config.solver.path.clone()).with_timeout(config.solver.timeout());
    run_batch_with_solver(config, solver, store, cancel, progress_cb)
}

/// Plan, execute on `solver`, and merge into `store`.
///
/// Outcomes are merged once the whole batch has reported. If `cancel` is set
/// by then, nothing is merged.
pub fn run_batch_with_solver<S: Solver + 'static>(
    config: &BatchConfig,
    solver: S,
    store: &Arc<SharedStore>,
    cancel: &CancelFlag,
    mut progress_cb: ProgressCb<'_>,
) -> AppResult<BatchResponse> {
    let started = Instant::now();

    emit(&mut progress_cb, BatchStage::Planning, started, Some("Planning jobs".to_string()), None);
    let plan = plan_batch(config, store)?;
    let planned = plan.jobs.len();
    let skipped_existing = plan.skipped_existing;
    info!(planned, skipped_existing, "batch planned");

    if plan.is_empty() {
        emit(
            &mut progress_cb,
            BatchStage::Completed,
            started,
            Some("Nothing to run".to_string()),
            None,
        );
        return Ok(BatchResponse {
            planned,
            skipped_existing,
            summary: BatchSummary {
                batch_id: compute_batch_id(&[]),
                ..BatchSummary::default()
            },
            merge: MergeReport::default(),
            failures: Vec::new(),
            elapsed_s: started.elapsed().as_secs_f64(),
        });
    }

    emit(
        &mut progress_cb,
        BatchStage::CheckingSolver,
        started,
        Some("Checking solver".to_string()),
        None,
    );
    let options = ExecutorOptions {
        workers: config.workers,
        scratch_root: config
            .scratch_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir),
    };
    let executor = BatchExecutor::new(solver, options)?.with_cancel_flag(cancel.clone());
    let handle = executor.spawn(plan.jobs, Arc::new(NoProgress))?;

    emit(
        &mut progress_cb,
        BatchStage::Running,
        started,
        Some(format!("Running {planned} job(s) on {} worker(s)", executor.workers())),
        Some((0, planned)),
    );
    let mut outcomes = Vec::with_capacity(planned);
    let mut failures = Vec::new();
    for outcome in handle.outcomes() {
        if let JobOutcome::Failure { job, failure } = &outcome {
            failures.push(FailedJob {
                name: job.name.clone(),
                reason: failure.reason.clone(),
            });
        }
        outcomes.push(outcome);
        emit(
            &mut progress_cb,
            BatchStage::Running,
            started,
            None,
            Some((outcomes.len(), planned)),
        );
    }
    let summary = handle.join()?;

    emit(&mut progress_cb, BatchStage::Merging, started, Some("Merging results".to_string()), None);
    let merge = ResultMerger::new(Arc::clone(store))
        .with_cancel_flag(cancel.clone())
        .merge_all(outcomes);

    emit(
        &mut progress_cb,
        BatchStage::Completed,
        started,
        Some("Batch completed".to_string()),
        None,
    );
    Ok(BatchResponse {
        planned,
        skipped_existing,
        summary,
        merge,
        failures,
        elapsed_s: started.elapsed().as_secs_f64(),
    })
}

/// Interactive mode: run one job and merge its outcome as soon as it arrives.
pub fn run_single<S: Solver + 'static>(
    solver: S,
    job: AnalysisJob,
    store: &Arc<SharedStore>,
) -> AppResult<MergeReport> {
    let executor = BatchExecutor::new(
        solver,
        ExecutorOptions {
            workers: Some(1),
            ..ExecutorOptions::default()
        },
    )?;
    let merger = ResultMerger::new(Arc::clone(store)).with_cancel_flag(executor.cancel_flag());
    let handle = executor.spawn(vec![job], Arc::new(NoProgress))?;
    let report = handle.recv().map(|o| merger.merge_one(o)).unwrap_or_default();
    handle.join()?;
    Ok(report)
}
