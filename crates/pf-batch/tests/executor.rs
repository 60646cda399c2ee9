//! Integration tests for batch execution with in-process solvers.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use pf_batch::*;

/// Solver that answers from a formula, failing on selected Reynolds numbers.
struct FormulaSolver {
    fail_reynolds: Vec<f64>,
    calls: AtomicUsize,
    cancel_on_first: Option<CancelFlag>,
}

impl FormulaSolver {
    fn new() -> Self {
        Self {
            fail_reynolds: Vec::new(),
            calls: AtomicUsize::new(0),
            cancel_on_first: None,
        }
    }
}

impl Solver for FormulaSolver {
    fn check_available(&self) -> BatchResult<()> {
        Ok(())
    }

    fn analyze(&self, job: &AnalysisJob, workdir: &Path) -> Result<SolverOutput, JobFailure> {
        assert!(workdir.is_dir());
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(flag) = &self.cancel_on_first {
            flag.cancel();
        }
        if self.fail_reynolds.contains(&job.reynolds) {
            return Err(JobFailure::new("no convergence"));
        }
        let lift = 0.5 + job.reynolds / 1e7;
        let text = format!("0.0 0.0 0.01 0.0\n5.0 {lift} 0.012 -0.02\n");
        let curve = solver_io::parse_polar(job, &text)?;
        Ok(SolverOutput {
            curve,
            details: Vec::new(),
        })
    }
}

struct Unavailable;

impl Solver for Unavailable {
    fn check_available(&self) -> BatchResult<()> {
        Err(BatchError::SolverUnavailable {
            path: "/missing".into(),
            reason: "not found".to_string(),
        })
    }

    fn analyze(&self, _job: &AnalysisJob, _workdir: &Path) -> Result<SolverOutput, JobFailure> {
        panic!("must not be dispatched");
    }
}

fn jobs(n: usize) -> Vec<AnalysisJob> {
    let subjects = vec!["NACA0012".to_string()];
    BatchJobPlanner::default()
        .plan(
            &subjects,
            &SweepRange::new(1e5, 1e5 * n as f64, 1e5).unwrap(),
            &SweepRange::new(0.0, 5.0, 5.0).unwrap(),
            &AnalysisConstants::default(),
            &HashSet::new(),
        )
        .unwrap()
        .jobs
}

fn options(workers: usize, scratch: &Path) -> ExecutorOptions {
    ExecutorOptions {
        workers: Some(workers),
        scratch_root: scratch.to_path_buf(),
    }
}

#[test]
fn every_job_reports_exactly_once() {
    let scratch = tempfile::tempdir().unwrap();
    let executor = BatchExecutor::new(FormulaSolver::new(), options(4, scratch.path())).unwrap();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink_seen = Arc::clone(&seen);
    let sink: Arc<dyn ProgressSink> = Arc::new(move |done: usize, total: usize| {
        sink_seen.lock().unwrap().push((done, total));
    });

    let (outcomes, summary) = executor.run(jobs(8), sink).unwrap();
    assert_eq!(outcomes.len(), 8);
    assert_eq!(summary.total, 8);
    assert_eq!(summary.succeeded, 8);
    assert_eq!(summary.failed, 0);

    let names: HashSet<String> = outcomes.iter().map(|o| o.job().name.clone()).collect();
    assert_eq!(names.len(), 8);

    let mut counts: Vec<usize> = seen.lock().unwrap().iter().map(|(d, _)| *d).collect();
    counts.sort_unstable();
    assert_eq!(counts, (1..=8).collect::<Vec<_>>());
    assert!(seen.lock().unwrap().iter().all(|(_, t)| *t == 8));
}

#[test]
fn job_failure_does_not_abort_siblings() {
    let scratch = tempfile::tempdir().unwrap();
    let mut solver = FormulaSolver::new();
    solver.fail_reynolds = vec![2e5, 4e5];
    let executor = BatchExecutor::new(solver, options(2, scratch.path())).unwrap();

    let (outcomes, summary) = executor.run(jobs(5), Arc::new(NoProgress)).unwrap();
    assert_eq!(outcomes.len(), 5);
    assert_eq!(summary.succeeded, 3);
    assert_eq!(summary.failed, 2);
    assert!(!summary.all_failed());
    let failed: Vec<f64> = outcomes
        .iter()
        .filter(|o| !o.is_success())
        .map(|o| o.job().reynolds)
        .collect();
    assert_eq!(failed.len(), 2);
}

#[test]
fn cancellation_stops_dispatch_but_not_running_job() {
    let scratch = tempfile::tempdir().unwrap();
    let flag = CancelFlag::new();
    let mut solver = FormulaSolver::new();
    solver.cancel_on_first = Some(flag.clone());
    let executor = BatchExecutor::new(solver, options(1, scratch.path()))
        .unwrap()
        .with_cancel_flag(flag);

    let (outcomes, summary) = executor.run(jobs(6), Arc::new(NoProgress)).unwrap();
    assert_eq!(outcomes.len(), 1);
    assert!(outcomes[0].is_success());
    assert_eq!(summary.succeeded, 1);
    assert_eq!(summary.cancelled, 5);
    assert_eq!(executor.solver().calls.load(Ordering::SeqCst), 1);
}

#[test]
fn unavailable_solver_aborts_before_dispatch() {
    let scratch = tempfile::tempdir().unwrap();
    let executor = BatchExecutor::new(Unavailable, options(2, scratch.path())).unwrap();
    let err = executor.run(jobs(3), Arc::new(NoProgress)).unwrap_err();
    assert!(matches!(err, BatchError::SolverUnavailable { .. }));
}

#[test]
fn streaming_handle_yields_outcomes() {
    let scratch = tempfile::tempdir().unwrap();
    let executor = BatchExecutor::new(FormulaSolver::new(), options(2, scratch.path())).unwrap();
    let handle = executor.spawn(jobs(3), Arc::new(NoProgress)).unwrap();
    let mut received = 0;
    while let Some(outcome) = handle.recv() {
        assert!(outcome.is_success());
        received += 1;
    }
    let summary = handle.join().unwrap();
    assert_eq!(received, 3);
    assert_eq!(summary.total, 3);
    assert_eq!(summary.batch_id.len(), 64);
}

#[cfg(unix)]
mod external {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::time::Duration;

    /// Writes a fake solver script that reads its output paths from the input file.
    fn script(dir: &Path, body: &str) -> std::path::PathBuf {
        let path = dir.join("fake-solver.sh");
        let text = format!(
            "#!/bin/sh\npolar=$(sed -n 's/^polar_output = //p' \"$1\")\ndetails=$(sed -n 's/^details_output = //p' \"$1\")\n{body}\n"
        );
        fs::write(&path, text).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[test]
    fn external_solver_round_trip_with_details() {
        let bin = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();
        let path = script(
            bin.path(),
            "printf '0.0 0.0 0.008 0.0\\n4.0 0.44 0.010 -0.01\\n' > \"$polar\"\n\
             if [ -n \"$details\" ]; then printf 'alpha 4.0\\ntop 0.5 1.1 0.002 0.001 0.003 2.0 -0.3\\n' > \"$details\"; fi",
        );
        let solver = ExternalSolver::new(&path);
        solver.check_available().unwrap();

        let constants = AnalysisConstants {
            keep_details: true,
            ..AnalysisConstants::default()
        };
        let job = AnalysisJob::new("NACA0012", 5e5, SweepRange::new(0.0, 4.0, 4.0).unwrap(), constants);
        let executor = BatchExecutor::new(solver, options(1, scratch.path())).unwrap();
        let (outcomes, summary) = executor.run(vec![job], Arc::new(NoProgress)).unwrap();

        assert_eq!(summary.succeeded, 1);
        match &outcomes[0] {
            JobOutcome::Success { output, .. } => {
                assert_eq!(output.curve.samples().len(), 2);
                assert_eq!(output.details.len(), 1);
                assert_eq!(output.details[0].top.len(), 1);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn failing_and_hung_solvers_become_job_failures() {
        let bin = tempfile::tempdir().unwrap();
        let scratch = tempfile::tempdir().unwrap();

        let failing = ExternalSolver::new(script(bin.path(), "exit 3"));
        let executor = BatchExecutor::new(failing, options(1, scratch.path())).unwrap();
        let (_, summary) = executor.run(jobs(1), Arc::new(NoProgress)).unwrap();
        assert_eq!(summary.failed, 1);

        let hung_dir = tempfile::tempdir().unwrap();
        let hung = ExternalSolver::new(script(hung_dir.path(), "sleep 5"))
            .with_timeout(Some(Duration::from_millis(200)));
        let executor = BatchExecutor::new(hung, options(1, scratch.path())).unwrap();
        let (outcomes, summary) = executor.run(jobs(1), Arc::new(NoProgress)).unwrap();
        assert_eq!(summary.failed, 1);
        match &outcomes[0] {
            JobOutcome::Failure { failure, .. } => assert!(failure.reason.contains("timed out")),
            other => panic!("unexpected outcome {other:?}"),
        }
    }
}
