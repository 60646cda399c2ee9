//! End-to-end tests of the plan/execute/merge pipeline with an in-process solver.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use pf_app::*;
use pf_batch::{
    AnalysisConstants, AnalysisJob, BatchError, BatchResult, CancelFlag, JobFailure, Solver,
    SolverOutput, SweepRange, canonical_name, solver_io,
};
use pf_polars::BoundaryLayerRecord;
use pf_results::SharedStore;

/// cl = 0.1 alpha + Re / 1e6; fails on `fail_subject`.
struct LinearSolver {
    fail_subject: Option<String>,
}

impl Solver for LinearSolver {
    fn check_available(&self) -> BatchResult<()> {
        Ok(())
    }

    fn analyze(&self, job: &AnalysisJob, _workdir: &Path) -> Result<SolverOutput, JobFailure> {
        if self.fail_subject.as_deref() == Some(job.subject.as_str()) {
            return Err(JobFailure::new("solver diverged"));
        }
        let text: String = job
            .alpha
            .points()
            .iter()
            .map(|a| format!("{a} {} 0.01 -0.05\n", 0.1 * a + job.reynolds / 1e6))
            .collect();
        let curve = solver_io::parse_polar(job, &text)?;
        let details = if job.constants.keep_details {
            job.alpha
                .points()
                .iter()
                .map(|&a| BoundaryLayerRecord::new("bl", job.reynolds, a, vec![], vec![]))
                .collect()
        } else {
            Vec::new()
        };
        Ok(SolverOutput { curve, details })
    }
}

fn config(scratch: &Path) -> BatchConfig {
    BatchConfig {
        solver: SolverConfig {
            path: PathBuf::from("/unused"),
            timeout_s: None,
        },
        store: scratch.join("polars.json"),
        subjects: vec!["NACA0012".to_string(), "NACA2412".to_string()],
        reynolds: SweepRange::new(1e5, 4e5, 1e5).unwrap(),
        alpha: SweepRange::new(-4.0, 8.0, 2.0).unwrap(),
        constants: AnalysisConstants {
            keep_details: true,
            ..AnalysisConstants::default()
        },
        workers: Some(3),
        scratch_dir: Some(scratch.to_path_buf()),
    }
}

fn ok_solver() -> LinearSolver {
    LinearSolver { fail_subject: None }
}

#[test]
fn batch_runs_merges_and_reports_stages() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let store = Arc::new(SharedStore::new());
    let mut events = Vec::new();

    let response = run_batch_with_solver(
        &config,
        ok_solver(),
        &store,
        &CancelFlag::new(),
        Some(&mut |e| events.push(e)),
    )
    .unwrap();

    assert_eq!(response.planned, 8);
    assert_eq!(response.summary.succeeded, 8);
    assert_eq!(response.merge.inserted, 8);
    assert_eq!(response.merge.details_inserted, 8 * 7);
    assert!(response.failures.is_empty());
    assert_eq!(store.len(), 8);

    for stage in [
        BatchStage::Planning,
        BatchStage::CheckingSolver,
        BatchStage::Running,
        BatchStage::Merging,
        BatchStage::Completed,
    ] {
        assert!(events.iter().any(|e| e.stage == stage), "missing {stage:?}");
    }
    let last_running = events
        .iter()
        .filter_map(|e| e.jobs)
        .last()
        .unwrap();
    assert_eq!(last_running, (8, 8));
}

#[test]
fn second_run_plans_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let store = Arc::new(SharedStore::new());
    run_batch_with_solver(&config, ok_solver(), &store, &CancelFlag::new(), None).unwrap();
    let rx = store.subscribe();

    let again =
        run_batch_with_solver(&config, ok_solver(), &store, &CancelFlag::new(), None).unwrap();
    assert_eq!(again.planned, 0);
    assert_eq!(again.skipped_existing, 8);
    assert_eq!(again.merge.inserted, 0);
    assert_eq!(store.len(), 8);
    assert!(rx.try_recv().is_err());
}

#[test]
fn failures_are_listed_and_successes_kept() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let store = Arc::new(SharedStore::new());
    let solver = LinearSolver {
        fail_subject: Some("NACA2412".to_string()),
    };

    let response =
        run_batch_with_solver(&config, solver, &store, &CancelFlag::new(), None).unwrap();
    assert_eq!(response.summary.failed, 4);
    assert_eq!(response.merge.failures, 4);
    assert_eq!(response.failures.len(), 4);
    assert!(response.failures.iter().all(|f| f.reason == "solver diverged"));
    assert!(!response.summary.all_failed());
    assert_eq!(store.curves_for_subject("NACA0012").len(), 4);
    assert!(store.curves_for_subject("NACA2412").is_empty());
}

#[test]
fn cancelled_batch_merges_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let store = Arc::new(SharedStore::new());
    let cancel = CancelFlag::new();
    cancel.cancel();

    let response = run_batch_with_solver(&config, ok_solver(), &store, &cancel, None).unwrap();
    assert_eq!(response.summary.cancelled, 8);
    assert_eq!(response.merge.inserted, 0);
    assert!(store.is_empty());
}

#[test]
fn oversized_batch_is_rejected_before_running() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path());
    config.reynolds = SweepRange::new(1e4, 3e6, 1e4).unwrap();
    let store = Arc::new(SharedStore::new());

    let err = run_batch_with_solver(&config, ok_solver(), &store, &CancelFlag::new(), None)
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Batch(BatchError::TooManyJobs { limit: 500, .. })
    ));
    assert!(store.is_empty());
}

#[test]
fn missing_solver_aborts_batch() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path());
    config.solver.path = dir.path().join("no-such-solver");
    let store = Arc::new(SharedStore::new());

    let err = run_batch(&config, &store, &CancelFlag::new(), None).unwrap_err();
    assert!(matches!(
        err,
        AppError::Batch(BatchError::SolverUnavailable { .. })
    ));
    assert!(store.is_empty());
}

#[test]
fn stored_results_answer_queries() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    {
        let store = Arc::new(SharedStore::new());
        run_batch_with_solver(&config, ok_solver(), &store, &CancelFlag::new(), None).unwrap();
        save_store(&config.store, &store).unwrap();
    }

    let store = load_store(&config.store).unwrap();
    assert_eq!(store.len(), 8);

    // linear in Re between 2e5 and 3e5
    let c = query_reynolds(&store, "NACA0012", 0.0, 9.0, 2.0, 2.5e5).unwrap();
    assert!((c.cl - (0.2 + 0.25)).abs() < 1e-12);
    // clamped above the family
    let c = query_reynolds(&store, "NACA0012", 0.0, 9.0, 0.0, 9e6).unwrap();
    assert!((c.cl - 0.4).abs() < 1e-12);

    assert!(matches!(
        query_reynolds(&store, "NACA0012", 0.3, 9.0, 0.0, 1e5),
        Err(AppError::PolarNotFound(_))
    ));
}

#[test]
fn control_surface_from_stored_polars() {
    let dir = tempfile::tempdir().unwrap();
    let config = config(dir.path());
    let store = Arc::new(SharedStore::new());
    run_batch_with_solver(&config, ok_solver(), &store, &CancelFlag::new(), None).unwrap();

    let name = |subject: &str, re: f64| canonical_name(subject, re, 0.0, 9.0);
    let def = ControlSurfaceDef {
        pos_a: 0.0,
        pos_b: 1.0,
        side_a: vec![
            DeflectionStateDef {
                deflection: -10.0,
                pitch_offset: 0.0,
                curves: vec![name("NACA0012", 1e5), name("NACA0012", 2e5)],
            },
            DeflectionStateDef {
                deflection: 10.0,
                pitch_offset: 0.0,
                curves: vec![name("NACA0012", 3e5), name("NACA0012", 4e5)],
            },
        ],
        side_b: vec![DeflectionStateDef {
            deflection: 0.0,
            pitch_offset: -2.0,
            curves: vec![name("NACA2412", 1e5), name("NACA2412", 2e5)],
        }],
    };
    let mut ctx = build_control_surface(&def, &store).unwrap();

    let query = FlapQuery {
        alpha: 2.0,
        span: 0.5,
        reynolds: 1.5e5,
        deflection: Some(0.0),
        dt_s: 0.1,
    };
    let answer = query_flap(&mut ctx, &query).unwrap();
    // side A at β = 0 sits halfway between 0.35 and 0.5 (Re clamped to 3e5);
    // side B sees α + 2, so 0.4 + 0.15
    assert!((answer.coefficients.cl - 0.5 * (0.425 + 0.55)).abs() < 1e-12);
    // only side A depends on β: 0.15 over 20 deg, halved by the span blend
    assert!((answer.beta_slope - 0.00375).abs() < 1e-12);

    let answer = query_flap(
        &mut ctx,
        &FlapQuery {
            deflection: Some(2.0),
            ..query
        },
    )
    .unwrap();
    assert!((answer.motion.state - 2.0).abs() < 1e-12);
    assert!((answer.motion.state_dt - 20.0).abs() < 1e-9);
    assert!((answer.motion.state_dt_dt - 200.0).abs() < 1e-6);

    let mut bad = def.clone();
    bad.side_b[0].curves.push("missing".to_string());
    assert!(matches!(
        build_control_surface(&bad, &store),
        Err(AppError::PolarNotFound(n)) if n == "missing"
    ));
}

#[test]
fn single_job_mode_merges_once() {
    let store = Arc::new(SharedStore::new());
    let job = AnalysisJob::new(
        "E387",
        2e5,
        SweepRange::new(0.0, 4.0, 2.0).unwrap(),
        AnalysisConstants::default(),
    );
    let report = run_single(ok_solver(), job.clone(), &store).unwrap();
    assert_eq!(report.inserted, 1);
    assert!(store.exists(&job.name));

    let report = run_single(ok_solver(), job, &store).unwrap();
    assert_eq!(report.duplicates_discarded, 1);
    assert_eq!(store.len(), 1);
}
