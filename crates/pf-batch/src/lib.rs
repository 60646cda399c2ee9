//! pf-batch: planning and parallel execution of external polar analyses.
//!
//! Provides:
//! - `SweepRange`, `AnalysisJob` and canonical polar naming
//! - `BatchJobPlanner`: subjects × Reynolds expansion with dedup and a job ceiling
//! - `Solver` seam and the `ExternalSolver` process collaborator
//! - `BatchExecutor`: bounded rayon pool, progress sink, cooperative cancellation
//!
//! Workers never touch the shared store; they stream `JobOutcome`s for the
//! merger to commit.

pub mod error;
pub mod executor;
pub mod hash;
pub mod job;
pub mod planner;
pub mod solver;
pub mod solver_io;

// Re-exports for ergonomics
pub use error::{BatchError, BatchResult};
pub use executor::{
    BatchExecutor, BatchHandle, BatchSummary, CancelFlag, ExecutorOptions, JobOutcome,
    NoProgress, ProgressSink, default_workers,
};
pub use hash::compute_batch_id;
pub use job::{AnalysisConstants, AnalysisJob, SweepRange, canonical_name};
pub use planner::{BatchJobPlanner, BatchPlan, MAX_BATCH_JOBS, NameIndex};
pub use solver::{ExternalSolver, JobFailure, Solver, SolverOutput};
