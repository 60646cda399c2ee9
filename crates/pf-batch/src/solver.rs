//! The external numerical solver collaborator.
//!
//! The batch pipeline only needs "job in, polar out or failure". [`Solver`] is
//! that seam; [`ExternalSolver`] drives an executable through files in the
//! job's scratch directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use pf_polars::{BoundaryLayerRecord, ReferenceCurve};
use tracing::{debug, warn};

use crate::error::{BatchError, BatchResult};
use crate::job::AnalysisJob;
use crate::solver_io;

/// Why one analysis produced no usable output.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{reason}")]
pub struct JobFailure {
    pub reason: String,
}

impl JobFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// A successful analysis: the polar plus any orphaned detail records.
///
/// The output owns its curve until the merger either moves it into the
/// store or drops it.
#[derive(Debug, Clone)]
pub struct SolverOutput {
    pub curve: ReferenceCurve,
    pub details: Vec<BoundaryLayerRecord>,
}

pub trait Solver: Send + Sync {
    /// Confirm the solver can be invoked at all. Called once before dispatch.
    fn check_available(&self) -> BatchResult<()>;

    /// Run one analysis. `workdir` is an empty directory owned by this job.
    fn analyze(&self, job: &AnalysisJob, workdir: &Path) -> Result<SolverOutput, JobFailure>;
}

/// Polling interval while waiting on a solver under a timeout.
const WAIT_POLL: Duration = Duration::from_millis(20);

/// Runs an executable as `<path> <input-file>`.
#[derive(Debug, Clone)]
pub struct ExternalSolver {
    path: PathBuf,
    timeout: Option<Duration>,
}

impl ExternalSolver {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            timeout: None,
        }
    }

    /// Kill the solver and fail the job if it runs longer than `timeout`.
    ///
    /// Without a timeout a hung solver occupies its worker indefinitely.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn unavailable(&self, reason: impl Into<String>) -> BatchError {
        BatchError::SolverUnavailable {
            path: self.path.clone(),
            reason: reason.into(),
        }
    }

    fn wait(&self, job: &AnalysisJob, mut child: std::process::Child) -> Result<(), JobFailure> {
        let status = match self.timeout {
            None => child
                .wait()
                .map_err(|e| JobFailure::new(format!("waiting for solver: {e}")))?,
            Some(limit) => {
                let deadline = Instant::now() + limit;
                loop {
                    match child.try_wait() {
                        Ok(Some(status)) => break status,
                        Ok(None) if Instant::now() >= deadline => {
                            warn!(job = %job.name, timeout_s = limit.as_secs_f64(), "solver timed out, killing");
                            let _ = child.kill();
                            let _ = child.wait();
                            return Err(JobFailure::new(format!(
                                "solver timed out after {:.1}s",
                                limit.as_secs_f64()
                            )));
                        }
                        Ok(None) => thread::sleep(WAIT_POLL),
                        Err(e) => return Err(JobFailure::new(format!("waiting for solver: {e}"))),
                    }
                }
            }
        };
        if status.success() {
            Ok(())
        } else {
            Err(JobFailure::new(format!("solver exited with {status}")))
        }
    }
}

impl Solver for ExternalSolver {
    fn check_available(&self) -> BatchResult<()> {
        let meta = fs::metadata(&self.path).map_err(|e| self.unavailable(e.to_string()))?;
        if !meta.is_file() {
            return Err(self.unavailable("not a regular file"));
        }
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if meta.permissions().mode() & 0o111 == 0 {
                return Err(self.unavailable("not executable"));
            }
        }
        Ok(())
    }

    fn analyze(&self, job: &AnalysisJob, workdir: &Path) -> Result<SolverOutput, JobFailure> {
        let input_path = workdir.join("analysis.in");
        let polar_path = workdir.join("polar.out");
        let details_path = job
            .constants
            .keep_details
            .then(|| workdir.join("details.out"));

        let input = solver_io::input_description(job, &polar_path, details_path.as_deref());
        fs::write(&input_path, input)
            .map_err(|e| JobFailure::new(format!("writing solver input: {e}")))?;

        debug!(job = %job.name, solver = %self.path.display(), "launching solver");
        let child = Command::new(&self.path)
            .arg(&input_path)
            .current_dir(workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| JobFailure::new(format!("launching solver: {e}")))?;
        self.wait(job, child)?;

        let polar_text = fs::read_to_string(&polar_path)
            .map_err(|e| JobFailure::new(format!("reading solver polar: {e}")))?;
        let curve = solver_io::parse_polar(job, &polar_text)?;

        let details = match &details_path {
            Some(path) if path.exists() => {
                let text = fs::read_to_string(path)
                    .map_err(|e| JobFailure::new(format!("reading solver details: {e}")))?;
                solver_io::parse_details(job, &text)?
            }
            _ => Vec::new(),
        };

        Ok(SolverOutput { curve, details })
    }
}
