//! Expansion of subjects × Reynolds samples into a deduplicated job list.

use std::collections::{BTreeSet, HashSet};

use tracing::{debug, info};

use crate::error::{BatchError, BatchResult};
use crate::job::{AnalysisConstants, AnalysisJob, SweepRange};

/// Ceiling on `subjects × Reynolds samples` for a single batch.
pub const MAX_BATCH_JOBS: usize = 500;

/// Existence lookup by canonical name, implemented by the shared store.
pub trait NameIndex {
    fn contains_name(&self, name: &str) -> bool;
}

impl NameIndex for HashSet<String> {
    fn contains_name(&self, name: &str) -> bool {
        self.contains(name)
    }
}

impl NameIndex for BTreeSet<String> {
    fn contains_name(&self, name: &str) -> bool {
        self.contains(name)
    }
}

/// Output of [`BatchJobPlanner::plan`].
#[derive(Debug, Clone, Default)]
pub struct BatchPlan {
    pub jobs: Vec<AnalysisJob>,
    /// Combinations skipped because the store already holds their polar
    pub skipped_existing: usize,
}

impl BatchPlan {
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct BatchJobPlanner {
    max_jobs: usize,
}

impl Default for BatchJobPlanner {
    fn default() -> Self {
        Self {
            max_jobs: MAX_BATCH_JOBS,
        }
    }
}

impl BatchJobPlanner {
    pub fn with_limit(max_jobs: usize) -> Self {
        Self { max_jobs }
    }

    pub fn max_jobs(&self) -> usize {
        self.max_jobs
    }

    /// Expand `subjects × reynolds` into jobs, skipping names already in `index`
    /// and repeats within the plan itself.
    ///
    /// The ceiling is checked on the raw cross-product before any job exists,
    /// so an oversized request fails even if most of it is already stored.
    pub fn plan(
        &self,
        subjects: &[String],
        reynolds: &SweepRange,
        alpha: &SweepRange,
        constants: &AnalysisConstants,
        index: &dyn NameIndex,
    ) -> BatchResult<BatchPlan> {
        reynolds.validate("reynolds range")?;
        alpha.validate("alpha range")?;
        if reynolds.min <= 0.0 {
            return Err(BatchError::config(format!(
                "reynolds range must be positive, got min {}",
                reynolds.min
            )));
        }

        let samples = reynolds.sample_count();
        let requested = subjects.len().saturating_mul(samples);
        if requested > self.max_jobs {
            return Err(BatchError::TooManyJobs {
                requested,
                limit: self.max_jobs,
            });
        }

        let mut plan = BatchPlan::default();
        let mut planned = HashSet::new();
        for subject in subjects {
            for re in reynolds.points() {
                let job = AnalysisJob::new(subject.clone(), re, *alpha, *constants);
                if index.contains_name(&job.name) {
                    debug!(name = %job.name, "polar already stored, skipping");
                    plan.skipped_existing += 1;
                    continue;
                }
                if !planned.insert(job.name.clone()) {
                    debug!(name = %job.name, "duplicate combination in request, skipping");
                    continue;
                }
                plan.jobs.push(job);
            }
        }

        info!(
            subjects = subjects.len(),
            reynolds_samples = samples,
            jobs = plan.jobs.len(),
            skipped = plan.skipped_existing,
            "batch planned"
        );
        Ok(plan)
    }
}
