//! Folds finished batch outcomes into the shared store.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use pf_batch::{CancelFlag, JobOutcome, SolverOutput};
use pf_polars::BoundaryLayerRecord;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::store::SharedStore;

/// What one merge did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeReport {
    pub inserted: usize,
    /// Successful outcomes whose name was already in the store
    pub duplicates_discarded: usize,
    pub failures: usize,
    pub details_inserted: usize,
    pub details_discarded: usize,
    /// Outcomes dropped because cancellation was requested
    pub cancelled_discarded: usize,
}

impl MergeReport {
    pub fn changed(&self) -> bool {
        self.inserted > 0
    }
}

impl fmt::Display for MergeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} inserted, {} duplicate(s) discarded, {} failure(s), {} detail record(s) inserted, {} discarded",
            self.inserted,
            self.duplicates_discarded,
            self.failures,
            self.details_inserted,
            self.details_discarded,
        )?;
        if self.cancelled_discarded > 0 {
            write!(f, ", {} cancelled", self.cancelled_discarded)?;
        }
        Ok(())
    }
}

/// The only writer of batch results into a [`SharedStore`].
///
/// Merges exclude each other. Each job is committed under one write lock, so
/// readers see either none or all of a job (its polar and its detail records).
/// Once every outcome is processed the store is reordered, the newly inserted
/// polars are colored in display order, and subscribers get one notification.
/// The end state depends only on the set of outcomes, not their arrival order,
/// as long as no two successful outcomes share a canonical name.
pub struct ResultMerger {
    store: Arc<SharedStore>,
    cancel: Option<CancelFlag>,
}

impl ResultMerger {
    pub fn new(store: Arc<SharedStore>) -> Self {
        Self {
            store,
            cancel: None,
        }
    }

    /// Discard outcomes while `flag` is set.
    pub fn with_cancel_flag(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn store(&self) -> &Arc<SharedStore> {
        &self.store
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled)
    }

    /// Merge one batch worth of outcomes.
    pub fn merge_all<I>(&self, outcomes: I) -> MergeReport
    where
        I: IntoIterator<Item = JobOutcome>,
    {
        let _merge = self.store.merge_guard();
        let mut report = MergeReport::default();
        let mut inserted = HashSet::new();

        for outcome in outcomes {
            if self.cancelled() {
                debug!(job = %outcome.job().name, "cancelled, outcome discarded");
                report.cancelled_discarded += 1;
                continue;
            }
            match outcome {
                JobOutcome::Failure { job, failure } => {
                    warn!(job = %job.name, %failure, "analysis failed");
                    report.failures += 1;
                }
                JobOutcome::Success { output, .. } => {
                    if let Some(name) = self.commit(output, &mut report) {
                        inserted.insert(name);
                    }
                }
            }
        }

        if !inserted.is_empty() {
            let revision = {
                let mut inner = self.store.write();
                inner.recolor(&inserted);
                inner.reorder();
                inner.bump_revision()
            };
            self.store.notify(revision);
        }

        info!(%report, "merge finished");
        report
    }

    /// Interactive single-job mode: merge one outcome as soon as it arrives.
    pub fn merge_one(&self, outcome: JobOutcome) -> MergeReport {
        self.merge_all(std::iter::once(outcome))
    }

    /// Insert one job's polar and records. Returns the polar name if it was new.
    fn commit(&self, output: SolverOutput, report: &mut MergeReport) -> Option<String> {
        let SolverOutput { curve, details } = output;
        let name = curve.name().to_string();
        let mut inner = self.store.write();

        if !inner.insert_curve(curve, None) {
            debug!(%name, records = details.len(), "name exists, duplicate discarded");
            report.duplicates_discarded += 1;
            report.details_discarded += details.len();
            return None;
        }
        report.inserted += 1;

        for mut record in details {
            let record_name = BoundaryLayerRecord::canonical_name(&name, record.alpha);
            if inner.contains_detail(&record_name) {
                debug!(record = %record_name, "detail record exists, discarded");
                report.details_discarded += 1;
                continue;
            }
            record.reparent(&name);
            inner.insert_detail(record);
            report.details_inserted += 1;
        }
        debug!(%name, "polar merged");
        Some(name)
    }
}
