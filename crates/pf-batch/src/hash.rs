//! Content-based hashing for batch IDs.

use sha2::{Digest, Sha256};

use crate::job::AnalysisJob;

/// Digest of the planned jobs, stable for identical plans.
pub fn compute_batch_id(jobs: &[AnalysisJob]) -> String {
    let mut hasher = Sha256::new();
    for job in jobs {
        let job_json = serde_json::to_string(job).unwrap_or_default();
        hasher.update(job_json.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}
