//! Text exchange with the external solver.
//!
//! The input description is a `key = value` list. The solver answers with a
//! whitespace table of `alpha cl cd cm` rows and, when detail records were
//! requested, a block file where each `alpha <deg>` line opens a record and
//! `top`/`bottom` lines carry `x ue dstar theta cf h cp` stations. Lines
//! starting with `#` are comments in both outputs.

use std::fmt::Write as _;
use std::path::Path;

use pf_polars::{
    BoundaryLayerRecord, FlowConditions, PolarSample, ReferenceCurve, StationSample,
};

use crate::job::AnalysisJob;
use crate::solver::JobFailure;

/// Render the input description for `job`.
pub fn input_description(job: &AnalysisJob, polar_path: &Path, details_path: Option<&Path>) -> String {
    let c = &job.constants;
    let mut out = String::new();
    // writing to a String cannot fail
    let _ = writeln!(out, "# polarflow analysis input");
    let _ = writeln!(out, "name = {}", job.name);
    let _ = writeln!(out, "subject = {}", job.subject);
    let _ = writeln!(out, "reynolds = {}", job.reynolds);
    let _ = writeln!(out, "mach = {}", c.mach);
    let _ = writeln!(out, "ncrit = {}", c.ncrit);
    let _ = writeln!(out, "xtr_top = {}", c.xtr_top);
    let _ = writeln!(out, "xtr_bot = {}", c.xtr_bot);
    let _ = writeln!(out, "alpha_min = {}", job.alpha.min);
    let _ = writeln!(out, "alpha_max = {}", job.alpha.max);
    let _ = writeln!(out, "alpha_step = {}", job.alpha.step);
    let _ = writeln!(out, "polar_output = {}", polar_path.display());
    if let Some(path) = details_path {
        let _ = writeln!(out, "details_output = {}", path.display());
    }
    out
}

fn data_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty() && !l.starts_with('#'))
}

fn parse_numbers<const N: usize>(fields: &[&str], line_no: usize) -> Result<[f64; N], JobFailure> {
    if fields.len() < N {
        return Err(JobFailure::new(format!(
            "line {line_no}: expected {N} values, found {}",
            fields.len()
        )));
    }
    let mut values = [0.0; N];
    for (slot, field) in values.iter_mut().zip(fields) {
        *slot = field
            .parse()
            .map_err(|_| JobFailure::new(format!("line {line_no}: '{field}' is not a number")))?;
    }
    Ok(values)
}

/// Parse a polar table into a curve named after `job`.
///
/// Rows are sorted by angle of attack and repeated angles keep their first
/// occurrence, since solvers revisit angles when restarting from a
/// converged point.
pub fn parse_polar(job: &AnalysisJob, text: &str) -> Result<ReferenceCurve, JobFailure> {
    let mut samples = Vec::new();
    for (line_no, line) in data_lines(text) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        let [alpha, cl, cd, cm] = parse_numbers::<4>(&fields, line_no)?;
        samples.push(PolarSample::new(alpha, cl, cd, cm));
    }
    if samples.is_empty() {
        return Err(JobFailure::new("solver produced no converged points"));
    }
    samples.sort_by(|a, b| a.alpha.total_cmp(&b.alpha));
    samples.dedup_by(|b, a| a.alpha == b.alpha);

    let conditions = FlowConditions {
        reynolds: job.reynolds,
        mach: job.constants.mach,
        ncrit: job.constants.ncrit,
        xtr_top: job.constants.xtr_top,
        xtr_bot: job.constants.xtr_bot,
    };
    ReferenceCurve::new(job.name.clone(), job.subject.clone(), conditions, samples)
        .map_err(|e| JobFailure::new(e.to_string()))
}

/// Parse boundary-layer detail blocks. Records come back orphaned.
pub fn parse_details(job: &AnalysisJob, text: &str) -> Result<Vec<BoundaryLayerRecord>, JobFailure> {
    let mut records: Vec<BoundaryLayerRecord> = Vec::new();
    for (line_no, line) in data_lines(text) {
        let fields: Vec<&str> = line.split_whitespace().collect();
        match fields[0] {
            "alpha" => {
                let [alpha] = parse_numbers::<1>(&fields[1..], line_no)?;
                records.push(BoundaryLayerRecord::new(
                    BoundaryLayerRecord::canonical_name(&job.name, alpha),
                    job.reynolds,
                    alpha,
                    Vec::new(),
                    Vec::new(),
                ));
            }
            side @ ("top" | "bottom") => {
                let [x, ue, dstar, theta, cf, h, cp] = parse_numbers::<7>(&fields[1..], line_no)?;
                let station = StationSample {
                    x,
                    ue,
                    dstar,
                    theta,
                    cf,
                    h,
                    cp,
                };
                let record = records.last_mut().ok_or_else(|| {
                    JobFailure::new(format!("line {line_no}: station before any 'alpha' line"))
                })?;
                if side == "top" {
                    record.top.push(station);
                } else {
                    record.bottom.push(station);
                }
            }
            other => {
                return Err(JobFailure::new(format!(
                    "line {line_no}: unknown record tag '{other}'"
                )));
            }
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{AnalysisConstants, SweepRange};
    use std::path::PathBuf;

    fn job() -> AnalysisJob {
        AnalysisJob::new(
            "NACA0012",
            5e5,
            SweepRange::new(0.0, 4.0, 2.0).unwrap(),
            AnalysisConstants::default(),
        )
    }

    #[test]
    fn input_description_lists_conditions() {
        let text = input_description(&job(), &PathBuf::from("/tmp/p.out"), None);
        assert!(text.contains("reynolds = 500000"));
        assert!(text.contains("alpha_step = 2"));
        assert!(text.contains("polar_output = /tmp/p.out"));
        assert!(!text.contains("details_output"));
    }

    #[test]
    fn polar_rows_are_sorted_and_deduplicated() {
        let text = "# alpha cl cd cm\n4.0 0.44 0.011 -0.01\n0.0 0.0 0.008 0.0\n\n2.0 0.22 0.009 -0.005\n2.0 0.23 0.009 -0.005\n";
        let curve = parse_polar(&job(), text).unwrap();
        let alphas: Vec<f64> = curve.samples().iter().map(|s| s.alpha).collect();
        assert_eq!(alphas, vec![0.0, 2.0, 4.0]);
        assert_eq!(curve.samples()[1].cl, 0.22);
        assert_eq!(curve.name(), "NACA0012_Re0.500_M0.00_N9.0");
        assert_eq!(curve.reynolds(), 5e5);
    }

    #[test]
    fn empty_or_malformed_polar_fails() {
        assert!(parse_polar(&job(), "# nothing converged\n").is_err());
        let err = parse_polar(&job(), "1.0 0.1 abc 0.0\n").unwrap_err();
        assert!(err.reason.contains("line 1"));
    }

    #[test]
    fn detail_blocks_become_orphan_records() {
        let text = "alpha 2.0\ntop 0.1 1.2 0.001 0.0005 0.004 2.0 -0.4\nbottom 0.1 0.9 0.001 0.0005 0.003 2.1 0.2\nalpha 4.0\ntop 0.1 1.3 0.001 0.0005 0.004 2.0 -0.6\n";
        let records = parse_details(&job(), text).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.parent.is_none()));
        assert_eq!(records[0].top.len(), 1);
        assert_eq!(records[0].bottom.len(), 1);
        assert_eq!(records[1].alpha, 4.0);
        assert_eq!(records[1].name, "NACA0012_Re0.500_M0.00_N9.0_a4.000");
    }

    #[test]
    fn station_before_alpha_fails() {
        let text = "top 0.1 1.2 0.001 0.0005 0.004 2.0 -0.4\n";
        assert!(parse_details(&job(), text).is_err());
    }
}
