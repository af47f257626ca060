use std::fs;
use std::path::Path;

use epsweep_core::errors::{ErrorInfo, SweepError};
use epsweep_core::provenance::RunProvenance;
use epsweep_core::serde::to_canonical_json_bytes;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Terminal state of one combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Succeeded,
    Failed,
    Skipped,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
            JobStatus::Skipped => "skipped",
        }
    }
}

/// Outcome of one combination of the sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobReport {
    /// Combination identity in declared dimension order.
    pub label: String,
    /// Full parameter assignment including fixed values.
    pub params: Value,
    /// Concrete command line the combination ran (or would have run).
    pub command: String,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Invocation attempts actually made; zero for skipped jobs.
    pub attempts: usize,
    /// Archived artifact paths, empty unless the job succeeded.
    #[serde(default)]
    pub artifacts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate sweep report persisted for reproducibility. Covers every
/// combination, so partial failure is never silent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepReport {
    pub plan_name: String,
    pub plan_hash: String,
    pub provenance: RunProvenance,
    pub jobs: Vec<JobReport>,
    #[serde(default)]
    pub summary: Value,
}

impl SweepReport {
    /// True when no combination failed (skipped-only tails still count as
    /// failures upstream because something had to fail to cause them).
    pub fn all_succeeded(&self) -> bool {
        self.jobs
            .iter()
            .all(|job| job.status == JobStatus::Succeeded)
    }

    pub fn failed_count(&self) -> usize {
        self.jobs
            .iter()
            .filter(|job| job.status == JobStatus::Failed)
            .count()
    }
}

/// Builds the summary block with per-status counts.
pub fn build_summary(jobs: &[JobReport]) -> Value {
    let count = |status: JobStatus| jobs.iter().filter(|job| job.status == status).count();
    json!({
        "total": jobs.len(),
        "succeeded": count(JobStatus::Succeeded),
        "failed": count(JobStatus::Failed),
        "skipped": count(JobStatus::Skipped),
    })
}

/// Persists the report under `out`: `sweep_report.json`, `summary.json`, and
/// one directory per job with its parameters, command line and status.
pub fn persist_report(out: &Path, report: &SweepReport) -> Result<(), SweepError> {
    fs::create_dir_all(out).map_err(|err| persist_io(out, err))?;
    let bytes = to_canonical_json_bytes(report)?;
    fs::write(out.join("sweep_report.json"), bytes).map_err(|err| persist_io(out, err))?;
    let summary_bytes = to_canonical_json_bytes(&report.summary)?;
    fs::write(out.join("summary.json"), summary_bytes).map_err(|err| persist_io(out, err))?;
    for (idx, job) in report.jobs.iter().enumerate() {
        let job_dir = out.join(format!("job_{:04}", idx));
        fs::create_dir_all(&job_dir).map_err(|err| persist_io(&job_dir, err))?;
        let params_bytes = to_canonical_json_bytes(&job.params)?;
        fs::write(job_dir.join("params.json"), params_bytes)
            .map_err(|err| persist_io(&job_dir, err))?;
        fs::write(job_dir.join("COMMAND"), format!("{}\n", job.command))
            .map_err(|err| persist_io(&job_dir, err))?;
        let status = match job.exit_code {
            Some(code) => format!("{}\nexit_code={}\n", job.status.as_str(), code),
            None => format!("{}\n", job.status.as_str()),
        };
        fs::write(job_dir.join("STATUS"), status).map_err(|err| persist_io(&job_dir, err))?;
    }
    Ok(())
}

fn persist_io(path: &Path, err: std::io::Error) -> SweepError {
    SweepError::Io(
        ErrorInfo::new("report-persist", "failed to persist sweep report")
            .with_context("path", path.display().to_string())
            .with_hint(err.to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(status: JobStatus) -> JobReport {
        JobReport {
            label: "epsilon=1.0".to_string(),
            params: json!({"epsilon": "1.0"}),
            command: "true".to_string(),
            status,
            exit_code: matches!(status, JobStatus::Succeeded | JobStatus::Failed).then_some(0),
            attempts: 1,
            artifacts: Vec::new(),
            error: None,
        }
    }

    #[test]
    fn summary_counts_by_status() {
        let jobs = vec![
            job(JobStatus::Succeeded),
            job(JobStatus::Failed),
            job(JobStatus::Skipped),
            job(JobStatus::Succeeded),
        ];
        assert_eq!(
            build_summary(&jobs),
            json!({"total": 4, "succeeded": 2, "failed": 1, "skipped": 1})
        );
    }

    #[test]
    fn report_roundtrips_through_canonical_json() {
        let report = SweepReport {
            plan_name: "gap-edp".to_string(),
            plan_hash: "abc".to_string(),
            provenance: RunProvenance::default(),
            jobs: vec![job(JobStatus::Succeeded)],
            summary: build_summary(&[job(JobStatus::Succeeded)]),
        };
        let bytes = to_canonical_json_bytes(&report).expect("encode");
        let restored: SweepReport =
            epsweep_core::serde::from_json_slice(&bytes).expect("decode");
        assert_eq!(restored, report);
    }
}
