use epsweep_core::errors::{ErrorInfo, SweepError};
use epsweep_core::provenance::RunProvenance;
use tracing::{error, info};

use crate::archive::archive_outputs;
use crate::exec::{run_with_retry, Invocation};
use crate::grid::{expand_grid, Combination};
use crate::hash::stable_hash_string;
use crate::plan::{FailurePolicy, SweepPlan};
use crate::report::{build_summary, JobReport, JobStatus, SweepReport};

/// Executes the sweep described by the plan: validates it, enumerates the
/// Cartesian product in deterministic order, runs one trainer invocation per
/// combination strictly serially, and archives each run's artifacts before
/// the next run can overwrite them.
///
/// Configuration problems fail fast before anything is spawned. Trainer
/// failures are governed by the plan's `on_failure` policy; artifact
/// failures (missing output, destination collision) always stop the sweep
/// with the remaining combinations marked skipped. The returned report
/// covers every combination.
pub fn run_sweep(plan: &SweepPlan) -> Result<SweepReport, SweepError> {
    plan.validate()?;
    let plan_hash = stable_hash_string(plan)?;
    let provenance = RunProvenance::capture();
    let combinations = expand_grid(&plan.dimensions, &plan.fixed);
    info!(
        plan = %plan.name,
        combinations = combinations.len(),
        "starting sweep"
    );

    let mut jobs: Vec<JobReport> = Vec::with_capacity(combinations.len());
    let mut stop = false;
    for (idx, combination) in combinations.iter().enumerate() {
        let invocation = Invocation::from_spec(&plan.command, combination)?;
        if stop {
            jobs.push(skipped_job(combination, &invocation));
            continue;
        }
        info!(
            job = idx,
            combination = %combination.label(),
            command = %invocation.command_line(),
            "running combination"
        );
        match run_with_retry(&invocation, &plan.policy.retry) {
            Ok(outcome) if outcome.success => {
                match archive_outputs(&plan.outputs, combination) {
                    Ok(archived) => {
                        jobs.push(JobReport {
                            label: combination.label(),
                            params: combination.params_value(),
                            command: invocation.command_line(),
                            status: JobStatus::Succeeded,
                            exit_code: Some(outcome.exit_code),
                            attempts: outcome.attempts,
                            artifacts: archived
                                .iter()
                                .map(|path| path.display().to_string())
                                .collect(),
                            error: None,
                        });
                    }
                    Err(err) => {
                        // Archiving errors poison the matrix; never continue past them.
                        error!(combination = %combination.label(), %err, "archiving failed");
                        jobs.push(JobReport {
                            label: combination.label(),
                            params: combination.params_value(),
                            command: invocation.command_line(),
                            status: JobStatus::Failed,
                            exit_code: Some(outcome.exit_code),
                            attempts: outcome.attempts,
                            artifacts: Vec::new(),
                            error: Some(err.to_string()),
                        });
                        stop = true;
                    }
                }
            }
            Ok(outcome) => {
                let failure = SweepError::Process(
                    ErrorInfo::new("trainer-failed", "external trainer exited with failure")
                        .with_context("combination", combination.label())
                        .with_context("exit_code", outcome.exit_code.to_string()),
                );
                error!(
                    combination = %combination.label(),
                    exit_code = outcome.exit_code,
                    attempts = outcome.attempts,
                    "combination failed"
                );
                jobs.push(JobReport {
                    label: combination.label(),
                    params: combination.params_value(),
                    command: invocation.command_line(),
                    status: JobStatus::Failed,
                    exit_code: Some(outcome.exit_code),
                    attempts: outcome.attempts,
                    artifacts: Vec::new(),
                    error: Some(failure.to_string()),
                });
                if plan.policy.on_failure == FailurePolicy::Abort {
                    stop = true;
                }
            }
            Err(err) => {
                error!(combination = %combination.label(), %err, "spawn failed");
                jobs.push(JobReport {
                    label: combination.label(),
                    params: combination.params_value(),
                    command: invocation.command_line(),
                    status: JobStatus::Failed,
                    exit_code: None,
                    attempts: 1,
                    artifacts: Vec::new(),
                    error: Some(err.to_string()),
                });
                if plan.policy.on_failure == FailurePolicy::Abort {
                    stop = true;
                }
            }
        }
    }

    let summary = build_summary(&jobs);
    info!(plan = %plan.name, %summary, "sweep finished");
    Ok(SweepReport {
        plan_name: plan.name.clone(),
        plan_hash,
        provenance,
        jobs,
        summary,
    })
}

fn skipped_job(combination: &Combination, invocation: &Invocation) -> JobReport {
    JobReport {
        label: combination.label(),
        params: combination.params_value(),
        command: invocation.command_line(),
        status: JobStatus::Skipped,
        exit_code: None,
        attempts: 0,
        artifacts: Vec::new(),
        error: None,
    }
}
