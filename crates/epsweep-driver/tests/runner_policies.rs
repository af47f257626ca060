use std::fs;
use std::path::Path;

use epsweep_driver::{
    run_sweep, CommandSpec, FailurePolicy, GridDimension, JobStatus, OutputSpec, PolicySpec,
    RetrySpec, SweepPlan,
};
use serde_json::json;
use tempfile::tempdir;

/// Trainer stand-in that fails for `badset` and writes its checkpoint
/// otherwise. `badset` is declared first so later combinations prove the
/// continue policy.
fn mixed_plan(root: &Path, on_failure: FailurePolicy) -> SweepPlan {
    let ckpt = root.join("checkpoints");
    let script = format!(
        "if [ {{dataset}} = badset ]; then exit 3; fi; \
         mkdir -p {ckpt} && printf '%s' '{{dataset}}' > {ckpt}/model.pt",
        ckpt = ckpt.display()
    );
    SweepPlan {
        name: "mixed".to_string(),
        command: CommandSpec {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script],
        },
        dimensions: vec![GridDimension {
            name: "dataset".to_string(),
            values: vec![json!("badset"), json!("goodset")],
        }],
        fixed: Default::default(),
        outputs: vec![OutputSpec {
            source: ckpt.join("model.pt"),
            dest: root.join("results/{dataset}.pt").display().to_string(),
        }],
        policy: PolicySpec {
            on_failure,
            retry: RetrySpec::default(),
        },
    }
}

#[test]
fn continue_policy_runs_later_combinations_and_records_the_failure() {
    let dir = tempdir().expect("tempdir");
    let plan = mixed_plan(dir.path(), FailurePolicy::Continue);

    let report = run_sweep(&plan).expect("sweep");

    assert_eq!(report.jobs.len(), 2);
    assert_eq!(report.jobs[0].status, JobStatus::Failed);
    assert_eq!(report.jobs[0].exit_code, Some(3));
    assert!(report.jobs[0].error.as_deref().unwrap_or("").contains("exit_code=3"));
    assert!(report.jobs[0].artifacts.is_empty());
    assert_eq!(report.jobs[1].status, JobStatus::Succeeded);
    assert!(dir.path().join("results/goodset.pt").exists());
    assert_eq!(
        report.summary,
        json!({"total": 2, "succeeded": 1, "failed": 1, "skipped": 0})
    );
    assert!(!report.all_succeeded());
    assert_eq!(report.failed_count(), 1);
}

#[test]
fn abort_policy_skips_the_remaining_combinations() {
    let dir = tempdir().expect("tempdir");
    let plan = mixed_plan(dir.path(), FailurePolicy::Abort);

    let report = run_sweep(&plan).expect("sweep");

    assert_eq!(report.jobs[0].status, JobStatus::Failed);
    assert_eq!(report.jobs[1].status, JobStatus::Skipped);
    assert_eq!(report.jobs[1].attempts, 0);
    assert!(!dir.path().join("results/goodset.pt").exists());
    assert_eq!(
        report.summary,
        json!({"total": 2, "succeeded": 0, "failed": 1, "skipped": 1})
    );
}

#[test]
fn missing_artifact_stops_the_sweep() {
    let dir = tempdir().expect("tempdir");
    let mut plan = mixed_plan(dir.path(), FailurePolicy::Continue);
    // Trainer succeeds but never writes the expected checkpoint.
    plan.command.args = vec!["-c".to_string(), "exit 0".to_string()];
    plan.dimensions[0].values = vec![json!("one"), json!("two")];

    let report = run_sweep(&plan).expect("sweep");

    assert_eq!(report.jobs[0].status, JobStatus::Failed);
    assert!(report.jobs[0]
        .error
        .as_deref()
        .unwrap_or("")
        .contains("artifact-missing"));
    assert_eq!(report.jobs[1].status, JobStatus::Skipped);
}

#[test]
fn destination_collision_preserves_the_prior_result() {
    let dir = tempdir().expect("tempdir");
    let plan = mixed_plan(dir.path(), FailurePolicy::Continue);
    let occupied = dir.path().join("results/goodset.pt");
    fs::create_dir_all(occupied.parent().expect("parent")).expect("mkdir");
    fs::write(&occupied, b"prior").expect("write");
    let mut plan = plan;
    plan.dimensions[0].values = vec![json!("goodset")];

    let report = run_sweep(&plan).expect("sweep");

    assert_eq!(report.jobs[0].status, JobStatus::Failed);
    assert!(report.jobs[0]
        .error
        .as_deref()
        .unwrap_or("")
        .contains("artifact-collision"));
    assert_eq!(fs::read(&occupied).expect("read"), b"prior");
}

#[test]
fn retry_recovers_a_flaky_trainer() {
    let dir = tempdir().expect("tempdir");
    let ckpt = dir.path().join("checkpoints");
    let script = format!(
        "marker={root}/marker-{{dataset}}; \
         if [ ! -f $marker ]; then touch $marker; exit 1; fi; \
         mkdir -p {ckpt} && printf '%s' '{{dataset}}' > {ckpt}/model.pt",
        root = dir.path().display(),
        ckpt = ckpt.display()
    );
    let plan = SweepPlan {
        name: "flaky".to_string(),
        command: CommandSpec {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script],
        },
        dimensions: vec![GridDimension {
            name: "dataset".to_string(),
            values: vec![json!("flickr")],
        }],
        fixed: Default::default(),
        outputs: vec![OutputSpec {
            source: ckpt.join("model.pt"),
            dest: dir.path().join("results/{dataset}.pt").display().to_string(),
        }],
        policy: PolicySpec {
            on_failure: FailurePolicy::Continue,
            retry: RetrySpec {
                max_attempts: 3,
                base_delay_ms: 1,
                max_delay_ms: 5,
            },
        },
    };

    let report = run_sweep(&plan).expect("sweep");

    assert_eq!(report.jobs[0].status, JobStatus::Succeeded);
    assert_eq!(report.jobs[0].attempts, 2);
    assert!(dir.path().join("results/flickr.pt").exists());
}
