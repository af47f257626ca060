use std::fs;
use std::path::Path;

use epsweep_driver::{
    persist_report, run_sweep, CommandSpec, GridDimension, JobStatus, OutputSpec, PolicySpec,
    SweepPlan,
};
use serde_json::json;
use tempfile::tempdir;

/// Builds a plan whose "trainer" is a shell snippet writing the two
/// fixed-path checkpoints the real trainer would leave behind.
fn trainer_plan(root: &Path) -> SweepPlan {
    let ckpt = root.join("checkpoints");
    let script = format!(
        "mkdir -p {ckpt}/encoder \
         && printf '%s' '{{dataset}}-{{epsilon}}' > {ckpt}/model.pt \
         && printf '%s' 'enc-{{dataset}}-{{epsilon}}' > {ckpt}/encoder/model.pt",
        ckpt = ckpt.display()
    );
    SweepPlan {
        name: "gap-edp".to_string(),
        command: CommandSpec {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), script],
        },
        dimensions: vec![
            GridDimension {
                name: "dataset".to_string(),
                values: vec![json!("flickr"), json!("lastfm")],
            },
            GridDimension {
                name: "epsilon".to_string(),
                values: vec![json!(1.0), json!(2.0)],
            },
        ],
        fixed: [("hops".to_string(), json!(4))].into_iter().collect(),
        outputs: vec![
            OutputSpec {
                source: ckpt.join("model.pt"),
                dest: root
                    .join("results/{dataset}_eps_{epsilon}_edp.pt")
                    .display()
                    .to_string(),
            },
            OutputSpec {
                source: ckpt.join("encoder/model.pt"),
                dest: root
                    .join("results/encoder/{dataset}_eps_{epsilon}_edp.pt")
                    .display()
                    .to_string(),
            },
        ],
        policy: PolicySpec::default(),
    }
}

#[test]
fn four_combinations_produce_eight_archived_artifacts() {
    let dir = tempdir().expect("tempdir");
    let plan = trainer_plan(dir.path());

    let report = run_sweep(&plan).expect("sweep");

    assert_eq!(report.jobs.len(), 4);
    assert!(report.all_succeeded());
    assert_eq!(
        report.summary,
        json!({"total": 4, "succeeded": 4, "failed": 0, "skipped": 0})
    );

    for dataset in ["flickr", "lastfm"] {
        for epsilon in ["1.0", "2.0"] {
            let top = dir
                .path()
                .join(format!("results/{dataset}_eps_{epsilon}_edp.pt"));
            let encoder = dir
                .path()
                .join(format!("results/encoder/{dataset}_eps_{epsilon}_edp.pt"));
            assert_eq!(
                fs::read_to_string(&top).expect("top artifact"),
                format!("{dataset}-{epsilon}")
            );
            assert_eq!(
                fs::read_to_string(&encoder).expect("encoder artifact"),
                format!("enc-{dataset}-{epsilon}")
            );
        }
    }

    // The fixed source paths were moved, not copied.
    assert!(!dir.path().join("checkpoints/model.pt").exists());
    assert!(!dir.path().join("checkpoints/encoder/model.pt").exists());
}

#[test]
fn jobs_run_in_declared_nested_loop_order() {
    let dir = tempdir().expect("tempdir");
    let plan = trainer_plan(dir.path());
    let report = run_sweep(&plan).expect("sweep");
    let labels: Vec<&str> = report.jobs.iter().map(|job| job.label.as_str()).collect();
    assert_eq!(
        labels,
        vec![
            "dataset=flickr epsilon=1.0",
            "dataset=flickr epsilon=2.0",
            "dataset=lastfm epsilon=1.0",
            "dataset=lastfm epsilon=2.0",
        ]
    );
    for job in &report.jobs {
        assert_eq!(job.attempts, 1);
        assert_eq!(job.exit_code, Some(0));
        assert_eq!(job.artifacts.len(), 2);
        assert_eq!(job.params["hops"], json!("4"));
    }
}

#[test]
fn empty_value_list_is_a_no_op() {
    let dir = tempdir().expect("tempdir");
    let mut plan = trainer_plan(dir.path());
    plan.dimensions[1].values.clear();
    let report = run_sweep(&plan).expect("sweep");
    assert!(report.jobs.is_empty());
    assert_eq!(report.summary["total"], json!(0));
    assert!(!dir.path().join("results").exists());
}

#[test]
fn report_persists_job_directories() {
    let dir = tempdir().expect("tempdir");
    let plan = trainer_plan(dir.path());
    let report = run_sweep(&plan).expect("sweep");

    let out = dir.path().join("report");
    persist_report(&out, &report).expect("persist");

    assert!(out.join("sweep_report.json").exists());
    assert!(out.join("summary.json").exists());
    for idx in 0..4 {
        let job_dir = out.join(format!("job_{:04}", idx));
        assert!(job_dir.join("params.json").exists());
        let status = fs::read_to_string(job_dir.join("STATUS")).expect("status");
        assert!(status.starts_with("succeeded"));
        assert!(status.contains("exit_code=0"));
        let command = fs::read_to_string(job_dir.join("COMMAND")).expect("command");
        assert!(command.starts_with("sh -c"));
    }
    assert_eq!(report.jobs[0].status, JobStatus::Succeeded);
}

#[test]
fn reference_plan_parses_and_validates() {
    let raw = fs::read_to_string(
        Path::new(env!("CARGO_MANIFEST_DIR")).join("../../plans/gap_edp.yaml"),
    )
    .expect("read reference plan");
    let plan: SweepPlan = serde_yaml::from_str(&raw).expect("parse reference plan");
    plan.validate().expect("reference plan is valid");
    assert_eq!(plan.dimensions.len(), 2);
    let product: usize = plan.dimensions.iter().map(|d| d.values.len()).product();
    assert_eq!(product, 16);
    assert_eq!(plan.fixed.get("hops"), Some(&json!(4)));
}

#[test]
fn validation_failures_spawn_nothing() {
    let dir = tempdir().expect("tempdir");
    let sentinel = dir.path().join("ran");
    let mut plan = trainer_plan(dir.path());
    plan.command.args = vec![
        "-c".to_string(),
        format!("touch {}", sentinel.display()),
    ];
    plan.dimensions.clear();
    let err = run_sweep(&plan).expect_err("must fail");
    assert_eq!(err.info().code, "plan-no-dimensions");
    assert!(!sentinel.exists());
}
