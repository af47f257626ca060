use std::env;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use epsweep_core::to_canonical_json_bytes;
use epsweep_driver::{expand_grid, substitute, SweepPlan};
use serde::Serialize;
use serde_yaml::from_str;

#[derive(Args, Debug)]
pub struct DoctorArgs {
    /// Sweep plan to inspect.
    #[arg(long)]
    pub plan: PathBuf,
    /// Emit only JSON without additional context.
    #[arg(long)]
    pub quiet: bool,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: String,
    ok: bool,
    detail: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    status: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(args: &DoctorArgs) -> Result<(), Box<dyn Error>> {
    let report = diagnose(&args.plan);
    let json = to_canonical_json_bytes(&report).map_err(|err| Box::new(err) as Box<dyn Error>)?;
    let rendered = String::from_utf8(json)?;
    if args.quiet {
        println!("{}", rendered);
    } else {
        println!("epsweep doctor status: {}", report.status);
        println!("{}", rendered);
    }
    if report.status != "ok" {
        return Err("one or more checks failed".into());
    }
    Ok(())
}

fn diagnose(plan_path: &Path) -> DoctorReport {
    let mut checks = Vec::new();
    let plan = load_plan(plan_path, &mut checks);

    if let Some(plan) = plan {
        checks.push(check_program(&plan.command.program));
        let combinations = expand_grid(&plan.dimensions, &plan.fixed);
        match combinations.first() {
            Some(first) => {
                for output in &plan.outputs {
                    // Surface the first concrete destination so typos are visible.
                    let detail = substitute(&output.dest, first)
                        .unwrap_or_else(|err| err.to_string());
                    checks.push(DoctorCheck {
                        name: format!("destination {}", output.dest),
                        ok: true,
                        detail,
                    });
                }
            }
            None => checks.push(DoctorCheck {
                name: "combinations".into(),
                ok: true,
                detail: "empty product, sweep would be a no-op".into(),
            }),
        }
    }

    let status = if checks.iter().all(|check| check.ok) {
        "ok"
    } else {
        "needs-attention"
    };
    DoctorReport {
        status: status.into(),
        checks,
    }
}

fn load_plan(path: &Path, checks: &mut Vec<DoctorCheck>) -> Option<SweepPlan> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            checks.push(DoctorCheck {
                name: "plan readable".into(),
                ok: false,
                detail: err.to_string(),
            });
            return None;
        }
    };
    let plan: SweepPlan = match from_str(&raw) {
        Ok(plan) => plan,
        Err(err) => {
            checks.push(DoctorCheck {
                name: "plan parses".into(),
                ok: false,
                detail: err.to_string(),
            });
            return None;
        }
    };
    match plan.validate() {
        Ok(()) => {
            checks.push(DoctorCheck {
                name: "plan valid".into(),
                ok: true,
                detail: plan.name.clone(),
            });
            Some(plan)
        }
        Err(err) => {
            checks.push(DoctorCheck {
                name: "plan valid".into(),
                ok: false,
                detail: err.to_string(),
            });
            None
        }
    }
}

fn check_program(program: &str) -> DoctorCheck {
    let found = if program.contains(std::path::MAIN_SEPARATOR) {
        Path::new(program).exists()
    } else {
        env::var_os("PATH")
            .map(|paths| env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
            .unwrap_or(false)
    };
    DoctorCheck {
        name: format!("program {program}"),
        ok: found,
        detail: if found {
            "resolved".into()
        } else {
            "not found on PATH".into()
        },
    }
}
