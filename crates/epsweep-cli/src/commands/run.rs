use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Args;
use epsweep_core::to_canonical_json_bytes;
use epsweep_driver::{persist_report, registry_append, run_sweep, Registry, SweepPlan};
use serde_yaml::from_str;

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Path to the sweep plan YAML.
    #[arg(long)]
    pub plan: PathBuf,
    /// Output directory for the sweep report.
    #[arg(long)]
    pub out: PathBuf,
    /// Optional registry path to append one row per combination.
    #[arg(long)]
    pub registry: Option<PathBuf>,
}

pub fn run(args: &RunArgs) -> Result<(), Box<dyn Error>> {
    let plan_text = fs::read_to_string(&args.plan)?;
    let plan: SweepPlan = from_str(&plan_text)?;
    let report = run_sweep(&plan).map_err(|err| Box::new(err) as Box<dyn Error>)?;
    persist_report(&args.out, &report).map_err(|err| Box::new(err) as Box<dyn Error>)?;
    if let Some(path) = &args.registry {
        let registry = Registry::from_path(path);
        registry_append(&registry, &report).map_err(|err| Box::new(err) as Box<dyn Error>)?;
    }
    let summary =
        to_canonical_json_bytes(&report.summary).map_err(|err| Box::new(err) as Box<dyn Error>)?;
    println!("{}", String::from_utf8(summary)?);
    let failed = report.failed_count();
    if failed > 0 {
        return Err(format!("{failed} combination(s) failed").into());
    }
    Ok(())
}
