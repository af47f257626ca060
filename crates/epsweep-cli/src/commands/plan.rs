use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::Args;
use epsweep_core::to_canonical_json_bytes;
use epsweep_driver::{expand_grid, stable_hash_string, substitute, Invocation, SweepPlan};
use serde::Serialize;
use serde_yaml::from_str;

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// Path to the sweep plan YAML.
    #[arg(long)]
    pub plan: PathBuf,
    /// Emit canonical JSON instead of text lines.
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize)]
struct PlanPreview {
    plan_name: String,
    plan_hash: String,
    combinations: Vec<CombinationPreview>,
}

#[derive(Debug, Serialize)]
struct CombinationPreview {
    label: String,
    command: String,
    destinations: Vec<String>,
}

pub fn run(args: &PlanArgs) -> Result<(), Box<dyn Error>> {
    let plan_text = fs::read_to_string(&args.plan)?;
    let plan: SweepPlan = from_str(&plan_text)?;
    plan.validate().map_err(|err| Box::new(err) as Box<dyn Error>)?;

    let mut combinations = Vec::new();
    for combination in expand_grid(&plan.dimensions, &plan.fixed) {
        let invocation = Invocation::from_spec(&plan.command, &combination)
            .map_err(|err| Box::new(err) as Box<dyn Error>)?;
        let mut destinations = Vec::with_capacity(plan.outputs.len());
        for output in &plan.outputs {
            destinations.push(
                substitute(&output.dest, &combination)
                    .map_err(|err| Box::new(err) as Box<dyn Error>)?,
            );
        }
        combinations.push(CombinationPreview {
            label: combination.label(),
            command: invocation.command_line(),
            destinations,
        });
    }

    let preview = PlanPreview {
        plan_name: plan.name.clone(),
        plan_hash: stable_hash_string(&plan).map_err(|err| Box::new(err) as Box<dyn Error>)?,
        combinations,
    };

    if args.json {
        let bytes =
            to_canonical_json_bytes(&preview).map_err(|err| Box::new(err) as Box<dyn Error>)?;
        println!("{}", String::from_utf8(bytes)?);
        return Ok(());
    }
    println!("plan: {} ({})", preview.plan_name, preview.plan_hash);
    for combo in &preview.combinations {
        println!("{}", combo.label);
        println!("  command: {}", combo.command);
        for dest in &combo.destinations {
            println!("  dest: {dest}");
        }
    }
    println!("{} combination(s)", preview.combinations.len());
    Ok(())
}
