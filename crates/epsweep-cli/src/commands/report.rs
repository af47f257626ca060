use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use epsweep_driver::{registry_query, Query, Registry};

#[derive(Args, Debug)]
pub struct ReportArgs {
    /// Registry file to query (`.csv`, `.sqlite` or `.db`).
    #[arg(long)]
    pub registry: PathBuf,
    /// Restrict rows to a single plan name.
    #[arg(long = "plan-name")]
    pub plan_name: Option<String>,
    /// Maximum number of rows to print.
    #[arg(long)]
    pub limit: Option<usize>,
}

pub fn run(args: &ReportArgs) -> Result<(), Box<dyn Error>> {
    let registry = Registry::from_path(&args.registry);
    let query = Query {
        plan_name: args.plan_name.clone(),
        limit: args.limit,
    };
    let table =
        registry_query(&registry, &query).map_err(|err| Box::new(err) as Box<dyn Error>)?;
    println!("{}", table.columns.join("\t"));
    for row in &table.rows {
        println!("{}", row.join("\t"));
    }
    Ok(())
}
