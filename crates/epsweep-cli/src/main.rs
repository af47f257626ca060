use std::error::Error;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{doctor, plan, report, run, version};

#[derive(Parser, Debug)]
#[command(name = "epsweep", about = "Parameter-sweep driver for external training programs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Execute a sweep plan and archive each run's artifacts.
    Run(run::RunArgs),
    /// Expand a plan and print every combination without running anything.
    Plan(plan::PlanArgs),
    /// Query the results registry.
    Report(report::ReportArgs),
    /// Check the environment before starting a long sweep.
    Doctor(doctor::DoctorArgs),
    /// Print version information.
    Version(version::VersionArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run::run(&args),
        Command::Plan(args) => plan::run(&args),
        Command::Report(args) => report::run(&args),
        Command::Doctor(args) => doctor::run(&args),
        Command::Version(args) => version::run(&args),
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("EPSWEEP_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
