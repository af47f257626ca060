//! Parameter-sweep engine: expands a grid plan into combinations, drives one
//! external trainer invocation per combination, and archives the artifacts
//! each run leaves behind at fixed paths.

mod archive;
mod exec;
mod grid;
mod hash;
mod plan;
mod registry;
mod report;
mod runner;
mod template;

pub use archive::archive_outputs;
pub use exec::{run_with_retry, Invocation, InvocationOutcome};
pub use grid::{expand_grid, render_value, Combination};
pub use hash::stable_hash_string;
pub use plan::{
    CommandSpec, FailurePolicy, GridDimension, OutputSpec, PolicySpec, RetrySpec, SweepPlan,
};
pub use registry::{registry_append, registry_query, Query, Registry, Table};
pub use report::{persist_report, JobReport, JobStatus, SweepReport};
pub use runner::run_sweep;
pub use template::{placeholders, substitute};
