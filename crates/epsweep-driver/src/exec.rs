use std::process::Command;
use std::thread;
use std::time::Duration;

use epsweep_core::errors::{ErrorInfo, SweepError};
use tracing::warn;

use crate::grid::Combination;
use crate::plan::{CommandSpec, RetrySpec};
use crate::template::substitute;

/// A fully substituted trainer invocation for one combination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
}

impl Invocation {
    /// Builds the concrete invocation from the plan's command template.
    pub fn from_spec(spec: &CommandSpec, combination: &Combination) -> Result<Self, SweepError> {
        let mut args = Vec::with_capacity(spec.args.len());
        for arg in &spec.args {
            args.push(substitute(arg, combination)?);
        }
        Ok(Self {
            program: spec.program.clone(),
            args,
        })
    }

    /// Shell-style rendering for logs and report files.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            if arg.contains(' ') {
                line.push('\'');
                line.push_str(arg);
                line.push('\'');
            } else {
                line.push_str(arg);
            }
        }
        line
    }
}

/// Outcome of one invocation after the retry budget is spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvocationOutcome {
    /// Exit code of the final attempt; -1 when terminated by a signal.
    pub exit_code: i32,
    /// Attempts actually made (at least one).
    pub attempts: usize,
    pub success: bool,
}

/// Runs the invocation synchronously, inheriting stdio, retrying non-zero
/// exits with exponential backoff until the budget is exhausted. Spawn
/// failures (program missing, permission denied) are not retried.
pub fn run_with_retry(
    invocation: &Invocation,
    retry: &RetrySpec,
) -> Result<InvocationOutcome, SweepError> {
    let max_attempts = retry.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        attempt += 1;
        let status = Command::new(&invocation.program)
            .args(&invocation.args)
            .status()
            .map_err(|err| {
                SweepError::Process(
                    ErrorInfo::new("spawn-failed", "failed to spawn external trainer")
                        .with_context("program", invocation.program.clone())
                        .with_hint(err.to_string()),
                )
            })?;
        let exit_code = status.code().unwrap_or(-1);
        if status.success() {
            return Ok(InvocationOutcome {
                exit_code,
                attempts: attempt,
                success: true,
            });
        }
        if attempt >= max_attempts {
            return Ok(InvocationOutcome {
                exit_code,
                attempts: attempt,
                success: false,
            });
        }
        let delay = backoff_delay(retry, attempt);
        warn!(
            command = %invocation.command_line(),
            exit_code,
            attempt,
            delay_ms = delay.as_millis() as u64,
            "trainer invocation failed, retrying"
        );
        thread::sleep(delay);
    }
}

fn backoff_delay(retry: &RetrySpec, attempt: usize) -> Duration {
    let exponent = (attempt - 1).min(16) as u32;
    let delay = retry
        .base_delay_ms
        .saturating_mul(1u64 << exponent)
        .min(retry.max_delay_ms);
    Duration::from_millis(delay)
}
