use std::error::Error;
use std::process::Command;

use clap::Args;
use epsweep_core::to_canonical_json_bytes;
use serde::Serialize;

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Emit extended metadata including git and toolchain information.
    #[arg(long)]
    pub long: bool,
}

#[derive(Debug, Serialize)]
struct VersionInfo {
    version: String,
    git_commit: String,
    rustc: String,
    profile: String,
}

pub fn run(args: &VersionArgs) -> Result<(), Box<dyn Error>> {
    if !args.long {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }
    let info = gather_info();
    let json = to_canonical_json_bytes(&info).map_err(|err| Box::new(err) as Box<dyn Error>)?;
    println!("{}", String::from_utf8(json)?);
    Ok(())
}

fn gather_info() -> VersionInfo {
    let git_commit = probe("git", &["rev-parse", "HEAD"]).unwrap_or_else(|| "unknown".into());
    let rustc = probe("rustc", &["--version"]).unwrap_or_else(|| "rustc unavailable".into());
    let profile = if cfg!(debug_assertions) { "debug" } else { "release" };
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").into(),
        git_commit,
        rustc,
        profile: profile.into(),
    }
}

fn probe(program: &str, args: &[&str]) -> Option<String> {
    Command::new(program).args(args).output().ok().and_then(|out| {
        if out.status.success() {
            Some(String::from_utf8_lossy(&out.stdout).trim().to_string())
        } else {
            None
        }
    })
}
