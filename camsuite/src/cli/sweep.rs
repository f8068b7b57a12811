//! sweep subcommand
//!
//! Removes e2e companies and cameras left behind by crashed runs.

use super::GlobalArgs;
use crate::fixtures::{sweep_stale, SweepOptions, NAME_PREFIX};
use anyhow::anyhow;
use clap::Args;

/// Arguments for the sweep subcommand
#[derive(Args, Debug, Clone)]
pub struct SweepArgs {
    /// Name prefix of resources to remove
    #[arg(long, default_value = NAME_PREFIX)]
    pub prefix: String,

    /// Only remove resources older than this many hours
    ///
    /// Camera age is read from the run timestamp in the name. Cameras from runs that set
    /// CAMSUITE_RUN_ID carry no timestamp and are only removed with 0.
    #[arg(long, default_value_t = 6)]
    pub older_than_hours: i64,

    /// List what would be removed without deleting
    #[arg(long)]
    pub dry_run: bool,
}

/// Execute the sweep command
pub async fn execute(global: &GlobalArgs, args: &SweepArgs) -> Result<(), anyhow::Error> {
    if args.prefix.is_empty() {
        return Err(anyhow!("--prefix must not be empty"));
    }
    let (_env, api) = global.login().await?;
    let options = SweepOptions {
        prefix: args.prefix.clone(),
        older_than: chrono::Duration::hours(args.older_than_hours),
        dry_run: args.dry_run,
    };
    let report = sweep_stale(&api, &options).await?;

    let verb = if args.dry_run { "Would delete" } else { "Deleted" };
    for camera in &report.cameras {
        println!("{verb} camera\t{}\t{}", camera.id, camera.name);
    }
    for company in &report.companies {
        println!(
            "{verb} company\t{}\t{}\t{}",
            company.id,
            company.kind.as_str(),
            company.name
        );
    }

    if report.failed.is_empty() {
        Ok(())
    } else {
        for (name, error) in &report.failed {
            eprintln!("Failed: {name}: {error}");
        }
        Err(anyhow!("{} resource(s) could not be deleted", report.failed.len()))
    }
}
