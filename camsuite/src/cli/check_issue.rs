//! check-issue subcommand

use super::GlobalArgs;
use crate::tracker::{Gate, IssueTracker};
use camsuite_common::config::SuiteConfig;
use clap::Args;

/// Arguments for the check-issue subcommand
#[derive(Args, Debug, Clone)]
pub struct CheckIssueArgs {
    /// Issue number
    pub number: u64,
}

/// Execute the check-issue command
///
/// 認証情報は不要なので、設定ファイルのトラッカー設定だけを読む。
pub async fn execute(global: &GlobalArgs, args: &CheckIssueArgs) -> Result<(), anyhow::Error> {
    let config = SuiteConfig::load(global.overrides().config_path())?;
    let tracker = IssueTracker::new(&config.tracker)?;

    match tracker.gate(args.number).await {
        Gate::Run => println!("#{}: run", args.number),
        Gate::Skip(reason) => println!("#{}: skip ({reason})", args.number),
    }
    Ok(())
}
