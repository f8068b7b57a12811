//! CLI module for camsuite
//!
//! テストデータ投入・取得用のスタンドアロンツール群。

pub mod check_issue;
pub mod download_objects;
pub mod feeder;
pub mod sweep;

use crate::api::ApiClient;
use crate::config::{ResolvedEnv, RunOverrides};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// camsuite - E2E test harness tools for the video-analytics product
#[derive(Parser, Debug)]
#[command(name = "camsuite")]
#[command(version, about, long_about = None)]
#[command(after_help = r#"ENVIRONMENT VARIABLES:
    CAMSUITE_CONFIG         Config file path (default: camsuite.yaml)
    CAMSUITE_ENV            Environment name (default: config default_env)
    CAMSUITE_EMAIL          Admin login email
    CAMSUITE_PASSWORD       Admin login password
    CAMSUITE_LOG_LEVEL      Log level (default: info)
    CAMSUITE_LOG_DIR        Also write daily-rotated log files here
    CAMSUITE_RUN_ID         Run tag shared by parallel shards
"#)]
pub struct Cli {
    /// Options shared by every subcommand
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Provision cameras and feed synthetic detections
    Feeder(feeder::FeederArgs),
    /// Export detected objects as CSV or JSON lines
    DownloadObjects(download_objects::DownloadObjectsArgs),
    /// Delete stale e2e resources left by crashed runs
    Sweep(sweep::SweepArgs),
    /// Show whether tests gated on an issue would run
    CheckIssue(check_issue::CheckIssueArgs),
}

/// Options shared by every subcommand
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Environment name from the config file
    #[arg(long, global = true)]
    pub env: Option<String>,

    /// Admin login email
    #[arg(long, global = true)]
    pub email: Option<String>,

    /// Admin login password
    #[arg(long, global = true)]
    pub password: Option<String>,

    /// Log level filter (overrides CAMSUITE_LOG_LEVEL)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

impl GlobalArgs {
    /// フラグを優先し、未指定項目は環境変数で埋める
    pub fn overrides(&self) -> RunOverrides {
        RunOverrides {
            config_path: self.config.clone(),
            env: self.env.clone(),
            email: self.email.clone(),
            password: self.password.clone(),
            ..RunOverrides::default()
        }
        .or(RunOverrides::from_env())
    }

    /// 実行環境を決定する
    pub fn resolve(&self) -> Result<ResolvedEnv, anyhow::Error> {
        Ok(ResolvedEnv::load(&self.overrides())?)
    }

    /// 管理者でログインしたクライアントを作る
    pub async fn login(&self) -> Result<(ResolvedEnv, ApiClient), anyhow::Error> {
        let env = self.resolve()?;
        let api = ApiClient::from_env(&env)?;
        api.login(&env.admin.email, &env.admin.password).await?;
        if let Some(company_id) = &env.spc_company_id {
            api.select_company(company_id.clone()).await;
        }
        Ok((env, api))
    }
}

/// サブコマンドを実行する
pub async fn run(cli: Cli) -> Result<(), anyhow::Error> {
    match &cli.command {
        Commands::Feeder(args) => feeder::execute(&cli.global, args).await,
        Commands::DownloadObjects(args) => download_objects::execute(&cli.global, args).await,
        Commands::Sweep(args) => sweep::execute(&cli.global, args).await,
        Commands::CheckIssue(args) => check_issue::execute(&cli.global, args).await,
    }
}
