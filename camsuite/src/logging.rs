//! ロギング初期化ユーティリティ
//!
//! `CAMSUITE_LOG_LEVEL`（なければ `RUST_LOG`、既定 `info`）でフィルタし、
//! `CAMSUITE_LOG_DIR` が設定されていれば日次ローテーションのファイルにも出力する。

use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// ログレベル指定の環境変数
pub const ENV_LOG_LEVEL: &str = "CAMSUITE_LOG_LEVEL";
/// ログファイル出力先の環境変数
pub const ENV_LOG_DIR: &str = "CAMSUITE_LOG_DIR";

const LOG_FILE_PREFIX: &str = "camsuite.log";

static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

fn env_filter(default_level: &str) -> EnvFilter {
    std::env::var(ENV_LOG_LEVEL)
        .ok()
        .and_then(|level| EnvFilter::try_new(level).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(default_level))
}

fn filter(level: Option<&str>) -> EnvFilter {
    level
        .and_then(|level| EnvFilter::try_new(level).ok())
        .unwrap_or_else(|| env_filter("info"))
}

/// ロギングを初期化する
///
/// `level` を指定した場合は環境変数より優先する。
pub fn init_with_level(level: Option<&str>) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter(level));

    let file_layer = match std::env::var(ENV_LOG_DIR) {
        Ok(dir) if !dir.trim().is_empty() => {
            std::fs::create_dir_all(&dir)?;
            let appender = tracing_appender::rolling::daily(&dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(
                fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_filter(filter(level)),
            )
        }
        _ => None,
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init()?;
    Ok(())
}

/// テスト用のロギングを初期化する（複数回呼んでも安全）
pub fn init_for_tests() {
    let _ = fmt()
        .with_env_filter(env_filter("info,camsuite=debug"))
        .with_test_writer()
        .try_init();
}
