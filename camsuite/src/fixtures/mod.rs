//! テストデータのプロビジョニングと後始末
//!
//! テストはUIを経由せずAPIで前提状態を作り、作成したリソースを後始末台帳に記録する。
//! リソース名はすべて `unique_name()` で生成し、並列実行同士が衝突しないようにする。

pub mod context;
pub mod sweep;
pub mod teardown;

pub use context::{create_cameras_bounded, CompanyTree, TestContext, VerifiedUser};
pub use sweep::{sweep_stale, SweepOptions, SweepReport};
pub use teardown::{Resource, Teardown, TeardownReport};

use crate::config::{get_env_with_fallback, ENV_RUN_ID};
use chrono::Utc;
use once_cell::sync::Lazy;
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};

/// プロビジョニングしたリソース名の接頭辞
pub const NAME_PREFIX: &str = "e2e-";

static RUN_TAG: Lazy<String> = Lazy::new(|| {
    get_env_with_fallback(ENV_RUN_ID, "E2E_RUN_ID")
        .filter(|tag| !tag.trim().is_empty())
        .unwrap_or_else(generate_run_tag)
});

static NAME_COUNTER: AtomicU64 = AtomicU64::new(0);

fn generate_run_tag() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|b| (b as char).to_ascii_lowercase())
        .collect();
    format!("{}-{suffix}", Utc::now().format("%Y%m%d%H%M%S"))
}

/// プロセス単位のラン識別子
///
/// `CAMSUITE_RUN_ID` が設定されていればそれを使う（並列シャードで共有する場合）。
pub fn run_tag() -> &'static str {
    &RUN_TAG
}

/// `e2e-<run_tag>-<kind>-<counter>` 形式の一意な名前
pub fn unique_name(kind: &str) -> String {
    let n = NAME_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    format!("{NAME_PREFIX}{}-{kind}-{n}", run_tag())
}
