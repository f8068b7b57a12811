//! Run configuration
//!
//! YAML設定ファイルと環境変数（CLIフラグも同名の変数で受け付ける）を合成し、
//! 各モジュールが使う `ResolvedEnv` を作る。
//!
//! 環境変数は新名称を優先し、旧名称（`E2E_*` 等）のみ設定されている場合は
//! 非推奨警告を出して採用する。

use crate::error::{Result, SuiteError};
use crate::eventual::Poll;
use crate::retry::RetryPolicy;
use camsuite_common::config::{
    Credentials, InboxConfig, SuiteConfig, TimeoutConfig, TrackerConfig, WebDriverConfig,
    WebDriverMode,
};
use std::path::PathBuf;
use std::time::Duration;

/// 設定ファイルパス
pub const ENV_CONFIG: &str = "CAMSUITE_CONFIG";
/// 環境名
pub const ENV_ENV: &str = "CAMSUITE_ENV";
/// ログインメールアドレス
pub const ENV_EMAIL: &str = "CAMSUITE_EMAIL";
/// ログインパスワード
pub const ENV_PASSWORD: &str = "CAMSUITE_PASSWORD";
/// WebDriver接続方式
pub const ENV_WEBDRIVER: &str = "CAMSUITE_WEBDRIVER";
/// WebDriverエンドポイント
pub const ENV_WEBDRIVER_URL: &str = "CAMSUITE_WEBDRIVER_URL";
/// ヘッドレス起動
pub const ENV_HEADLESS: &str = "CAMSUITE_HEADLESS";
/// 製品E2Eスイートの有効化
pub const ENV_E2E: &str = "CAMSUITE_E2E";
/// 並列シャード間で共有するラン識別子
pub const ENV_RUN_ID: &str = "CAMSUITE_RUN_ID";

/// 設定ファイルのデフォルトパス
pub const DEFAULT_CONFIG_PATH: &str = "camsuite.yaml";

/// 環境変数を読む。新しい名前がなければ旧名を読み、非推奨の警告を出す
pub fn get_env_with_fallback(new_name: &str, old_name: &str) -> Option<String> {
    if let Ok(val) = std::env::var(new_name) {
        return Some(val);
    }
    if let Ok(val) = std::env::var(old_name) {
        tracing::warn!(
            "Environment variable '{}' is deprecated, use '{}' instead",
            old_name,
            new_name
        );
        return Some(val);
    }
    None
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// 製品E2Eスイートが有効か
///
/// `CAMSUITE_E2E`（旧: `E2E`）が `true/1/yes/on` のときに有効。
pub fn e2e_enabled() -> bool {
    get_env_with_fallback(ENV_E2E, "E2E")
        .map(|v| parse_flag(&v))
        .unwrap_or(false)
}

/// 実行時の上書き指定（CLIフラグ・環境変数）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunOverrides {
    /// 設定ファイルパス
    pub config_path: Option<PathBuf>,
    /// 環境名
    pub env: Option<String>,
    /// ログインメールアドレス
    pub email: Option<String>,
    /// ログインパスワード
    pub password: Option<String>,
    /// WebDriver接続方式
    pub webdriver_mode: Option<WebDriverMode>,
    /// WebDriverエンドポイント
    pub webdriver_url: Option<String>,
    /// ヘッドレス起動
    pub headless: Option<bool>,
}

impl RunOverrides {
    /// 環境変数から読み込む
    pub fn from_env() -> Self {
        Self {
            config_path: get_env_with_fallback(ENV_CONFIG, "E2E_CONFIG").map(PathBuf::from),
            env: get_env_with_fallback(ENV_ENV, "E2E_ENV"),
            email: get_env_with_fallback(ENV_EMAIL, "E2E_EMAIL"),
            password: get_env_with_fallback(ENV_PASSWORD, "E2E_PASSWORD"),
            webdriver_mode: get_env_with_fallback(ENV_WEBDRIVER, "WEBDRIVER")
                .and_then(|v| v.parse().ok()),
            webdriver_url: get_env_with_fallback(ENV_WEBDRIVER_URL, "WEBDRIVER_URL"),
            headless: get_env_with_fallback(ENV_HEADLESS, "HEADLESS").map(|v| parse_flag(&v)),
        }
    }

    /// `self` を優先し、未指定項目を `fallback` で埋める
    pub fn or(self, fallback: RunOverrides) -> Self {
        Self {
            config_path: self.config_path.or(fallback.config_path),
            env: self.env.or(fallback.env),
            email: self.email.or(fallback.email),
            password: self.password.or(fallback.password),
            webdriver_mode: self.webdriver_mode.or(fallback.webdriver_mode),
            webdriver_url: self.webdriver_url.or(fallback.webdriver_url),
            headless: self.headless.or(fallback.headless),
        }
    }

    /// 設定ファイルパス（未指定ならデフォルト）
    pub fn config_path(&self) -> PathBuf {
        self.config_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }
}

/// 上書きを反映した実行環境
#[derive(Debug, Clone)]
pub struct ResolvedEnv {
    /// 環境名
    pub name: String,
    /// Web UIのベースURL
    pub web_url: String,
    /// REST APIのベースURL
    pub api_url: String,
    /// 管理者アカウント
    pub admin: Credentials,
    /// プロビジョニング起点のSPC会社ID
    pub spc_company_id: Option<String>,
    /// テスト用ライセンスキー
    pub license_keys: Vec<String>,
    /// 受信箱サービス
    pub inbox: InboxConfig,
    /// 課題トラッカー
    pub tracker: TrackerConfig,
    /// WebDriver
    pub webdriver: WebDriverConfig,
    /// タイムアウト
    pub timeouts: TimeoutConfig,
    /// リトライポリシー
    pub retry: RetryPolicy,
    /// カメラ同時作成数
    pub camera_concurrency: usize,
}

impl ResolvedEnv {
    /// 設定と上書き指定から実行環境を決定する
    pub fn resolve(config: &SuiteConfig, overrides: &RunOverrides) -> Result<Self> {
        let name = overrides
            .env
            .clone()
            .unwrap_or_else(|| config.default_env.clone());
        let env = config.environment(&name)?;

        let mut admin = env.admin.clone();
        if let Some(email) = &overrides.email {
            admin.email = email.clone();
        }
        if let Some(password) = &overrides.password {
            admin.password = password.clone();
        }
        if admin.email.is_empty() || admin.password.is_empty() {
            return Err(SuiteError::Validation(format!(
                "environment '{name}' has no admin credentials (set {ENV_EMAIL}/{ENV_PASSWORD})"
            )));
        }

        let mut webdriver = config.webdriver.clone();
        if let Some(mode) = overrides.webdriver_mode {
            webdriver.mode = mode;
        }
        if let Some(url) = &overrides.webdriver_url {
            webdriver.url = url.clone();
        }
        if let Some(headless) = overrides.headless {
            webdriver.headless = headless;
        }

        Ok(Self {
            name,
            web_url: env.web_url.trim_end_matches('/').to_string(),
            api_url: env.api_url.trim_end_matches('/').to_string(),
            admin,
            spc_company_id: env.spc_company_id.clone(),
            license_keys: env.license_keys.clone(),
            inbox: config.inbox.clone(),
            tracker: config.tracker.clone(),
            webdriver,
            timeouts: config.timeouts.clone(),
            retry: RetryPolicy::from(&config.retry),
            camera_concurrency: config.concurrency.camera_provisioning.max(1),
        })
    }

    /// 環境変数が指す設定ファイルを読み込んで決定する
    pub fn from_environment() -> Result<Self> {
        Self::load(&RunOverrides::from_env())
    }

    /// 上書き指定が指す設定ファイルを読み込んで決定する
    pub fn load(overrides: &RunOverrides) -> Result<Self> {
        let config = SuiteConfig::load(overrides.config_path())?;
        Self::resolve(&config, overrides)
    }

    fn interval(&self) -> Duration {
        Duration::from_millis(self.timeouts.poll_interval_ms)
    }

    /// メール到着待ち
    pub fn email_poll(&self) -> Poll {
        Poll::new(Duration::from_secs(self.timeouts.email_secs), self.interval())
    }

    /// オブジェクト取り込み待ち
    pub fn ingestion_poll(&self) -> Poll {
        Poll::new(
            Duration::from_secs(self.timeouts.ingestion_secs),
            self.interval(),
        )
    }

    /// UI要素待ち（UIは短い間隔で見る）
    pub fn ui_poll(&self) -> Poll {
        Poll::new(
            Duration::from_secs(self.timeouts.ui_secs),
            self.interval().min(Duration::from_millis(250)),
        )
    }

    /// HTTPリクエスト単体のタイムアウト
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.request_secs)
    }
}
