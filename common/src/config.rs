//! 設定管理
//!
//! 環境ごとのURL・認証情報を定義するYAML設定ファイルのモデル。
//! `environments` 以外のセクションはすべてデフォルト値を持つ。

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// 設定読み込みエラー
#[derive(Debug, Error)]
pub enum ConfigError {
    /// ファイル読み込み失敗
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// 対象パス
        path: String,
        /// 元エラー
        #[source]
        source: std::io::Error,
    },

    /// YAML構文・型エラー
    #[error("Invalid config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// 未定義の環境名
    #[error("Unknown environment '{name}' (known: {known})")]
    UnknownEnvironment {
        /// 指定された環境名
        name: String,
        /// 定義済み環境名（カンマ区切り）
        known: String,
    },

    /// 値の検証エラー
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// スイート全体の設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteConfig {
    /// 環境未指定時に使う環境名
    #[serde(default = "default_env_name")]
    pub default_env: String,

    /// 環境定義（名前 → URL・認証情報）
    pub environments: BTreeMap<String, EnvironmentConfig>,

    /// 受信箱サービス
    #[serde(default)]
    pub inbox: InboxConfig,

    /// 課題トラッカー
    #[serde(default)]
    pub tracker: TrackerConfig,

    /// WebDriver設定
    #[serde(default)]
    pub webdriver: WebDriverConfig,

    /// 待機タイムアウト
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// リトライ設定
    #[serde(default)]
    pub retry: RetryConfig,

    /// 並列度
    #[serde(default)]
    pub concurrency: ConcurrencyConfig,
}

fn default_env_name() -> String {
    "staging".to_string()
}

impl SuiteConfig {
    /// YAML文字列から読み込む
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: SuiteConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// YAMLファイルから読み込む
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    /// 環境名から環境定義を引く
    pub fn environment(&self, name: &str) -> Result<&EnvironmentConfig, ConfigError> {
        self.environments
            .get(name)
            .ok_or_else(|| ConfigError::UnknownEnvironment {
                name: name.to_string(),
                known: self
                    .environments
                    .keys()
                    .cloned()
                    .collect::<Vec<_>>()
                    .join(", "),
            })
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.environments.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one environment must be defined".to_string(),
            ));
        }
        for (name, env) in &self.environments {
            if env.api_url.trim().is_empty() || env.web_url.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "environment '{name}' must define api_url and web_url"
                )));
            }
        }
        if self.retry.attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// 認証情報
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Credentials {
    /// メールアドレス
    pub email: String,
    /// パスワード
    #[serde(default)]
    pub password: String,
}

/// 1環境分の定義
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Web UIのベースURL
    pub web_url: String,
    /// REST APIのベースURL
    pub api_url: String,
    /// 管理者アカウント
    pub admin: Credentials,
    /// プロビジョニングの起点にするSPC会社ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spc_company_id: Option<String>,
    /// テスト用ライセンスキー
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub license_keys: Vec<String>,
}

/// 受信箱サービス設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboxConfig {
    /// APIベースURL
    #[serde(default = "default_inbox_url")]
    pub api_url: String,
    /// 受信用の固定ドメイン
    #[serde(default = "default_inbox_domain")]
    pub domain: String,
    /// APIトークン
    #[serde(default)]
    pub token: String,
}

fn default_inbox_url() -> String {
    "https://mail-api.example.com/api/v2".to_string()
}

fn default_inbox_domain() -> String {
    "e2e.example.com".to_string()
}

impl Default for InboxConfig {
    fn default() -> Self {
        Self {
            api_url: default_inbox_url(),
            domain: default_inbox_domain(),
            token: String::new(),
        }
    }
}

/// 課題トラッカー設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// APIベースURL
    #[serde(default = "default_tracker_url")]
    pub api_url: String,
    /// `owner/name` 形式のリポジトリ
    #[serde(default)]
    pub repo: String,
    /// APIトークン（任意）
    #[serde(default)]
    pub token: String,
}

fn default_tracker_url() -> String {
    "https://api.github.com".to_string()
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            api_url: default_tracker_url(),
            repo: String::new(),
            token: String::new(),
        }
    }
}

/// WebDriver接続方式
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WebDriverMode {
    /// ローカルのchromedriver
    #[default]
    Local,
    /// リモートのSeleniumグリッド
    Remote,
}

impl std::str::FromStr for WebDriverMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(WebDriverMode::Local),
            "remote" => Ok(WebDriverMode::Remote),
            other => Err(format!("unknown webdriver mode: {other}")),
        }
    }
}

/// WebDriver設定
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebDriverConfig {
    /// 接続方式
    #[serde(default)]
    pub mode: WebDriverMode,
    /// WebDriverエンドポイント
    #[serde(default = "default_webdriver_url")]
    pub url: String,
    /// ヘッドレス起動
    #[serde(default = "default_headless")]
    pub headless: bool,
    /// ウィンドウサイズ [幅, 高さ]
    #[serde(default = "default_window")]
    pub window: [u32; 2],
    /// 失敗時スクリーンショットの保存先
    #[serde(default = "default_screenshot_dir")]
    pub screenshot_dir: String,
}

fn default_webdriver_url() -> String {
    "http://localhost:9515".to_string()
}

fn default_headless() -> bool {
    true
}

fn default_window() -> [u32; 2] {
    [1600, 1000]
}

fn default_screenshot_dir() -> String {
    "target/screenshots".to_string()
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            mode: WebDriverMode::default(),
            url: default_webdriver_url(),
            headless: default_headless(),
            window: default_window(),
            screenshot_dir: default_screenshot_dir(),
        }
    }
}

/// 待機タイムアウト設定
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// ポーリング間隔（ミリ秒）
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// メール到着待ち（秒）
    #[serde(default = "default_email_secs")]
    pub email_secs: u64,
    /// オブジェクト取り込み待ち（秒）
    #[serde(default = "default_ingestion_secs")]
    pub ingestion_secs: u64,
    /// UI要素待ち（秒）
    #[serde(default = "default_ui_secs")]
    pub ui_secs: u64,
    /// HTTPリクエスト単体のタイムアウト（秒）
    #[serde(default = "default_request_secs")]
    pub request_secs: u64,
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_email_secs() -> u64 {
    120
}

fn default_ingestion_secs() -> u64 {
    180
}

fn default_ui_secs() -> u64 {
    20
}

fn default_request_secs() -> u64 {
    30
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            email_secs: default_email_secs(),
            ingestion_secs: default_ingestion_secs(),
            ui_secs: default_ui_secs(),
            request_secs: default_request_secs(),
        }
    }
}

/// リトライ設定
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryConfig {
    /// 最大試行回数（初回含む）
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    /// 初回待機（ミリ秒）
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// 待機上限（ミリ秒）
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_attempts() -> u32 {
    4
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    8000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// 並列度設定
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConcurrencyConfig {
    /// カメラ同時作成数
    #[serde(default = "default_camera_provisioning")]
    pub camera_provisioning: usize,
}

fn default_camera_provisioning() -> usize {
    4
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            camera_provisioning: default_camera_provisioning(),
        }
    }
}
