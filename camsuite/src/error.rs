//! エラー型定義
//!
//! 統一エラー型（thiserror使用）
//!
//! テスト失敗はこのエラーを伝播させて表面化する。`is_transient()` が真のものだけが
//! リトライ対象になり、それ以外は即座にテストを失敗させる。

use camsuite_common::config::ConfigError;
use std::time::Duration;
use thiserror::Error;

/// ハーネス共通エラー
#[derive(Debug, Error)]
pub enum SuiteError {
    /// 設定エラー
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// HTTPトランスポートエラー（接続失敗・タイムアウト等）
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// バックエンドが成功以外のステータスを返した
    #[error("{method} {path} returned {status}: {body}")]
    Api {
        /// HTTPステータスコード
        status: u16,
        /// HTTPメソッド
        method: String,
        /// リクエストパス
        path: String,
        /// レスポンスボディ（先頭のみ）
        body: String,
        /// `Retry-After` ヘッダの値
        retry_after: Option<Duration>,
    },

    /// 資源が存在しない
    #[error("Not found: {0}")]
    NotFound(String),

    /// 認証失敗（再認証後も401）
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// 待機タイムアウト
    #[error("Timed out after {elapsed:?} waiting for {what}")]
    Timeout {
        /// 待機対象
        what: String,
        /// 経過時間
        elapsed: Duration,
    },

    /// 受信箱サービスのエラー
    #[error("Inbox error: {0}")]
    Inbox(String),

    /// 課題トラッカーのエラー
    #[error("Issue tracker error: {0}")]
    Tracker(String),

    /// WebDriverのエラー
    #[error("WebDriver error: {0}")]
    WebDriver(String),

    /// I/Oエラー
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSONシリアライズエラー
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 入力値・前提条件の検証エラー
    #[error("Validation error: {0}")]
    Validation(String),
}

/// ハーネス共通のResult
pub type Result<T> = std::result::Result<T, SuiteError>;

/// リトライ対象とするHTTPステータス
const TRANSIENT_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

impl SuiteError {
    /// 一時的な障害（リトライで回復し得る）か
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_connect() || e.is_timeout(),
            Self::Api { status, .. } => TRANSIENT_STATUSES.contains(status),
            _ => false,
        }
    }

    /// サーバーが通知した再試行までの待機時間
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Api { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// バックエンドのHTTPステータス（Apiエラーのみ）
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// `NotFound` か
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

impl From<fantoccini::error::CmdError> for SuiteError {
    fn from(e: fantoccini::error::CmdError) -> Self {
        Self::WebDriver(e.to_string())
    }
}

impl From<fantoccini::error::NewSessionError> for SuiteError {
    fn from(e: fantoccini::error::NewSessionError) -> Self {
        Self::WebDriver(format!("failed to start session: {e}"))
    }
}
