//! camsuite - 映像解析SaaSのE2Eテストハーネス
//!
//! REST APIクライアント・ブラウザ操作・受信箱・課題トラッカーを束ね、
//! テストデータの作成と後始末、結果整合な状態の待機を提供する。

#![warn(missing_docs)]

/// エラー型
pub mod error;

/// 設定管理（環境変数ヘルパー・実行環境の決定）
pub mod config;

/// ロギング初期化ユーティリティ
pub mod logging;

/// 一時障害のリトライ
pub mod retry;

/// 結果整合な状態の待機（ポーリング）
pub mod eventual;

/// REST APIクライアント
pub mod api;

/// プロセス内カメラキャッシュ
pub mod cache;

/// テスト用受信箱
pub mod inbox;

/// 課題トラッカーによる実行ゲート
pub mod tracker;

/// プロビジョニングと後始末
pub mod fixtures;

/// ブラウザ操作とページオブジェクト
pub mod browser;

/// CLIサブコマンド
pub mod cli;

pub use error::{Result, SuiteError};
