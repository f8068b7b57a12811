//! camsuite共通ライブラリ
//!
//! バックエンドREST資源の値オブジェクト、リクエストペイロード、YAML設定モデル

#![warn(missing_docs)]

/// 設定管理（YAMLファイルモデル）
pub mod config;

/// リクエストペイロード定義
pub mod protocol;

/// バックエンド資源の型定義
pub mod types;
