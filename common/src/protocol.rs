//! リクエストペイロード定義
//!
//! ハーネス→バックエンドREST APIへ送るボディ。未指定のオプション項目は送信しない。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{CompanyKind, UserRole, WidgetKind};

/// ログインリクエスト
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoginRequest {
    /// メールアドレス
    pub email: String,
    /// パスワード
    pub password: String,
}

/// セルフサインアップリクエスト（確認メールが送信される）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignupRequest {
    /// メールアドレス
    pub email: String,
    /// パスワード
    pub password: String,
    /// 表示名
    pub name: String,
    /// 新規作成する会社名
    pub company_name: String,
}

/// サインアップレスポンス
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SignupResponse {
    /// 作成されたユーザーID
    pub user_id: String,
    /// 作成された会社ID
    pub company_id: String,
}

/// メールアドレス確認リクエスト
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VerifyEmailRequest {
    /// メールに記載された確認コード
    pub code: String,
}

/// パスワードリセット要求
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PasswordResetRequest {
    /// 対象メールアドレス
    pub email: String,
}

/// 会社作成リクエスト
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateCompanyRequest {
    /// 会社名
    pub name: String,
    /// 種別
    pub kind: CompanyKind,
    /// 親会社ID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

/// 会社更新リクエスト
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpdateCompanyRequest {
    /// 新しい会社名
    pub name: String,
}

/// ユーザー招待リクエスト
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InviteUserRequest {
    /// 招待先メールアドレス
    pub email: String,
    /// 付与するロール
    pub role: UserRole,
}

/// ユーザー更新リクエスト
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpdateUserRequest {
    /// 新しいロール
    pub role: UserRole,
}

/// ロケーション作成リクエスト
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateLocationRequest {
    /// 名前
    pub name: String,
    /// 住所
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// タイムゾーン
    pub timezone: String,
    /// 親ロケーションID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

/// カメラ作成リクエスト
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateCameraRequest {
    /// 名前
    pub name: String,
    /// ストリームURL
    pub stream_url: String,
    /// 設置ロケーションID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    /// 有効化する解析（"people_counting" 等）
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub analytics: Vec<String>,
}

impl CreateCameraRequest {
    /// テスト用ダミーストリームを指すカメラ作成リクエスト
    pub fn synthetic(name: impl Into<String>, location_id: Option<String>) -> Self {
        let name = name.into();
        Self {
            stream_url: format!("rtsp://synthetic.invalid/{name}"),
            name,
            location_id,
            analytics: vec!["object_detection".to_string()],
        }
    }
}

/// カメラ更新リクエスト（部分更新）
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UpdateCameraRequest {
    /// 名前
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// ロケーションID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    /// 有効フラグ
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

/// ライセンス有効化リクエスト
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivateLicenseRequest {
    /// ライセンスキー
    pub key: String,
}

/// ライセンス割り当てリクエスト
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssignLicenseRequest {
    /// 割り当て先カメラID
    pub camera_id: String,
}

/// APIトークン作成リクエスト
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateTokenRequest {
    /// 名前
    pub name: String,
    /// スコープ
    #[serde(default)]
    pub scopes: Vec<String>,
}

/// レイアウト作成リクエスト
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateLayoutRequest {
    /// 名前
    pub name: String,
}

/// ウィジェット追加リクエスト
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddWidgetRequest {
    /// 種別
    pub kind: WidgetKind,
    /// タイトル
    pub title: String,
    /// 対象カメラ
    #[serde(default)]
    pub camera_ids: Vec<String>,
    /// 自動更新間隔（秒）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autorefresh_secs: Option<u32>,
}

/// オブジェクト検索リクエスト
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObjectSearchRequest {
    /// 対象カメラ（空は全カメラ）
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub camera_ids: Vec<String>,
    /// 検索開始時刻
    pub from: DateTime<Utc>,
    /// 検索終了時刻
    pub to: DateTime<Utc>,
    /// 種別フィルタ（空は全種別）
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub object_types: Vec<String>,
    /// 取得件数上限
    pub limit: u32,
    /// 取得開始位置
    #[serde(default)]
    pub offset: u64,
}

/// フィーダーが投入する合成検出オブジェクト
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyntheticObject {
    /// 種別
    pub object_type: String,
    /// 検出時刻
    pub detected_at: DateTime<Utc>,
    /// 信頼度
    pub confidence: f32,
}

/// 検出オブジェクト投入リクエスト
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IngestObjectsRequest {
    /// 投入オブジェクト
    pub objects: Vec<SyntheticObject>,
}
