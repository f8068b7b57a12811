//! 共通型定義
//!
//! Company, User, Camera等、バックエンドREST資源を写した値オブジェクト。
//! いずれも呼び出しごとに取得し直す前提で、キャッシュ保証は持たない。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// テナント階層上の会社種別
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CompanyKind {
    /// Service Provider Company
    Spc,
    /// Integrator Company
    Ic,
    /// End User Company
    Euc,
}

impl CompanyKind {
    /// `child` をこの種別の子会社として作成できるか
    ///
    /// SPC → IC → EUC の一方向のみ許可される。
    pub fn can_parent(self, child: CompanyKind) -> bool {
        matches!(
            (self, child),
            (CompanyKind::Spc, CompanyKind::Ic) | (CompanyKind::Ic, CompanyKind::Euc)
        )
    }

    /// 表示用の短縮名
    pub fn as_str(self) -> &'static str {
        match self {
            CompanyKind::Spc => "spc",
            CompanyKind::Ic => "ic",
            CompanyKind::Euc => "euc",
        }
    }
}

/// 会社（テナント）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Company {
    /// 会社ID
    pub id: String,
    /// 会社名
    pub name: String,
    /// 種別
    pub kind: CompanyKind,
    /// 親会社ID（SPCはNone）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// 作成日時
    pub created_at: DateTime<Utc>,
}

/// ユーザーロール
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// 管理者
    Admin,
    /// オペレーター
    Operator,
    /// 閲覧のみ
    Viewer,
}

impl UserRole {
    /// UI上の表示ラベル
    pub fn label(self) -> &'static str {
        match self {
            UserRole::Admin => "Admin",
            UserRole::Operator => "Operator",
            UserRole::Viewer => "Viewer",
        }
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(UserRole::Admin),
            "operator" => Ok(UserRole::Operator),
            "viewer" => Ok(UserRole::Viewer),
            other => Err(format!("unknown user role: {other}")),
        }
    }
}

/// ユーザー状態
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    /// 招待済み（未アクティベート）
    Invited,
    /// 有効
    Active,
    /// 無効化済み
    Disabled,
}

/// ユーザー
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    /// ユーザーID
    pub id: String,
    /// メールアドレス
    pub email: String,
    /// 表示名
    #[serde(default)]
    pub name: String,
    /// ロール
    pub role: UserRole,
    /// 所属会社ID
    pub company_id: String,
    /// 状態
    pub status: UserStatus,
}

/// ロケーション（カメラの設置場所）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Location {
    /// ロケーションID
    pub id: String,
    /// 名前
    pub name: String,
    /// 住所
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// タイムゾーン（IANA名）
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// 親ロケーションID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

/// カメラ状態
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CameraStatus {
    /// 登録直後（ストリーム未確認）
    Pending,
    /// オンライン
    Online,
    /// オフライン
    Offline,
}

/// カメラ
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Camera {
    /// カメラID
    pub id: String,
    /// 名前
    pub name: String,
    /// ストリームURL（RTSP等）
    pub stream_url: String,
    /// 設置ロケーションID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    /// 状態
    pub status: CameraStatus,
    /// 解析有効フラグ
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// 割り当て済みライセンスID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_id: Option<String>,
}

fn default_true() -> bool {
    true
}

/// ライセンス
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct License {
    /// ライセンスID
    pub id: String,
    /// ライセンスキー
    pub key: String,
    /// プラン名
    pub plan: String,
    /// 総シート数（カメラ台数）
    pub seats: u32,
    /// 使用中シート数
    pub used: u32,
    /// 有効期限
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl License {
    /// 空きシート数
    pub fn free_seats(&self) -> u32 {
        self.seats.saturating_sub(self.used)
    }

    /// `now` 時点で期限切れか
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at <= now).unwrap_or(false)
    }
}

/// APIトークン
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiToken {
    /// トークンID
    pub id: String,
    /// 名前
    pub name: String,
    /// スコープ
    #[serde(default)]
    pub scopes: Vec<String>,
    /// 作成日時
    pub created_at: DateTime<Utc>,
    /// 最終使用日時
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_used_at: Option<DateTime<Utc>>,
}

/// トークン作成レスポンス（シークレットは作成時のみ返る）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreatedToken {
    /// 作成されたトークン
    pub token: ApiToken,
    /// 平文シークレット
    pub secret: String,
}

/// ウィジェット種別
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WidgetKind {
    /// カウンター
    Counter,
    /// 折れ線グラフ
    LineChart,
    /// 棒グラフ
    BarChart,
    /// ヒートマップ
    Heatmap,
    /// 表
    Table,
}

/// ダッシュボードウィジェット
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Widget {
    /// ウィジェットID
    pub id: String,
    /// 種別
    pub kind: WidgetKind,
    /// タイトル
    pub title: String,
    /// 対象カメラID
    #[serde(default)]
    pub camera_ids: Vec<String>,
    /// 自動更新間隔（秒）。Noneは自動更新なし
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub autorefresh_secs: Option<u32>,
}

/// ダッシュボードレイアウト
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Layout {
    /// レイアウトID
    pub id: String,
    /// 名前
    pub name: String,
    /// 配置されたウィジェット
    #[serde(default)]
    pub widgets: Vec<Widget>,
}

impl Layout {
    /// タイトルでウィジェットを探す
    pub fn widget(&self, title: &str) -> Option<&Widget> {
        self.widgets.iter().find(|w| w.title == title)
    }
}

/// 時系列データ点
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataPoint {
    /// 時刻
    pub ts: DateTime<Utc>,
    /// 値
    pub value: f64,
}

/// ウィジェットの描画データ
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WidgetData {
    /// ウィジェットID
    pub widget_id: String,
    /// 最終更新時刻（自動更新ごとに進む）
    pub updated_at: DateTime<Utc>,
    /// 集計値
    pub total: u64,
    /// 時系列
    #[serde(default)]
    pub series: Vec<DataPoint>,
}

/// 検出オブジェクト
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectedObject {
    /// オブジェクトID
    pub id: String,
    /// 検出元カメラID
    pub camera_id: String,
    /// 種別（person, car 等）
    pub object_type: String,
    /// 検出時刻
    pub detected_at: DateTime<Utc>,
    /// 信頼度 (0.0-1.0)
    pub confidence: f32,
}

/// オブジェクト検索結果の1ページ
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObjectPage {
    /// 検出オブジェクト
    pub objects: Vec<DetectedObject>,
    /// 条件に一致する総件数
    pub total: u64,
}

/// ログインレスポンス
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthTokens {
    /// アクセストークン
    pub access_token: String,
    /// 有効期間（秒）
    pub expires_in: u64,
    /// ログインユーザー
    pub user: User,
}
