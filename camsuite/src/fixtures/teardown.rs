//! 後始末台帳
//!
//! 作成したリソースを作成順に記録し、逆順にちょうど一度だけ削除する。

use crate::api::ApiClient;
use crate::cache::camera_cache;
use crate::error::{Result, SuiteError};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// 後始末対象のリソース
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resource {
    /// 会社
    Company(String),
    /// ユーザー
    User(String),
    /// カメラ
    Camera(String),
    /// ロケーション
    Location(String),
    /// ダッシュボードレイアウト
    Layout(String),
    /// APIトークン
    Token(String),
    /// ライセンスのカメラ割り当て
    LicenseAssignment {
        /// ライセンスID
        license_id: String,
        /// カメラID
        camera_id: String,
    },
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Company(id) => write!(f, "company {id}"),
            Resource::User(id) => write!(f, "user {id}"),
            Resource::Camera(id) => write!(f, "camera {id}"),
            Resource::Location(id) => write!(f, "location {id}"),
            Resource::Layout(id) => write!(f, "layout {id}"),
            Resource::Token(id) => write!(f, "token {id}"),
            Resource::LicenseAssignment {
                license_id,
                camera_id,
            } => write!(f, "license {license_id} on camera {camera_id}"),
        }
    }
}

impl Resource {
    /// 削除する。既に存在しなければ `Ok(false)`
    pub async fn delete(&self, api: &ApiClient) -> Result<bool> {
        match self {
            Resource::Company(id) => api.delete_idempotent(&format!("/companies/{id}")).await,
            Resource::User(id) => api.delete_idempotent(&format!("/users/{id}")).await,
            Resource::Camera(id) => {
                let deleted = api.delete_idempotent(&format!("/cameras/{id}")).await?;
                camera_cache().mark_changed(id);
                Ok(deleted)
            }
            Resource::Location(id) => api.delete_idempotent(&format!("/locations/{id}")).await,
            Resource::Layout(id) => api.delete_idempotent(&format!("/layouts/{id}")).await,
            Resource::Token(id) => api.delete_idempotent(&format!("/tokens/{id}")).await,
            Resource::LicenseAssignment {
                license_id,
                camera_id,
            } => match api.unassign_license(license_id, camera_id).await {
                Ok(_) => Ok(true),
                Err(SuiteError::NotFound(_)) => Ok(false),
                Err(e) => Err(e),
            },
        }
    }
}

/// 後始末の結果
#[derive(Debug, Default)]
pub struct TeardownReport {
    /// 削除したリソース
    pub deleted: Vec<Resource>,
    /// 既に存在しなかったリソース
    pub already_gone: Vec<Resource>,
    /// 削除に失敗したリソースとエラー
    pub failed: Vec<(Resource, String)>,
    /// 実行済みのため何もしなかった
    pub skipped: bool,
}

impl TeardownReport {
    /// 失敗がないか
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// 失敗があればエラーにする
    pub fn into_result(self) -> Result<()> {
        if self.is_clean() {
            return Ok(());
        }
        let details = self
            .failed
            .iter()
            .map(|(resource, error)| format!("{resource}: {error}"))
            .collect::<Vec<_>>()
            .join("; ");
        Err(SuiteError::Validation(format!(
            "teardown left {} resource(s) behind: {details}",
            self.failed.len()
        )))
    }
}

/// 後始末台帳
#[derive(Debug, Default)]
pub struct Teardown {
    entries: Mutex<Vec<Resource>>,
    done: AtomicBool,
}

impl Teardown {
    /// 空の台帳
    pub fn new() -> Self {
        Self::default()
    }

    /// リソースを記録する
    pub fn register(&self, resource: Resource) {
        debug!(%resource, "Registered for teardown");
        if let Ok(mut entries) = self.entries.lock() {
            entries.push(resource);
        }
    }

    /// テスト自身が削除したリソースを台帳から外す
    pub fn forget(&self, resource: &Resource) -> bool {
        let Ok(mut entries) = self.entries.lock() else {
            return false;
        };
        match entries.iter().rposition(|r| r == resource) {
            Some(index) => {
                entries.remove(index);
                true
            }
            None => false,
        }
    }

    /// 記録中のリソース（作成順）
    pub fn pending(&self) -> Vec<Resource> {
        self.entries
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }

    /// 記録件数
    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    /// 記録がないか
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 実行済みか
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::SeqCst)
    }

    /// 作成の逆順に削除する
    ///
    /// 2回目以降の呼び出しは何もしない。個々の失敗は記録して残りの削除を続ける。
    pub async fn run(&self, api: &ApiClient) -> TeardownReport {
        if self.done.swap(true, Ordering::SeqCst) {
            return TeardownReport {
                skipped: true,
                ..TeardownReport::default()
            };
        }

        let resources = self
            .entries
            .lock()
            .map(|mut entries| std::mem::take(&mut *entries))
            .unwrap_or_default();

        let mut report = TeardownReport::default();
        for resource in resources.into_iter().rev() {
            match resource.delete(api).await {
                Ok(true) => report.deleted.push(resource),
                Ok(false) => {
                    debug!(%resource, "Already deleted");
                    report.already_gone.push(resource);
                }
                Err(e) => {
                    warn!(%resource, error = %e, "Teardown failed");
                    report.failed.push((resource, e.to_string()));
                }
            }
        }

        info!(
            deleted = report.deleted.len(),
            already_gone = report.already_gone.len(),
            failed = report.failed.len(),
            "Teardown finished"
        );
        report
    }
}
