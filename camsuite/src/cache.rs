//! プロセス内カメラキャッシュ
//!
//! カメラ一覧のキャッシュと「変更済みカメラ」キューを保持する。
//! テスト間の分離のための便宜で、正しさを担保する仕組みではない。
//! `TestContext` の生成時と後始末時に `clear()` される。

use crate::api::ApiClient;
use crate::error::Result;
use camsuite_common::types::Camera;
use once_cell::sync::Lazy;
use std::collections::VecDeque;
use std::sync::{Mutex, RwLock};
use tracing::debug;

static CAMERA_CACHE: Lazy<CameraCache> = Lazy::new(CameraCache::new);

/// プロセス共通のカメラキャッシュ
pub fn camera_cache() -> &'static CameraCache {
    &CAMERA_CACHE
}

/// カメラ一覧キャッシュと変更済みキュー
#[derive(Debug, Default)]
pub struct CameraCache {
    cameras: RwLock<Option<Vec<Camera>>>,
    changed: Mutex<VecDeque<String>>,
}

impl CameraCache {
    /// 空のキャッシュを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// キャッシュ済みの一覧を返す（未取得ならAPIから取得して保持）
    pub async fn cameras(&self, api: &ApiClient) -> Result<Vec<Camera>> {
        if let Some(cached) = self.cached() {
            return Ok(cached);
        }

        let cameras = api.list_cameras().await?;
        debug!(count = cameras.len(), "Camera cache filled");
        if let Ok(mut slot) = self.cameras.write() {
            *slot = Some(cameras.clone());
        }
        Ok(cameras)
    }

    /// 名前でカメラを探す
    pub async fn find_by_name(&self, api: &ApiClient, name: &str) -> Result<Option<Camera>> {
        Ok(self
            .cameras(api)
            .await?
            .into_iter()
            .find(|camera| camera.name == name))
    }

    /// キャッシュ済みの一覧（取得はしない）
    pub fn cached(&self) -> Option<Vec<Camera>> {
        self.cameras.read().ok().and_then(|slot| slot.clone())
    }

    /// 一覧キャッシュを破棄する
    pub fn invalidate(&self) {
        if let Ok(mut slot) = self.cameras.write() {
            *slot = None;
        }
    }

    /// 変更済みとして記録し、一覧キャッシュを破棄する
    ///
    /// 既にキューにあるIDは重複して積まない。
    pub fn mark_changed(&self, camera_id: &str) {
        self.invalidate();
        if let Ok(mut queue) = self.changed.lock() {
            if !queue.iter().any(|id| id == camera_id) {
                queue.push_back(camera_id.to_string());
            }
        }
    }

    /// 変更済みキューを取り出す（先入れ先出し）
    pub fn drain_changed(&self) -> Vec<String> {
        self.changed
            .lock()
            .map(|mut queue| queue.drain(..).collect())
            .unwrap_or_default()
    }

    /// 変更済みキューの件数
    pub fn pending_changes(&self) -> usize {
        self.changed.lock().map(|queue| queue.len()).unwrap_or(0)
    }

    /// 一覧キャッシュと変更済みキューを両方クリアする
    pub fn clear(&self) {
        self.invalidate();
        if let Ok(mut queue) = self.changed.lock() {
            queue.clear();
        }
    }
}
