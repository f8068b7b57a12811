//! ライセンスAPI

use super::ApiClient;
use crate::cache::camera_cache;
use crate::error::Result;
use camsuite_common::protocol::{ActivateLicenseRequest, AssignLicenseRequest};
use camsuite_common::types::License;
use serde_json::json;
use tracing::info;

impl ApiClient {
    /// ライセンス一覧
    pub async fn list_licenses(&self) -> Result<Vec<License>> {
        self.get("/licenses").await
    }

    /// ライセンスを取得（一覧から検索）
    pub async fn get_license(&self, id: &str) -> Result<Option<License>> {
        Ok(self
            .list_licenses()
            .await?
            .into_iter()
            .find(|license| license.id == id))
    }

    /// ライセンスキーを有効化
    pub async fn activate_license(&self, key: &str) -> Result<License> {
        let license: License = self
            .post(
                "/licenses/activate",
                &ActivateLicenseRequest {
                    key: key.to_string(),
                },
            )
            .await?;
        info!(license_id = %license.id, plan = %license.plan, seats = license.seats, "License activated");
        Ok(license)
    }

    /// カメラにライセンスを割り当てる
    pub async fn assign_license(&self, license_id: &str, camera_id: &str) -> Result<License> {
        let license = self
            .post(
                &format!("/licenses/{license_id}/assign"),
                &AssignLicenseRequest {
                    camera_id: camera_id.to_string(),
                },
            )
            .await?;
        camera_cache().mark_changed(camera_id);
        Ok(license)
    }

    /// カメラからライセンスを外す
    pub async fn unassign_license(&self, license_id: &str, camera_id: &str) -> Result<License> {
        let license = self
            .post(
                &format!("/licenses/{license_id}/unassign"),
                &json!({ "camera_id": camera_id }),
            )
            .await?;
        camera_cache().mark_changed(camera_id);
        Ok(license)
    }
}
