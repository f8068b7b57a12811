//! カメラAPI
//!
//! 変更系の呼び出しはプロセス内カメラキャッシュを無効化し、
//! 対象IDを変更済みキューに積む。

use super::ApiClient;
use crate::cache::camera_cache;
use crate::error::Result;
use crate::eventual::{wait_for_value, Poll};
use camsuite_common::protocol::{
    CreateCameraRequest, IngestObjectsRequest, SyntheticObject, UpdateCameraRequest,
};
use camsuite_common::types::{Camera, CameraStatus};
use tracing::{debug, info};

impl ApiClient {
    /// カメラ一覧（キャッシュを通さない）
    pub async fn list_cameras(&self) -> Result<Vec<Camera>> {
        self.get("/cameras").await
    }

    /// カメラを取得
    pub async fn get_camera(&self, id: &str) -> Result<Camera> {
        self.get(&format!("/cameras/{id}")).await
    }

    /// カメラを作成
    pub async fn create_camera(&self, request: &CreateCameraRequest) -> Result<Camera> {
        let camera: Camera = self.post("/cameras", request).await?;
        camera_cache().mark_changed(&camera.id);
        info!(camera_id = %camera.id, name = %camera.name, "Camera created");
        Ok(camera)
    }

    /// カメラを部分更新
    pub async fn update_camera(&self, id: &str, request: &UpdateCameraRequest) -> Result<Camera> {
        let camera: Camera = self.patch(&format!("/cameras/{id}"), request).await?;
        camera_cache().mark_changed(id);
        Ok(camera)
    }

    /// カメラを削除
    pub async fn delete_camera(&self, id: &str) -> Result<()> {
        self.delete(&format!("/cameras/{id}")).await?;
        camera_cache().mark_changed(id);
        info!(camera_id = %id, "Camera deleted");
        Ok(())
    }

    /// 合成検出オブジェクトを投入する（非同期に取り込まれる）
    pub async fn ingest_objects(&self, camera_id: &str, objects: Vec<SyntheticObject>) -> Result<()> {
        let count = objects.len();
        self.post_no_content(
            &format!("/cameras/{camera_id}/objects"),
            &IngestObjectsRequest { objects },
        )
        .await?;
        debug!(camera_id, count, "Objects submitted for ingestion");
        Ok(())
    }

    /// カメラが指定の状態になるまで待つ
    pub async fn wait_for_camera_status(
        &self,
        id: &str,
        status: CameraStatus,
        poll: Poll,
    ) -> Result<Camera> {
        let what = format!("camera {id} to become {status:?}");
        wait_for_value(poll, &what, || async move {
            let camera = self.get_camera(id).await?;
            Ok((camera.status == status).then_some(camera))
        })
        .await
    }
}
