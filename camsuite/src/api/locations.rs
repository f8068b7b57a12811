//! ロケーションAPI

use super::ApiClient;
use crate::error::Result;
use camsuite_common::protocol::CreateLocationRequest;
use camsuite_common::types::Location;

impl ApiClient {
    /// ロケーション一覧
    pub async fn list_locations(&self) -> Result<Vec<Location>> {
        self.get("/locations").await
    }

    /// ロケーションを作成
    pub async fn create_location(&self, request: &CreateLocationRequest) -> Result<Location> {
        self.post("/locations", request).await
    }

    /// ロケーションを削除
    pub async fn delete_location(&self, id: &str) -> Result<()> {
        self.delete(&format!("/locations/{id}")).await
    }
}
