//! ダッシュボードのレイアウト・ウィジェットAPI

use super::ApiClient;
use crate::error::Result;
use crate::eventual::{wait_for_value, Poll};
use camsuite_common::protocol::{AddWidgetRequest, CreateLayoutRequest};
use camsuite_common::types::{Layout, Widget, WidgetData};
use chrono::{DateTime, Utc};
use tracing::info;

impl ApiClient {
    /// レイアウト一覧
    pub async fn list_layouts(&self) -> Result<Vec<Layout>> {
        self.get("/layouts").await
    }

    /// レイアウトを取得（ウィジェット含む）
    pub async fn get_layout(&self, id: &str) -> Result<Layout> {
        self.get(&format!("/layouts/{id}")).await
    }

    /// レイアウトを作成
    pub async fn create_layout(&self, name: &str) -> Result<Layout> {
        let layout: Layout = self
            .post(
                "/layouts",
                &CreateLayoutRequest {
                    name: name.to_string(),
                },
            )
            .await?;
        info!(layout_id = %layout.id, name, "Layout created");
        Ok(layout)
    }

    /// レイアウトを削除
    pub async fn delete_layout(&self, id: &str) -> Result<()> {
        self.delete(&format!("/layouts/{id}")).await
    }

    /// ウィジェットを追加
    pub async fn add_widget(&self, layout_id: &str, request: &AddWidgetRequest) -> Result<Widget> {
        self.post(&format!("/layouts/{layout_id}/widgets"), request)
            .await
    }

    /// ウィジェットを削除
    pub async fn remove_widget(&self, layout_id: &str, widget_id: &str) -> Result<()> {
        self.delete(&format!("/layouts/{layout_id}/widgets/{widget_id}"))
            .await
    }

    /// ウィジェットの描画データ
    pub async fn widget_data(&self, widget_id: &str) -> Result<WidgetData> {
        self.get(&format!("/widgets/{widget_id}/data")).await
    }

    /// 自動更新で `updated_at` が `since` より進むまで待つ
    pub async fn wait_for_widget_refresh(
        &self,
        widget_id: &str,
        since: DateTime<Utc>,
        poll: Poll,
    ) -> Result<WidgetData> {
        let what = format!("widget {widget_id} to refresh after {since}");
        wait_for_value(poll, &what, || async move {
            let data = self.widget_data(widget_id).await?;
            Ok((data.updated_at > since).then_some(data))
        })
        .await
    }
}
