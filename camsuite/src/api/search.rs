//! 検出オブジェクト検索API

use super::ApiClient;
use crate::error::Result;
use crate::eventual::{wait_for_value, Poll};
use camsuite_common::protocol::ObjectSearchRequest;
use camsuite_common::types::{DetectedObject, ObjectPage};
use tracing::debug;

impl ApiClient {
    /// 1ページ分を検索
    pub async fn search_objects(&self, request: &ObjectSearchRequest) -> Result<ObjectPage> {
        self.post("/search/objects", request).await
    }

    /// `total` に達するまでページを辿って全件取得する
    ///
    /// `request.limit` をページサイズ、`request.offset` を開始位置として使う。
    /// 空ページが返った時点でも打ち切る。
    pub async fn search_all_objects(
        &self,
        request: &ObjectSearchRequest,
    ) -> Result<Vec<DetectedObject>> {
        self.search_objects_up_to(request, None).await
    }

    /// 最大 `max` 件に達した時点でページングを止める
    ///
    /// 最後のページは残り件数だけを要求する。
    pub async fn search_objects_up_to(
        &self,
        request: &ObjectSearchRequest,
        max: Option<usize>,
    ) -> Result<Vec<DetectedObject>> {
        let mut page_request = request.clone();
        let mut objects = Vec::new();

        loop {
            if let Some(max) = max {
                let remaining = max.saturating_sub(objects.len());
                if remaining == 0 {
                    break;
                }
                page_request.limit = page_request
                    .limit
                    .min(u32::try_from(remaining).unwrap_or(u32::MAX))
                    .max(1);
            }

            let page = self.search_objects(&page_request).await?;
            let fetched = page.objects.len() as u64;
            debug!(
                offset = page_request.offset,
                fetched,
                total = page.total,
                "Fetched object page"
            );
            objects.extend(page.objects);

            page_request.offset += fetched;
            if fetched == 0 || page_request.offset >= page.total {
                break;
            }
        }

        if let Some(max) = max {
            objects.truncate(max);
        }
        Ok(objects)
    }

    /// 検索件数が `expected` 以上になるまで待つ（取り込み完了待ち）
    pub async fn wait_for_object_count(
        &self,
        request: &ObjectSearchRequest,
        expected: u64,
        poll: Poll,
    ) -> Result<u64> {
        let what = format!("{expected} ingested objects");
        wait_for_value(poll, &what, || async move {
            let page = self.search_objects(request).await?;
            Ok((page.total >= expected).then_some(page.total))
        })
        .await
    }
}
