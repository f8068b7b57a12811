//! 検出オブジェクトの取り込みと検索

use camsuite::cli::feeder::synthetic_objects;
use camsuite_common::protocol::ObjectSearchRequest;
use chrono::{Duration, Utc};

use crate::common;

#[tokio::test]
async fn test_ingested_objects_become_searchable() {
    require_e2e!();
    let ctx = common::context().await;
    let camera = ctx.camera(None).await.unwrap();
    let now = Utc::now();
    ctx.api()
        .ingest_objects(&camera.id, synthetic_objects(30, "person", now))
        .await
        .unwrap();

    let request = ObjectSearchRequest {
        camera_ids: vec![camera.id.clone()],
        from: now - Duration::hours(1),
        to: now + Duration::minutes(5),
        object_types: vec!["person".into()],
        limit: 10,
        offset: 0,
    };
    let total = ctx
        .api()
        .wait_for_object_count(&request, 30, ctx.env.ingestion_poll())
        .await
        .unwrap();
    assert_eq!(total, 30);

    let objects = ctx.api().search_all_objects(&request).await.unwrap();
    assert_eq!(objects.len(), 30);
    assert!(objects.iter().all(|o| o.camera_id == camera.id));
    common::finish(ctx).await;
}

#[tokio::test]
async fn test_type_filter_excludes_other_objects() {
    require_e2e!();
    let ctx = common::context().await;
    let camera = ctx.camera(None).await.unwrap();
    let now = Utc::now();
    ctx.api()
        .ingest_objects(&camera.id, synthetic_objects(5, "vehicle", now))
        .await
        .unwrap();

    let mut request = ObjectSearchRequest {
        camera_ids: vec![camera.id.clone()],
        from: now - Duration::hours(1),
        to: now + Duration::minutes(5),
        object_types: vec!["vehicle".into()],
        limit: 50,
        offset: 0,
    };
    ctx.api()
        .wait_for_object_count(&request, 5, ctx.env.ingestion_poll())
        .await
        .unwrap();

    request.object_types = vec!["person".into()];
    let page = ctx.api().search_objects(&request).await.unwrap();
    assert_eq!(page.total, 0);
    common::finish(ctx).await;
}
