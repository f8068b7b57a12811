//! カメラ・ロケーション管理

use camsuite::browser::pages::{CamerasPage, Page};
use camsuite::cache::camera_cache;
use camsuite::fixtures::{unique_name, Resource};
use camsuite_common::protocol::{CreateCameraRequest, UpdateCameraRequest};
use camsuite_common::types::CameraStatus;

use crate::common;

#[tokio::test]
async fn test_camera_created_via_api_is_listed_in_ui() {
    require_e2e!();
    let ctx = common::context().await;
    let location = ctx.location().await.unwrap();
    let camera = ctx.camera(Some(&location)).await.unwrap();

    let browser = common::admin_browser(&ctx).await;
    let page = CamerasPage::new(&browser);
    page.open().await.unwrap();
    page.wait_for_camera(&camera.name).await.unwrap();

    assert!(page.camera_names().await.unwrap().contains(&camera.name));
    common::close_browser(browser, "cameras-listed").await;
    common::finish(ctx).await;
}

#[tokio::test]
async fn test_add_camera_dialog_creates_camera() {
    require_e2e!();
    let ctx = common::context().await;
    let name = unique_name("camera");
    let stream_url = CreateCameraRequest::synthetic(name.clone(), None).stream_url;

    let browser = common::admin_browser(&ctx).await;
    let page = CamerasPage::new(&browser);
    page.open().await.unwrap();
    let dialog = page.open_add_dialog().await.unwrap();
    dialog.fill(&name, &stream_url).await.unwrap();
    dialog.submit().await.unwrap();
    page.wait_for_camera(&name).await.unwrap();

    // UIで作ったものも後始末の対象にする
    camera_cache().invalidate();
    let created = camera_cache()
        .find_by_name(ctx.api(), &name)
        .await
        .unwrap()
        .expect("camera visible through the API");
    ctx.ledger().register(Resource::Camera(created.id));

    common::close_browser(browser, "camera-added").await;
    common::finish(ctx).await;
}

#[tokio::test]
async fn test_add_camera_dialog_rejects_invalid_stream_url() {
    require_e2e!();
    let ctx = common::context().await;

    let browser = common::admin_browser(&ctx).await;
    let page = CamerasPage::new(&browser);
    page.open().await.unwrap();
    let dialog = page.open_add_dialog().await.unwrap();
    dialog
        .fill(&unique_name("camera"), "not a stream url")
        .await
        .unwrap();
    let errors = dialog.submit_expecting_errors().await.unwrap();

    assert!(!errors.is_empty());
    common::close_browser(browser, "camera-invalid-url").await;
    common::finish(ctx).await;
}

#[tokio::test]
async fn test_deleting_camera_in_ui_removes_it() {
    require_e2e!();
    let ctx = common::context().await;
    let camera = ctx.camera(None).await.unwrap();

    let browser = common::admin_browser(&ctx).await;
    let page = CamerasPage::new(&browser);
    page.open().await.unwrap();
    page.delete_camera(&camera.name).await.unwrap();

    let err = ctx.api().get_camera(&camera.id).await.unwrap_err();
    assert!(err.is_not_found());
    common::close_browser(browser, "camera-deleted").await;
    // 台帳には残っているが、既に消えている扱いになる
    common::finish(ctx).await;
}

#[tokio::test]
async fn test_disabled_camera_goes_offline() {
    require_e2e!();
    let ctx = common::context().await;
    let camera = ctx.camera(None).await.unwrap();

    ctx.api()
        .update_camera(
            &camera.id,
            &UpdateCameraRequest {
                enabled: Some(false),
                ..UpdateCameraRequest::default()
            },
        )
        .await
        .unwrap();
    let updated = ctx
        .api()
        .wait_for_camera_status(&camera.id, CameraStatus::Offline, ctx.env.ingestion_poll())
        .await
        .unwrap();

    assert!(!updated.enabled);
    common::finish(ctx).await;
}

#[tokio::test]
async fn test_moving_camera_between_locations() {
    require_e2e!();
    let ctx = common::context().await;
    let lobby = ctx.location().await.unwrap();
    let garage = ctx.location().await.unwrap();
    let camera = ctx.camera(Some(&lobby)).await.unwrap();

    let moved = ctx
        .api()
        .update_camera(
            &camera.id,
            &UpdateCameraRequest {
                location_id: Some(garage.id.clone()),
                ..UpdateCameraRequest::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(moved.location_id.as_deref(), Some(garage.id.as_str()));
    common::finish(ctx).await;
}
