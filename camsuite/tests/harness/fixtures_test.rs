//! プロビジョニングヘルパー

use camsuite::fixtures::{create_cameras_bounded, TestContext, NAME_PREFIX};
use camsuite::SuiteError;
use camsuite_common::protocol::CreateCameraRequest;
use camsuite_common::types::{CompanyKind, UserRole, UserStatus, WidgetKind};
use chrono::{Duration, Utc};
use serial_test::serial;

use crate::support::{self, backend::StubBackend, INBOX_DOMAIN, LICENSE_KEY};

async fn context(backend: &StubBackend) -> TestContext {
    support::init_tracing();
    TestContext::with_env(backend.env())
        .await
        .expect("context logs in")
}

#[tokio::test]
#[serial]
async fn test_company_tree_links_parents() {
    let backend = StubBackend::start().await;
    let ctx = context(&backend).await;

    let tree = ctx.company_tree().await.unwrap();

    assert_eq!(tree.spc.kind, CompanyKind::Spc);
    assert_eq!(tree.ic.parent_id.as_deref(), Some(tree.spc.id.as_str()));
    assert_eq!(tree.euc.parent_id.as_deref(), Some(tree.ic.id.as_str()));
    assert!(tree.spc.name.starts_with(NAME_PREFIX));
    assert_eq!(ctx.ledger().len(), 3);

    let report = ctx.teardown().await;
    assert!(report.is_clean(), "{report:?}");
    assert_eq!(backend.companies().len(), 1);
}

#[tokio::test]
#[serial]
async fn test_invalid_hierarchy_is_rejected_locally() {
    let backend = StubBackend::start().await;
    let ctx = context(&backend).await;
    let euc = ctx.company(CompanyKind::Euc, None).await.unwrap();

    let err = ctx
        .company(CompanyKind::Spc, Some(&euc))
        .await
        .unwrap_err();

    assert!(matches!(err, SuiteError::Validation(_)), "got {err:?}");
    assert_eq!(ctx.ledger().len(), 1);
    ctx.teardown().await.into_result().unwrap();
}

#[tokio::test]
#[serial]
async fn test_invited_user_uses_inbox_domain() {
    let backend = StubBackend::start().await;
    let ctx = context(&backend).await;

    let user = ctx.user(UserRole::Operator).await.unwrap();

    assert!(user.email.ends_with(&format!("@{INBOX_DOMAIN}")));
    assert_eq!(user.role, UserRole::Operator);
    assert_eq!(user.status, UserStatus::Invited);

    ctx.teardown().await.into_result().unwrap();
    assert!(backend.users().iter().all(|u| u.id != user.id));
}

#[tokio::test]
#[serial]
async fn test_verified_user_completes_signup_by_email() {
    let backend = StubBackend::start().await;
    let ctx = context(&backend).await;

    let verified = ctx.verified_user().await.expect("signup flow completes");

    assert_eq!(verified.user.status, UserStatus::Active);
    assert_eq!(verified.user.email, verified.email);
    assert_eq!(verified.inbox.address(), verified.email);
    assert!(verified.api.is_authenticated().await);
    // 管理者のセッションは別物
    assert_ne!(
        verified.api.session().await.access_token,
        ctx.api().session().await.access_token
    );

    let report = ctx.teardown().await;
    assert!(report.is_clean(), "{report:?}");
    assert!(backend.users().iter().all(|u| u.email != verified.email));
}

#[tokio::test]
#[serial]
async fn test_cameras_are_created_concurrently_and_registered() {
    let backend = StubBackend::start().await;
    let ctx = context(&backend).await;
    let location = ctx.location().await.unwrap();

    let cameras = ctx.cameras(7, Some(&location)).await.unwrap();

    assert_eq!(cameras.len(), 7);
    assert!(cameras
        .iter()
        .all(|c| c.location_id.as_deref() == Some(location.id.as_str())));
    assert_eq!(backend.cameras().len(), 7);
    assert_eq!(ctx.ledger().len(), 8);

    // ロケーションはカメラより先に作られたので最後に消える
    let report = ctx.teardown().await;
    assert!(report.is_clean(), "{report:?}");
    assert!(backend.cameras().is_empty());
}

#[tokio::test]
#[serial]
async fn test_bounded_creation_keeps_request_order() {
    let backend = StubBackend::start().await;
    let ctx = context(&backend).await;
    let mut requests: Vec<_> = (0..5)
        .map(|i| CreateCameraRequest::synthetic(format!("ordered-{i}"), None))
        .collect();
    requests[2].stream_url = "http://not-a-stream".into();

    let results = create_cameras_bounded(ctx.api(), requests, 2).await;

    assert_eq!(results.len(), 5);
    for (i, result) in results.iter().enumerate() {
        match result {
            Ok(camera) => assert_eq!(camera.name, format!("ordered-{i}")),
            Err(e) => {
                assert_eq!(i, 2);
                assert_eq!(e.status(), Some(422));
            }
        }
    }
    for camera in results.into_iter().flatten() {
        ctx.api().delete_camera(&camera.id).await.unwrap();
    }
    ctx.teardown().await;
}

#[tokio::test]
#[serial]
async fn test_layout_widget_reports_fresh_data() {
    let backend = StubBackend::start().await;
    let ctx = context(&backend).await;
    let camera = ctx.camera(None).await.unwrap();

    let (layout, widget) = ctx
        .layout_with_widget(WidgetKind::Counter, std::slice::from_ref(&camera))
        .await
        .unwrap();

    assert_eq!(layout.widget(&widget.title).map(|w| &w.id), Some(&widget.id));
    assert_eq!(widget.camera_ids, vec![camera.id.clone()]);
    assert!(widget.autorefresh_secs.is_some());

    let since = Utc::now() - Duration::seconds(1);
    let data = ctx
        .api()
        .wait_for_widget_refresh(&widget.id, since, ctx.env.ui_poll())
        .await
        .unwrap();
    assert_eq!(data.widget_id, widget.id);

    ctx.teardown().await.into_result().unwrap();
}

#[tokio::test]
#[serial]
async fn test_license_activation_is_reused_and_seats_released() {
    let backend = StubBackend::start().await;
    let ctx = context(&backend).await;
    let camera = ctx.camera(None).await.unwrap();

    let license = ctx.license().await.unwrap();
    let again = ctx.license().await.expect("409 falls back to the listing");
    assert_eq!(license.id, again.id);
    assert_eq!(license.key, LICENSE_KEY);

    let assigned = ctx.assign_license(&license, &camera).await.unwrap();
    assert_eq!(assigned.used, 1);

    let api = ctx.api().clone();
    let report = ctx.teardown().await;
    assert!(report.is_clean(), "{report:?}");
    let after = api.get_license(&license.id).await.unwrap().unwrap();
    assert_eq!(after.used, 0);
}

#[tokio::test]
#[serial]
async fn test_token_is_revoked_on_teardown() {
    let backend = StubBackend::start().await;
    let ctx = context(&backend).await;

    let created = ctx.token(&["cameras:read"]).await.unwrap();
    assert!(!created.secret.is_empty());

    let api = ctx.api().clone();
    ctx.teardown().await.into_result().unwrap();
    assert!(api.list_tokens().await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn test_context_selects_spc_company_from_env() {
    let backend = StubBackend::start().await;
    let mut env = backend.env();
    env.spc_company_id = Some("company-root".into());

    let ctx = TestContext::with_env(env).await.unwrap();
    ctx.api().list_cameras().await.unwrap();

    let last = backend.requests().pop().unwrap();
    assert_eq!(last.company.as_deref(), Some("company-root"));
}
