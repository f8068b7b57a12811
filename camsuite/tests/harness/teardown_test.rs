//! 後始末台帳: 逆順・冪等・失敗時の継続・Drop時の回収

use camsuite::fixtures::{Resource, TestContext};
use camsuite_common::types::CompanyKind;
use serial_test::serial;

use crate::support::{self, backend::StubBackend};

async fn context(backend: &StubBackend) -> TestContext {
    support::init_tracing();
    TestContext::with_env(backend.env()).await.unwrap()
}

#[tokio::test]
#[serial]
async fn test_teardown_runs_in_reverse_creation_order() {
    let backend = StubBackend::start().await;
    let ctx = context(&backend).await;
    let location = ctx.location().await.unwrap();
    let camera = ctx.camera(Some(&location)).await.unwrap();
    let token = ctx.token(&[]).await.unwrap();

    let report = ctx.teardown().await;

    assert_eq!(
        report.deleted,
        vec![
            Resource::Token(token.token.id),
            Resource::Camera(camera.id),
            Resource::Location(location.id),
        ]
    );
    assert!(report.already_gone.is_empty());
}

#[tokio::test]
#[serial]
async fn test_resources_deleted_by_the_test_count_as_already_gone() {
    let backend = StubBackend::start().await;
    let ctx = context(&backend).await;
    let camera = ctx.camera(None).await.unwrap();

    ctx.api().delete_camera(&camera.id).await.unwrap();
    let report = ctx.teardown().await;

    assert!(report.is_clean());
    assert!(report.deleted.is_empty());
    assert_eq!(report.already_gone, vec![Resource::Camera(camera.id)]);
}

#[tokio::test]
#[serial]
async fn test_teardown_runs_only_once() {
    let backend = StubBackend::start().await;
    let ctx = context(&backend).await;
    ctx.camera(None).await.unwrap();

    let first = ctx.ledger().run(ctx.api()).await;
    let second = ctx.teardown().await;

    assert_eq!(first.deleted.len(), 1);
    assert!(!first.skipped);
    assert!(second.skipped);
    assert!(second.deleted.is_empty());
}

#[tokio::test]
#[serial]
async fn test_forgotten_resources_are_left_alone() {
    let backend = StubBackend::start().await;
    let ctx = context(&backend).await;
    let kept = ctx.camera(None).await.unwrap();
    ctx.camera(None).await.unwrap();

    assert!(ctx.ledger().forget(&Resource::Camera(kept.id.clone())));
    ctx.teardown().await.into_result().unwrap();

    let remaining = backend.cameras();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, kept.id);
}

#[tokio::test]
#[serial]
async fn test_failures_are_reported_and_do_not_stop_teardown() {
    let backend = StubBackend::start().await;
    let ctx = context(&backend).await;
    let tree = ctx.company_tree().await.unwrap();
    let camera = ctx.camera(None).await.unwrap();
    // EUCを残すとICは子を持ったまま → 409
    ctx.ledger().forget(&Resource::Company(tree.euc.id.clone()));

    let api = ctx.api().clone();
    let report = ctx.teardown().await;

    assert_eq!(report.deleted.first(), Some(&Resource::Camera(camera.id)));
    let failed: Vec<_> = report.failed.iter().map(|(r, _)| r.clone()).collect();
    assert_eq!(
        failed,
        vec![
            Resource::Company(tree.ic.id.clone()),
            Resource::Company(tree.spc.id.clone()),
        ]
    );
    let err = report.into_result().unwrap_err();
    assert!(err.to_string().contains(&tree.ic.id));

    for id in [&tree.euc.id, &tree.ic.id, &tree.spc.id] {
        api.delete_company(id).await.unwrap();
    }
    assert_eq!(backend.companies().len(), 1);
    assert_eq!(backend.companies()[0].kind, CompanyKind::Spc);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
#[serial]
async fn test_dropped_context_cleans_up_before_drop_returns() {
    let backend = StubBackend::start().await;
    let ctx = context(&backend).await;
    ctx.cameras(3, None).await.unwrap();
    assert_eq!(backend.cameras().len(), 3);

    drop(ctx);

    assert!(backend.cameras().is_empty());
}

fn outer_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap()
}

fn test_body_runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

#[test]
#[serial]
fn test_context_left_at_end_of_test_body_is_cleaned_up() {
    let outer = outer_runtime();
    let backend = outer.block_on(StubBackend::start());
    let env = backend.env();

    let body = test_body_runtime();
    body.block_on(async {
        support::init_tracing();
        let ctx = TestContext::with_env(env).await.unwrap();
        ctx.cameras(3, None).await.unwrap();
    });
    drop(body);

    assert!(backend.cameras().is_empty());
    drop(outer);
}

#[test]
#[serial]
fn test_context_in_panicking_test_body_is_cleaned_up() {
    let outer = outer_runtime();
    let backend = outer.block_on(StubBackend::start());
    let env = backend.env();

    let body = test_body_runtime();
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        body.block_on(async {
            let ctx = TestContext::with_env(env).await.unwrap();
            ctx.cameras(2, None).await.unwrap();
            panic!("assertion failed inside the test body");
        })
    }));
    drop(body);

    assert!(outcome.is_err());
    assert!(backend.cameras().is_empty());
    drop(outer);
}
