//! APIセッション: ヘッダ付与・リトライ・再認証・エラー分類

use axum::http::Method;
use camsuite::api::ApiClient;
use camsuite::SuiteError;
use camsuite_common::protocol::CreateCameraRequest;
use serial_test::serial;
use std::time::{Duration, Instant};

use crate::support::{self, backend::StubBackend, ADMIN_EMAIL, ADMIN_PASSWORD};

const CAMERAS: &str = "/api/v1/cameras";

async fn logged_in(backend: &StubBackend) -> ApiClient {
    support::init_tracing();
    let api = ApiClient::from_env(&backend.env()).expect("client builds");
    api.login(ADMIN_EMAIL, ADMIN_PASSWORD)
        .await
        .expect("admin login succeeds");
    api
}

#[tokio::test]
#[serial]
async fn test_requests_carry_bearer_and_company_headers() {
    let backend = StubBackend::start().await;
    let api = logged_in(&backend).await;
    api.select_company("company-root").await;

    api.list_cameras().await.unwrap();

    let request = backend
        .requests()
        .into_iter()
        .rev()
        .find(|r| r.path == CAMERAS)
        .expect("camera list recorded");
    let auth = request.authorization.expect("authorization header");
    assert!(auth.starts_with("Bearer sess-"), "got {auth}");
    assert_eq!(request.company.as_deref(), Some("company-root"));
}

#[tokio::test]
#[serial]
async fn test_login_request_has_no_company_header() {
    let backend = StubBackend::start().await;
    let api = logged_in(&backend).await;
    api.select_company("company-root").await;

    // 再ログインで会社選択はリセットされる
    api.login(ADMIN_EMAIL, ADMIN_PASSWORD).await.unwrap();

    assert_eq!(api.selected_company().await, None);
    let logins: Vec<_> = backend
        .requests()
        .into_iter()
        .filter(|r| r.path == "/api/v1/auth/login")
        .collect();
    assert_eq!(logins.len(), 2);
    assert!(logins.iter().all(|r| r.company.is_none()));
}

#[tokio::test]
#[serial]
async fn test_bad_credentials_are_unauthorized() {
    let backend = StubBackend::start().await;
    let api = ApiClient::from_env(&backend.env()).unwrap();

    let err = api.login(ADMIN_EMAIL, "wrong").await.unwrap_err();

    assert!(matches!(err, SuiteError::Unauthorized(_)), "got {err:?}");
    assert!(!api.is_authenticated().await);
}

#[tokio::test]
#[serial]
async fn test_transient_502_is_retried() {
    let backend = StubBackend::start().await;
    let api = logged_in(&backend).await;
    backend.fail_next(Method::GET, CAMERAS, 502, 2);

    let cameras = api.list_cameras().await.expect("third attempt succeeds");

    assert!(cameras.is_empty());
    assert_eq!(backend.count(Method::GET, CAMERAS), 3);
}

#[tokio::test]
#[serial]
async fn test_retries_give_up_after_configured_attempts() {
    let backend = StubBackend::start().await;
    let api = logged_in(&backend).await;
    backend.fail_next(Method::GET, CAMERAS, 503, 10);

    let err = api.list_cameras().await.unwrap_err();

    assert_eq!(err.status(), Some(503));
    assert_eq!(backend.count(Method::GET, CAMERAS), 3);
}

#[tokio::test]
#[serial]
async fn test_retry_after_is_capped_by_max_delay() {
    let backend = StubBackend::start().await;
    let api = logged_in(&backend).await;
    backend.fail_next_with_retry_after(Method::GET, CAMERAS, 429, 30);

    let started = Instant::now();
    api.list_cameras().await.expect("retried after 429");

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(backend.count(Method::GET, CAMERAS), 2);
}

#[tokio::test]
#[serial]
async fn test_client_errors_fail_fast() {
    let backend = StubBackend::start().await;
    let api = logged_in(&backend).await;

    let err = api
        .create_camera(&CreateCameraRequest::synthetic("", None))
        .await
        .unwrap_err();

    assert_eq!(err.status(), Some(422));
    assert_eq!(backend.count(Method::POST, CAMERAS), 1);
}

#[tokio::test]
#[serial]
async fn test_expired_session_reauthenticates_once() {
    let backend = StubBackend::start().await;
    let api = logged_in(&backend).await;
    let before = api.session().await.access_token;

    backend.expire_sessions();
    api.list_cameras().await.expect("request replayed after re-login");

    assert_eq!(backend.login_count(), 2);
    assert_ne!(api.session().await.access_token, before);
}

#[tokio::test]
#[serial]
async fn test_second_401_is_not_retried_again() {
    let backend = StubBackend::start().await;
    let api = logged_in(&backend).await;
    backend.fail_next(Method::GET, CAMERAS, 401, 2);

    let err = api.list_cameras().await.unwrap_err();

    assert!(matches!(err, SuiteError::Unauthorized(_)), "got {err:?}");
    assert_eq!(backend.login_count(), 2);
    assert_eq!(backend.count(Method::GET, CAMERAS), 2);
}

#[tokio::test]
#[serial]
async fn test_concurrent_401s_share_one_relogin() {
    let backend = StubBackend::start().await;
    let api = logged_in(&backend).await;
    backend.expire_sessions();

    let (a, b, c) = tokio::join!(api.list_cameras(), api.list_companies(), api.list_users());

    assert!(a.is_ok() && b.is_ok() && c.is_ok());
    assert_eq!(backend.login_count(), 2);
}

#[tokio::test]
#[serial]
async fn test_missing_resource_is_not_found() {
    let backend = StubBackend::start().await;
    let api = logged_in(&backend).await;

    let err = api.get_camera("cam-missing").await.unwrap_err();

    assert!(err.is_not_found());
    assert!(!err.is_transient());
}

#[tokio::test]
#[serial]
async fn test_idempotent_delete_reports_already_gone() {
    let backend = StubBackend::start().await;
    let api = logged_in(&backend).await;
    let camera = api
        .create_camera(&CreateCameraRequest::synthetic("lobby", None))
        .await
        .unwrap();
    let path = format!("/cameras/{}", camera.id);

    assert!(api.delete_idempotent(&path).await.unwrap());
    assert!(!api.delete_idempotent(&path).await.unwrap());
}

#[tokio::test]
#[serial]
async fn test_logout_drops_session_and_stops_reauth() {
    let backend = StubBackend::start().await;
    let api = logged_in(&backend).await;

    api.logout().await.unwrap();

    assert!(!api.is_authenticated().await);
    assert_eq!(backend.count(Method::POST, "/api/v1/auth/logout"), 1);
    let err = api.list_cameras().await.unwrap_err();
    assert!(matches!(err, SuiteError::Unauthorized(_)));
    assert_eq!(backend.login_count(), 1);
}

#[tokio::test]
#[serial]
async fn test_fresh_client_does_not_share_session() {
    let backend = StubBackend::start().await;
    let api = logged_in(&backend).await;

    let fresh = api.fresh();

    assert!(api.is_authenticated().await);
    assert!(!fresh.is_authenticated().await);
    assert_eq!(fresh.base_url(), api.base_url());
}

#[tokio::test]
#[serial]
async fn test_api_token_authenticates_until_revoked() {
    let backend = StubBackend::start().await;
    let api = logged_in(&backend).await;
    let created = api
        .create_token("ci-token", &["cameras:read"])
        .await
        .unwrap();

    let token_client = api.fresh();
    token_client.use_api_token(created.secret.clone()).await;
    token_client.list_cameras().await.expect("token accepted");

    api.revoke_token(&created.token.id).await.unwrap();
    let err = token_client.list_cameras().await.unwrap_err();
    assert!(matches!(err, SuiteError::Unauthorized(_)));
}

#[tokio::test]
#[serial]
async fn test_me_returns_logged_in_admin() {
    let backend = StubBackend::start().await;
    let api = logged_in(&backend).await;

    let me = api.me().await.unwrap();

    assert_eq!(me.email, ADMIN_EMAIL);
    assert_eq!(api.current_user().await.map(|u| u.id), Some(me.id));
}
