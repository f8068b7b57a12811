//! 受信箱: 到着待ち・本文取得・削除

use axum::http::Method;
use camsuite::api::ApiClient;
use camsuite::inbox::{extract_code, InboxClient};
use camsuite::SuiteError;
use camsuite_common::protocol::SignupRequest;
use serial_test::serial;
use std::time::Duration;

use crate::support::{self, backend::StubBackend, INBOX_DOMAIN};

async fn signup(backend: &StubBackend, email: &str) {
    let api = ApiClient::from_env(&backend.env()).unwrap();
    api.signup(&SignupRequest {
        email: email.to_string(),
        password: "E2e!password".into(),
        name: "Inbox Tester".into(),
        company_name: "Inbox Co".into(),
    })
    .await
    .unwrap();
}

#[tokio::test]
#[serial]
async fn test_verification_email_arrives_with_code() {
    support::init_tracing();
    let backend = StubBackend::start().await;
    let env = backend.env();
    let inbox = InboxClient::new(&env.inbox).unwrap().create_inbox();
    assert!(inbox.address().ends_with(&format!("@{INBOX_DOMAIN}")));

    signup(&backend, &inbox.address()).await;
    let message = inbox
        .wait_for_message("VERIFY", env.email_poll())
        .await
        .unwrap();

    let code = extract_code(&message).expect("six digit code");
    assert_eq!(code.len(), 6);
    assert!(message.text.contains(&code));
}

#[tokio::test]
#[serial]
async fn test_other_inboxes_do_not_see_the_message() {
    support::init_tracing();
    let backend = StubBackend::start().await;
    let env = backend.env();
    let client = InboxClient::new(&env.inbox).unwrap();
    let mine = client.create_inbox();
    let other = client.create_inbox();

    signup(&backend, &mine.address()).await;

    assert_eq!(mine.list().await.unwrap().len(), 1);
    assert!(other.list().await.unwrap().is_empty());
    let err = other
        .wait_for_message("verify", env.email_poll().with_timeout(Duration::from_millis(100)))
        .await
        .unwrap_err();
    assert!(matches!(err, SuiteError::Timeout { .. }), "got {err:?}");
}

#[tokio::test]
#[serial]
async fn test_purge_empties_the_inbox() {
    support::init_tracing();
    let backend = StubBackend::start().await;
    let env = backend.env();
    let inbox = InboxClient::new(&env.inbox).unwrap().inbox_for("e2e-purge");
    signup(&backend, &inbox.address()).await;
    assert_eq!(inbox.list().await.unwrap().len(), 1);

    inbox.purge().await.unwrap();

    assert!(inbox.list().await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn test_unknown_message_is_an_inbox_error() {
    support::init_tracing();
    let backend = StubBackend::start().await;
    let inbox = InboxClient::new(&backend.env().inbox)
        .unwrap()
        .create_inbox();

    let err = inbox.message("msg-missing").await.unwrap_err();

    assert!(matches!(err, SuiteError::Inbox(_)), "got {err:?}");
}

#[tokio::test]
#[serial]
async fn test_transient_inbox_errors_are_retried() {
    support::init_tracing();
    let backend = StubBackend::start().await;
    let env = backend.env();
    let inbox = InboxClient::new(&env.inbox)
        .unwrap()
        .with_retry(env.retry)
        .inbox_for("e2e-flaky");
    signup(&backend, &inbox.address()).await;
    let summary = inbox.list().await.unwrap().remove(0);

    let message_path = format!("/inbox/domains/{INBOX_DOMAIN}/messages/{}", summary.id);
    backend.fail_next(Method::GET, &message_path, 502, 1);
    let message = inbox.message(&summary.id).await.unwrap();
    assert_eq!(message.id, summary.id);
    assert_eq!(backend.count(Method::GET, &message_path), 2);

    let inbox_path = format!("/inbox/domains/{INBOX_DOMAIN}/inboxes/e2e-flaky");
    backend.fail_next_with_retry_after(Method::DELETE, &inbox_path, 503, 0);
    inbox.purge().await.unwrap();
    assert_eq!(backend.count(Method::DELETE, &inbox_path), 2);
    assert!(inbox.list().await.unwrap().is_empty());
}

#[tokio::test]
#[serial]
async fn test_inbox_gives_up_after_the_retry_budget() {
    support::init_tracing();
    let backend = StubBackend::start().await;
    let env = backend.env();
    let inbox = InboxClient::new(&env.inbox)
        .unwrap()
        .with_retry(env.retry)
        .inbox_for("e2e-down");

    let inbox_path = format!("/inbox/domains/{INBOX_DOMAIN}/inboxes/e2e-down");
    backend.fail_next(Method::GET, &inbox_path, 502, 10);
    let err = inbox.list().await.unwrap_err();

    assert_eq!(err.status(), Some(502));
    assert_eq!(
        backend.count(Method::GET, &inbox_path),
        env.retry.attempts as usize
    );
}
