//! ユーザー管理: 招待 → メール → 有効化

use camsuite::browser::pages::{Page, UsersPage};
use camsuite::fixtures::Resource;
use camsuite::inbox::extract_link;
use camsuite_common::types::{UserRole, UserStatus};

use crate::common;

#[tokio::test]
async fn test_invite_from_ui_sends_email() {
    require_e2e!();
    let ctx = common::context().await;
    let inbox = ctx.inbox_client().unwrap().create_inbox();
    let email = inbox.address();

    let browser = common::admin_browser(&ctx).await;
    let page = UsersPage::new(&browser);
    page.open().await.unwrap();
    page.invite(&email, UserRole::Viewer).await.unwrap();

    let invited = ctx
        .api()
        .find_user_by_email(&email)
        .await
        .unwrap()
        .expect("invited user exists");
    ctx.ledger().register(Resource::User(invited.id.clone()));
    assert_eq!(invited.status, UserStatus::Invited);

    let row = page
        .user_rows()
        .await
        .unwrap()
        .into_iter()
        .find(|r| r.email == email)
        .expect("row for the invited user");
    assert_eq!(row.role, UserRole::Viewer.label());

    let message = inbox
        .wait_for_message("invit", ctx.env.email_poll())
        .await
        .unwrap();
    let web_host = ctx
        .env
        .web_url
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    assert!(extract_link(&message, web_host).is_some());

    common::close_browser(browser, "user-invited").await;
    common::finish(ctx).await;
}

#[tokio::test]
async fn test_self_signup_activates_after_email_verification() {
    require_e2e!();
    let ctx = common::context().await;

    let verified = ctx.verified_user().await.unwrap();

    let me = verified.api.me().await.unwrap();
    assert_eq!(me.email, verified.email);
    assert_eq!(me.status, UserStatus::Active);
    common::finish(ctx).await;
}

#[tokio::test]
async fn test_role_change_is_persisted() {
    require_e2e!();
    let ctx = common::context().await;
    let user = ctx.user(UserRole::Viewer).await.unwrap();

    let updated = ctx
        .api()
        .update_user_role(&user.id, UserRole::Operator)
        .await
        .unwrap();

    assert_eq!(updated.role, UserRole::Operator);
    let listed = ctx
        .api()
        .find_user_by_email(&user.email)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(listed.role, UserRole::Operator);
    common::finish(ctx).await;
}

#[tokio::test]
async fn test_password_reset_email_is_delivered() {
    require_e2e!();
    let ctx = common::context().await;
    let verified = ctx.verified_user().await.unwrap();
    verified.inbox.purge().await.unwrap();

    ctx.api()
        .fresh()
        .request_password_reset(&verified.email)
        .await
        .unwrap();

    let message = verified
        .inbox
        .wait_for_message("reset", ctx.env.email_poll())
        .await
        .unwrap();
    assert!(!message.subject.is_empty());
    common::finish(ctx).await;
}
