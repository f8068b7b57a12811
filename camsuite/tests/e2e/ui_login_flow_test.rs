//! UIログインと画面遷移

use camsuite::browser::pages::{CamerasPage, LoginPage, Page, UsersPage};
use camsuite::browser::{Browser, WebDriverSettings};

use crate::common;

#[tokio::test]
async fn test_wrong_password_shows_error() {
    require_e2e!();
    let ctx = common::context().await;
    let browser = Browser::connect(WebDriverSettings::from_env(&ctx.env))
        .await
        .unwrap();

    let page = LoginPage::new(&browser);
    page.open().await.unwrap();
    page.submit(&ctx.env.admin.email, "definitely-wrong")
        .await
        .unwrap();

    let message = page.error_message().await.unwrap();
    assert!(!message.is_empty());
    assert!(browser.current_path().await.unwrap().starts_with("/login"));
    common::close_browser(browser, "login-error").await;
    common::finish(ctx).await;
}

#[tokio::test]
async fn test_verified_user_can_log_in_through_ui() {
    require_e2e!();
    let ctx = common::context().await;
    let verified = ctx.verified_user().await.unwrap();
    let browser = Browser::connect(WebDriverSettings::from_env(&ctx.env))
        .await
        .unwrap();

    let page = LoginPage::new(&browser);
    page.open().await.unwrap();
    page.login(&verified.email, &verified.password).await.unwrap();

    common::close_browser(browser, "verified-user-login").await;
    common::finish(ctx).await;
}

#[tokio::test]
async fn test_navigation_between_admin_pages() {
    require_e2e!();
    let ctx = common::context().await;
    let browser = common::admin_browser(&ctx).await;

    CamerasPage::new(&browser).open().await.unwrap();
    browser.wait_for_path("/cameras").await.unwrap();
    UsersPage::new(&browser).open().await.unwrap();
    browser.wait_for_path("/users").await.unwrap();

    common::close_browser(browser, "navigation").await;
    common::finish(ctx).await;
}
