//! ログイン画面

use super::{Page, APP_SHELL};
use crate::browser::{testid, Browser};
use crate::error::Result;
use async_trait::async_trait;
use tracing::info;

const EMAIL: &str = "login-email";
const PASSWORD: &str = "login-password";
const SUBMIT: &str = "login-submit";
const ERROR: &str = "login-error";

/// ログイン画面
#[derive(Debug)]
pub struct LoginPage<'a> {
    browser: &'a Browser,
}

impl<'a> LoginPage<'a> {
    /// 作成
    pub fn new(browser: &'a Browser) -> Self {
        Self { browser }
    }

    /// 資格情報を入力して送信する（結果は待たない）
    pub async fn submit(&self, email: &str, password: &str) -> Result<()> {
        self.browser.fill(&testid(EMAIL), email).await?;
        self.browser.fill(&testid(PASSWORD), password).await?;
        self.browser.click(&testid(SUBMIT)).await
    }

    /// ログインしてアプリケーションシェルの表示まで待つ
    pub async fn login(&self, email: &str, password: &str) -> Result<()> {
        self.submit(email, password).await?;
        self.browser.wait_for(&testid(APP_SHELL)).await?;
        info!(email, "Logged in through the UI");
        Ok(())
    }

    /// 表示されたエラーメッセージ
    pub async fn error_message(&self) -> Result<String> {
        self.browser.text(&testid(ERROR)).await
    }
}

#[async_trait]
impl Page for LoginPage<'_> {
    fn path(&self) -> &'static str {
        "/login"
    }

    fn browser(&self) -> &Browser {
        self.browser
    }

    fn ready_marker(&self) -> &'static str {
        SUBMIT
    }
}
