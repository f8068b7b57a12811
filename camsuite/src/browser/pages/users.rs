//! ユーザー管理画面

use super::Page;
use crate::browser::{testid, testid_with, Browser};
use crate::error::Result;
use async_trait::async_trait;
use camsuite_common::types::UserRole;
use fantoccini::elements::Element;
use fantoccini::Locator;

const TABLE: &str = "users-table";
const ROW: &str = "user-row";
const INVITE: &str = "invite-user";
const INVITE_DIALOG: &str = "invite-dialog";
const INVITE_EMAIL: &str = "invite-email";
const INVITE_ROLE: &str = "invite-role";
const INVITE_SUBMIT: &str = "invite-submit";

async fn cell_text(row: &Element, id: &str) -> Result<String> {
    let selector = testid(id);
    let text = row.find(Locator::Css(&selector)).await?.text().await?;
    Ok(text.trim().to_string())
}

/// 一覧の1行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    /// メールアドレス
    pub email: String,
    /// ロール表示
    pub role: String,
    /// 状態表示
    pub status: String,
}

/// ユーザー管理画面
#[derive(Debug)]
pub struct UsersPage<'a> {
    browser: &'a Browser,
}

impl<'a> UsersPage<'a> {
    /// 作成
    pub fn new(browser: &'a Browser) -> Self {
        Self { browser }
    }

    /// 招待ダイアログからユーザーを招待し、一覧に現れるまで待つ
    pub async fn invite(&self, email: &str, role: UserRole) -> Result<()> {
        self.browser.click(&testid(INVITE)).await?;
        self.browser.fill(&testid(INVITE_EMAIL), email).await?;
        self.browser
            .click(&testid_with(INVITE_ROLE, "data-role", role.label()))
            .await?;
        self.browser.click(&testid(INVITE_SUBMIT)).await?;
        self.browser.wait_gone(&testid(INVITE_DIALOG)).await?;
        self.browser
            .wait_for(&testid_with(ROW, "data-email", email))
            .await?;
        Ok(())
    }

    /// 一覧の行
    pub async fn user_rows(&self) -> Result<Vec<UserRow>> {
        let mut rows = Vec::new();
        for row in self.browser.find_all(&testid(ROW)).await? {
            rows.push(UserRow {
                email: cell_text(&row, "user-email").await?,
                role: cell_text(&row, "user-role").await?,
                status: cell_text(&row, "user-status").await?,
            });
        }
        Ok(rows)
    }
}

#[async_trait]
impl Page for UsersPage<'_> {
    fn path(&self) -> &'static str {
        "/users"
    }

    fn browser(&self) -> &Browser {
        self.browser
    }

    fn ready_marker(&self) -> &'static str {
        TABLE
    }
}
