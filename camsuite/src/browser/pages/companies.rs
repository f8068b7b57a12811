//! 会社管理画面

use super::Page;
use crate::browser::{testid, testid_with, Browser};
use crate::error::Result;
use crate::eventual::wait_for_value;
use async_trait::async_trait;

const TABLE: &str = "companies-table";
const NAME: &str = "company-name";
const SWITCHER: &str = "company-switcher";
const OPTION: &str = "company-option";
const CURRENT: &str = "current-company";

/// 会社管理画面
#[derive(Debug)]
pub struct CompaniesPage<'a> {
    browser: &'a Browser,
}

impl<'a> CompaniesPage<'a> {
    /// 作成
    pub fn new(browser: &'a Browser) -> Self {
        Self { browser }
    }

    /// 一覧に表示された会社名
    pub async fn company_names(&self) -> Result<Vec<String>> {
        self.browser.texts(&testid(NAME)).await
    }

    /// ヘッダの会社切り替えで `name` に切り替える
    pub async fn switch_company(&self, name: &str) -> Result<()> {
        self.browser.click(&testid(SWITCHER)).await?;
        self.browser
            .click(&testid_with(OPTION, "data-company-name", name))
            .await?;

        let what = format!("company '{name}' to become current");
        wait_for_value(self.browser.poll(), &what, || async move {
            let current = self.browser.text(&testid(CURRENT)).await?;
            Ok((current == name).then_some(()))
        })
        .await
    }
}

#[async_trait]
impl Page for CompaniesPage<'_> {
    fn path(&self) -> &'static str {
        "/companies"
    }

    fn browser(&self) -> &Browser {
        self.browser
    }

    fn ready_marker(&self) -> &'static str {
        TABLE
    }
}
