//! ダッシュボード画面

use super::Page;
use crate::browser::{testid, testid_with, Browser};
use crate::error::{Result, SuiteError};
use crate::eventual::{wait_for_value, Poll};
use async_trait::async_trait;

const DASHBOARD: &str = "dashboard";
const LAYOUT_SELECT: &str = "layout-select";
const LAYOUT_OPTION: &str = "layout-option";
const CURRENT_LAYOUT: &str = "current-layout";
const WIDGET: &str = "widget";
const WIDGET_TITLE: &str = "widget-title";
const WIDGET_VALUE: &str = "widget-value";
const UPDATED_AT: &str = "data-updated-at";

/// ダッシュボード画面
#[derive(Debug)]
pub struct DashboardPage<'a> {
    browser: &'a Browser,
}

impl<'a> DashboardPage<'a> {
    /// 作成
    pub fn new(browser: &'a Browser) -> Self {
        Self { browser }
    }

    fn widget(title: &str) -> String {
        testid_with(WIDGET, "data-widget-title", title)
    }

    /// レイアウトを切り替える
    pub async fn select_layout(&self, name: &str) -> Result<()> {
        self.browser.click(&testid(LAYOUT_SELECT)).await?;
        self.browser
            .click(&testid_with(LAYOUT_OPTION, "data-layout-name", name))
            .await?;

        let what = format!("layout '{name}' to be selected");
        wait_for_value(self.browser.poll(), &what, || async move {
            let current = self.browser.text(&testid(CURRENT_LAYOUT)).await?;
            Ok((current == name).then_some(()))
        })
        .await
    }

    /// 表示中ウィジェットのタイトル
    pub async fn widget_titles(&self) -> Result<Vec<String>> {
        self.browser
            .texts(&format!("{} {}", testid(WIDGET), testid(WIDGET_TITLE)))
            .await
    }

    /// ウィジェットに表示された値
    pub async fn widget_value(&self, title: &str) -> Result<String> {
        self.browser
            .text(&format!("{} {}", Self::widget(title), testid(WIDGET_VALUE)))
            .await
    }

    /// ウィジェットの最終更新時刻（描画側の `data-updated-at`）
    pub async fn widget_updated_at(&self, title: &str) -> Result<String> {
        self.browser
            .attr(&Self::widget(title), UPDATED_AT)
            .await?
            .ok_or_else(|| {
                SuiteError::WebDriver(format!("widget '{title}' has no {UPDATED_AT} attribute"))
            })
    }

    /// 自動更新で `data-updated-at` が変わるまで待ち、新しい値を返す
    ///
    /// 自動更新間隔はUI待機より長いことがあるため、`poll` は呼び出し側が決める。
    pub async fn wait_for_autorefresh(&self, title: &str, poll: Poll) -> Result<String> {
        let before = self.widget_updated_at(title).await?;
        let what = format!("widget '{title}' to autorefresh");
        wait_for_value(poll, &what, || {
            let before = before.clone();
            async move {
                let now = self.widget_updated_at(title).await?;
                Ok((now != before).then_some(now))
            }
        })
        .await
    }
}

#[async_trait]
impl Page for DashboardPage<'_> {
    fn path(&self) -> &'static str {
        "/dashboard"
    }

    fn browser(&self) -> &Browser {
        self.browser
    }

    fn ready_marker(&self) -> &'static str {
        DASHBOARD
    }
}
