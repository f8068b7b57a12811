//! ライセンス画面

use super::Page;
use crate::browser::{testid, Browser};
use crate::error::{Result, SuiteError};
use async_trait::async_trait;

const TABLE: &str = "licenses-table";
const SEAT_USAGE: &str = "seat-usage";

/// `"used / seats"` 形式の表示を `(used, seats)` に変換する
pub fn parse_seat_usage(text: &str) -> Option<(u32, u32)> {
    let (used, seats) = text.split_once('/')?;
    Some((used.trim().parse().ok()?, seats.trim().parse().ok()?))
}

/// ライセンス画面
#[derive(Debug)]
pub struct LicensesPage<'a> {
    browser: &'a Browser,
}

impl<'a> LicensesPage<'a> {
    /// 作成
    pub fn new(browser: &'a Browser) -> Self {
        Self { browser }
    }

    /// 使用中シート数と総シート数
    pub async fn seat_usage(&self) -> Result<(u32, u32)> {
        let text = self.browser.text(&testid(SEAT_USAGE)).await?;
        parse_seat_usage(&text)
            .ok_or_else(|| SuiteError::WebDriver(format!("unexpected seat usage text: {text:?}")))
    }
}

#[async_trait]
impl Page for LicensesPage<'_> {
    fn path(&self) -> &'static str {
        "/licenses"
    }

    fn browser(&self) -> &Browser {
        self.browser
    }

    fn ready_marker(&self) -> &'static str {
        TABLE
    }
}
