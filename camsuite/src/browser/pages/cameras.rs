//! カメラ一覧画面と追加ダイアログ

use super::Page;
use crate::browser::{testid, testid_with, Browser};
use crate::error::Result;
use async_trait::async_trait;

const TABLE: &str = "cameras-table";
const ROW: &str = "camera-row";
const NAME: &str = "camera-name";
const ADD: &str = "add-camera";
const DELETE: &str = "delete-camera";
const CONFIRM_DELETE: &str = "confirm-delete";

const DIALOG: &str = "add-camera-dialog";
const DIALOG_NAME: &str = "camera-name-input";
const DIALOG_URL: &str = "camera-url-input";
const DIALOG_SUBMIT: &str = "add-camera-submit";
const FIELD_ERROR: &str = "field-error";

/// カメラ一覧画面
#[derive(Debug)]
pub struct CamerasPage<'a> {
    browser: &'a Browser,
}

impl<'a> CamerasPage<'a> {
    /// 作成
    pub fn new(browser: &'a Browser) -> Self {
        Self { browser }
    }

    fn row(name: &str) -> String {
        testid_with(ROW, "data-camera-name", name)
    }

    /// 一覧に表示されたカメラ名
    pub async fn camera_names(&self) -> Result<Vec<String>> {
        self.browser
            .texts(&format!("{} {}", testid(ROW), testid(NAME)))
            .await
    }

    /// 指定名のカメラ行が現れるまで待つ
    pub async fn wait_for_camera(&self, name: &str) -> Result<()> {
        self.browser.wait_for(&Self::row(name)).await?;
        Ok(())
    }

    /// 追加ダイアログを開く
    pub async fn open_add_dialog(&self) -> Result<AddCameraDialog<'a>> {
        self.browser.click(&testid(ADD)).await?;
        self.browser.wait_for(&testid(DIALOG)).await?;
        Ok(AddCameraDialog {
            browser: self.browser,
        })
    }

    /// 行の削除ボタンから削除し、行が消えるまで待つ
    pub async fn delete_camera(&self, name: &str) -> Result<()> {
        let row = Self::row(name);
        self.browser
            .click(&format!("{row} {}", testid(DELETE)))
            .await?;
        self.browser.click(&testid(CONFIRM_DELETE)).await?;
        self.browser.wait_gone(&row).await
    }
}

#[async_trait]
impl Page for CamerasPage<'_> {
    fn path(&self) -> &'static str {
        "/cameras"
    }

    fn browser(&self) -> &Browser {
        self.browser
    }

    fn ready_marker(&self) -> &'static str {
        TABLE
    }
}

/// カメラ追加ダイアログ
#[derive(Debug)]
pub struct AddCameraDialog<'a> {
    browser: &'a Browser,
}

impl AddCameraDialog<'_> {
    /// 名前とストリームURLを入力
    pub async fn fill(&self, name: &str, stream_url: &str) -> Result<()> {
        self.browser.fill(&testid(DIALOG_NAME), name).await?;
        self.browser.fill(&testid(DIALOG_URL), stream_url).await
    }

    /// 送信してダイアログが閉じるまで待つ
    pub async fn submit(&self) -> Result<()> {
        self.browser.click(&testid(DIALOG_SUBMIT)).await?;
        self.browser.wait_gone(&testid(DIALOG)).await
    }

    /// 送信だけ行う（入力エラーの確認用）
    pub async fn submit_expecting_errors(&self) -> Result<Vec<String>> {
        self.browser.click(&testid(DIALOG_SUBMIT)).await?;
        self.browser
            .wait_for(&format!("{} {}", testid(DIALOG), testid(FIELD_ERROR)))
            .await?;
        self.validation_errors().await
    }

    /// 表示中の入力エラー
    pub async fn validation_errors(&self) -> Result<Vec<String>> {
        self.browser
            .texts(&format!("{} {}", testid(DIALOG), testid(FIELD_ERROR)))
            .await
    }
}
