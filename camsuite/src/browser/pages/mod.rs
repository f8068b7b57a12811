//! 画面ごとの操作（ページオブジェクト）
//!
//! 各ページは `Browser` を借用する単純な構造体で、継承階層は持たない。
//! 共通部分は `Page` トレイトのデフォルト実装にまとめている。

mod cameras;
mod companies;
mod dashboard;
mod licenses;
mod login;
mod users;

pub use cameras::{AddCameraDialog, CamerasPage};
pub use companies::CompaniesPage;
pub use dashboard::DashboardPage;
pub use licenses::{parse_seat_usage, LicensesPage};
pub use login::LoginPage;
pub use users::{UserRow, UsersPage};

use super::Browser;
use crate::error::Result;
use async_trait::async_trait;

/// アプリケーションシェル（ログイン後の共通レイアウト）
pub const APP_SHELL: &str = "app-shell";

/// ページオブジェクト共通の操作
#[async_trait]
pub trait Page: Send + Sync {
    /// ページのパス
    fn path(&self) -> &'static str;

    /// 操作対象のブラウザ
    fn browser(&self) -> &Browser;

    /// 読み込み完了の目印になる `data-testid`
    fn ready_marker(&self) -> &'static str;

    /// 読み込み完了まで待つ
    async fn wait_loaded(&self) -> Result<()> {
        self.browser()
            .wait_for(&super::testid(self.ready_marker()))
            .await?;
        Ok(())
    }

    /// ページを開いて読み込み完了まで待つ
    async fn open(&self) -> Result<()> {
        self.browser().open(self.path()).await?;
        self.wait_loaded().await
    }
}
