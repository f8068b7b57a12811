//! WebDriver経由のブラウザ操作
//!
//! `fantoccini` のクライアントを包み、`data-testid` セレクタでの要素操作と
//! UI向けの待機（`eventual` + `ui_secs`）を提供する。画面ごとの操作は `pages` 配下。

pub mod pages;

use crate::config::ResolvedEnv;
use crate::error::{Result, SuiteError};
use crate::eventual::{wait_for_value, Poll};
use camsuite_common::config::WebDriverMode;
use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// `[data-testid='id']`
pub fn testid(id: &str) -> String {
    format!("[data-testid='{}']", escape(id))
}

/// `[data-testid='id'][attr='value']`
pub fn testid_with(id: &str, attr: &str, value: &str) -> String {
    format!("{}[{attr}='{}']", testid(id), escape(value))
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// ブラウザ接続設定
#[derive(Debug, Clone)]
pub struct WebDriverSettings {
    /// 接続方式
    pub mode: WebDriverMode,
    /// WebDriverエンドポイント
    pub url: String,
    /// ヘッドレス起動
    pub headless: bool,
    /// ウィンドウサイズ [幅, 高さ]
    pub window: [u32; 2],
    /// Web UIのベースURL
    pub web_url: String,
    /// UI待機
    pub poll: Poll,
    /// スクリーンショット保存先
    pub screenshot_dir: PathBuf,
}

impl WebDriverSettings {
    /// 実行環境から作成
    pub fn from_env(env: &ResolvedEnv) -> Self {
        Self {
            mode: env.webdriver.mode,
            url: env.webdriver.url.clone(),
            headless: env.webdriver.headless,
            window: env.webdriver.window,
            web_url: env.web_url.clone(),
            poll: env.ui_poll(),
            screenshot_dir: PathBuf::from(&env.webdriver.screenshot_dir),
        }
    }

    /// Chrome向けのcapabilities
    pub fn capabilities(&self) -> Map<String, Value> {
        let [width, height] = self.window;
        let mut args = vec![
            format!("--window-size={width},{height}"),
            "--disable-gpu".to_string(),
            "--no-sandbox".to_string(),
        ];
        if self.headless {
            args.push("--headless=new".to_string());
        }

        let mut caps = Map::new();
        caps.insert("browserName".to_string(), json!("chrome"));
        caps.insert("goog:chromeOptions".to_string(), json!({ "args": args }));
        if self.mode == WebDriverMode::Remote {
            caps.insert(
                "se:name".to_string(),
                json!(format!("camsuite {}", crate::fixtures::run_tag())),
            );
        }
        caps
    }

    fn absolute(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.web_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// WebDriverセッション
pub struct Browser {
    client: Client,
    settings: WebDriverSettings,
}

impl std::fmt::Debug for Browser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Browser")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

fn missing_to_none<T>(result: std::result::Result<T, CmdError>) -> Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_no_such_element() => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// 要素が見つからなければ `Some(())`。セッション切れ等はエラーのまま返す
fn absent<T>(result: std::result::Result<T, CmdError>) -> Result<Option<()>> {
    Ok(missing_to_none(result)?.is_none().then_some(()))
}

impl Browser {
    /// WebDriverに接続してセッションを開始する
    pub async fn connect(settings: WebDriverSettings) -> Result<Self> {
        info!(
            mode = ?settings.mode,
            url = %settings.url,
            headless = settings.headless,
            "Starting WebDriver session"
        );
        let mut builder = ClientBuilder::native();
        builder.capabilities(settings.capabilities());
        let client = builder.connect(&settings.url).await?;
        Ok(Self { client, settings })
    }

    /// 接続設定
    pub fn settings(&self) -> &WebDriverSettings {
        &self.settings
    }

    /// UI待機設定
    pub fn poll(&self) -> Poll {
        self.settings.poll
    }

    /// Web UIのパス（または絶対URL）を開く
    pub async fn open(&self, path: &str) -> Result<()> {
        let url = self.settings.absolute(path);
        debug!(%url, "Navigating");
        self.client.goto(&url).await?;
        Ok(())
    }

    /// 要素を1つ取得（待たない）
    pub async fn find(&self, selector: &str) -> Result<Element> {
        Ok(self.client.find(Locator::Css(selector)).await?)
    }

    /// 要素をすべて取得（待たない）
    pub async fn find_all(&self, selector: &str) -> Result<Vec<Element>> {
        Ok(self.client.find_all(Locator::Css(selector)).await?)
    }

    /// 要素が存在するか
    pub async fn is_present(&self, selector: &str) -> Result<bool> {
        Ok(missing_to_none(self.client.find(Locator::Css(selector)).await)?.is_some())
    }

    /// 要素が現れるまで待つ
    pub async fn wait_for(&self, selector: &str) -> Result<Element> {
        let what = format!("element {selector}");
        wait_for_value(self.poll(), &what, || async move {
            missing_to_none(self.client.find(Locator::Css(selector)).await)
        })
        .await
    }

    /// 要素が消えるまで待つ
    pub async fn wait_gone(&self, selector: &str) -> Result<()> {
        let what = format!("element {selector} to disappear");
        wait_for_value(self.poll(), &what, || async move {
            absent(self.client.find(Locator::Css(selector)).await)
        })
        .await
    }

    /// 要素の出現を待ってクリックする
    pub async fn click(&self, selector: &str) -> Result<()> {
        self.wait_for(selector).await?.click().await?;
        Ok(())
    }

    /// 入力欄をクリアしてから入力する
    pub async fn fill(&self, selector: &str, text: &str) -> Result<()> {
        let element = self.wait_for(selector).await?;
        element.clear().await?;
        element.send_keys(text).await?;
        Ok(())
    }

    /// 要素の出現を待ってテキストを取得する
    pub async fn text(&self, selector: &str) -> Result<String> {
        Ok(self.wait_for(selector).await?.text().await?.trim().to_string())
    }

    /// 一致する全要素のテキスト（要素がなければ空）
    pub async fn texts(&self, selector: &str) -> Result<Vec<String>> {
        let mut texts = Vec::new();
        for element in self.find_all(selector).await? {
            texts.push(element.text().await?.trim().to_string());
        }
        Ok(texts)
    }

    /// 要素の出現を待って属性を取得する
    pub async fn attr(&self, selector: &str, name: &str) -> Result<Option<String>> {
        Ok(self.wait_for(selector).await?.attr(name).await?)
    }

    /// 現在のURLのパス部分
    pub async fn current_path(&self) -> Result<String> {
        Ok(self.client.current_url().await?.path().to_string())
    }

    /// パスが `prefix` で始まるまで待つ
    pub async fn wait_for_path(&self, prefix: &str) -> Result<String> {
        let what = format!("navigation to {prefix}");
        wait_for_value(self.poll(), &what, || async move {
            let path = self.current_path().await?;
            Ok(path.starts_with(prefix).then_some(path))
        })
        .await
    }

    /// スクリーンショットをPNGで保存する
    pub async fn screenshot(&self, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let png = self.client.screenshot().await?;
        tokio::fs::write(&path, png).await?;
        info!(path = %path.display(), "Screenshot saved");
        Ok(path)
    }

    /// 設定済みの保存先に `<name>.png` で保存する（失敗はログのみ）
    pub async fn capture(&self, name: &str) -> Option<PathBuf> {
        let path = self.settings.screenshot_dir.join(format!("{name}.png"));
        match self.screenshot(&path).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(error = %e, "Failed to capture screenshot");
                None
            }
        }
    }

    /// セッションを終了する
    pub async fn close(self) -> Result<()> {
        self.client
            .close()
            .await
            .map_err(|e| SuiteError::WebDriver(format!("failed to close session: {e}")))
    }
}
