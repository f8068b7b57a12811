//! テスト用受信箱クライアント
//!
//! 固定のテストドメイン配下に合成ローカルパート（`e2e-xxxxxxxxxx`）で受信箱を作り、
//! 確認メールや通知メールの到着をHTTP API経由で待つ。

use crate::api::parse_retry_after;
use crate::error::{Result, SuiteError};
use crate::eventual::{wait_for_value, Poll};
use crate::retry::{retry, RetryPolicy};
use camsuite_common::config::InboxConfig;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use once_cell::sync::Lazy;
use rand::distributions::Alphanumeric;
use rand::Rng;
use regex::Regex;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

/// ローカルパートの接頭辞
pub const LOCAL_PART_PREFIX: &str = "e2e-";

/// 送信側と受信箱サービスの時計ずれの許容幅（秒）
const CLOCK_SKEW_SECS: i64 = 5;

static LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"https?://[^\s"'<>]+"#).expect("link regex is valid"));

static CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(\d{6})\b").expect("code regex is valid"));

/// 受信箱一覧の1件
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MessageSummary {
    /// メッセージID
    pub id: String,
    /// 差出人
    pub from: String,
    /// 件名
    pub subject: String,
    /// 受信時刻（エポックミリ秒）
    pub time: i64,
}

impl MessageSummary {
    /// 受信時刻
    pub fn received_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.time).single()
    }
}

#[derive(Debug, Deserialize)]
struct InboxListing {
    #[serde(default)]
    msgs: Vec<MessageSummary>,
}

/// メール本文
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// メッセージID
    pub id: String,
    /// 差出人
    pub from: String,
    /// 件名
    pub subject: String,
    /// 受信時刻（エポックミリ秒）
    pub time: i64,
    /// テキスト本文
    #[serde(default)]
    pub text: String,
    /// HTML本文
    #[serde(default)]
    pub html: String,
}

impl Message {
    fn bodies(&self) -> impl Iterator<Item = &str> {
        [self.text.as_str(), self.html.as_str()].into_iter()
    }
}

/// `host_contains` を含む最初のリンクを抽出する
///
/// HTML本文中の `&amp;` は `&` に戻す。
pub fn extract_link(message: &Message, host_contains: &str) -> Option<String> {
    message.bodies().find_map(|body| {
        LINK_RE
            .find_iter(body)
            .map(|m| m.as_str().replace("&amp;", "&"))
            .find(|link| link.contains(host_contains))
    })
}

/// 本文中の最初の6桁コードを抽出する
pub fn extract_code(message: &Message) -> Option<String> {
    message.bodies().find_map(|body| {
        CODE_RE
            .captures(body)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    })
}

/// ランダムなローカルパートを生成する
pub fn random_local_part() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(|b| (b as char).to_ascii_lowercase())
        .collect();
    format!("{LOCAL_PART_PREFIX}{suffix}")
}

/// 受信箱サービスのクライアント
#[derive(Debug, Clone)]
pub struct InboxClient {
    http: Client,
    api_url: String,
    domain: String,
    token: String,
    retry: RetryPolicy,
}

impl InboxClient {
    /// 設定から作成
    pub fn new(config: &InboxConfig) -> Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self {
            http,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            domain: config.domain.clone(),
            token: config.token.clone(),
            retry: RetryPolicy::default(),
        })
    }

    /// 一時障害時のリトライポリシーを差し替える
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// 受信ドメイン
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// ランダムなローカルパートで受信箱を作る
    pub fn create_inbox(&self) -> Inbox {
        self.inbox_for(random_local_part())
    }

    /// 指定したローカルパートの受信箱を開く
    pub fn inbox_for(&self, local_part: impl Into<String>) -> Inbox {
        Inbox {
            client: self.clone(),
            local_part: local_part.into(),
            created_at: Utc::now(),
        }
    }

    async fn request<T: DeserializeOwned>(&self, method: Method, path: &str) -> Result<Option<T>> {
        let label = format!("inbox {method} {path}");
        retry(&self.retry, &label, || self.send_once(method.clone(), path)).await
    }

    async fn send_once<T: DeserializeOwned>(&self, method: Method, path: &str) -> Result<Option<T>> {
        let url = format!("{}/domains/{}{}", self.api_url, self.domain, path);
        let mut request = self.http.request(method.clone(), &url);
        if !self.token.is_empty() {
            request = request.header("Authorization", &self.token);
        }
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if status.is_success() {
            return Ok(Some(response.json().await?));
        }

        let retry_after = parse_retry_after(response.headers());
        let body = response.text().await.unwrap_or_default();
        if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(SuiteError::Api {
                status: status.as_u16(),
                method: method.to_string(),
                path: url,
                body,
                retry_after,
            });
        }
        Err(SuiteError::Inbox(format!(
            "{method} {path} returned {}: {body}",
            status.as_u16()
        )))
    }
}

/// 1つの受信箱
#[derive(Debug, Clone)]
pub struct Inbox {
    client: InboxClient,
    local_part: String,
    created_at: DateTime<Utc>,
}

impl Inbox {
    /// ローカルパート
    pub fn local_part(&self) -> &str {
        &self.local_part
    }

    /// メールアドレス
    pub fn address(&self) -> String {
        format!("{}@{}", self.local_part, self.client.domain)
    }

    /// 受信メール一覧
    pub async fn list(&self) -> Result<Vec<MessageSummary>> {
        let listing: Option<InboxListing> = self
            .client
            .request(Method::GET, &format!("/inboxes/{}", self.local_part))
            .await?;
        Ok(listing.map(|l| l.msgs).unwrap_or_default())
    }

    /// メール本文を取得
    pub async fn message(&self, id: &str) -> Result<Message> {
        self.client
            .request(Method::GET, &format!("/messages/{id}"))
            .await?
            .ok_or_else(|| SuiteError::Inbox(format!("message {id} has no content")))
    }

    /// 受信箱を空にする
    pub async fn purge(&self) -> Result<()> {
        let _: Option<serde_json::Value> = self
            .client
            .request(Method::DELETE, &format!("/inboxes/{}", self.local_part))
            .await?;
        debug!(address = %self.address(), "Inbox purged");
        Ok(())
    }

    fn is_fresh(&self, summary: &MessageSummary) -> bool {
        let threshold = self.created_at - ChronoDuration::seconds(CLOCK_SKEW_SECS);
        summary
            .received_at()
            .map(|at| at >= threshold)
            .unwrap_or(true)
    }

    /// 件名に `subject_contains` を含むメールの到着を待つ
    ///
    /// 受信箱の作成より前（時計ずれ許容分を除く）に届いたメールは無視する。
    pub async fn wait_for_message(&self, subject_contains: &str, poll: Poll) -> Result<Message> {
        let what = format!("email '{}' to {}", subject_contains, self.address());
        let needle = subject_contains.to_lowercase();

        let summary = wait_for_value(poll, &what, || {
            let needle = needle.clone();
            async move {
                let messages = self.list().await?;
                Ok(messages.into_iter().find(|m| {
                    self.is_fresh(m) && m.subject.to_lowercase().contains(&needle)
                }))
            }
        })
        .await?;

        info!(address = %self.address(), subject = %summary.subject, "Email received");
        self.message(&summary.id).await
    }
}
