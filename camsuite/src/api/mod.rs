//! REST APIクライアント
//!
//! 認証トークン・選択中の会社・ログインユーザーを束ねたセッションを保持し、
//! バックエンドへのリクエストを組み立てる。
//!
//! - 認証済みなら `Authorization: Bearer <token>`、会社選択中なら `X-Company-Id` を付与
//! - 一時障害は `retry` のポリシーで再試行
//! - 認証済みセッションで401を受けた場合は一度だけ再ログインして再送

pub mod auth;
pub mod cameras;
pub mod companies;
pub mod layouts;
pub mod licenses;
pub mod locations;
pub mod search;
pub mod tokens;
pub mod users;

use crate::config::ResolvedEnv;
use crate::error::{Result, SuiteError};
use crate::retry::{retry, RetryPolicy};
use camsuite_common::config::Credentials;
use camsuite_common::protocol::LoginRequest;
use camsuite_common::types::{AuthTokens, User};
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

/// REST APIのパス接頭辞
pub const API_PREFIX: &str = "/api/v1";

/// 会社選択ヘッダ
pub const COMPANY_HEADER: &str = "X-Company-Id";

/// ログインエンドポイント
const LOGIN_PATH: &str = "/auth/login";

/// エラーメッセージに含めるボディの最大長
const MAX_ERROR_BODY: usize = 512;

/// セッション状態
#[derive(Debug, Clone, Default)]
pub struct Session {
    /// アクセストークン
    pub access_token: Option<String>,
    /// ログインユーザー
    pub user: Option<User>,
    /// 選択中の会社ID
    pub company_id: Option<String>,
    credentials: Option<Credentials>,
}

impl Session {
    /// 再認証に使える認証情報を持つか
    pub fn can_reauthenticate(&self) -> bool {
        self.credentials.is_some()
    }
}

#[derive(Debug, Clone, Default)]
struct AuthHeaders {
    token: Option<String>,
    company_id: Option<String>,
}

struct Inner {
    http: Client,
    base_url: String,
    retry: RetryPolicy,
    timeout: Duration,
    session: RwLock<Session>,
    reauth_lock: Mutex<()>,
}

/// REST APIクライアント（クローンはセッションを共有する）
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    /// 新しいクライアントを作成
    pub fn new(base_url: impl Into<String>, retry: RetryPolicy) -> Result<Self> {
        Self::with_timeout(base_url, retry, Duration::from_secs(30))
    }

    /// リクエストタイムアウトを指定して作成
    pub fn with_timeout(
        base_url: impl Into<String>,
        retry: RetryPolicy,
        timeout: Duration,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(format!("camsuite/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::build(http, base_url.into(), retry, timeout))
    }

    /// 実行環境の設定から作成
    pub fn from_env(env: &ResolvedEnv) -> Result<Self> {
        Self::with_timeout(env.api_url.clone(), env.retry, env.request_timeout())
    }

    fn build(http: Client, base_url: String, retry: RetryPolicy, timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                http,
                base_url: base_url.trim_end_matches('/').to_string(),
                retry,
                timeout,
                session: RwLock::new(Session::default()),
                reauth_lock: Mutex::new(()),
            }),
        }
    }

    /// 同じ接続設定で、セッションを共有しない新しいクライアントを作る
    pub fn fresh(&self) -> Self {
        Self::build(
            self.inner.http.clone(),
            self.inner.base_url.clone(),
            self.inner.retry,
            self.inner.timeout,
        )
    }

    /// 新しいHTTP接続プールで、現在のセッションを引き継いだクライアントを作る
    ///
    /// 元のランタイムが終了した後に別ランタイムから使う場合に用いる。
    pub async fn detached(&self) -> Result<Self> {
        let detached = Self::with_timeout(
            self.inner.base_url.clone(),
            self.inner.retry,
            self.inner.timeout,
        )?;
        *detached.inner.session.write().await = self.session().await;
        Ok(detached)
    }

    /// APIトークンで認証するクライアントに切り替える（再認証なし）
    pub async fn use_api_token(&self, secret: impl Into<String>) {
        let mut session = self.inner.session.write().await;
        *session = Session {
            access_token: Some(secret.into()),
            ..Session::default()
        };
    }

    /// ベースURL
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// リトライポリシー
    pub fn retry_policy(&self) -> RetryPolicy {
        self.inner.retry
    }

    /// セッションのスナップショット
    pub async fn session(&self) -> Session {
        self.inner.session.read().await.clone()
    }

    /// 認証済みか
    pub async fn is_authenticated(&self) -> bool {
        self.inner.session.read().await.access_token.is_some()
    }

    /// ログイン中のユーザー
    pub async fn current_user(&self) -> Option<User> {
        self.inner.session.read().await.user.clone()
    }

    /// 以降のリクエストの対象会社を選択する
    pub async fn select_company(&self, company_id: impl Into<String>) {
        let company_id = company_id.into();
        debug!(company_id = %company_id, "Selecting company");
        self.inner.session.write().await.company_id = Some(company_id);
    }

    /// 会社選択を解除する
    pub async fn clear_company(&self) {
        self.inner.session.write().await.company_id = None;
    }

    /// 選択中の会社ID
    pub async fn selected_company(&self) -> Option<String> {
        self.inner.session.read().await.company_id.clone()
    }

    /// ログインしてセッションを確立する
    ///
    /// 既存セッションの会社選択はリセットされる。
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let credentials = Credentials {
            email: email.to_string(),
            password: password.to_string(),
        };
        let tokens = self.authenticate(&credentials).await?;
        let user = tokens.user.clone();

        let mut session = self.inner.session.write().await;
        *session = Session {
            access_token: Some(tokens.access_token),
            user: Some(tokens.user),
            company_id: None,
            credentials: Some(credentials),
        };
        info!(email, user_id = %user.id, "Logged in");
        Ok(user)
    }

    /// ローカルのセッションを破棄する
    pub(crate) async fn invalidate_session(&self) {
        let mut session = self.inner.session.write().await;
        *session = Session::default();
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<AuthTokens> {
        let body = serde_json::to_value(LoginRequest {
            email: credentials.email.clone(),
            password: credentials.password.clone(),
        })?;
        let label = format!("POST {LOGIN_PATH}");
        let text = retry(&self.inner.retry, &label, || {
            self.send_once(Method::POST, LOGIN_PATH, Some(&body), AuthHeaders::default())
        })
        .await?;
        decode(&label, &text)
    }

    /// 401を受けたトークンを捨てて再ログインする
    ///
    /// 並行リクエストが同時に401を受けても、再ログインは1回にまとめる。
    async fn reauthenticate(&self, rejected_token: Option<&str>) -> Result<()> {
        let _guard = self.inner.reauth_lock.lock().await;

        let credentials = {
            let session = self.inner.session.read().await;
            if session.access_token.as_deref() != rejected_token {
                // 別タスクが再ログイン済み
                return Ok(());
            }
            session.credentials.clone()
        };
        let credentials = credentials
            .ok_or_else(|| SuiteError::Unauthorized("session has no credentials".into()))?;

        warn!(email = %credentials.email, "Session rejected, re-authenticating");
        self.inner.session.write().await.access_token = None;

        let tokens = self.authenticate(&credentials).await?;
        let mut session = self.inner.session.write().await;
        session.access_token = Some(tokens.access_token);
        session.user = Some(tokens.user);
        Ok(())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.inner.base_url, API_PREFIX, path)
    }

    async fn auth_headers(&self) -> (AuthHeaders, bool) {
        let session = self.inner.session.read().await;
        (
            AuthHeaders {
                token: session.access_token.clone(),
                company_id: session.company_id.clone(),
            },
            session.can_reauthenticate(),
        )
    }

    async fn send_once(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        auth: AuthHeaders,
    ) -> Result<String> {
        let mut request = self.inner.http.request(method.clone(), self.url(path));
        if let Some(token) = &auth.token {
            request = request.bearer_auth(token);
        }
        if let Some(company_id) = &auth.company_id {
            request = request.header(COMPANY_HEADER, company_id);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let retry_after = parse_retry_after(response.headers());
        let text = response.text().await?;

        if status.is_success() {
            return Ok(text);
        }

        debug!(%method, path, status = status.as_u16(), "Request failed");
        match status.as_u16() {
            401 => Err(SuiteError::Unauthorized(format!(
                "{method} {path}: {}",
                truncate(&text)
            ))),
            404 => Err(SuiteError::NotFound(format!("{method} {path}"))),
            code => Err(SuiteError::Api {
                status: code,
                method: method.to_string(),
                path: path.to_string(),
                body: truncate(&text),
                retry_after,
            }),
        }
    }

    async fn send_authenticated(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<String> {
        let (auth, can_reauth) = self.auth_headers().await;
        let rejected = auth.token.clone();
        match self.send_once(method.clone(), path, body, auth).await {
            Err(SuiteError::Unauthorized(_)) if can_reauth => {
                self.reauthenticate(rejected.as_deref()).await?;
                let (auth, _) = self.auth_headers().await;
                self.send_once(method, path, body, auth).await
            }
            other => other,
        }
    }

    /// リトライ・再認証付きでリクエストを送り、レスポンスボディを返す
    pub async fn execute(&self, method: Method, path: &str, body: Option<&Value>) -> Result<String> {
        let label = format!("{method} {path}");
        retry(&self.inner.retry, &label, || {
            self.send_authenticated(method.clone(), path, body)
        })
        .await
    }

    /// GETしてJSONをデコードする
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let text = self.execute(Method::GET, path, None).await?;
        decode(path, &text)
    }

    /// POSTしてJSONをデコードする
    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        let text = self.execute(Method::POST, path, Some(&body)).await?;
        decode(path, &text)
    }

    /// POSTしてレスポンスボディを捨てる
    pub async fn post_no_content<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<()> {
        let body = serde_json::to_value(body)?;
        self.execute(Method::POST, path, Some(&body)).await?;
        Ok(())
    }

    /// PATCHしてJSONをデコードする
    pub async fn patch<B, T>(&self, path: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let body = serde_json::to_value(body)?;
        let text = self.execute(Method::PATCH, path, Some(&body)).await?;
        decode(path, &text)
    }

    /// DELETEする
    pub async fn delete(&self, path: &str) -> Result<()> {
        self.execute(Method::DELETE, path, None).await?;
        Ok(())
    }

    /// DELETEする（404は削除済みとして扱う）
    ///
    /// 実際に削除した場合は `true`、既に存在しなかった場合は `false` を返す。
    pub async fn delete_idempotent(&self, path: &str) -> Result<bool> {
        match self.delete(path).await {
            Ok(()) => Ok(true),
            Err(SuiteError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

fn decode<T: DeserializeOwned>(label: &str, text: &str) -> Result<T> {
    serde_json::from_str(text).map_err(|e| {
        debug!(label, body = %truncate(text), "Failed to decode response");
        SuiteError::Serialization(e)
    })
}

pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn truncate(text: &str) -> String {
    if text.len() <= MAX_ERROR_BODY {
        return text.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &text[..end])
}
