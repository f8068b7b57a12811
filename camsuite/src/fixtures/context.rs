//! テストコンテキスト
//!
//! 管理者としてログインしたAPIクライアントと後始末台帳を持ち、
//! 各プロビジョニングヘルパーが作成したリソースを台帳に記録する。

use super::teardown::{Resource, Teardown, TeardownReport};
use super::unique_name;
use crate::api::ApiClient;
use crate::cache::camera_cache;
use crate::config::ResolvedEnv;
use crate::error::{Result, SuiteError};
use crate::inbox::{extract_code, Inbox, InboxClient};
use camsuite_common::protocol::{
    AddWidgetRequest, CreateCameraRequest, CreateLocationRequest, SignupRequest,
};
use camsuite_common::types::{
    Camera, Company, CompanyKind, CreatedToken, Layout, License, Location, User, UserRole,
    Widget, WidgetKind,
};
use rand::distributions::Alphanumeric;
use rand::Rng;
use std::sync::Arc;
use tokio::runtime::RuntimeFlavor;
use tokio::sync::Semaphore;
use tracing::{info, warn};

/// 検証メールの件名に含まれる語
const VERIFICATION_SUBJECT: &str = "verify";

/// ウィジェットの自動更新間隔（秒）
const WIDGET_AUTOREFRESH_SECS: u32 = 10;

/// SPC → IC → EUC の会社ツリー
#[derive(Debug, Clone)]
pub struct CompanyTree {
    /// サービスプロバイダ
    pub spc: Company,
    /// インテグレータ
    pub ic: Company,
    /// エンドユーザー
    pub euc: Company,
}

/// サインアップとメール検証を済ませたユーザー
#[derive(Debug, Clone)]
pub struct VerifiedUser {
    /// ユーザー
    pub user: User,
    /// このユーザーでログイン済みのクライアント（管理者とはセッションを共有しない）
    pub api: ApiClient,
    /// メールアドレス
    pub email: String,
    /// パスワード
    pub password: String,
    /// 検証メールを受けた受信箱
    pub inbox: Inbox,
}

/// カメラを同時実行数を抑えて作成する
///
/// 結果はリクエストと同じ順序で返す。
pub async fn create_cameras_bounded(
    api: &ApiClient,
    requests: Vec<CreateCameraRequest>,
    concurrency: usize,
) -> Vec<Result<Camera>> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = Vec::with_capacity(requests.len());

    for request in requests {
        let api = api.clone();
        let semaphore = semaphore.clone();
        tasks.push(tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| SuiteError::Validation(format!("provisioning cancelled: {e}")))?;
            api.create_camera(&request).await
        }));
    }

    let mut results = Vec::with_capacity(tasks.len());
    for task in tasks {
        results.push(match task.await {
            Ok(result) => result,
            Err(e) => Err(SuiteError::Validation(format!(
                "camera provisioning task failed: {e}"
            ))),
        });
    }
    results
}

fn random_password() -> String {
    let body: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(16)
        .map(char::from)
        .collect();
    format!("E2e!{body}")
}

/// 1テスト分の前提状態と後始末
pub struct TestContext {
    /// 実行環境
    pub env: ResolvedEnv,
    api: ApiClient,
    teardown: Arc<Teardown>,
    torn_down: bool,
}

impl std::fmt::Debug for TestContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestContext")
            .field("env", &self.env.name)
            .field("pending", &self.teardown.len())
            .finish()
    }
}

impl TestContext {
    /// 環境変数と設定ファイルから作成し、管理者でログインする
    pub async fn new() -> Result<Self> {
        Self::with_env(ResolvedEnv::from_environment()?).await
    }

    /// 実行環境を指定して作成し、管理者でログインする
    pub async fn with_env(env: ResolvedEnv) -> Result<Self> {
        let api = ApiClient::from_env(&env)?;
        api.login(&env.admin.email, &env.admin.password).await?;
        if let Some(company_id) = &env.spc_company_id {
            api.select_company(company_id.clone()).await;
        }
        camera_cache().clear();
        info!(env = %env.name, run_tag = super::run_tag(), "Test context ready");

        Ok(Self {
            env,
            api,
            teardown: Arc::new(Teardown::new()),
            torn_down: false,
        })
    }

    /// 管理者としてログイン済みのクライアント
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// 後始末台帳
    pub fn ledger(&self) -> &Teardown {
        &self.teardown
    }

    /// 受信箱クライアント
    pub fn inbox_client(&self) -> Result<InboxClient> {
        Ok(InboxClient::new(&self.env.inbox)?.with_retry(self.env.retry))
    }

    /// 会社を作成
    pub async fn company(&self, kind: CompanyKind, parent: Option<&Company>) -> Result<Company> {
        let name = unique_name(kind.as_str());
        let company = self.api.create_company(&name, kind, parent).await?;
        self.teardown.register(Resource::Company(company.id.clone()));
        Ok(company)
    }

    /// SPC → IC → EUC のツリーを作成
    pub async fn company_tree(&self) -> Result<CompanyTree> {
        let spc = self.company(CompanyKind::Spc, None).await?;
        let ic = self.company(CompanyKind::Ic, Some(&spc)).await?;
        let euc = self.company(CompanyKind::Euc, Some(&ic)).await?;
        Ok(CompanyTree { spc, ic, euc })
    }

    /// テスト用ドメインのアドレスでユーザーを招待する
    pub async fn user(&self, role: UserRole) -> Result<User> {
        let email = format!("{}@{}", unique_name("user"), self.env.inbox.domain);
        let user = self.api.invite_user(&email, role).await?;
        self.teardown.register(Resource::User(user.id.clone()));
        Ok(user)
    }

    /// サインアップ → 検証メール受信 → コード送信 → ログインまで済ませたユーザー
    pub async fn verified_user(&self) -> Result<VerifiedUser> {
        let inbox = self.inbox_client()?.create_inbox();
        let email = inbox.address();
        let password = random_password();

        let anonymous = self.api.fresh();
        let signup = anonymous
            .signup(&SignupRequest {
                email: email.clone(),
                password: password.clone(),
                name: unique_name("user"),
                company_name: unique_name("company"),
            })
            .await?;
        self.teardown
            .register(Resource::Company(signup.company_id.clone()));
        self.teardown.register(Resource::User(signup.user_id.clone()));

        let message = inbox
            .wait_for_message(VERIFICATION_SUBJECT, self.env.email_poll())
            .await?;
        let code = extract_code(&message).ok_or_else(|| {
            SuiteError::Inbox(format!(
                "verification email '{}' has no code",
                message.subject
            ))
        })?;
        anonymous.verify_email(&code).await?;

        let api = self.api.fresh();
        let user = api.login(&email, &password).await?;
        info!(user_id = %user.id, email = %email, "Verified user ready");

        Ok(VerifiedUser {
            user,
            api,
            email,
            password,
            inbox,
        })
    }

    /// ロケーションを作成
    pub async fn location(&self) -> Result<Location> {
        let location = self
            .api
            .create_location(&CreateLocationRequest {
                name: unique_name("location"),
                address: None,
                timezone: "UTC".to_string(),
                parent_id: None,
            })
            .await?;
        self.teardown
            .register(Resource::Location(location.id.clone()));
        Ok(location)
    }

    /// 合成ストリームのカメラを作成
    pub async fn camera(&self, location: Option<&Location>) -> Result<Camera> {
        let request =
            CreateCameraRequest::synthetic(unique_name("camera"), location.map(|l| l.id.clone()));
        let camera = self.api.create_camera(&request).await?;
        self.teardown.register(Resource::Camera(camera.id.clone()));
        Ok(camera)
    }

    /// カメラを `n` 台並行して作成
    ///
    /// 成功した分は失敗があっても台帳に記録し、最初のエラーを返す。
    pub async fn cameras(&self, n: usize, location: Option<&Location>) -> Result<Vec<Camera>> {
        let requests = (0..n)
            .map(|_| {
                CreateCameraRequest::synthetic(
                    unique_name("camera"),
                    location.map(|l| l.id.clone()),
                )
            })
            .collect();
        let results =
            create_cameras_bounded(&self.api, requests, self.env.camera_concurrency).await;

        let mut cameras = Vec::with_capacity(n);
        let mut first_error = None;
        for result in results {
            match result {
                Ok(camera) => {
                    self.teardown.register(Resource::Camera(camera.id.clone()));
                    cameras.push(camera);
                }
                Err(e) if first_error.is_none() => first_error = Some(e),
                Err(e) => warn!(error = %e, "Additional camera provisioning failure"),
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(cameras),
        }
    }

    /// ウィジェットを1つ持つレイアウトを作成
    pub async fn layout_with_widget(
        &self,
        kind: WidgetKind,
        cameras: &[Camera],
    ) -> Result<(Layout, Widget)> {
        let layout = self.api.create_layout(&unique_name("layout")).await?;
        self.teardown.register(Resource::Layout(layout.id.clone()));

        let widget = self
            .api
            .add_widget(
                &layout.id,
                &AddWidgetRequest {
                    kind,
                    title: unique_name("widget"),
                    camera_ids: cameras.iter().map(|c| c.id.clone()).collect(),
                    autorefresh_secs: Some(WIDGET_AUTOREFRESH_SECS),
                },
            )
            .await?;
        let layout = self.api.get_layout(&layout.id).await?;
        Ok((layout, widget))
    }

    /// APIトークンを発行
    pub async fn token(&self, scopes: &[&str]) -> Result<CreatedToken> {
        let created = self.api.create_token(&unique_name("token"), scopes).await?;
        self.teardown
            .register(Resource::Token(created.token.id.clone()));
        Ok(created)
    }

    /// 設定済みのライセンスキーを有効化する
    ///
    /// 有効化は取り消せないため台帳には記録しない。
    pub async fn license(&self) -> Result<License> {
        let key = self.env.license_keys.first().ok_or_else(|| {
            SuiteError::Validation(format!(
                "environment '{}' has no license_keys configured",
                self.env.name
            ))
        })?;
        match self.api.activate_license(key).await {
            Ok(license) => Ok(license),
            // 有効化済み
            Err(SuiteError::Api { status: 409, .. }) => self
                .api
                .list_licenses()
                .await?
                .into_iter()
                .find(|l| &l.key == key)
                .ok_or_else(|| SuiteError::NotFound(format!("license with key {key}"))),
            Err(e) => Err(e),
        }
    }

    /// ライセンスをカメラに割り当てる
    pub async fn assign_license(&self, license: &License, camera: &Camera) -> Result<License> {
        let updated = self.api.assign_license(&license.id, &camera.id).await?;
        self.teardown.register(Resource::LicenseAssignment {
            license_id: license.id.clone(),
            camera_id: camera.id.clone(),
        });
        Ok(updated)
    }

    /// 台帳を実行し、カメラキャッシュをクリアする
    pub async fn teardown(mut self) -> TeardownReport {
        self.torn_down = true;
        let report = self.teardown.run(&self.api).await;
        camera_cache().clear();
        report
    }
}

impl Drop for TestContext {
    fn drop(&mut self) {
        if self.torn_down || self.teardown.is_done() || self.teardown.is_empty() {
            return;
        }
        warn!(
            pending = self.teardown.len(),
            "TestContext dropped without teardown, cleaning up"
        );
        let ledger = self.teardown.clone();
        let api = self.api.clone();

        // 呼び出し側のランタイムは直後に終了しうるため、専用スレッドの
        // ランタイムで最後まで実行して待つ
        let cleanup = move || {
            let worker = std::thread::spawn(move || run_detached_teardown(&ledger, &api));
            if worker.join().is_err() {
                warn!("Teardown thread panicked, resources may be leaked");
            }
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(cleanup)
            }
            _ => cleanup(),
        }
    }
}

fn run_detached_teardown(ledger: &Teardown, api: &ApiClient) {
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            warn!(
                error = %e,
                pending = ledger.len(),
                "Cannot start teardown runtime, resources leaked"
            );
            return;
        }
    };
    runtime.block_on(async {
        let api = match api.detached().await {
            Ok(api) => api,
            Err(e) => {
                warn!(
                    error = %e,
                    pending = ledger.len(),
                    "Cannot build teardown client, resources leaked"
                );
                return;
            }
        };
        let report = ledger.run(&api).await;
        if !report.is_clean() {
            warn!(
                failed = report.failed.len(),
                "Teardown after drop left resources behind"
            );
        }
        camera_cache().clear();
    });
}
