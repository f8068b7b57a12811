//! 認証系API

use super::ApiClient;
use crate::error::Result;
use camsuite_common::protocol::{
    PasswordResetRequest, SignupRequest, SignupResponse, VerifyEmailRequest,
};
use camsuite_common::types::User;
use serde_json::json;
use tracing::{debug, info};

impl ApiClient {
    /// ログアウトする
    ///
    /// サーバー呼び出しはベストエフォートで、ローカルのセッションは必ず破棄する。
    pub async fn logout(&self) -> Result<()> {
        if self.is_authenticated().await {
            if let Err(e) = self.post_no_content("/auth/logout", &json!({})).await {
                debug!(error = %e, "Server-side logout failed, dropping local session anyway");
            }
        }
        self.invalidate_session().await;
        info!("Logged out");
        Ok(())
    }

    /// セルフサインアップ（確認メールが送信される）
    pub async fn signup(&self, request: &SignupRequest) -> Result<SignupResponse> {
        let response: SignupResponse = self.post("/auth/signup", request).await?;
        info!(email = %request.email, user_id = %response.user_id, "Signed up");
        Ok(response)
    }

    /// メールの確認コードを送信する
    pub async fn verify_email(&self, code: &str) -> Result<()> {
        self.post_no_content(
            "/auth/verify",
            &VerifyEmailRequest {
                code: code.to_string(),
            },
        )
        .await
    }

    /// パスワードリセットメールを要求する
    pub async fn request_password_reset(&self, email: &str) -> Result<()> {
        self.post_no_content(
            "/auth/password-reset",
            &PasswordResetRequest {
                email: email.to_string(),
            },
        )
        .await
    }

    /// ログイン中のユーザーをサーバーから取得する
    pub async fn me(&self) -> Result<User> {
        self.get("/users/me").await
    }
}
