//! APIトークン管理

use super::ApiClient;
use crate::error::Result;
use camsuite_common::protocol::CreateTokenRequest;
use camsuite_common::types::{ApiToken, CreatedToken};

impl ApiClient {
    /// トークン一覧（シークレットは含まれない）
    pub async fn list_tokens(&self) -> Result<Vec<ApiToken>> {
        self.get("/tokens").await
    }

    /// トークンを発行
    pub async fn create_token(&self, name: &str, scopes: &[&str]) -> Result<CreatedToken> {
        self.post(
            "/tokens",
            &CreateTokenRequest {
                name: name.to_string(),
                scopes: scopes.iter().map(|s| s.to_string()).collect(),
            },
        )
        .await
    }

    /// トークンを失効させる
    pub async fn revoke_token(&self, id: &str) -> Result<()> {
        self.delete(&format!("/tokens/{id}")).await
    }
}
