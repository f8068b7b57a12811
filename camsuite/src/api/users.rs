//! ユーザー管理API

use super::ApiClient;
use crate::error::Result;
use camsuite_common::protocol::{InviteUserRequest, UpdateUserRequest};
use camsuite_common::types::{User, UserRole};
use tracing::info;

impl ApiClient {
    /// 選択中の会社のユーザー一覧
    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.get("/users").await
    }

    /// メールアドレスでユーザーを探す（大文字小文字は区別しない）
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let users = self.list_users().await?;
        Ok(users
            .into_iter()
            .find(|u| u.email.eq_ignore_ascii_case(email)))
    }

    /// ユーザーを招待（招待メールが送信される）
    pub async fn invite_user(&self, email: &str, role: UserRole) -> Result<User> {
        let user: User = self
            .post(
                "/users/invite",
                &InviteUserRequest {
                    email: email.to_string(),
                    role,
                },
            )
            .await?;
        info!(user_id = %user.id, email, role = role.label(), "User invited");
        Ok(user)
    }

    /// ロールを変更
    pub async fn update_user_role(&self, id: &str, role: UserRole) -> Result<User> {
        self.patch(&format!("/users/{id}"), &UpdateUserRequest { role })
            .await
    }

    /// ユーザーを削除
    pub async fn delete_user(&self, id: &str) -> Result<()> {
        self.delete(&format!("/users/{id}")).await
    }
}
