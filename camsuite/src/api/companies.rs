//! 会社（テナント）API

use super::ApiClient;
use crate::error::{Result, SuiteError};
use camsuite_common::protocol::{CreateCompanyRequest, UpdateCompanyRequest};
use camsuite_common::types::{Company, CompanyKind};
use tracing::info;

impl ApiClient {
    /// 参照可能な会社一覧
    pub async fn list_companies(&self) -> Result<Vec<Company>> {
        self.get("/companies").await
    }

    /// 会社を取得
    pub async fn get_company(&self, id: &str) -> Result<Company> {
        self.get(&format!("/companies/{id}")).await
    }

    /// 会社を作成
    ///
    /// 親会社を渡した場合は SPC → IC → EUC の階層をローカルで検証してから送信する。
    pub async fn create_company(
        &self,
        name: &str,
        kind: CompanyKind,
        parent: Option<&Company>,
    ) -> Result<Company> {
        if let Some(parent) = parent {
            if !parent.kind.can_parent(kind) {
                return Err(SuiteError::Validation(format!(
                    "a {} company cannot be created under a {} company",
                    kind.as_str(),
                    parent.kind.as_str()
                )));
            }
        }
        let request = CreateCompanyRequest {
            name: name.to_string(),
            kind,
            parent_id: parent.map(|p| p.id.clone()),
        };
        let company: Company = self.post("/companies", &request).await?;
        info!(company_id = %company.id, kind = kind.as_str(), name, "Company created");
        Ok(company)
    }

    /// 会社名を変更
    pub async fn rename_company(&self, id: &str, name: &str) -> Result<Company> {
        self.patch(
            &format!("/companies/{id}"),
            &UpdateCompanyRequest {
                name: name.to_string(),
            },
        )
        .await
    }

    /// 会社を削除
    pub async fn delete_company(&self, id: &str) -> Result<()> {
        self.delete(&format!("/companies/{id}")).await?;
        info!(company_id = %id, "Company deleted");
        Ok(())
    }
}
