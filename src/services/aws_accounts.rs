// Registered AWS accounts and per-project deployments

use super::{body, decode_list, execute, fetch};
use crate::errors::{ResultExt, ServiceError};
use crate::models::{
    AccountDetails, AwsAccount, AwsAccountPatch, AwsCredentials, CredentialCheck, JobSnapshot,
    JobStart, NewAwsAccount,
};
use crate::transport::{Method, RequestOptions, Transport};
use std::sync::Arc;

#[derive(Clone)]
pub struct AwsAccountsService {
    transport: Arc<dyn Transport>,
}

impl AwsAccountsService {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub async fn list(&self) -> Result<Vec<AwsAccount>, ServiceError> {
        const FALLBACK: &str = "Failed to load AWS accounts";
        let value = self
            .transport
            .get("/aws-accounts", RequestOptions::new())
            .await
            .with_fallback(FALLBACK)?;
        decode_list(value, &["accounts", "items"], FALLBACK)
    }

    pub async fn get(&self, id: &str) -> Result<AwsAccount, ServiceError> {
        fetch(
            self.transport.as_ref(),
            Method::Get,
            &format!("/aws-accounts/{}", id),
            RequestOptions::new(),
            "Failed to load AWS account",
        )
        .await
    }

    pub async fn create(&self, account: &NewAwsAccount) -> Result<AwsAccount, ServiceError> {
        const FALLBACK: &str = "Failed to add AWS account";
        log::info!("[AwsAccountsService] Adding account '{}'", account.name);
        fetch(
            self.transport.as_ref(),
            Method::Post,
            "/aws-accounts",
            body(account, FALLBACK)?,
            FALLBACK,
        )
        .await
    }

    pub async fn update(&self, id: &str, patch: &AwsAccountPatch) -> Result<AwsAccount, ServiceError> {
        const FALLBACK: &str = "Failed to update AWS account";
        fetch(
            self.transport.as_ref(),
            Method::Put,
            &format!("/aws-accounts/{}", id),
            body(patch, FALLBACK)?,
            FALLBACK,
        )
        .await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        log::info!("[AwsAccountsService] Removing account {}", id);
        execute(
            self.transport.as_ref(),
            Method::Delete,
            &format!("/aws-accounts/{}", id),
            RequestOptions::new(),
            "Failed to remove AWS account",
        )
        .await
    }

    /// Check keys against AWS before saving them
    pub async fn validate_credentials(
        &self,
        credentials: &AwsCredentials,
    ) -> Result<CredentialCheck, ServiceError> {
        const FALLBACK: &str = "Failed to validate AWS credentials";
        fetch(
            self.transport.as_ref(),
            Method::Post,
            "/aws-accounts/validate-credentials",
            body(credentials, FALLBACK)?,
            FALLBACK,
        )
        .await
    }

    /// Re-check the stored keys of an account
    pub async fn revalidate(&self, id: &str) -> Result<CredentialCheck, ServiceError> {
        fetch(
            self.transport.as_ref(),
            Method::Patch,
            &format!("/aws-accounts/{}/validate", id),
            RequestOptions::new(),
            "Failed to validate AWS account",
        )
        .await
    }

    pub async fn details(&self, id: &str) -> Result<AccountDetails, ServiceError> {
        fetch(
            self.transport.as_ref(),
            Method::Get,
            &format!("/aws-accounts/{}/details", id),
            RequestOptions::new(),
            "Failed to load AWS account details",
        )
        .await
    }

    pub async fn deploy(&self, account_id: &str, project_id: &str) -> Result<JobStart, ServiceError> {
        log::info!(
            "[AwsAccountsService] Deploying project {} to account {}",
            project_id,
            account_id
        );
        fetch(
            self.transport.as_ref(),
            Method::Post,
            &format!("/aws-accounts/{}/deploy/{}", account_id, project_id),
            RequestOptions::new(),
            "Failed to start deployment",
        )
        .await
    }

    pub async fn destroy(&self, account_id: &str, project_id: &str) -> Result<JobStart, ServiceError> {
        log::info!(
            "[AwsAccountsService] Destroying project {} in account {}",
            project_id,
            account_id
        );
        fetch(
            self.transport.as_ref(),
            Method::Post,
            &format!("/aws-accounts/{}/destroy/{}", account_id, project_id),
            RequestOptions::new(),
            "Failed to destroy deployment",
        )
        .await
    }

    pub async fn deployment_status(
        &self,
        account_id: &str,
        project_id: &str,
    ) -> Result<JobSnapshot, ServiceError> {
        fetch(
            self.transport.as_ref(),
            Method::Get,
            &format!("/aws-accounts/{}/deployment-status/{}", account_id, project_id),
            RequestOptions::new(),
            "Failed to load deployment status",
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::JobStatus;
    use crate::testing::ScriptedTransport;
    use serde_json::json;

    fn service() -> (Arc<ScriptedTransport>, AwsAccountsService) {
        let transport = Arc::new(ScriptedTransport::new());
        (transport.clone(), AwsAccountsService::new(transport))
    }

    #[tokio::test]
    async fn test_list_and_get() {
        let (transport, accounts) = service();
        transport.ok(
            Method::Get,
            "/aws-accounts",
            json!({"accounts": [{"id": 1, "name": "prod"}, {"id": 2, "name": "dev"}]}),
        );
        transport.ok(Method::Get, "/aws-accounts/1", json!({"id": 1, "name": "prod"}));

        let list = accounts.list().await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(accounts.get("1").await.unwrap().name, "prod");
    }

    #[tokio::test]
    async fn test_validate_credentials_reports_invalid_keys() {
        let (transport, accounts) = service();
        transport.ok(
            Method::Post,
            "/aws-accounts/validate-credentials",
            json!({"valid": false, "error": "InvalidClientTokenId"}),
        );
        let creds = AwsCredentials {
            access_key_id: "AKIA0000000000000000".into(),
            secret_access_key: "x".repeat(40),
            session_token: None,
            region: "eu-west-1".into(),
        };
        let check = accounts.validate_credentials(&creds).await.unwrap();
        assert!(!check.valid);
        assert_eq!(check.message.as_deref(), Some("InvalidClientTokenId"));
    }

    #[tokio::test]
    async fn test_deploy_and_status_paths() {
        let (transport, accounts) = service();
        transport.ok(Method::Post, "/aws-accounts/a1/deploy/p1", json!({"deployment_id": "d1"}));
        transport.ok(
            Method::Get,
            "/aws-accounts/a1/deployment-status/p1",
            json!({"status": "deploying", "progress_percentage": 10}),
        );

        let start = accounts.deploy("a1", "p1").await.unwrap();
        assert_eq!(start.job_id, "d1");
        let status = accounts.deployment_status("a1", "p1").await.unwrap();
        assert_eq!(status.status, JobStatus::Running);
    }
}
