// Production infrastructure jobs: deploy, import, apply security policies

use super::{body, execute, fetch};
use crate::errors::ServiceError;
use crate::models::{
    ApplyPoliciesRequest, CredentialCheck, DeployRequest, DestroyRequest, ImportExistingRequest,
    JobSnapshot, JobStart,
};
use crate::transport::{Method, RequestOptions, Transport};
use std::sync::Arc;

#[derive(Clone)]
pub struct ProductionService {
    transport: Arc<dyn Transport>,
}

impl ProductionService {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Start deploying a project's architecture into an account
    pub async fn create_from_scratch(&self, request: &DeployRequest) -> Result<JobStart, ServiceError> {
        const FALLBACK: &str = "Failed to start deployment";
        log::info!(
            "[ProductionService] Deploying project {} to account {}",
            request.project_id,
            request.aws_account_id
        );
        fetch(
            self.transport.as_ref(),
            Method::Post,
            "/production-infrastructure/create-from-scratch",
            body(request, FALLBACK)?,
            FALLBACK,
        )
        .await
    }

    /// Start importing the resources of an existing account
    pub async fn import_existing(&self, request: &ImportExistingRequest) -> Result<JobStart, ServiceError> {
        const FALLBACK: &str = "Failed to start import";
        log::info!(
            "[ProductionService] Importing account {}",
            request.aws_account_id
        );
        fetch(
            self.transport.as_ref(),
            Method::Post,
            "/production-infrastructure/import-existing",
            body(request, FALLBACK)?,
            FALLBACK,
        )
        .await
    }

    pub async fn import_status(&self, import_id: &str) -> Result<JobSnapshot, ServiceError> {
        fetch(
            self.transport.as_ref(),
            Method::Get,
            &format!("/production-infrastructure/import-status/{}", import_id),
            RequestOptions::new(),
            "Failed to load import status",
        )
        .await
    }

    pub async fn apply_security_policies(
        &self,
        request: &ApplyPoliciesRequest,
    ) -> Result<JobStart, ServiceError> {
        const FALLBACK: &str = "Failed to apply security fixes";
        log::info!(
            "[ProductionService] Applying {} security fix(es) for import {}",
            request.gap_ids.len(),
            request.import_id
        );
        fetch(
            self.transport.as_ref(),
            Method::Post,
            "/production-infrastructure/apply-security-policies",
            body(request, FALLBACK)?,
            FALLBACK,
        )
        .await
    }

    pub async fn deployment_status(&self, deployment_id: &str) -> Result<JobSnapshot, ServiceError> {
        fetch(
            self.transport.as_ref(),
            Method::Get,
            &format!("/production-infrastructure/deployment-status/{}", deployment_id),
            RequestOptions::new(),
            "Failed to load deployment status",
        )
        .await
    }

    /// Tear down a deployment. The account's stored keys are used server-side.
    pub async fn destroy(&self, deployment_id: &str, aws_account_id: &str) -> Result<JobStart, ServiceError> {
        const FALLBACK: &str = "Failed to destroy deployment";
        log::info!("[ProductionService] Destroying deployment {}", deployment_id);
        let request = DestroyRequest {
            aws_account_id: aws_account_id.to_string(),
            confirm: true,
        };
        fetch(
            self.transport.as_ref(),
            Method::Post,
            &format!("/production-infrastructure/destroy/{}", deployment_id),
            body(&request, FALLBACK)?,
            FALLBACK,
        )
        .await
    }

    pub async fn validate_credentials(&self, aws_account_id: &str) -> Result<CredentialCheck, ServiceError> {
        fetch(
            self.transport.as_ref(),
            Method::Get,
            "/production-infrastructure/validate-aws-credentials",
            RequestOptions::new().query("aws_account_id", aws_account_id),
            "Failed to validate AWS credentials",
        )
        .await
    }

    /// Ask the server to stop a job. Best effort: the caller has already
    /// stopped listening.
    pub async fn cancel(&self, job_id: &str) -> Result<(), ServiceError> {
        execute(
            self.transport.as_ref(),
            Method::Post,
            &format!("/production-infrastructure/cancel/{}", job_id),
            RequestOptions::new(),
            "Failed to cancel operation",
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

    #[tokio::test]
    async fn test_apply_policies_sends_both_ids() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.ok(
            Method::Post,
            "/production-infrastructure/apply-security-policies",
            json!({"job_id": "j1", "status": "started"}),
        );
        let service = ProductionService::new(transport.clone());

        let start = service
            .apply_security_policies(&ApplyPoliciesRequest {
                import_id: "imp-1".into(),
                aws_account_id: "a1".into(),
                gap_ids: vec!["g1".into(), "g2".into()],
            })
            .await
            .unwrap();
        assert_eq!(start.job_id, "j1");
        assert_eq!(
            transport.last_body(Method::Post, "/production-infrastructure/apply-security-policies"),
            Some(json!({"import_id": "imp-1", "aws_account_id": "a1", "gap_ids": ["g1", "g2"]}))
        );
    }

    #[tokio::test]
    async fn test_status_endpoints() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.ok(
            Method::Get,
            "/production-infrastructure/import-status/imp-1",
            json!({"status": "completed", "progress_percentage": 100}),
        );
        transport.ok(
            Method::Get,
            "/production-infrastructure/deployment-status/d1",
            json!({"status": "failed", "errors": ["boom"]}),
        );
        let service = ProductionService::new(transport);

        let import = service.import_status("imp-1").await.unwrap();
        assert_eq!(import.status, JobStatus::Complete);
        let deploy = service.deployment_status("d1").await.unwrap();
        assert_eq!(deploy.errors, vec!["boom"]);
    }

    #[tokio::test]
    async fn test_validate_credentials_uses_account_reference() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.ok(
            Method::Get,
            "/production-infrastructure/validate-aws-credentials",
            json!({"valid": true, "account_id": 123456789012u64}),
        );
        let service = ProductionService::new(transport.clone());

        let check = service.validate_credentials("a1").await.unwrap();
        assert!(check.valid);
        assert_eq!(
            transport.calls()[0].query,
            vec![("aws_account_id".to_string(), "a1".to_string())]
        );
    }
}
