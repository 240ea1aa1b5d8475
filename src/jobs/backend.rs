// Per-kind adapters between the orchestrator and the resource services

use crate::errors::ServiceError;
use crate::models::{
    ApplyPoliciesRequest, DeployRequest, GenerateRequest, GenerateResponse, ImportExistingRequest,
    JobSnapshot, JobStart, JobStatus,
};
use crate::services::{ProductionService, ProjectsService};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Mutex;

/// Server side of one job kind
#[async_trait]
pub trait JobBackend: Send + Sync {
    /// Start the job from its JSON request payload
    async fn start(&self, payload: Value) -> Result<JobStart, ServiceError>;

    async fn poll(&self, job_id: &str) -> Result<JobSnapshot, ServiceError>;

    /// Ask the server to stop the job. Best effort.
    async fn cancel(&self, job_id: &str) -> Result<(), ServiceError>;

    /// The run of `job_id` has ended; drop anything held for it
    fn release(&self, _job_id: &str) {}
}

fn request<T: DeserializeOwned>(payload: Value) -> Result<T, ServiceError> {
    serde_json::from_value(payload)
        .map_err(|e| ServiceError::new(format!("Invalid job request: {}", e)))
}

/// Architecture generation is a single synchronous call on the server.
///
/// The reply is held until the first poll, which reports it as a finished job
/// whose result is `{project_id, architecture_data}`.
pub struct GenerateBackend {
    projects: ProjectsService,
    replies: Mutex<HashMap<String, GenerateResponse>>,
}

impl GenerateBackend {
    pub fn new(projects: ProjectsService) -> Self {
        Self {
            projects,
            replies: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl JobBackend for GenerateBackend {
    async fn start(&self, payload: Value) -> Result<JobStart, ServiceError> {
        let request: GenerateRequest = request(payload)?;
        let reply = self.projects.generate(&request).await?;
        let start = JobStart {
            job_id: reply.project_id.clone(),
            status: JobStatus::Complete,
            message: None,
        };
        if let Ok(mut replies) = self.replies.lock() {
            replies.insert(reply.project_id.clone(), reply);
        }
        Ok(start)
    }

    async fn poll(&self, job_id: &str) -> Result<JobSnapshot, ServiceError> {
        let reply = self
            .replies
            .lock()
            .ok()
            .and_then(|mut replies| replies.remove(job_id));
        let result = match reply {
            Some(reply) => serde_json::to_value(&reply)
                .map_err(|e| ServiceError::new(format!("Failed to read architecture: {}", e)))?,
            None => json!({ "project_id": job_id }),
        };
        Ok(JobSnapshot::new(JobStatus::Complete, 100)
            .with_step("Architecture generated")
            .with_result(result))
    }

    async fn cancel(&self, _job_id: &str) -> Result<(), ServiceError> {
        Ok(())
    }

    fn release(&self, job_id: &str) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.remove(job_id);
        }
    }
}

#[cfg(test)]
impl GenerateBackend {
    fn held(&self) -> usize {
        self.replies.lock().map(|r| r.len()).unwrap_or_default()
    }
}

/// Scan and import of an existing account
pub struct ImportBackend {
    production: ProductionService,
}

impl ImportBackend {
    pub fn new(production: ProductionService) -> Self {
        Self { production }
    }
}

#[async_trait]
impl JobBackend for ImportBackend {
    async fn start(&self, payload: Value) -> Result<JobStart, ServiceError> {
        let request: ImportExistingRequest = request(payload)?;
        self.production.import_existing(&request).await
    }

    async fn poll(&self, job_id: &str) -> Result<JobSnapshot, ServiceError> {
        self.production.import_status(job_id).await
    }

    async fn cancel(&self, job_id: &str) -> Result<(), ServiceError> {
        self.production.cancel(job_id).await
    }
}

/// Remediation of security gaps found by an import
pub struct ApplyPoliciesBackend {
    production: ProductionService,
}

impl ApplyPoliciesBackend {
    pub fn new(production: ProductionService) -> Self {
        Self { production }
    }
}

#[async_trait]
impl JobBackend for ApplyPoliciesBackend {
    async fn start(&self, payload: Value) -> Result<JobStart, ServiceError> {
        let request: ApplyPoliciesRequest = request(payload)?;
        self.production.apply_security_policies(&request).await
    }

    async fn poll(&self, job_id: &str) -> Result<JobSnapshot, ServiceError> {
        self.production.deployment_status(job_id).await
    }

    async fn cancel(&self, job_id: &str) -> Result<(), ServiceError> {
        self.production.cancel(job_id).await
    }
}

pub struct DeployBackend {
    production: ProductionService,
}

impl DeployBackend {
    pub fn new(production: ProductionService) -> Self {
        Self { production }
    }
}

#[async_trait]
impl JobBackend for DeployBackend {
    async fn start(&self, payload: Value) -> Result<JobStart, ServiceError> {
        let request: DeployRequest = request(payload)?;
        self.production.create_from_scratch(&request).await
    }

    async fn poll(&self, job_id: &str) -> Result<JobSnapshot, ServiceError> {
        self.production.deployment_status(job_id).await
    }

    async fn cancel(&self, job_id: &str) -> Result<(), ServiceError> {
        self.production.cancel(job_id).await
    }
}
