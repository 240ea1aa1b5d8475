// Projects and their generated architectures

use super::{body, decode_list, execute, fetch};
use crate::errors::{ResultExt, ServiceError};
use crate::models::{
    ArchitectureData, GenerateRequest, GenerateResponse, NewProject, Project, ProjectPatch,
    ProjectSummary,
};
use crate::transport::{decode, Method, RequestOptions, Transport};
use serde_json::Value;
use std::sync::Arc;

#[derive(Clone)]
pub struct ProjectsService {
    transport: Arc<dyn Transport>,
}

impl ProjectsService {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Ask the server to plan an architecture for a questionnaire
    pub async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse, ServiceError> {
        const FALLBACK: &str = "Failed to generate architecture";
        log::info!(
            "[ProjectsService] Generating architecture for {} answers",
            request.questionnaire.answers.len()
        );
        let response: GenerateResponse = fetch(
            self.transport.as_ref(),
            Method::Post,
            "/projects/generate-architecture",
            body(request, FALLBACK)?,
            FALLBACK,
        )
        .await?;
        log::info!("[ProjectsService] Generated project {}", response.project_id);
        Ok(response)
    }

    pub async fn create(&self, project: &NewProject) -> Result<Project, ServiceError> {
        const FALLBACK: &str = "Failed to create project";
        fetch(
            self.transport.as_ref(),
            Method::Post,
            "/projects/",
            body(project, FALLBACK)?,
            FALLBACK,
        )
        .await
    }

    pub async fn get(&self, id: &str) -> Result<Project, ServiceError> {
        fetch(
            self.transport.as_ref(),
            Method::Get,
            &format!("/projects/{}", id),
            RequestOptions::new(),
            "Failed to load project",
        )
        .await
    }

    pub async fn list(&self, skip: u32, limit: u32) -> Result<Vec<ProjectSummary>, ServiceError> {
        const FALLBACK: &str = "Failed to load projects";
        let value = self
            .transport
            .get(
                "/projects/",
                RequestOptions::new().query("skip", skip).query("limit", limit),
            )
            .await
            .with_fallback(FALLBACK)?;
        decode_list(value, &["projects", "items"], FALLBACK)
    }

    pub async fn update(&self, id: &str, patch: &ProjectPatch) -> Result<Project, ServiceError> {
        const FALLBACK: &str = "Failed to update project";
        fetch(
            self.transport.as_ref(),
            Method::Put,
            &format!("/projects/{}", id),
            body(patch, FALLBACK)?,
            FALLBACK,
        )
        .await
    }

    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        log::info!("[ProjectsService] Deleting project {}", id);
        execute(
            self.transport.as_ref(),
            Method::Delete,
            &format!("/projects/{}", id),
            RequestOptions::new(),
            "Failed to delete project",
        )
        .await
    }

    /// Re-plan the architecture from the project's stored questionnaire
    pub async fn regenerate(&self, id: &str) -> Result<ArchitectureData, ServiceError> {
        const FALLBACK: &str = "Failed to regenerate architecture";
        log::info!("[ProjectsService] Regenerating architecture for {}", id);
        let value = self
            .transport
            .put(
                &format!("/projects/{}/regenerate-architecture", id),
                RequestOptions::new(),
            )
            .await
            .with_fallback(FALLBACK)?;
        architecture_from(value, FALLBACK)
    }

    pub async fn get_architecture(&self, id: &str) -> Result<ArchitectureData, ServiceError> {
        const FALLBACK: &str = "Failed to load architecture";
        let value = self
            .transport
            .get(&format!("/projects/{}/architecture", id), RequestOptions::new())
            .await
            .with_fallback(FALLBACK)?;
        architecture_from(value, FALLBACK)
    }
}

/// The artifact either bare or wrapped as `{"architecture_data": ...}`
fn architecture_from(value: Value, fallback: &str) -> Result<ArchitectureData, ServiceError> {
    let inner = match value {
        Value::Object(mut map) if map.contains_key("architecture_data") => map
            .remove("architecture_data")
            .unwrap_or(Value::Null),
        other => other,
    };
    if inner.is_null() {
        return Err(ServiceError::new(fallback));
    }
    decode(inner).with_fallback(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::questionnaire::{Answers, QuestionnaireData, ServiceSelection};
    use crate::testing::ScriptedTransport;
    use serde_json::json;

    fn service() -> (Arc<ScriptedTransport>, ProjectsService) {
        let transport = Arc::new(ScriptedTransport::new());
        (transport.clone(), ProjectsService::new(transport))
    }

    #[tokio::test]
    async fn test_generate_posts_questionnaire() {
        let (transport, projects) = service();
        transport.ok(
            Method::Post,
            "/projects/generate-architecture",
            json!({"project_id": "p1", "architecture_data": {"services": {"compute": "Lambda"}}}),
        );

        let mut answers = Answers::new();
        answers.set("project_name", "Shop");
        let mut services = ServiceSelection::new();
        services.add("compute", "Lambda");
        let request = GenerateRequest::new(QuestionnaireData::new(answers, services));

        let reply = projects.generate(&request).await.unwrap();
        assert_eq!(reply.project_id, "p1");
        assert_eq!(
            transport.last_body(Method::Post, "/projects/generate-architecture"),
            Some(json!({"project_name": "Shop", "selected_services": {"compute": ["Lambda"]}}))
        );
    }

    #[tokio::test]
    async fn test_list_sends_paging() {
        let (transport, projects) = service();
        transport.ok(Method::Get, "/projects/", json!([{"id": 1, "project_name": "A"}]));

        let list = projects.list(10, 5).await.unwrap();
        assert_eq!(list[0].id, "1");
        let call = &transport.calls()[0];
        assert_eq!(
            call.query,
            vec![("skip".to_string(), "10".to_string()), ("limit".to_string(), "5".to_string())]
        );
    }

    #[tokio::test]
    async fn test_errors_are_translated() {
        let (transport, projects) = service();
        transport.fail(Method::Get, "/projects/p9", 404, json!({"detail": "Project not found"}));
        let err = projects.get("p9").await.unwrap_err();
        assert_eq!(err.message, "Project not found");
        assert!(err.is_not_found());

        transport.fail(Method::Delete, "/projects/p9", 500, json!({}));
        let err = projects.delete("p9").await.unwrap_err();
        assert_eq!(err.message, "Request failed with status code 500");
        assert_eq!(err.status, Some(500));
    }

    #[tokio::test]
    async fn test_architecture_reply_shapes() {
        let (transport, projects) = service();
        transport.ok(
            Method::Get,
            "/projects/p1/architecture",
            json!({"architecture_data": {"security_features": ["WAF"]}}),
        );
        transport.ok(
            Method::Put,
            "/projects/p1/regenerate-architecture",
            json!({"security_features": ["KMS"]}),
        );

        let arch = projects.get_architecture("p1").await.unwrap();
        assert_eq!(arch.security_features, vec!["WAF"]);
        let arch = projects.regenerate("p1").await.unwrap();
        assert_eq!(arch.security_features, vec!["KMS"]);
    }
}
