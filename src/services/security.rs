// Security analysis, recommendations and compliance

use super::{body, decode_list, fetch};
use crate::errors::{ResultExt, ServiceError};
use crate::models::security::{
    AnalyzeProjectRequest, BulkAnalysis, BulkAnalyzeRequest, ComplianceDashboard,
    ImplementationPlan, ProjectSecurityReport, SecurityRecommendation, SecurityUpdate,
};
use crate::models::RecommendationFilters;
use crate::transport::{Method, RequestOptions, Transport};
use serde_json::json;
use std::sync::Arc;

#[derive(Clone)]
pub struct SecurityService {
    transport: Arc<dyn Transport>,
}

impl SecurityService {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub async fn analyze_project(&self, project_id: &str) -> Result<ProjectSecurityReport, ServiceError> {
        const FALLBACK: &str = "Failed to analyze project security";
        let request = AnalyzeProjectRequest {
            project_id: project_id.to_string(),
            include_compliance: true,
        };
        fetch(
            self.transport.as_ref(),
            Method::Post,
            "/security/analyze-project",
            body(&request, FALLBACK)?,
            FALLBACK,
        )
        .await
    }

    pub async fn recommendations(
        &self,
        project_id: &str,
        filters: &RecommendationFilters,
    ) -> Result<Vec<SecurityRecommendation>, ServiceError> {
        const FALLBACK: &str = "Failed to load security recommendations";
        let options = RequestOptions::new()
            .query_opt("severity", filters.severity.map(|s| s.as_str()))
            .query_opt("category", filters.category.as_deref());
        let value = self
            .transport
            .get(&format!("/security/recommendations/{}", project_id), options)
            .await
            .with_fallback(FALLBACK)?;
        decode_list(value, &["recommendations"], FALLBACK)
    }

    pub async fn security_updates(&self) -> Result<Vec<SecurityUpdate>, ServiceError> {
        const FALLBACK: &str = "Failed to load AWS security updates";
        let value = self
            .transport
            .get("/security/aws-security-updates", RequestOptions::new())
            .await
            .with_fallback(FALLBACK)?;
        decode_list(value, &["updates"], FALLBACK)
    }

    pub async fn implementation_plan(
        &self,
        recommendation_id: &str,
        project_id: &str,
    ) -> Result<ImplementationPlan, ServiceError> {
        fetch(
            self.transport.as_ref(),
            Method::Post,
            &format!("/security/recommendation-implementation-plan/{}", recommendation_id),
            RequestOptions::with_body(json!({ "project_id": project_id })),
            "Failed to build implementation plan",
        )
        .await
    }

    pub async fn compliance_dashboard(&self, project_id: &str) -> Result<ComplianceDashboard, ServiceError> {
        fetch(
            self.transport.as_ref(),
            Method::Get,
            &format!("/security/compliance-dashboard/{}", project_id),
            RequestOptions::new(),
            "Failed to load compliance dashboard",
        )
        .await
    }

    pub async fn bulk_analyze(&self, project_ids: &[String]) -> Result<BulkAnalysis, ServiceError> {
        const FALLBACK: &str = "Failed to analyze projects";
        let request = BulkAnalyzeRequest {
            project_ids: project_ids.to_vec(),
        };
        fetch(
            self.transport.as_ref(),
            Method::Post,
            "/security/bulk-analyze",
            body(&request, FALLBACK)?,
            FALLBACK,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;
    use crate::testing::ScriptedTransport;

    #[tokio::test]
    async fn test_recommendation_filters_become_query() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.ok(
            Method::Get,
            "/security/recommendations/p1",
            json!({"recommendations": [{"id": 1, "title": "Enable MFA", "severity": "high"}]}),
        );
        let service = SecurityService::new(transport.clone());

        let filters = RecommendationFilters {
            severity: Some(Severity::High),
            category: None,
        };
        let recs = service.recommendations("p1", &filters).await.unwrap();
        assert_eq!(recs[0].title, "Enable MFA");
        assert_eq!(
            transport.calls()[0].query,
            vec![("severity".to_string(), "high".to_string())]
        );
    }

    #[tokio::test]
    async fn test_bulk_analyze_body() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.ok(Method::Post, "/security/bulk-analyze", json!({"results": []}));
        let service = SecurityService::new(transport.clone());

        service
            .bulk_analyze(&["p1".to_string(), "p2".to_string()])
            .await
            .unwrap();
        assert_eq!(
            transport.last_body(Method::Post, "/security/bulk-analyze"),
            Some(json!({"project_ids": ["p1", "p2"]}))
        );
    }
}
