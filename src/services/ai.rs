// AI-assisted analysis and optimisation

use super::{body, fetch};
use crate::errors::ServiceError;
use crate::models::ai::{
    AiAnalysis, AiReadiness, AnalyzeArchitectureRequest, ChatReply, ChatRequest, CostPrediction,
    Optimization, OptimizeRequest, SmartSuggestions,
};
use crate::transport::{Method, RequestOptions, Transport};
use std::sync::Arc;

#[derive(Clone)]
pub struct AiService {
    transport: Arc<dyn Transport>,
}

impl AiService {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    pub async fn analyze_with_ai(
        &self,
        request: &AnalyzeArchitectureRequest,
    ) -> Result<AiAnalysis, ServiceError> {
        const FALLBACK: &str = "AI analysis is unavailable right now";
        fetch(
            self.transport.as_ref(),
            Method::Post,
            "/ai-ml/analyze-architecture",
            body(request, FALLBACK)?,
            FALLBACK,
        )
        .await
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatReply, ServiceError> {
        const FALLBACK: &str = "The assistant could not answer. Please try again.";
        fetch(
            self.transport.as_ref(),
            Method::Post,
            "/ai-ml/chat",
            body(request, FALLBACK)?,
            FALLBACK,
        )
        .await
    }

    pub async fn smart_suggestions(&self, project_id: &str) -> Result<SmartSuggestions, ServiceError> {
        fetch(
            self.transport.as_ref(),
            Method::Get,
            &format!("/ai-ml/smart-suggestions/{}", project_id),
            RequestOptions::new(),
            "Failed to load suggestions",
        )
        .await
    }

    pub async fn optimize(&self, request: &OptimizeRequest) -> Result<Optimization, ServiceError> {
        const FALLBACK: &str = "Failed to optimize architecture";
        fetch(
            self.transport.as_ref(),
            Method::Post,
            "/ai-ml/optimize-architecture",
            body(request, FALLBACK)?,
            FALLBACK,
        )
        .await
    }

    pub async fn ai_readiness(&self, project_id: &str) -> Result<AiReadiness, ServiceError> {
        fetch(
            self.transport.as_ref(),
            Method::Get,
            &format!("/ai-ml/ai-readiness-assessment/{}", project_id),
            RequestOptions::new(),
            "Failed to assess AI readiness",
        )
        .await
    }

    pub async fn ml_cost_prediction(&self, project_id: &str) -> Result<CostPrediction, ServiceError> {
        fetch(
            self.transport.as_ref(),
            Method::Get,
            &format!("/ai-ml/ml-cost-prediction/{}", project_id),
            RequestOptions::new(),
            "Failed to predict costs",
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ai::{ChatRole, ChatTurn};
    use crate::testing::ScriptedTransport;
    use serde_json::json;

    #[tokio::test]
    async fn test_chat_roundtrip() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.ok(
            Method::Post,
            "/ai-ml/chat",
            json!({"reply": "Use Aurora Serverless", "suggestions": ["Enable backups"]}),
        );
        let service = AiService::new(transport.clone());

        let reply = service
            .chat(&ChatRequest {
                message: "Which database?".into(),
                project_id: Some("p1".into()),
                history: vec![ChatTurn {
                    role: ChatRole::User,
                    content: "hi".into(),
                }],
            })
            .await
            .unwrap();
        assert_eq!(reply.response, "Use Aurora Serverless");
        assert_eq!(
            transport.last_body(Method::Post, "/ai-ml/chat").unwrap()["history"][0]["role"],
            "user"
        );
    }

    #[tokio::test]
    async fn test_unavailable_ai_uses_fallback() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.fail(Method::Get, "/ai-ml/smart-suggestions/p1", 503, json!({"detail": null}));
        let service = AiService::new(transport);

        let err = service.smart_suggestions("p1").await.unwrap_err();
        assert_eq!(err.message, "Request failed with status code 503");
    }
}
