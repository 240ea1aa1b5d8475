// Security analysis and compliance records

use super::import::{SecurityFinding, Severity};
use super::wire;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalyzeProjectRequest {
    pub project_id: String,
    pub include_compliance: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectSecurityReport {
    #[serde(default, deserialize_with = "wire::opt_id")]
    pub project_id: Option<String>,
    #[serde(default, alias = "overall_score")]
    pub security_score: Option<f64>,
    #[serde(default)]
    pub findings: Vec<SecurityFinding>,
    #[serde(default)]
    pub recommendations: Vec<SecurityRecommendation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityRecommendation {
    #[serde(deserialize_with = "wire::id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub severity: Severity,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub aws_service: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Query filters for `GET /security/recommendations/{id}`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecommendationFilters {
    pub severity: Option<Severity>,
    pub category: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityUpdate {
    #[serde(deserialize_with = "wire::id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, with = "wire::opt_timestamp")]
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    #[serde(default)]
    pub order: u32,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub commands: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplementationPlan {
    #[serde(default, deserialize_with = "wire::opt_id")]
    pub recommendation_id: Option<String>,
    #[serde(default)]
    pub steps: Vec<PlanStep>,
    #[serde(default, deserialize_with = "wire::opt_text")]
    pub estimated_effort: Option<String>,
    #[serde(default)]
    pub risk: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameworkScore {
    pub framework: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub passed: u32,
    #[serde(default)]
    pub failed: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComplianceDashboard {
    #[serde(default, deserialize_with = "wire::opt_id")]
    pub project_id: Option<String>,
    #[serde(default)]
    pub overall_score: Option<f64>,
    #[serde(default)]
    pub frameworks: Vec<FrameworkScore>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkAnalyzeRequest {
    pub project_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkAnalysis {
    #[serde(default)]
    pub results: Vec<ProjectSecurityReport>,
}
