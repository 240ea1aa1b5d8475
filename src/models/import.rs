// Infrastructure import: scans, inventories and security findings

use super::aws::AwsCredentials;
use super::wire;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Body of `POST /infrastructure-import/scan-aws-account`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanRequest {
    #[serde(flatten)]
    pub credentials: AwsCredentials,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub regions: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<String>,
}

/// Resources discovered in an account, grouped by service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    #[serde(default, deserialize_with = "wire::opt_id")]
    pub account_id: Option<String>,
    #[serde(default)]
    pub regions: Vec<String>,
    /// Service name -> resources of that service
    #[serde(default)]
    pub resources: BTreeMap<String, Vec<Value>>,
    #[serde(default, with = "wire::opt_timestamp")]
    pub scanned_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Body of `POST /infrastructure-import/import-infrastructure`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportRequest {
    pub aws_account_id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub regions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
}

/// Result of a completed import
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImportResult {
    #[serde(default, deserialize_with = "wire::opt_id")]
    pub import_id: Option<String>,
    #[serde(default, deserialize_with = "wire::opt_id")]
    pub project_id: Option<String>,
    #[serde(default)]
    pub inventory: Inventory,
    #[serde(default)]
    pub security_analysis: Option<SecurityAnalysis>,
}

/// Finding severity, ordered from most to least severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[serde(alias = "CRITICAL", alias = "Critical")]
    Critical,
    #[serde(alias = "HIGH", alias = "High")]
    High,
    #[serde(alias = "MEDIUM", alias = "Medium")]
    Medium,
    #[serde(alias = "LOW", alias = "Low")]
    Low,
    #[serde(alias = "INFO", alias = "Info", alias = "informational")]
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A security gap found in imported infrastructure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityFinding {
    #[serde(deserialize_with = "wire::id")]
    pub id: String,
    pub severity: Severity,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub resource: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub recommendation: Option<String>,
}

/// Reply of `POST /infrastructure-import/analyze-security`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecurityAnalysis {
    #[serde(default, alias = "security_gaps")]
    pub findings: Vec<SecurityFinding>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub summary: Option<String>,
}

/// Overall risk derived from finding counts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    None,
    Low,
    Medium,
    High,
    Critical,
}

/// Finding counts per severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RiskSummary {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
    pub total: usize,
    pub level: Option<RiskLevel>,
}

/// Template returned by the IaC generators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateDocument {
    #[serde(alias = "terraform", alias = "cloudformation", alias = "terraform_code")]
    pub template: String,
    #[serde(default)]
    pub format: Option<String>,
}

/// An AWS region offered for scans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Region {
    pub code: &'static str,
    pub name: &'static str,
}
