// Production infrastructure job requests

use serde::{Deserialize, Serialize};

/// Body of `POST /production-infrastructure/create-from-scratch`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeployRequest {
    pub project_id: String,
    pub aws_account_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

/// Body of `POST /production-infrastructure/import-existing`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportExistingRequest {
    pub aws_account_id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub regions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
}

/// Body of `POST /production-infrastructure/apply-security-policies`.
///
/// Both identifiers are required: the import job that found the gaps and the
/// account the fixes are applied to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyPoliciesRequest {
    pub import_id: String,
    pub aws_account_id: String,
    #[serde(default)]
    pub gap_ids: Vec<String>,
}

/// Body of `POST /production-infrastructure/destroy/{id}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DestroyRequest {
    pub aws_account_id: String,
    pub confirm: bool,
}
