// Projects and the generated architecture artifact

use super::wire;
use crate::questionnaire::QuestionnaireData;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One line of the cost breakdown
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostItem {
    #[serde(default, deserialize_with = "wire::text")]
    pub service: String,
    #[serde(default, deserialize_with = "wire::text")]
    pub estimated_monthly_cost: String,
    #[serde(default, deserialize_with = "wire::text")]
    pub description: String,
}

impl CostItem {
    /// Monthly cost as a number, parsed from strings such as "$1,250.00"
    pub fn monthly_amount(&self) -> Option<f64> {
        parse_amount(&self.estimated_monthly_cost)
    }
}

/// First number in a cost string; thousands separators are ignored
pub fn parse_amount(raw: &str) -> Option<f64> {
    let digits: String = raw
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .filter(|c| *c != ',')
        .collect();
    digits.parse().ok()
}

/// Diagram payload. Layout is left to the presentation layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagram {
    #[serde(default)]
    pub nodes: Vec<Value>,
    #[serde(default)]
    pub edges: Vec<Value>,
}

impl Diagram {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

/// The server-produced architecture
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureData {
    /// Category -> chosen service name
    #[serde(default, deserialize_with = "wire::string_map")]
    pub services: BTreeMap<String, String>,
    #[serde(default)]
    pub security_features: Vec<String>,
    #[serde(default, alias = "cost_estimate", deserialize_with = "wire::opt_text")]
    pub estimated_cost: Option<String>,
    #[serde(default)]
    pub cost_breakdown: Vec<CostItem>,
    #[serde(default, alias = "diagram_data")]
    pub diagram: Option<Diagram>,
    /// Declarative IaC template
    #[serde(default, alias = "terraform")]
    pub terraform_template: Option<String>,
    /// Stack template
    #[serde(default, alias = "cloudformation")]
    pub cloudformation_template: Option<String>,
    /// Fields this client does not interpret, kept for round-trips
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ArchitectureData {
    /// Sum of the parsable lines of the cost breakdown
    pub fn breakdown_total(&self) -> Option<f64> {
        let amounts: Vec<f64> = self
            .cost_breakdown
            .iter()
            .filter_map(CostItem::monthly_amount)
            .collect();
        if amounts.is_empty() {
            None
        } else {
            Some(amounts.iter().sum())
        }
    }

    pub fn has_templates(&self) -> bool {
        self.terraform_template.as_deref().is_some_and(|t| !t.is_empty())
            || self
                .cloudformation_template
                .as_deref()
                .is_some_and(|t| !t.is_empty())
    }
}

/// A saved project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(deserialize_with = "wire::id")]
    pub id: String,
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub questionnaire_data: QuestionnaireData,
    #[serde(default)]
    pub architecture_data: Option<ArchitectureData>,
    #[serde(default, with = "wire::opt_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "wire::opt_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Project {
    pub fn has_architecture(&self) -> bool {
        self.architecture_data.is_some()
    }
}

/// Row of the project list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSummary {
    #[serde(deserialize_with = "wire::id")]
    pub id: String,
    #[serde(default)]
    pub project_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, with = "wire::opt_timestamp")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "wire::opt_timestamp")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<&Project> for ProjectSummary {
    fn from(project: &Project) -> Self {
        Self {
            id: project.id.clone(),
            project_name: project.project_name.clone(),
            description: project.description.clone(),
            created_at: project.created_at,
            updated_at: project.updated_at,
        }
    }
}

/// Body of `POST /projects/`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewProject {
    pub project_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub questionnaire_data: QuestionnaireData,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub architecture_data: Option<ArchitectureData>,
}

/// Body of `PUT /projects/{id}`; absent fields are left unchanged
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub questionnaire_data: Option<QuestionnaireData>,
}

impl ProjectPatch {
    pub fn is_empty(&self) -> bool {
        self.project_name.is_none() && self.description.is_none() && self.questionnaire_data.is_none()
    }

    /// Whether applying the patch requires the architecture to be regenerated
    pub fn needs_regeneration(&self) -> bool {
        self.questionnaire_data.is_some()
    }
}

/// Body of `POST /projects/generate-architecture`: the questionnaire itself
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    #[serde(flatten)]
    pub questionnaire: QuestionnaireData,
}

impl GenerateRequest {
    pub fn new(questionnaire: QuestionnaireData) -> Self {
        Self { questionnaire }
    }
}

/// Reply of `POST /projects/generate-architecture`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateResponse {
    #[serde(deserialize_with = "wire::id")]
    pub project_id: String,
    #[serde(default)]
    pub architecture_data: ArchitectureData,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_project_decodes_server_record() {
        let project: Project = serde_json::from_value(json!({
            "id": 7,
            "project_name": "Shop",
            "description": null,
            "questionnaire_data": {
                "application_type": "ecommerce",
                "compliance_requirements": ["pci"],
                "selected_services": {"compute": ["Lambda"]}
            },
            "architecture_data": {
                "services": {"compute": "AWS Lambda", "database": "Amazon RDS"},
                "security_features": ["WAF", "KMS encryption"],
                "estimated_cost": "$120-$300/month",
                "cost_breakdown": [
                    {"service": "Lambda", "estimated_monthly_cost": "$20", "description": "API"},
                    {"service": "RDS", "estimated_monthly_cost": 1250.5, "description": "db"}
                ],
                "diagram": {"nodes": [{"id": "a"}], "edges": []},
                "terraform_template": "resource \"aws_lambda_function\" {}",
                "cloudformation_template": "",
                "generated_by": "planner-v2"
            },
            "created_at": "2024-05-01T09:00:00",
            "updated_at": "2024-05-02T09:00:00Z",
            "owner_id": 3
        }))
        .unwrap();

        assert_eq!(project.id, "7");
        assert_eq!(project.questionnaire_data.answers.text("application_type"), Some("ecommerce"));
        assert_eq!(project.questionnaire_data.selected_services.services("compute"), ["Lambda"]);

        let arch = project.architecture_data.unwrap();
        assert_eq!(arch.services["database"], "Amazon RDS");
        assert_eq!(arch.cost_breakdown[1].estimated_monthly_cost, "1250.5");
        assert_eq!(arch.breakdown_total(), Some(1270.5));
        assert!(arch.has_templates());
        assert_eq!(arch.extra.get("generated_by"), Some(&json!("planner-v2")));
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("$1,250.00"), Some(1250.0));
        assert_eq!(parse_amount("~ 30 USD"), Some(30.0));
        assert_eq!(parse_amount("free"), None);
    }

    #[test]
    fn test_patch_only_sends_changed_fields() {
        let patch = ProjectPatch {
            description: Some("new".into()),
            ..Default::default()
        };
        assert_eq!(serde_json::to_value(&patch).unwrap(), json!({"description": "new"}));
        assert!(!patch.needs_regeneration());
        assert!(ProjectPatch::default().is_empty());
    }

    #[test]
    fn test_generate_response_defaults_artifact() {
        let reply: GenerateResponse = serde_json::from_value(json!({"project_id": "p1"})).unwrap();
        assert_eq!(reply.project_id, "p1");
        assert!(reply.architecture_data.services.is_empty());
    }
}
